//! HTTP source kind
//!
//! A shared reqwest client plus a base URL, default headers and default
//! query parameters. REST-wrapper tools compose requests against it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use toolcast_core::error::{ConfigError, ConfigResult};
use toolcast_core::kinds::{decode_strict, SourceConfig};
use toolcast_core::source::Source;

pub const KIND: &str = "http";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(skip)]
    name: String,

    base_url: String,

    /// Headers sent with every request; tools may override per key
    #[serde(default)]
    headers: BTreeMap<String, String>,

    /// Query parameters appended to every request
    #[serde(default)]
    query_params: BTreeMap<String, String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

pub fn decode_config(name: &str, node: YamlValue) -> ConfigResult<Box<dyn SourceConfig>> {
    let mut config: HttpConfig = decode_strict("source", name, node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[async_trait]
impl SourceConfig for HttpConfig {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> ConfigResult<Arc<dyn Source>> {
        let base_url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidConfig {
            family: "source",
            name: self.name.clone(),
            message: format!("invalid baseUrl: {}", e),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Initialize {
                family: "source",
                name: self.name.clone(),
                message: e.to_string(),
            })?;

        info!(source = %self.name, base_url = %base_url, "http source ready");
        Ok(Arc::new(HttpSource {
            client,
            base_url,
            headers: self.headers.clone(),
            query_params: self.query_params.clone(),
        }))
    }
}

pub struct HttpSource {
    client: reqwest::Client,
    base_url: Url,
    headers: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
}

impl HttpSource {
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn default_query(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }
}

#[async_trait]
impl Source for HttpSource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn close(&self) {
        // reqwest clients release their connections on drop
    }
}

fn default_timeout_secs() -> u64 {
    30
}
