//! Root manifest schema
//!
//! The root document is decoded loosely first: entity bodies stay as raw
//! YAML nodes so the kind factories can decode them strictly in a second
//! phase.

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

/// Top-level manifest shape.
///
/// `BTreeMap` keeps entity iteration deterministic, which makes error
/// reporting and tests stable.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, YamlValue>,

    #[serde(default, rename = "authServices")]
    pub auth_services: BTreeMap<String, YamlValue>,

    #[serde(default)]
    pub tools: BTreeMap<String, YamlValue>,

    #[serde(default)]
    pub prompts: BTreeMap<String, YamlValue>,

    #[serde(default)]
    pub toolsets: BTreeMap<String, Vec<String>>,
}

/// Minimal envelope peeked out of every entity node before the full strict
/// decode.
#[derive(Debug, Deserialize)]
pub struct KindEnvelope {
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_sections_optional() {
        let root: RootConfig = serde_yaml::from_str("sources: {}\n").unwrap();
        assert!(root.tools.is_empty());
        assert!(root.toolsets.is_empty());
    }

    #[test]
    fn test_unknown_root_key_rejected() {
        let err = serde_yaml::from_str::<RootConfig>("widgets: {}\n").unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }
}
