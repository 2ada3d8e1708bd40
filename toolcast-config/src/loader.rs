//! Configuration loading entry points

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use toolcast_core::error::ConfigResult;
use toolcast_core::registry::Registry;

use crate::decode;

/// Load and wire a manifest document.
pub async fn load_str(document: &str) -> ConfigResult<Arc<Registry>> {
    let decoded = decode::decode(document)?;
    let registry = decode::initialize(decoded).await?;
    Ok(Arc::new(registry))
}

/// Load and wire a manifest file.
///
/// Used both at startup and on reload: each call produces a fresh registry
/// which the server swaps in atomically.
pub async fn load_file(path: impl AsRef<Path>) -> ConfigResult<Arc<Registry>> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading configuration");
    let document = std::fs::read_to_string(path)?;
    load_str(&document).await
}
