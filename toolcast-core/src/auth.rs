//! Auth service contract

use async_trait::async_trait;

use crate::error::ToolcastResult;
use crate::params::JsonMap;

/// A bearer-token verifier and claim extractor.
///
/// Services are consulted per request: each one reads its own
/// `<name>_token` header, and a verification failure is not fatal unless a
/// tool's `authRequired` names the service.
#[async_trait]
pub trait AuthService: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Registered kind identifier
    fn kind(&self) -> &'static str;

    /// Verify a raw bearer token and return its claims map.
    async fn verify(&self, token: &str) -> ToolcastResult<JsonMap>;
}
