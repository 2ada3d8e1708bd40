//! MCP session table for the streamable HTTP transport
//!
//! Sessions carry nothing beyond the negotiated protocol version and the
//! client identity from `initialize`. Omitting the session id on a later
//! request simply starts a fresh session; expiry only bounds memory.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ClientInfo;

/// Negotiation state for one streamable-HTTP client
#[derive(Debug, Clone)]
pub struct McpSession {
    pub id: String,
    pub protocol_version: String,
    pub client_info: Option<ClientInfo>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Concurrent session table
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, McpSession>>>,
    session_ttl: Duration,
}

impl SessionManager {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl,
        }
    }

    /// Create a session after a successful `initialize`.
    pub async fn create(
        &self,
        protocol_version: &str,
        client_info: Option<ClientInfo>,
    ) -> McpSession {
        let now = Utc::now();
        let session = McpSession {
            id: Uuid::new_v4().to_string(),
            protocol_version: protocol_version.to_string(),
            client_info,
            created_at: now,
            last_seen: now,
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        debug!(session = %session.id, version = %session.protocol_version, "session created");
        session
    }

    /// Look up a session and refresh its activity timestamp.
    pub async fn touch(&self, id: &str) -> Option<McpSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        session.last_seen = Utc::now();
        Some(session.clone())
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle beyond the ttl.
    pub async fn expire_idle(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::zero());
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen > cutoff);
        before - sessions.len()
    }

    /// Background expiry sweep.
    pub fn start_expiry_task(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let expired = manager.expire_idle().await;
                if expired > 0 {
                    debug!(expired, "expired idle MCP sessions");
                }
            }
        })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_touch() {
        let manager = SessionManager::default();
        let session = manager.create("2024-11-05", None).await;

        let found = manager.touch(&session.id).await.unwrap();
        assert_eq!(found.protocol_version, "2024-11-05");
        assert!(manager.touch("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let manager = SessionManager::default();
        let session = manager.create("2024-11-05", None).await;
        assert!(manager.remove(&session.id).await);
        assert!(!manager.remove(&session.id).await);
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_expiry() {
        let manager = SessionManager::new(Duration::from_secs(0));
        manager.create("2024-11-05", None).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(manager.expire_idle().await, 1);
        assert!(manager.is_empty().await);
    }
}
