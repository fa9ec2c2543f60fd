//! Session token storage for the API client.
//!
//! The client never reaches into a global store; whoever constructs it
//! injects a [`TokenProvider`].

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Bearer token storage capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
    async fn set_token(&self, token: String);
    async fn clear(&self);
}

/// In-memory session, the default for CLI tools and tests
#[derive(Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenProvider for MemorySession {
    async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    async fn clear(&self) {
        *self.token.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn provider_is_usable_behind_a_trait_object() {
        let mut mock = MockTokenProvider::new();
        mock.expect_token()
            .times(2)
            .returning(|| Some("jwt-token".to_string()));

        let provider: Arc<dyn TokenProvider> = Arc::new(mock);
        assert_eq!(provider.token().await, Some("jwt-token".to_string()));
        assert_eq!(provider.token().await, Some("jwt-token".to_string()));
    }

    #[tokio::test]
    async fn memory_session_stores_and_clears() {
        let session = MemorySession::new();
        assert_eq!(session.token().await, None);
        session.set_token("abc".to_string()).await;
        assert_eq!(session.token().await, Some("abc".to_string()));
        session.clear().await;
        assert_eq!(session.token().await, None);
    }
}
