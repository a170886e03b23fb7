use async_trait::async_trait;
use duplex_error::NetworkError;

/// Boundary interface for auth-token acquisition (spec §6).
///
/// `get_valid_token` is called on every (re)connect attempt, not once per
/// `Transport` lifetime, so an implementation backed by a refreshing
/// OAuth client naturally hands out a fresh token after expiry.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_valid_token(&self) -> Result<String, NetworkError>;
}

/// A provider that always returns the same token. Useful for tests and
/// for static API-key deployments.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_valid_token(&self) -> Result<String, NetworkError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
#[path = "token_provider.test.rs"]
mod tests;
