pub mod redis;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DocStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// Schema-less JSON documents addressed by path (e.g. `codes/<id>`).
/// No querying; only direct key access.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, DocStoreError>;

    /// Replace whatever is stored at `path`
    async fn set(&self, path: &str, value: Value) -> Result<(), DocStoreError>;

    /// Removing a missing path is not an error
    async fn remove(&self, path: &str) -> Result<(), DocStoreError>;
}
