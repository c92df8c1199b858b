use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tracing::{debug, info};

use super::{DocStoreError, DocumentStore};

pub const DEFAULT_KEY_PREFIX: &str = "gradtrack:";

/// Stores each document as a JSON string under `<prefix><path>`
#[derive(Debug, Clone)]
pub struct RedisDocumentStore {
    client: Client,
    prefix: String,
}

impl RedisDocumentStore {
    pub fn new(client: Client, prefix: Option<String>) -> Self {
        // Connection validation happens on first use
        Self {
            client,
            prefix: prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        }
    }

    fn key(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches('/'))
    }

    /// Round-trip a PING so startup fails loudly on a bad URL
    pub async fn ping(&self) -> Result<(), DocStoreError> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, DocStoreError> {
        let key = self.key(path);
        let mut connection = self.client.get_multiplexed_async_connection().await?;

        let raw: Option<String> = connection.get(&key).await?;

        match raw {
            Some(json) => {
                debug!("Document hit for {}", key);
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                debug!("Document miss for {}", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), DocStoreError> {
        let key = self.key(path);
        let json = serde_json::to_string(&value)?;

        self.client
            .get_multiplexed_async_connection()
            .await?
            .set::<_, _, ()>(&key, json)
            .await?;

        info!("Stored document at {}", key);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), DocStoreError> {
        let key = self.key(path);

        let removed: i64 = self
            .client
            .get_multiplexed_async_connection()
            .await?
            .del(&key)
            .await?;

        info!("Removed document at {} ({} key(s))", key, removed);
        Ok(())
    }
}
