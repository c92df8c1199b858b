use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use crate::code::model::{
    snippet_path, CodeError, CodeSnippet, OwnerType, SaveSnippetRequest, SnippetPatch,
    SnippetRecord,
};
use crate::docstore::DocumentStore;
use crate::ids::generate_code_id;
use crate::retry::{retry, RetryPolicy};

/// Persists code snippets for posts and comments in the document store.
/// Stateless between calls; there is no locking, so concurrent edits to one
/// snippet resolve as last-write-wins.
#[derive(Clone)]
pub struct CodeSnippetStore {
    store: Arc<dyn DocumentStore>,
    retry_policy: RetryPolicy,
}

fn require<'a>(value: &'a str, field: &str) -> Result<&'a str, CodeError> {
    if value.trim().is_empty() {
        return Err(CodeError::ValidationError(format!(
            "Invalid {field}: {field} must be a non-empty string"
        )));
    }
    Ok(value)
}

fn require_id(id: &str) -> Result<(), CodeError> {
    require(id, "codeId").map(|_| ())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl CodeSnippetStore {
    pub fn new(store: Arc<dyn DocumentStore>, retry_policy: RetryPolicy) -> Self {
        Self {
            store,
            retry_policy,
        }
    }

    /// Save a new snippet, or overwrite the one at `request.id`. Returns the id.
    ///
    /// Every field is validated before the store is touched. The write is
    /// retried according to the store's retry policy.
    pub async fn save(&self, request: SaveSnippetRequest) -> Result<String, CodeError> {
        let content = require(&request.content, "content")?;
        let language = require(&request.language, "language")?;
        let related_id = require(&request.related_id, "relatedId")?;
        let related_type =
            OwnerType::from_str(require(&request.related_type, "relatedType")?)
                .map_err(CodeError::ValidationError)?;
        let created_by = require(&request.created_by, "createdBy")?;

        let existing_id = request
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        // createdAt is fixed by the first write; edits keep it
        let (id, created_at) = match existing_id {
            Some(id) => {
                let previous = self.get(id).await?;
                let created_at = previous
                    .map(|snippet| snippet.record.created_at)
                    .unwrap_or_else(now_millis);
                (id.to_string(), created_at)
            }
            None => (generate_code_id(), now_millis()),
        };

        let record = SnippetRecord {
            content: content.to_string(),
            language: language.to_string(),
            related_id: related_id.to_string(),
            related_type,
            created_by: created_by.to_string(),
            created_at,
            updated_at: now_millis().max(created_at),
        };
        let document = serde_json::to_value(&record).map_err(|e| {
            CodeError::Malformed(format!("Could not serialize snippet {}: {}", id, e))
        })?;

        let path = snippet_path(&id);
        info!("Saving code snippet to {}", path);

        let store = self.store.clone();
        retry(&self.retry_policy, "save code snippet", || {
            let store = store.clone();
            let path = path.clone();
            let document = document.clone();
            async move { store.set(&path, document).await }
        })
        .await
        .map_err(|e| {
            error!(
                "Giving up on code snippet {} after {} attempts: {}",
                path, e.attempts, e.last_error
            );
            CodeError::SaveFailed {
                attempts: e.attempts,
                last_error: e.last_error,
            }
        })?;

        info!("Saved code snippet {}", path);
        Ok(id)
    }

    /// `Ok(None)` when nothing is stored under `id`
    pub async fn get(&self, id: &str) -> Result<Option<CodeSnippet>, CodeError> {
        require_id(id)?;
        let path = snippet_path(id);

        let value = self.store.get(&path).await.map_err(|e| {
            error!("Error fetching code snippet {}: {}", path, e);
            CodeError::StoreError(e)
        })?;

        match value {
            Some(value) => {
                let record: SnippetRecord = serde_json::from_value(value)
                    .map_err(|e| CodeError::Malformed(format!("{}: {}", path, e)))?;
                Ok(Some(CodeSnippet {
                    id: id.to_string(),
                    record,
                }))
            }
            None => {
                info!("No code snippet found at {}", path);
                Ok(None)
            }
        }
    }

    /// Idempotent; removing an unknown id succeeds
    pub async fn remove(&self, id: &str) -> Result<(), CodeError> {
        require_id(id)?;
        let path = snippet_path(id);

        self.store.remove(&path).await.map_err(|e| {
            error!("Error deleting code snippet {}: {}", path, e);
            CodeError::StoreError(e)
        })?;

        info!("Deleted code snippet {}", path);
        Ok(())
    }

    /// Read, shallow-merge, write back. Not transactional: a writer that lands
    /// between the read and the write is overwritten.
    pub async fn update(&self, id: &str, patch: SnippetPatch) -> Result<CodeSnippet, CodeError> {
        require_id(id)?;
        for (field, value) in [
            ("content", &patch.content),
            ("language", &patch.language),
            ("relatedId", &patch.related_id),
            ("createdBy", &patch.created_by),
        ] {
            if let Some(value) = value {
                require(value, field)?;
            }
        }

        let mut snippet = self
            .get(id)
            .await?
            .ok_or_else(|| CodeError::NotFound(id.to_string()))?;

        let record = &mut snippet.record;
        if let Some(content) = patch.content {
            record.content = content;
        }
        if let Some(language) = patch.language {
            record.language = language;
        }
        if let Some(related_id) = patch.related_id {
            record.related_id = related_id;
        }
        if let Some(related_type) = patch.related_type {
            record.related_type = related_type;
        }
        if let Some(created_by) = patch.created_by {
            record.created_by = created_by;
        }
        record.updated_at = now_millis().max(record.created_at);

        let path = snippet_path(id);
        let document = serde_json::to_value(&*record)
            .map_err(|e| CodeError::Malformed(format!("{}: {}", path, e)))?;

        self.store.set(&path, document).await.map_err(|e| {
            error!("Error updating code snippet {}: {}", path, e);
            CodeError::StoreError(e)
        })?;

        info!("Updated code snippet {}", path);
        Ok(snippet)
    }
}
