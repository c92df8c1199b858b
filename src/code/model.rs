use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::docstore::DocStoreError;

/// Root path for snippet documents
pub const CODE_PATH_PREFIX: &str = "codes";

pub fn snippet_path(id: &str) -> String {
    format!("{}/{}", CODE_PATH_PREFIX, id)
}

/// What a snippet is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Post,
    Comment,
}

impl OwnerType {
    pub fn from_str(value: &str) -> Result<Self, String> {
        match value {
            "post" => Ok(OwnerType::Post),
            "comment" => Ok(OwnerType::Comment),
            _ => Err(format!(
                "Invalid relatedType: expected 'post' or 'comment', got '{}'",
                value
            )),
        }
    }
}

/// The document stored at `codes/<id>`. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnippetRecord {
    pub content: String,
    pub language: String,
    pub related_id: String,
    pub related_type: OwnerType,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CodeSnippet {
    pub id: String,
    #[serde(flatten)]
    pub record: SnippetRecord,
}

/// Input to `save`. Fields arrive as raw strings so that validation can name
/// exactly which one is missing.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnippetRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub related_id: String,
    #[serde(default)]
    pub related_type: String,
    #[serde(default)]
    pub created_by: String,
    /// Present when editing an existing snippet
    pub id: Option<String>,
}

/// Shallow patch; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnippetPatch {
    pub content: Option<String>,
    pub language: Option<String>,
    pub related_id: Option<String>,
    pub related_type: Option<OwnerType>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveSnippetResponse {
    pub id: String,
    pub success: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SnippetIdQuery {
    pub id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Code snippet with ID {0} not found")]
    NotFound(String),

    #[error("Failed to save code snippet after {attempts} attempts: {last_error}")]
    SaveFailed {
        attempts: u32,
        last_error: DocStoreError,
    },

    #[error("Document store error: {0}")]
    StoreError(#[from] DocStoreError),

    #[error("Stored snippet is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CodeErrorResponse {
    #[schema(example = "Code snippet not found")]
    pub error: String,

    #[schema(example = "NOT_FOUND")]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_path() {
        assert_eq!(snippet_path("code_1_abc"), "codes/code_1_abc");
    }

    #[test]
    fn test_record_uses_camel_case_fields() {
        let record = SnippetRecord {
            content: "fn main() {}".to_string(),
            language: "rust".to_string(),
            related_id: "post-1".to_string(),
            related_type: OwnerType::Post,
            created_by: "user-1".to_string(),
            created_at: 1,
            updated_at: 2,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["relatedId"], "post-1");
        assert_eq!(value["relatedType"], "post");
        assert_eq!(value["createdBy"], "user-1");
        assert_eq!(value["updatedAt"], 2);
    }

    #[test]
    fn test_owner_type_parsing() {
        assert_eq!(OwnerType::from_str("comment").unwrap(), OwnerType::Comment);
        assert!(OwnerType::from_str("task").is_err());
    }

    #[test]
    fn test_snippet_flattens_record() {
        let snippet = CodeSnippet {
            id: "code_1_abc".to_string(),
            record: SnippetRecord {
                content: "x".to_string(),
                language: "js".to_string(),
                related_id: "c1".to_string(),
                related_type: OwnerType::Comment,
                created_by: "u1".to_string(),
                created_at: 10,
                updated_at: 10,
            },
        };
        let value = serde_json::to_value(&snippet).unwrap();
        assert_eq!(value["id"], "code_1_abc");
        assert_eq!(value["language"], "js");
    }
}
