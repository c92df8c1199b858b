use crate::auth::middleware::AuthUser;
use crate::code::model::{
    CodeError, CodeErrorResponse, CodeSnippet, SaveSnippetRequest, SaveSnippetResponse,
    SnippetIdQuery, SnippetPatch,
};
use crate::code::service::CodeSnippetStore;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

// Helper function to convert CodeError to HTTP response
fn code_error_to_response(err: CodeError) -> (StatusCode, Json<CodeErrorResponse>) {
    let (status, message, code) = match &err {
        CodeError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR"),
        CodeError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            "مقطع الكود غير موجود".to_string(),
            "NOT_FOUND",
        ),
        CodeError::SaveFailed { .. } => {
            error!("{}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("فشل حفظ مقطع الكود: {}", err),
                "SAVE_FAILED",
            )
        }
        CodeError::StoreError(e) => {
            error!("Document store error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Document store error".to_string(),
                "STORE_ERROR",
            )
        }
        CodeError::Malformed(msg) => {
            error!("Malformed snippet: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process code snippet".to_string(),
                "MALFORMED",
            )
        }
    };

    (
        status,
        Json(CodeErrorResponse {
            error: message,
            code: code.to_string(),
        }),
    )
}

fn required_id(query: SnippetIdQuery) -> Result<String, (StatusCode, Json<CodeErrorResponse>)> {
    query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            code_error_to_response(CodeError::ValidationError(
                "يجب توفير معرف الكود".to_string(),
            ))
        })
}

/// Save a code snippet
///
/// Creates a snippet, or overwrites the one named by `id`. The author defaults
/// to the caller when `createdBy` is omitted.
#[utoipa::path(
    post,
    path = "/api/code/save",
    tag = "code",
    request_body = SaveSnippetRequest,
    responses(
        (status = 200, description = "Snippet saved", body = SaveSnippetResponse),
        (status = 400, description = "Missing or invalid field", body = CodeErrorResponse),
        (status = 500, description = "Store failed after retries", body = CodeErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn save_snippet(
    Extension(user): Extension<AuthUser>,
    Extension(code_store): Extension<Arc<CodeSnippetStore>>,
    Json(mut request): Json<SaveSnippetRequest>,
) -> impl IntoResponse {
    if request.created_by.trim().is_empty() {
        request.created_by = user.user_id.to_string();
    }

    match code_store.save(request).await {
        Ok(id) => {
            info!("User {} saved code snippet {}", user.user_id, id);
            (
                StatusCode::OK,
                Json(SaveSnippetResponse { id, success: true }),
            )
                .into_response()
        }
        Err(e) => code_error_to_response(e).into_response(),
    }
}

/// Fetch a code snippet by id
#[utoipa::path(
    get,
    path = "/api/code/get",
    tag = "code",
    params(SnippetIdQuery),
    responses(
        (status = 200, description = "Snippet found", body = CodeSnippet),
        (status = 400, description = "Missing id", body = CodeErrorResponse),
        (status = 404, description = "Snippet not found", body = CodeErrorResponse)
    )
)]
pub async fn get_snippet(
    Extension(code_store): Extension<Arc<CodeSnippetStore>>,
    Query(query): Query<SnippetIdQuery>,
) -> Result<Json<CodeSnippet>, (StatusCode, Json<CodeErrorResponse>)> {
    let id = required_id(query)?;

    match code_store.get(&id).await {
        Ok(Some(snippet)) => Ok(Json(snippet)),
        Ok(None) => Err(code_error_to_response(CodeError::NotFound(id))),
        Err(e) => Err(code_error_to_response(e)),
    }
}

/// Delete a code snippet
#[utoipa::path(
    delete,
    path = "/api/code/delete",
    tag = "code",
    params(SnippetIdQuery),
    responses(
        (status = 200, description = "Snippet deleted (or was already absent)"),
        (status = 400, description = "Missing id", body = CodeErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_snippet(
    Extension(user): Extension<AuthUser>,
    Extension(code_store): Extension<Arc<CodeSnippetStore>>,
    Query(query): Query<SnippetIdQuery>,
) -> impl IntoResponse {
    let id = match required_id(query) {
        Ok(id) => id,
        Err(response) => return response.into_response(),
    };

    info!("User {} deleting code snippet {}", user.user_id, id);
    match code_store.remove(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "تم حذف مقطع الكود بنجاح" })),
        )
            .into_response(),
        Err(e) => code_error_to_response(e).into_response(),
    }
}

/// Patch selected fields of a code snippet
#[utoipa::path(
    patch,
    path = "/api/code/{id}",
    tag = "code",
    params(
        ("id" = String, Path, description = "Snippet id")
    ),
    request_body = SnippetPatch,
    responses(
        (status = 200, description = "Snippet updated", body = CodeSnippet),
        (status = 404, description = "Snippet not found", body = CodeErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_snippet(
    Path(id): Path<String>,
    Extension(code_store): Extension<Arc<CodeSnippetStore>>,
    Json(patch): Json<SnippetPatch>,
) -> Result<Json<CodeSnippet>, (StatusCode, Json<CodeErrorResponse>)> {
    code_store
        .update(&id, patch)
        .await
        .map(Json)
        .map_err(code_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstore::DocStoreError;

    #[test]
    fn test_error_status_codes() {
        let (status, _) = code_error_to_response(CodeError::ValidationError("x".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = code_error_to_response(CodeError::NotFound("code_1".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, Json(body)) = code_error_to_response(CodeError::SaveFailed {
            attempts: 3,
            last_error: DocStoreError::Unavailable("down".to_string()),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "SAVE_FAILED");
        assert!(body.error.contains("3 attempts"));
    }

    #[test]
    fn test_required_id_rejects_blank() {
        assert!(required_id(SnippetIdQuery { id: None }).is_err());
        assert!(required_id(SnippetIdQuery {
            id: Some("  ".to_string())
        })
        .is_err());
        assert_eq!(
            required_id(SnippetIdQuery {
                id: Some("code_1_a".to_string())
            })
            .unwrap(),
            "code_1_a"
        );
    }
}
