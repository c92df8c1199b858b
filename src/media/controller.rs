use crate::auth::middleware::AuthUser;
use crate::media::{normalize_image_data, MediaClient, MediaError, UploadedImage, DEFAULT_FOLDER};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadImageRequest {
    /// Base64 payload, data URI or URL
    pub image: Option<String>,
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteImageRequest {
    pub public_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MediaErrorResponse {
    pub error: String,
}

fn media_error_to_response(err: MediaError) -> (StatusCode, Json<MediaErrorResponse>) {
    let status = match &err {
        MediaError::ValidationError(_) => StatusCode::BAD_REQUEST,
        MediaError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        MediaError::Transport(_) | MediaError::Rejected { .. } => StatusCode::BAD_GATEWAY,
    };

    let message = match err {
        MediaError::ValidationError(msg) => msg,
        other => {
            error!("Media API error: {}", other);
            format!("خطأ أثناء التعامل مع خدمة الصور: {}", other)
        }
    };

    (status, Json(MediaErrorResponse { error: message }))
}

/// Upload an image
///
/// Credentials are added server side. Raw base64 is sent as JPEG and the
/// folder defaults to `gradtrack-images`.
#[utoipa::path(
    post,
    path = "/api/cloudinary/images",
    tag = "media",
    request_body = UploadImageRequest,
    responses(
        (status = 200, description = "Image uploaded", body = UploadedImage),
        (status = 400, description = "No image data", body = MediaErrorResponse),
        (status = 502, description = "Media API failure", body = MediaErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_image(
    Extension(user): Extension<AuthUser>,
    Extension(media): Extension<Arc<dyn MediaClient>>,
    Json(request): Json<UploadImageRequest>,
) -> impl IntoResponse {
    let image = match request.image.filter(|image| !image.trim().is_empty()) {
        Some(image) => normalize_image_data(&image),
        None => {
            return media_error_to_response(MediaError::ValidationError(
                "بيانات الصورة مطلوبة".to_string(),
            ))
            .into_response()
        }
    };

    let folder = request
        .folder
        .filter(|folder| !folder.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string());

    info!("User {} uploading image to folder {}", user.user_id, folder);
    match media.upload(&image, &folder).await {
        Ok(uploaded) => (StatusCode::OK, Json(uploaded)).into_response(),
        Err(e) => media_error_to_response(e).into_response(),
    }
}

/// Delete an uploaded image by its public id
#[utoipa::path(
    post,
    path = "/api/cloudinary/delete",
    tag = "media",
    request_body = DeleteImageRequest,
    responses(
        (status = 200, description = "Image deleted"),
        (status = 400, description = "Missing public_id", body = MediaErrorResponse),
        (status = 500, description = "Media API refused the delete", body = MediaErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_image(
    Extension(user): Extension<AuthUser>,
    Extension(media): Extension<Arc<dyn MediaClient>>,
    Json(request): Json<DeleteImageRequest>,
) -> impl IntoResponse {
    let public_id = match request.public_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => {
            return media_error_to_response(MediaError::ValidationError(
                "معرف الصورة مطلوب".to_string(),
            ))
            .into_response()
        }
    };

    info!("User {} deleting image {}", user.user_id, public_id);
    match media.destroy(&public_id).await {
        Ok(result) if result.is_ok() => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "تم حذف الصورة بنجاح" })),
        )
            .into_response(),
        Ok(result) => {
            error!("Delete of {} returned {}", public_id, result.result);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "فشل حذف الصورة", "details": result })),
            )
                .into_response()
        }
        Err(e) => media_error_to_response(e).into_response(),
    }
}
