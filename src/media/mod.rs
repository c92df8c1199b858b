pub mod cloudinary;
pub mod controller;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Folder used when an upload names none
pub const DEFAULT_FOLDER: &str = "gradtrack-images";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Media API rejected request: status={status}, body={body}")]
    Rejected { status: u16, body: String },

    #[error("Media API is not configured")]
    NotConfigured,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

/// Outcome reported by the media API for a delete; `"ok"` on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DestroyResult {
    pub result: String,
}

impl DestroyResult {
    pub fn is_ok(&self) -> bool {
        self.result == "ok"
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaClient: Send + Sync {
    /// `image_data` is a data URI or a remote URL
    async fn upload(&self, image_data: &str, folder: &str) -> Result<UploadedImage, MediaError>;

    async fn destroy(&self, public_id: &str) -> Result<DestroyResult, MediaError>;
}

/// Raw base64 is treated as JPEG; data URIs and URLs pass through
pub fn normalize_image_data(image: &str) -> String {
    let image = image.trim();
    if image.starts_with("data:") || image.starts_with("http://") || image.starts_with("https://")
    {
        image.to_string()
    } else {
        format!("data:image/jpeg;base64,{}", image)
    }
}

/// Insert size, quality and format transformations into a Cloudinary delivery
/// URL. Other URLs are returned unchanged.
pub fn optimize_image_url(
    url: &str,
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u32>,
) -> String {
    if !url.contains("cloudinary.com") {
        return url.to_string();
    }

    let mut transformations = Vec::new();
    if let Some(w) = width {
        transformations.push(format!("w_{}", w));
    }
    if let Some(h) = height {
        transformations.push(format!("h_{}", h));
    }
    transformations.push(match quality {
        Some(q) => format!("q_{}", q),
        None => "q_auto".to_string(),
    });
    transformations.push("f_auto".to_string());

    url.replacen("/upload/", &format!("/upload/{}/", transformations.join(",")), 1)
}
