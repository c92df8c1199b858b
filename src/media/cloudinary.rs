use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use super::{DestroyResult, MediaClient, MediaError, UploadedImage};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// Signed calls to the Cloudinary upload API. The secret never leaves the server.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/{}", API_BASE, self.config.cloud_name, action)
    }

    fn ensure_configured(&self) -> Result<(), MediaError> {
        if self.config.cloud_name.is_empty()
            || self.config.api_key.is_empty()
            || self.config.api_secret.is_empty()
        {
            return Err(MediaError::NotConfigured);
        }
        Ok(())
    }

    /// Add api_key, signature and signature_algorithm to `params`
    fn signed(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        form: Vec<(&'static str, String)>,
    ) -> Result<T, MediaError> {
        let resp = self
            .client
            .post(self.endpoint(action))
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<T>().await?)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, followed by the secret, then hashed.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaClient for CloudinaryClient {
    async fn upload(&self, image_data: &str, folder: &str) -> Result<UploadedImage, MediaError> {
        self.ensure_configured()?;

        let params = vec![
            ("folder", folder.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let mut form = self.signed(params);
        form.push(("file", image_data.to_string()));

        let uploaded: UploadResponse = self.post_form("auto/upload", form).await?;
        info!("Uploaded image {} to folder {}", uploaded.public_id, folder);

        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyResult, MediaError> {
        self.ensure_configured()?;

        let form = self.signed(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let result: DestroyResult = self.post_form("image/destroy", form).await?;
        info!("Destroy {} returned {}", public_id, result.result);
        Ok(result)
    }
}
