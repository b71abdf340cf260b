//! Cloudinary adapter for archiving captured images.
//!
//! Endpoint: POST /v1_1/{cloud}/image/upload (signed)
//! Auth: SHA-256 signature over the signed parameters plus the API secret

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::ImageHost;
use crate::config::CloudinaryCredentials;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Upload response (only the fields we read)
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Cloudinary upload client
pub struct CloudinaryClient {
    credentials: CloudinaryCredentials,
    client: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        Self::with_client(reqwest::Client::new(), credentials)
    }

    pub fn with_client(client: reqwest::Client, credentials: CloudinaryCredentials) -> Self {
        Self {
            credentials,
            client,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", API_BASE, self.credentials.cloud_name, path)
    }

    /// Sign `timestamp=<ts>` the way the upload API expects
    fn signature(&self, timestamp: i64) -> String {
        sign_params(&[("timestamp", &timestamp.to_string())], &self.credentials.api_secret)
    }
}

/// Sort params, join as `k=v&k=v`, append the secret, hash
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, image: &str) -> Result<String> {
        let timestamp = chrono::Utc::now().timestamp();

        let form = Form::new()
            .text("file", image.to_string())
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", self.signature(timestamp));

        let response = self
            .client
            .post(self.api_url("image/upload"))
            .multipart(form)
            .send()
            .await
            .context("Failed to upload image to Cloudinary")?;

        let status = response.status();
        let body: UploadResponse = response
            .json()
            .await
            .context("Failed to parse Cloudinary response")?;

        if let Some(error) = body.error {
            anyhow::bail!("Cloudinary upload failed ({}): {}", status, error.message);
        }

        body.secure_url
            .context("Cloudinary response is missing secure_url")
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.api_url("ping"))
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .send()
            .await
            .context("Failed to reach Cloudinary")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloudinary ping failed ({}): {}", status, text);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CloudinaryClient {
        CloudinaryClient::new(CloudinaryCredentials {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: "secret".to_string(),
        })
    }

    #[test]
    fn test_api_url() {
        assert_eq!(
            client().api_url("image/upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn test_signature_is_sorted_and_stable() {
        let a = sign_params(&[("timestamp", "100"), ("folder", "dex")], "s");
        let b = sign_params(&[("folder", "dex"), ("timestamp", "100")], "s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=dex&timestamp=100s");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let c = client();
        assert_ne!(c.signature(100), sign_params(&[("timestamp", "100")], "other"));
    }
}
