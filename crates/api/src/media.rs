//! Cloud video host client
//!
//! Uploads admin-provided video files to a Cloudinary-style media host and
//! destroys assets when the catalog entry is deleted. Requests are signed
//! with SHA-256 over the sorted parameter string plus the API secret.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Upload folder for video assets
const UPLOAD_FOLDER: &str = "vidvault_videos";

/// Media host configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API base URL (overridable for tests)
    pub base_url: String,
}

impl MediaConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            api_key: std::env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            api_secret: std::env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            base_url: std::env::var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com".to_string()),
        }
    }

    /// Check if the media host is configured
    pub fn is_enabled(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// A stored media asset
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    /// Public delivery URL
    pub secure_url: String,
    /// Asset id used for later destruction
    pub public_id: String,
}

/// Media host client
#[derive(Clone)]
pub struct MediaClient {
    config: MediaConfig,
    client: reqwest::Client,
}

impl MediaClient {
    /// Create a new media client
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::new(MediaConfig::from_env())
    }

    /// Check if the media host is configured
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Sign a sorted parameter string: hex(sha256(params + secret))
    fn sign(params: &str, api_secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(params.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Upload a video file, returning its delivery URL and asset id
    pub async fn upload_video(&self, data: Vec<u8>, filename: &str) -> Result<UploadedMedia, MediaError> {
        if !self.is_enabled() {
            return Err(MediaError::NotConfigured);
        }

        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        // Params to sign, sorted alphabetically; file and api_key are excluded
        let to_sign = format!("folder={}&timestamp={}", UPLOAD_FOLDER, timestamp);
        let signature = Self::sign(&to_sign, &self.config.api_secret);

        let file_part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", UPLOAD_FOLDER)
            .text("signature", signature);

        let url = format!(
            "{}/v1_1/{}/video/upload",
            self.config.base_url, self.config.cloud_name
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Video upload failed");
            return Err(MediaError::Provider(status.as_u16()));
        }

        let uploaded: UploadedMedia = response
            .json()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;

        tracing::info!(public_id = %uploaded.public_id, "Video uploaded to media host");
        Ok(uploaded)
    }

    /// Destroy a previously uploaded video asset
    pub async fn destroy_video(&self, public_id: &str) -> Result<(), MediaError> {
        if !self.is_enabled() {
            return Err(MediaError::NotConfigured);
        }

        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let to_sign = format!("public_id={}&timestamp={}", public_id, timestamp);
        let signature = Self::sign(&to_sign, &self.config.api_secret);

        let url = format!(
            "{}/v1_1/{}/video/destroy",
            self.config.base_url, self.config.cloud_name
        );

        let timestamp = timestamp.to_string();
        let response = self
            .client
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("api_key", self.config.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, public_id = %public_id, "Video destroy failed");
            return Err(MediaError::Provider(status.as_u16()));
        }

        tracing::info!(public_id = %public_id, "Video destroyed on media host");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media host is not configured")]
    NotConfigured,
    #[error("Media host returned status {0}")]
    Provider(u16),
    #[error("Media request failed: {0}")]
    Request(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> MediaConfig {
        MediaConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            base_url,
        }
    }

    #[test]
    fn test_signature_is_deterministic() {
        let sig1 = MediaClient::sign("folder=vidvault_videos&timestamp=1700000000", "secret");
        let sig2 = MediaClient::sign("folder=vidvault_videos&timestamp=1700000000", "secret");
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
        assert!(sig1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_binds_secret() {
        let params = "public_id=abc&timestamp=1700000000";
        assert_ne!(
            MediaClient::sign(params, "secret-a"),
            MediaClient::sign(params, "secret-b")
        );
    }

    #[test]
    fn test_unconfigured_client_is_disabled() {
        let client = MediaClient::new(MediaConfig {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            base_url: "https://api.cloudinary.com".to_string(),
        });
        assert!(!client.is_enabled());
    }

    #[tokio::test]
    async fn test_destroy_hits_signed_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/video/destroy")
            .with_status(200)
            .with_body(r#"{"result":"ok"}"#)
            .create_async()
            .await;

        let client = MediaClient::new(test_config(server.url()));
        client.destroy_video("vidvault_videos/abc").await.unwrap();
        mock.assert_async().await;
    }
}
