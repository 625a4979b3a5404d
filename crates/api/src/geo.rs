//! IP geolocation lookup
//!
//! Resolves a coarse "City, Country" string for a client address via the
//! ipinfo.io API. Lookups are best-effort: callers decide how to degrade,
//! and the login flow falls back to "Unknown" without failing.

use serde::Deserialize;

/// Geolocation configuration
#[derive(Debug, Clone)]
pub struct GeoConfig {
    /// ipinfo.io access token
    pub token: String,
    /// API base URL (overridable for self-hosted relays and tests)
    pub base_url: String,
}

impl GeoConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("IPINFO_TOKEN").unwrap_or_default(),
            base_url: std::env::var("IPINFO_BASE_URL")
                .unwrap_or_else(|_| "https://ipinfo.io".to_string()),
        }
    }
}

/// Coarse location of an IP address
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoInfo {
    pub city: Option<String>,
    pub country: Option<String>,
}

impl GeoInfo {
    /// Render as "City, Country", or "Unknown" when nothing resolved
    pub fn display(&self) -> String {
        if self.city.is_none() && self.country.is_none() {
            return "Unknown".to_string();
        }
        format!(
            "{}, {}",
            self.city.as_deref().unwrap_or("Unknown City"),
            self.country.as_deref().unwrap_or("Unknown Country"),
        )
    }
}

/// Geolocation lookup client
#[derive(Clone)]
pub struct GeoClient {
    config: GeoConfig,
    client: reqwest::Client,
}

impl GeoClient {
    /// Create a new geolocation client
    pub fn new(config: GeoConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::new(GeoConfig::from_env())
    }

    /// Resolve the coarse location of an IP address
    pub async fn lookup(&self, ip: &str) -> Result<GeoInfo, GeoError> {
        let url = format!(
            "{}/{}/json?token={}",
            self.config.base_url, ip, self.config.token
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeoError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Provider(response.status().as_u16()));
        }

        response
            .json::<GeoInfo>()
            .await
            .map_err(|e| GeoError::Request(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Geolocation provider returned status {0}")]
    Provider(u16),
    #[error("Geolocation request failed: {0}")]
    Request(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> GeoClient {
        GeoClient::new(GeoConfig {
            token: "test-token".to_string(),
            base_url: server.url(),
        })
    }

    #[test]
    fn test_display_full() {
        let info = GeoInfo {
            city: Some("Mountain View".to_string()),
            country: Some("US".to_string()),
        };
        assert_eq!(info.display(), "Mountain View, US");
    }

    #[test]
    fn test_display_partial() {
        let info = GeoInfo {
            city: None,
            country: Some("US".to_string()),
        };
        assert_eq!(info.display(), "Unknown City, US");
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(GeoInfo::default().display(), "Unknown");
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/8.8.8.8/json?token=test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ip":"8.8.8.8","city":"Mountain View","country":"US"}"#)
            .create_async()
            .await;

        let info = client_for(&server).lookup("8.8.8.8").await.unwrap();
        assert_eq!(info.display(), "Mountain View, US");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_provider_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/8.8.8.8/json?token=test-token")
            .with_status(429)
            .create_async()
            .await;

        let result = client_for(&server).lookup("8.8.8.8").await;
        assert!(matches!(result, Err(GeoError::Provider(429))));
    }
}
