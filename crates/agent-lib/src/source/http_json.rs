//! Generic HTTP/JSON data source
//!
//! Fetches a JSON array of readings (`key`, `name`, `value`, `unit`,
//! optional `side`) from a single endpoint.

use super::{async_trait, DataSource};
use crate::error::WatchError;
use crate::models::Reading;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Request timeout for upstream endpoints
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Data source reading a JSON array of readings over HTTP
pub struct HttpJsonSource {
    name: String,
    url: Url,
    client: Client,
}

impl HttpJsonSource {
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self, WatchError> {
        let name = name.into();
        let url = Url::parse(url).map_err(|e| {
            WatchError::Configuration(format!("source '{}' has invalid URL '{}': {}", name, url, e))
        })?;

        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| WatchError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { name, url, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl DataSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Reading>, WatchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| WatchError::adapter(&self.name, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(WatchError::adapter(
                &self.name,
                format!("upstream returned {}", status),
            ));
        }

        let readings: Vec<Reading> = response
            .json()
            .await
            .map_err(|e| WatchError::adapter(&self.name, format!("malformed payload: {}", e)))?;

        if readings.is_empty() {
            return Err(WatchError::adapter(&self.name, "payload contained no readings"));
        }

        debug!(source = %self.name, readings = readings.len(), "Fetched readings");
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let result = HttpJsonSource::new("broken", "not a url");
        assert!(matches!(result, Err(WatchError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_fetch_parses_readings() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/readings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"key":"euler:pyusd:supply:cap","name":"Euler PYUSD Supply Cap","value":0.97,"unit":"ratio","side":"supply"},
                    {"key":"euler:usdc:borrow:rate","name":"Euler USDC Borrow APY","value":0.1243,"unit":"apy"}
                ]"#,
            )
            .create_async()
            .await;

        let source = HttpJsonSource::new("euler", &format!("{}/readings", server.url())).unwrap();
        let readings = source.fetch().await.unwrap();

        mock.assert_async().await;
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].side, Some(crate::models::Side::Supply));
        assert_eq!(readings[1].value, 0.1243);
    }

    #[tokio::test]
    async fn test_fetch_fails_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readings")
            .with_status(502)
            .create_async()
            .await;

        let source = HttpJsonSource::new("silo", &format!("{}/readings", server.url())).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert_eq!(err.kind(), "adapter");
        assert!(err.to_string().contains("silo"));
    }

    #[tokio::test]
    async fn test_fetch_fails_on_malformed_or_empty_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/bad")
            .with_status(200)
            .with_body(r#"{"silo1":{}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/empty")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let bad = HttpJsonSource::new("silo", &format!("{}/bad", server.url())).unwrap();
        assert!(matches!(bad.fetch().await, Err(WatchError::Adapter { .. })));

        let empty = HttpJsonSource::new("silo", &format!("{}/empty", server.url())).unwrap();
        assert!(matches!(empty.fetch().await, Err(WatchError::Adapter { .. })));
    }
}
