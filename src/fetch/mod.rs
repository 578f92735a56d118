use crate::error::NetworkError;
use serde_json::Value;
use std::time::Duration;

/// The resource-fetch collaborator.
///
/// All three operations are synchronous and single-attempt; retry policy is
/// the implementor's concern. Reconstruction itself never performs I/O, so a
/// test double can stand in for the whole network layer.
pub trait Fetch {
    fn fetch_json(&self, url: &str) -> Result<Value, NetworkError>;
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
    fn fetch_text(&self, url: &str) -> Result<String, NetworkError>;
}

/// Default [`Fetch`] implementation over a blocking HTTP client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to construct the HTTP client");
        Self { client }
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, NetworkError> {
        self.client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| NetworkError::Http {
                url: url.to_string(),
                source,
            })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value, NetworkError> {
        self.get(url)?.json().map_err(|source| NetworkError::Http {
            url: url.to_string(),
            source,
        })
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        self.get(url)?
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|source| NetworkError::Http {
                url: url.to_string(),
                source,
            })
    }

    fn fetch_text(&self, url: &str) -> Result<String, NetworkError> {
        self.get(url)?.text().map_err(|source| NetworkError::Http {
            url: url.to_string(),
            source,
        })
    }
}
