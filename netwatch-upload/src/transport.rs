use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};

use crate::error::UploadError;

/// Raw reply of a POST
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers JSON bodies to the experiment server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, UploadError>;
}

/// reqwest-backed transport rooted at the experiment server
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let base_url =
            Url::parse(base_url).map_err(|e| UploadError::InvalidUrl(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, UploadError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| UploadError::InvalidUrl(format!("{path}: {e}")))?;

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_paths_resolve_against_server_root() {
        let t = HttpTransport::new("http://localhost:3000/").unwrap();
        assert_eq!(
            t.base_url().join("/trial/addTrial").unwrap().as_str(),
            "http://localhost:3000/trial/addTrial"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(UploadError::InvalidUrl(_))
        ));
    }

    #[test]
    fn success_range() {
        let ok = TransportResponse {
            status: 204,
            body: String::new(),
        };
        let bad = TransportResponse {
            status: 500,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
