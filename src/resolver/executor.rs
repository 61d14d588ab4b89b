//! Outbound request execution against a resolved instance.

use crate::error::TransportError;

use async_trait::async_trait;
use std::time::Duration;

/// What came back from an instance. Any HTTP status counts as a response;
/// only failing to reach the instance is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, host: &str, port: u16, path: &str) -> Result<Response, TransportError>;
}

/// Plain HTTP GET over reqwest.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, host: &str, port: u16, path: &str) -> Result<Response, TransportError> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let url = format!("http://{}:{}{}", host, port, path);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        Ok(Response { status, body })
    }
}
