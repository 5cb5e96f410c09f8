//! The remote-call capability: a named backend call returning a JSON string.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::InvokeError;

#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, name: &str, args: Map<String, Value>) -> Result<String, InvokeError>;
}

/// Reaches the backend through an HTTP bridge: `POST {base_url}/{name}` with
/// the arguments as a JSON body.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInvoker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(&self, name: &str, args: Map<String, Value>) -> Result<String, InvokeError> {
        let url = self.endpoint_url(name);
        debug!(%url, "invoking backend");

        let resp = self.client.post(&url).json(&args).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(InvokeError::UnknownEndpoint(name.to_string()));
        }

        // Error statuses usually still carry an envelope; let the caller classify it.
        let body = resp.text().await?;
        if !status.is_success() && body.trim().is_empty() {
            return Err(InvokeError::Status(status.as_u16()));
        }
        Ok(body)
    }
}
