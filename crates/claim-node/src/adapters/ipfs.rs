//! IPFS `add` client.
//!
//! Uploads a document as the multipart field `file` to an IPFS HTTP API
//! (Infura-compatible, basic auth) and returns its CID.

use async_trait::async_trait;
use claim_workflow::{ContentRef, MetadataPublisher, PublishError};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Response of `/api/v0/add`.
#[derive(Debug, Deserialize)]
pub struct AddResponse {
    /// Content identifier.
    #[serde(rename = "Hash")]
    pub hash: String,
    /// File name as uploaded.
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Size in bytes (sent as a string by go-ipfs).
    #[serde(rename = "Size", default)]
    pub size: serde_json::Value,
}

/// IPFS publisher.
pub struct IpfsPublisher {
    api_url: String,
    project_id: String,
    project_secret: String,
    client: reqwest::Client,
}

impl IpfsPublisher {
    /// Create a publisher for the full `add` endpoint URL.
    pub fn new(
        api_url: impl Into<String>,
        project_id: impl Into<String>,
        project_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_url: api_url.into(),
            project_id: project_id.into(),
            project_secret: project_secret.into(),
            client,
        })
    }
}

#[async_trait]
impl MetadataPublisher for IpfsPublisher {
    async fn publish(&self, bytes: Vec<u8>) -> Result<ContentRef, PublishError> {
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes).file_name("file");
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.api_url).multipart(form);
        if !self.project_id.is_empty() {
            request = request.basic_auth(&self.project_id, Some(&self.project_secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let added: AddResponse = serde_json::from_str(&body)
            .map_err(|e| PublishError::Malformed(format!("{}: {}", e, body)))?;
        if added.hash.is_empty() {
            return Err(PublishError::Malformed(format!("no Hash in {}", body)));
        }

        debug!(cid = %added.hash, bytes = size, "[claim] metadata pinned");
        Ok(ContentRef(added.hash))
    }
}
