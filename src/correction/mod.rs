//! Forwarding emitted batches to the external correction model.
//!
//! The correction service receives each batch plus recent context and
//! broadcasts its own streaming deltas back into the room; this side only
//! posts the request and drains the event stream to completion. Correction
//! failures never block the transcript path.

use crate::error::{Result, RoomscribeError};
use crate::transport::envelope::{TranscriptBatch, TranscriptSegment};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use std::sync::Mutex;

/// Payload posted to the correction service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub request_id: String,
    pub room_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_identities: Option<Vec<String>>,
    pub batch: TranscriptBatch,
    pub context: Vec<TranscriptSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminology: Option<Vec<String>>,
}

/// Trait for the correction collaborator.
#[async_trait]
pub trait Corrector: Send + Sync {
    /// Forward one batch; resolves once the response stream is consumed.
    async fn forward(&self, request: &CorrectionRequest) -> Result<()>;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// HTTP corrector posting JSON and draining the `text/event-stream` body.
pub struct HttpCorrector {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCorrector {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Corrector for HttpCorrector {
    async fn forward(&self, request: &CorrectionRequest) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| RoomscribeError::Correction {
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoomscribeError::Correction {
                message: format!("correction returned {}: {}", status, body),
            });
        }

        // The deltas are broadcast by the service itself; consume the stream
        // fully so the connection is released, but do not interpret it.
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            chunk.map_err(|e| RoomscribeError::Correction {
                message: format!("stream interrupted: {}", e),
            })?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Corrector used when correction is disabled; drops every request.
pub struct DiscardCorrector;

#[async_trait]
impl Corrector for DiscardCorrector {
    async fn forward(&self, _request: &CorrectionRequest) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}

/// Records forwarded requests for inspection in tests.
#[derive(Default)]
pub struct MockCorrector {
    requests: Mutex<Vec<CorrectionRequest>>,
    fail: bool,
}

impl MockCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requests(&self) -> Vec<CorrectionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Corrector for MockCorrector {
    async fn forward(&self, request: &CorrectionRequest) -> Result<()> {
        if self.fail {
            return Err(RoomscribeError::Correction {
                message: "mock correction failure".to_string(),
            });
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
