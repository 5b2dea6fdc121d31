//! Data-channel envelopes.
//!
//! Every message on the transcription topic is a `{type, payload}` JSON
//! object. Transcript batches require reliable delivery; status notes and
//! metrics tolerate loss.

use crate::transport::epoch_ms;
use serde::{Deserialize, Serialize};

/// Which stage produced a transcript payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSource {
    Stt,
    Llm,
}

/// One piece of transcript text with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub id: String,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub is_final: bool,
    pub revision: u32,
    pub source: SegmentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub created_at: u64,
}

/// Delivery envelope carrying one or more segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptBatch {
    pub id: String,
    pub segments: Vec<TranscriptSegment>,
    pub received_at: u64,
}

/// Transcript payload: the producing stage plus the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptPayload {
    #[serde(rename = "type")]
    pub source: SegmentSource,
    pub batch: TranscriptBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// Status note, lossy delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub level: StatusLevel,
    pub message: String,
    pub timestamp: u64,
}

impl StatusPayload {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: epoch_ms(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message)
    }
}

/// Per-emission quality metrics, lossy delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPayload {
    pub chunk_id: u64,
    pub latency_ms: u64,
    pub confidence: f32,
    pub wer_proxy: f32,
    pub timestamp: u64,
}

/// Top-level data-channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Envelope {
    Transcript(TranscriptPayload),
    Status(StatusPayload),
    Metrics(MetricsPayload),
}
