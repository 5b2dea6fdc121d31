//! Narrow interfaces to the media-room transport.
//!
//! The room itself (signalling, subscription, reconnects) lives outside this
//! crate. What crosses the boundary is small: raw audio frames in, JSON
//! envelopes out over the room's data channel, and a participant metadata
//! blob read once at subscribe time.

pub mod envelope;

use crate::error::{Result, RoomscribeError};
use async_trait::async_trait;
use envelope::Envelope;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One raw PCM block as delivered by the room transport.
///
/// Lives for the length of one callback; never retained past normalization.
#[derive(Debug, Clone)]
pub struct RoomAudioFrame {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples_per_channel: u32,
    /// s16le interleaved payload.
    pub data: Vec<u8>,
}

/// Optional participant metadata attached at subscribe time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantMeta {
    pub locale: Option<String>,
    pub domain_hint: Option<String>,
    pub terminology: Vec<String>,
}

impl ParticipantMeta {
    /// Parses the metadata JSON; malformed metadata yields `None` rather
    /// than failing the subscription.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        serde_json::from_str(raw).ok()
    }
}

/// Outbound side of the room's data channel.
///
/// `reliable` maps to the transport's delivery mode: transcript batches ride
/// reliable, status and metrics may be lossy.
#[async_trait]
pub trait DataChannel: Send + Sync {
    async fn publish(&self, topic: &str, envelope: &Envelope, reliable: bool) -> Result<()>;
}

/// Data channel that prints envelopes as JSON lines, one per publish.
///
/// Used by pipe mode; doubles as a debugging sink.
pub struct StdoutChannel;

#[async_trait]
impl DataChannel for StdoutChannel {
    async fn publish(&self, _topic: &str, envelope: &Envelope, _reliable: bool) -> Result<()> {
        let line = serde_json::to_string(envelope)
            .map_err(|e| RoomscribeError::Publish { message: e.to_string() })?;
        println!("{}", line);
        Ok(())
    }
}

/// Records every publish for inspection in tests.
#[derive(Default)]
pub struct MockDataChannel {
    published: Mutex<Vec<(String, Envelope, bool)>>,
    fail: bool,
}

impl MockDataChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail every publish.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// All envelopes published so far, in order.
    pub fn published(&self) -> Vec<(String, Envelope, bool)> {
        self.published.lock().unwrap().clone()
    }

    /// Envelopes only, dropping topic and reliability.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, envelope, _)| envelope.clone())
            .collect()
    }
}

#[async_trait]
impl DataChannel for MockDataChannel {
    async fn publish(&self, topic: &str, envelope: &Envelope, reliable: bool) -> Result<()> {
        if self.fail {
            return Err(RoomscribeError::Publish {
                message: "mock publish failure".to_string(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), envelope.clone(), reliable));
        Ok(())
    }
}
