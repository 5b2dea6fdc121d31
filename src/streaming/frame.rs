//! Types that flow between pipeline stations.

use crate::stt::transcriber::SttSegment;
use crate::transport::envelope::StatusPayload;

/// A completed analysis window, detached from the ring.
///
/// The ring mutates immediately after emission, so a chunk always owns an
/// independent copy of its samples; it must never alias the ring.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Monotonic identifier within one track.
    pub chunk_id: u64,
    /// Window start, epoch milliseconds.
    pub start_ms: u64,
    /// Window end, epoch milliseconds (`start_ms + window_ms`).
    pub end_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample encoding tag.
    pub format: &'static str,
    /// Wall clock when the window started filling.
    pub captured_at_ms: u64,
    /// Wall clock when the window closed.
    pub completed_at_ms: u64,
    /// Owned copy of the window's samples.
    pub samples: Vec<i16>,
}

impl AudioChunk {
    /// Window duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// A transcribed window on its way to the emitter.
#[derive(Debug, Clone)]
pub struct TranscribedWindow {
    pub chunk_id: u64,
    pub start_ms: u64,
    pub end_ms: u64,
    pub completed_at_ms: u64,
    /// Full window text as returned by the STT.
    pub text: String,
    pub segments: Vec<SttSegment>,
}

/// Messages accepted by the emitter mailbox.
///
/// The emitter is the single owner of the session state; everything that
/// touches it arrives through this enum, which makes emissions totally
/// ordered even with several tracks feeding the pipeline.
#[derive(Debug)]
pub enum EmitterCommand {
    /// A transcribed window ready for incremental extraction.
    Window(TranscribedWindow),
    /// A status note to broadcast (lossy).
    Status(StatusPayload),
    /// A VAD-rejected window: count it and advance.
    Skipped { chunk_id: u64 },
    /// All tracks are gone; reset the session state.
    Reset,
}
