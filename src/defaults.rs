//! Default values used across the crate.
//!
//! Centralizing these makes them easy to find and keeps config defaults,
//! CLI help text, and documentation in sync.

/// Canonical sample rate every track is normalized to (Hz).
pub const SAMPLE_RATE: u32 = 16000;

/// Canonical channel count after normalization.
pub const CHANNELS: u16 = 1;

/// Analysis window length handed to the STT service (ms).
pub const WINDOW_MS: u32 = 3000;

/// Advance between consecutive windows (ms). Overlap = window − stride.
pub const STRIDE_MS: u32 = 1000;

/// AGC target RMS in raw s16 sample units.
pub const AGC_TARGET_RMS: f32 = 1500.0;

/// AGC gain clamp, lower bound.
pub const AGC_MIN_GAIN: f32 = 0.5;

/// AGC gain clamp, upper bound.
pub const AGC_MAX_GAIN: f32 = 3.0;

/// Smoothing coefficient shared by the AGC's RMS and gain loops.
pub const AGC_SMOOTHING: f32 = 0.2;

/// Span of the VAD's rolling zero-crossing-rate window (ms).
pub const VAD_WINDOW_MS: u32 = 600;

/// VAD score at or above which a window counts as speech.
pub const VAD_SENSITIVITY: f32 = 0.5;

/// Static RMS floor below which a window is silence, in s16 units.
pub const SILENCE_RMS_THRESHOLD: f32 = 600.0;

/// Blended confidence required before buffered sentences are released.
pub const CONFIDENCE_THRESHOLD: f32 = 0.45;

/// STT sampling temperature.
pub const STT_TEMPERATURE: f32 = 0.0;

/// Tail of emitted text kept for overlap deduplication (chars).
pub const HISTORY_TAIL_CHARS: usize = 1000;

/// How many recently emitted segments are retained as correction context.
pub const RECENT_SEGMENTS: usize = 40;

/// How many of the retained segments accompany a correction request.
pub const CORRECTION_CONTEXT_SEGMENTS: usize = 10;

/// Data-channel topic all envelopes are published on.
pub const DATA_TOPIC: &str = "transcription";
