//! roomscribe - live media-room transcription worker
//!
//! Ingests PCM audio from room participants, windows it, transcribes each
//! window via an external STT service, and emits deduplicated,
//! sentence-aligned transcript batches over the room's data channel, with a
//! correction-model forward for each batch.

pub mod audio;
pub mod config;
pub mod correction;
pub mod defaults;
pub mod error;
pub mod session;
pub mod streaming;
pub mod stt;
pub mod text;
pub mod transport;
