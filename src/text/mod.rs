//! Transcript text processing: incremental extraction, sentence assembly,
//! and cleanup.

pub mod cleanup;
pub mod extract;
pub mod sentence;
