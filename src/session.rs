//! Session state: everything the emitter owns across windows.
//!
//! The emitted-history tail, the pending sentence buffer, the recent-segment
//! ring, and the chunk counters are logically per-session. A single emitter
//! task owns one `Session`; pipelines send transcribed windows to it and
//! receive nothing back, which keeps emissions totally ordered without
//! locks.

use crate::defaults;
use crate::stt::transcriber::SttSegment;
use crate::text::cleanup::cleanup;
use crate::text::extract::{extract_new_text, normalize};
use crate::text::sentence::SentenceBuffer;
use crate::transport::envelope::TranscriptSegment;
use std::collections::VecDeque;

/// Sentences released for one window, ready to become a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Released {
    /// Cleaned sentence text.
    pub text: String,
    /// Blended sentence-buffer confidence at release time.
    pub confidence: f32,
}

/// Per-session transcript state.
pub struct Session {
    /// Normalized tail of everything broadcast so far.
    emitted_history: String,
    sentence: SentenceBuffer,
    recent: VecDeque<TranscriptSegment>,
    chunks_processed: u64,
    chunks_skipped: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            emitted_history: String::new(),
            sentence: SentenceBuffer::new(),
            recent: VecDeque::with_capacity(defaults::RECENT_SEGMENTS),
            chunks_processed: 0,
            chunks_skipped: 0,
        }
    }

    /// Absorbs one window's STT text.
    ///
    /// Runs extraction against the emitted history plus the pending buffer,
    /// feeds the new suffix into the sentence buffer, and returns cleaned
    /// complete sentences once the release predicate holds.
    pub fn absorb(
        &mut self,
        stt_text: &str,
        segments: &[SttSegment],
        confidence_threshold: f32,
    ) -> Option<Released> {
        let trimmed = stt_text.trim();
        if trimmed.is_empty() {
            // An empty window leaves every piece of session state untouched,
            // the counters included
            return None;
        }
        self.chunks_processed += 1;

        let prior = if self.sentence.is_empty() {
            self.emitted_history.clone()
        } else {
            format!("{} {}", self.emitted_history, self.sentence.pending())
        };

        let new_text = extract_new_text(&prior, trimmed);
        if new_text.is_empty() {
            return None;
        }

        let c_new = covering_confidence(segments, new_text.chars().count());
        self.sentence.push(&new_text, c_new);

        let blended = self.sentence.confidence();
        let released = self.sentence.try_release(confidence_threshold)?;
        let cleaned = cleanup(&released, blended);
        if cleaned.is_empty() {
            return None;
        }

        Some(Released {
            text: cleaned,
            confidence: blended,
        })
    }

    /// Records a broadcast segment: appends its normalized text to the
    /// history tail and pushes it onto the recent ring.
    pub fn record_emission(&mut self, segment: TranscriptSegment) {
        let normalized = normalize(&segment.text);
        if !normalized.is_empty() {
            if !self.emitted_history.is_empty() {
                self.emitted_history.push(' ');
            }
            self.emitted_history.push_str(&normalized);
            self.truncate_history();
        }

        self.recent.push_back(segment);
        while self.recent.len() > defaults::RECENT_SEGMENTS {
            self.recent.pop_front();
        }
    }

    fn truncate_history(&mut self) {
        let total = self.emitted_history.chars().count();
        if total > defaults::HISTORY_TAIL_CHARS {
            let skip = total - defaults::HISTORY_TAIL_CHARS;
            self.emitted_history = self.emitted_history.chars().skip(skip).collect();
        }
    }

    /// Last `n` emitted segments, oldest first.
    pub fn recent_context(&self, n: usize) -> Vec<TranscriptSegment> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    /// Counts a VAD-rejected window.
    pub fn mark_skipped(&mut self) {
        self.chunks_skipped += 1;
    }

    /// `(processed, skipped)` counters.
    pub fn counters(&self) -> (u64, u64) {
        (self.chunks_processed, self.chunks_skipped)
    }

    pub fn history(&self) -> &str {
        &self.emitted_history
    }

    pub fn pending(&self) -> &str {
        self.sentence.pending()
    }

    /// Clears all state; called when the last track disconnects.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Length-weighted average confidence of the segments covering the new
/// suffix, walking backwards until the suffix length is covered.
///
/// Segments without a confidence contribute at 1.0; an empty segment list
/// yields 1.0.
fn covering_confidence(segments: &[SttSegment], new_len: usize) -> f32 {
    let mut weighted = 0.0f64;
    let mut weight_total = 0.0f64;
    let mut covered = 0usize;

    for segment in segments.iter().rev() {
        let text_len = segment
            .text
            .as_deref()
            .map(|t| t.chars().count())
            .unwrap_or(1)
            .max(1);
        let confidence = segment.confidence.unwrap_or(1.0) as f64;
        weighted += confidence * text_len as f64;
        weight_total += text_len as f64;
        covered += text_len;
        if covered >= new_len {
            break;
        }
    }

    if weight_total == 0.0 {
        1.0
    } else {
        (weighted / weight_total) as f32
    }
}
