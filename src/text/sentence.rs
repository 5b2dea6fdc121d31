//! Sentence-boundary buffering.
//!
//! Extractor output accumulates here until at least one complete sentence is
//! present and the blended confidence clears the configured threshold. Only
//! complete sentences are released; the trailing fragment stays buffered for
//! the next window.

/// Pending text plus a blended confidence scalar.
#[derive(Debug, Clone)]
pub struct SentenceBuffer {
    buffer: String,
    confidence: f32,
    /// Confidence of the most recent push, used to re-seed the blend after a
    /// release.
    last_input: f32,
}

impl Default for SentenceBuffer {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            confidence: 1.0,
            last_input: 1.0,
        }
    }
}

impl SentenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends extractor output with a joining space and folds its
    /// confidence into the blend: `c' = 0.5·c + 0.5·c_new`.
    pub fn push(&mut self, text: &str, confidence: f32) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(text);
        self.last_input = confidence;
        self.confidence = 0.5 * self.confidence + 0.5 * confidence;
    }

    /// Releases every complete sentence, if the release predicate holds.
    ///
    /// The predicate: the buffer contains a terminator (`.`, `!`, `?`)
    /// followed by whitespace or end-of-string, and the blended confidence
    /// is at or above `threshold`. On release the remainder stays buffered
    /// and the confidence is re-seeded as `blend(1, c_last)`.
    pub fn try_release(&mut self, threshold: f32) -> Option<String> {
        if self.buffer.is_empty() || self.confidence < threshold {
            return None;
        }

        let (complete, rest) = split_sentences(&self.buffer);
        if complete.is_empty() {
            return None;
        }

        self.buffer = rest;
        self.confidence = 0.5 + 0.5 * self.last_input;
        Some(complete)
    }

    /// Text accepted but not yet released.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Current blended confidence.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Splits off complete sentences: every span of non-terminators followed by
/// a terminator run that sits before whitespace or end-of-string. Matches
/// are concatenated; the trailing unmatched suffix becomes the new buffer.
fn split_sentences(text: &str) -> (String, String) {
    let chars: Vec<char> = text.chars().collect();
    let mut complete = String::new();
    let mut last_match_end: Option<usize> = None;
    let mut pos = 0;

    while pos < chars.len() {
        if is_terminator(chars[pos]) {
            pos += 1;
            continue;
        }
        let span_start = pos;
        while pos < chars.len() && !is_terminator(chars[pos]) {
            pos += 1;
        }
        if pos == chars.len() {
            break;
        }
        while pos < chars.len() && is_terminator(chars[pos]) {
            pos += 1;
        }
        if pos == chars.len() || chars[pos].is_whitespace() {
            complete.extend(&chars[span_start..pos]);
            last_match_end = Some(pos);
        }
    }

    let rest = match last_match_end {
        Some(end) => chars[end..].iter().collect::<String>(),
        None => text.to_string(),
    };
    (complete, rest)
}
