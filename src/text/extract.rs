//! Overlap-aware incremental text extraction.
//!
//! Consecutive windows overlap by `window_ms − stride_ms`, so the STT
//! re-transcribes most of the previous window every time. Given the prior
//! text (everything already emitted plus the pending sentence buffer) and
//! the STT's full-window text, this module computes just the new suffix.
//!
//! Rules are tried in order; the first that applies wins:
//! 1. empty prior → whole text
//! 2. prior contains the text → nothing
//! 3. text extends the prior exactly → the extension
//! 4. word-boundary overlap (50 words down to 3)
//! 5. character-tail overlap (200 chars down to 20)
//! 6. high-redundancy paraphrase → nothing
//! 7. no overlap found → whole text
//!
//! Comparisons run on lowercased, whitespace-collapsed text; the returned
//! suffix keeps the original casing of the STT output.

use std::collections::HashSet;

/// Longest word overlap rule 4 considers.
const MAX_WORD_OVERLAP: usize = 50;
/// Shortest word overlap rule 4 accepts.
const MIN_WORD_OVERLAP: usize = 3;
/// Character span rules 5 compares on each side.
const CHAR_TAIL: usize = 200;
/// Shortest character overlap rule 5 accepts.
const MIN_CHAR_OVERLAP: usize = 20;
/// Known-word ratio above which rule 6 treats the text as a paraphrase.
const REDUNDANCY_RATIO: f32 = 0.7;

/// Lowercases, collapses whitespace runs to single spaces, and trims.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Returns the suffix of `current` not already implied by `prior`.
pub fn extract_new_text(prior: &str, current: &str) -> String {
    let norm_prior = normalize(prior);
    let norm_current = normalize(current);

    // Rule 1: nothing has been emitted yet
    if norm_prior.is_empty() {
        return current.trim().to_string();
    }

    // Rule 2: the window is entirely old material
    if norm_current.is_empty() || norm_prior.contains(&norm_current) {
        return String::new();
    }

    let prior_words: Vec<&str> = norm_prior.split(' ').collect();
    let current_words: Vec<&str> = norm_current.split(' ').collect();
    let original_words: Vec<&str> = current.split_whitespace().collect();

    // Rule 3: the window extends the prior exactly
    if norm_current.starts_with(&norm_prior) {
        let cut = norm_prior.chars().count();
        return suffix_from_char_cut(&original_words, &norm_current, cut);
    }

    // Rule 4: the window's head repeats the prior's tail, word for word
    let max_len = prior_words
        .len()
        .min(current_words.len())
        .min(MAX_WORD_OVERLAP);
    for len in (MIN_WORD_OVERLAP..=max_len).rev() {
        if prior_words[prior_words.len() - len..] == current_words[..len] {
            return original_words[len.min(original_words.len())..].join(" ");
        }
    }

    // Rule 5: character-level overlap across the boundary
    let prior_tail: Vec<char> = tail_chars(&norm_prior, CHAR_TAIL);
    let current_head: Vec<char> = norm_current.chars().take(CHAR_TAIL).collect();
    let max_len = prior_tail.len().min(current_head.len());
    for len in (MIN_CHAR_OVERLAP..=max_len).rev() {
        if prior_tail[prior_tail.len() - len..] == current_head[..len] {
            return suffix_after_overlap(current, &original_words, &norm_current, len);
        }
    }

    // Rule 6: mostly known words and no longer than the prior. Paraphrase
    // drift near the overlap boundary, not new speech.
    let unique_current: HashSet<&str> = current_words.iter().copied().collect();
    let prior_set: HashSet<&str> = prior_words.iter().copied().collect();
    let known = unique_current
        .iter()
        .filter(|word| prior_set.contains(*word))
        .count();
    let ratio = known as f32 / unique_current.len() as f32;
    if ratio > REDUNDANCY_RATIO && current_words.len() <= prior_words.len() {
        return String::new();
    }

    // Rule 7: treat the whole window as new
    current.trim().to_string()
}

/// Last `n` chars of a string.
fn tail_chars(text: &str, n: usize) -> Vec<char> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].to_vec()
}

/// Original-cased suffix for a cut at `cut` chars into the normalized text.
///
/// When the cut lands on a word boundary the suffix is rebuilt from the
/// original words, preserving their casing exactly.
fn suffix_from_char_cut(original_words: &[&str], norm_current: &str, cut: usize) -> String {
    let chars: Vec<char> = norm_current.chars().collect();
    let at_boundary = cut >= chars.len() || chars[cut] == ' ';
    if at_boundary {
        let words_before = chars[..cut.min(chars.len())]
            .iter()
            .collect::<String>()
            .split_whitespace()
            .count();
        if words_before >= original_words.len() {
            return String::new();
        }
        return original_words[words_before..].join(" ");
    }
    // Mid-word cut: slice the normalized text. Casing at the boundary is
    // lost, which mirrors the char-position slice this rule specifies.
    chars[cut..].iter().collect::<String>().trim().to_string()
}

/// Original-cased suffix after a rule-5 character overlap of `len` chars.
///
/// Starts at the first whitespace after the overlap; without one the suffix
/// starts right at the overlap boundary, even mid-word.
fn suffix_after_overlap(
    current: &str,
    original_words: &[&str],
    norm_current: &str,
    len: usize,
) -> String {
    let chars: Vec<char> = norm_current.chars().collect();
    match chars[len..].iter().position(|c| c.is_whitespace()) {
        Some(offset) => {
            let cut = len + offset;
            let words_before = chars[..cut]
                .iter()
                .collect::<String>()
                .split_whitespace()
                .count();
            if words_before >= original_words.len() {
                return String::new();
            }
            original_words[words_before..].join(" ")
        }
        None => {
            // Mid-word continuation with no later whitespace
            let trimmed = current.trim();
            trimmed.chars().skip(len).collect()
        }
    }
}
