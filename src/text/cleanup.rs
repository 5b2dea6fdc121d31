//! Final cleanup of released sentences.
//!
//! Collapses residual phrase repeats that survive extraction (the STT can
//! stutter across overlap boundaries) and normalizes punctuation spacing.
//! Also hosts the edit-distance used for the stream-quality metric.

/// Longest phrase (in words) the repeat scan considers.
const MAX_PHRASE_WORDS: usize = 10;
/// Shortest phrase the repeat scan collapses.
const MIN_PHRASE_WORDS: usize = 2;
/// Below this effective confidence the repeat scan is skipped; low-quality
/// windows repeat legitimately too often to touch.
const DEDUP_CONFIDENCE_FLOOR: f32 = 0.5;

/// Cleans released sentence text.
pub fn cleanup(text: &str, confidence: f32) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let deduped = if confidence >= DEDUP_CONFIDENCE_FLOOR {
        let mut words: Vec<&str> = collapsed.split(' ').filter(|w| !w.is_empty()).collect();
        collapse_repeats(&mut words);
        words.join(" ")
    } else {
        collapsed
    };

    let squeezed = squeeze_terminator_runs(&deduped);
    let tightened = strip_space_before_punct(&squeezed);
    space_after_terminator(&tightened)
}

/// Removes adjacent duplicated phrases in place.
///
/// At each position, the longest phrase (10 words down to 2) that repeats
/// immediately after itself loses its second copy; the scan stays put to
/// catch triple repeats.
fn collapse_repeats(words: &mut Vec<&str>) {
    let mut i = 0;
    while i < words.len() {
        let remaining = words.len() - i;
        let mut matched = false;
        let mut len = (remaining / 2).min(MAX_PHRASE_WORDS);
        while len >= MIN_PHRASE_WORDS {
            if phrases_equal(&words[i..i + len], &words[i + len..i + 2 * len]) {
                words.drain(i + len..i + 2 * len);
                matched = true;
                break;
            }
            len -= 1;
        }
        if !matched {
            i += 1;
        }
    }
}

fn phrases_equal(a: &[&str], b: &[&str]) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| x.to_lowercase() == y.to_lowercase())
}

/// Replaces runs of an identical terminator (`..`, `!!!`) with one.
fn squeeze_terminator_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        if matches!(ch, '.' | '!' | '?') && prev == Some(ch) {
            continue;
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

/// Removes whitespace immediately before `,;:.!?`.
fn strip_space_before_punct(text: &str) -> String {
    let mut out: Vec<char> = Vec::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, ',' | ';' | ':' | '.' | '!' | '?') {
            while out.last().is_some_and(|c| c.is_whitespace()) {
                out.pop();
            }
        }
        out.push(ch);
    }
    out.into_iter().collect()
}

/// Inserts one space between a terminator and an immediately-following
/// uppercase letter.
fn space_after_terminator(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?')
            && chars.get(i + 1).is_some_and(|c| c.is_uppercase())
        {
            out.push(' ');
        }
    }
    out
}

/// Levenshtein distance between two strings, by character.
///
/// Single-row dynamic program: `row[j]` holds the distance from the source
/// prefix consumed so far to the first `j` chars of `target`, with the
/// previous row's diagonal carried in a scalar.
pub fn edit_distance(source: &str, target: &str) -> usize {
    let target: Vec<char> = target.chars().collect();
    if target.is_empty() {
        return source.chars().count();
    }

    let mut row: Vec<usize> = (0..=target.len()).collect();
    for (i, from) in source.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &to) in target.iter().enumerate() {
            let substitution = diagonal + usize::from(from != to);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(diagonal + 1).min(row[j] + 1);
        }
    }
    row[target.len()]
}

/// Normalized edit distance between the raw STT text and the cleaned text.
///
/// A stream-quality proxy, not an accuracy metric: high values mean the
/// cleanup had to rewrite a lot.
pub fn wer_proxy(original: &str, cleaned: &str) -> f32 {
    let max_len = original.chars().count().max(cleaned.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    edit_distance(original, cleaned) as f32 / max_len as f32
}
