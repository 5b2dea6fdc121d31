//! Sliding-window chunker.
//!
//! A fixed-capacity ring of mono samples with a fill cursor. Every time the
//! ring fills, the whole window is copied out as a chunk and the ring slides
//! left by one stride, so consecutive windows overlap by
//! `window_ms − stride_ms`. Timestamps are assigned per emission: the first
//! window starts at the wall clock of the first appended frame and each
//! subsequent window starts one stride later.

use crate::error::{Result, RoomscribeError};
use crate::streaming::frame::AudioChunk;

/// Fixed ring over samples that emits one window per stride.
pub struct SlidingWindow {
    ring: Vec<i16>,
    capacity: usize,
    cursor: usize,
    stride_samples: usize,
    window_ms: u32,
    stride_ms: u32,
    sample_rate: u32,
    /// Start of the next window, epoch ms. Set from the wall clock on the
    /// first append.
    start_ms: Option<u64>,
    /// Wall clock when the current window started filling.
    opened_at_ms: Option<u64>,
    next_chunk_id: u64,
}

impl SlidingWindow {
    /// Creates a ring sized `sample_rate · window_ms / 1000`.
    pub fn new(sample_rate: u32, window_ms: u32, stride_ms: u32) -> Result<Self> {
        let capacity = (sample_rate as u64 * window_ms as u64 / 1000) as usize;
        let stride_samples = (sample_rate as u64 * stride_ms as u64 / 1000) as usize;

        if capacity == 0 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.window_ms".to_string(),
                message: "window holds zero samples".to_string(),
            });
        }
        if stride_samples == 0 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.stride_ms".to_string(),
                message: "stride holds zero samples".to_string(),
            });
        }

        Ok(Self {
            ring: vec![0; capacity],
            capacity,
            cursor: 0,
            stride_samples,
            window_ms,
            stride_ms,
            sample_rate,
            start_ms: None,
            opened_at_ms: None,
            next_chunk_id: 0,
        })
    }

    /// True when the ring is exactly full.
    pub fn has_window(&self) -> bool {
        self.cursor == self.capacity
    }

    /// Number of filled samples.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ring capacity in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends samples, emitting every window that completes along the way.
    ///
    /// The loop is iterative: a large input may close several windows, each
    /// emitted in capture order. `now_ms` is the wall clock of the frame,
    /// used to anchor the first window's timestamp.
    pub fn append(&mut self, samples: &[i16], now_ms: u64) -> Result<Vec<AudioChunk>> {
        debug_assert!(self.cursor <= self.capacity);

        if self.start_ms.is_none() {
            self.start_ms = Some(now_ms);
        }
        if self.opened_at_ms.is_none() && !samples.is_empty() {
            self.opened_at_ms = Some(now_ms);
        }

        let mut chunks = Vec::new();
        let mut offset = 0;

        while offset < samples.len() {
            let space = self.capacity - self.cursor;
            let take = space.min(samples.len() - offset);
            if take == 0 {
                // cursor == capacity with input left over means the slide
                // below failed to run; the ring invariant is broken.
                return Err(RoomscribeError::WindowOverflow {
                    requested: samples.len() - offset,
                    available: space,
                });
            }

            self.ring[self.cursor..self.cursor + take]
                .copy_from_slice(&samples[offset..offset + take]);
            self.cursor += take;
            offset += take;

            if self.cursor == self.capacity {
                chunks.push(self.emit(now_ms));
            }
        }

        Ok(chunks)
    }

    /// Copies the full ring out as a chunk and slides by one stride.
    fn emit(&mut self, now_ms: u64) -> AudioChunk {
        let start_ms = self.start_ms.unwrap_or(now_ms);
        let chunk = AudioChunk {
            chunk_id: self.next_chunk_id,
            start_ms,
            end_ms: start_ms + self.window_ms as u64,
            sample_rate: self.sample_rate,
            channels: 1,
            format: "s16le",
            captured_at_ms: self.opened_at_ms.unwrap_or(now_ms),
            completed_at_ms: now_ms,
            samples: self.ring.clone(),
        };

        if self.stride_samples >= self.capacity {
            self.cursor = 0;
        } else {
            self.ring.copy_within(self.stride_samples.., 0);
            self.cursor = self.capacity - self.stride_samples;
        }

        self.start_ms = Some(start_ms + self.stride_ms as u64);
        self.opened_at_ms = Some(now_ms);
        self.next_chunk_id += 1;

        chunk
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(sample_rate: u32, window_ms: u32, stride_ms: u32) -> SlidingWindow {
        SlidingWindow::new(sample_rate, window_ms, stride_ms).unwrap()
    }

    #[test]
    fn construction_computes_capacity_and_stride() {
        let w = window(16000, 3000, 1000);
        assert_eq!(w.capacity(), 48000);
        assert_eq!(w.stride_samples, 16000);
        assert_eq!(w.cursor(), 0);
    }

    #[test]
    fn construction_rejects_zero_capacity() {
        // 1000 Hz with a 0 ms window
        assert!(SlidingWindow::new(16000, 0, 1000).is_err());
        assert!(SlidingWindow::new(16000, 3000, 0).is_err());
    }

    #[test]
    fn exactly_full_ring_emits_one_window() {
        let mut w = window(1000, 1000, 400);
        let chunks = w.append(&vec![7i16; 1000], 5000).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples.len(), 1000);
        assert!(chunks[0].samples.iter().all(|&s| s == 7));
        // cursor = N − strideSamples after emission
        assert_eq!(w.cursor(), 600);
    }

    #[test]
    fn partial_fill_emits_nothing() {
        let mut w = window(1000, 1000, 400);
        let chunks = w.append(&vec![1i16; 999], 0).unwrap();
        assert!(chunks.is_empty());
        assert_eq!(w.cursor(), 999);
        assert!(!w.has_window());
    }

    #[test]
    fn large_input_closes_multiple_windows_in_order() {
        let mut w = window(1000, 1000, 1000);
        // Non-overlapping stride: 3 windows from 3000 samples
        let samples: Vec<i16> = (0..3000).map(|i| (i % 100) as i16).collect();
        let chunks = w.append(&samples, 0).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[1].chunk_id, 1);
        assert_eq!(chunks[2].chunk_id, 2);
        assert_eq!(chunks[0].samples[..], samples[..1000]);
        assert_eq!(chunks[1].samples[..], samples[1000..2000]);
        assert_eq!(chunks[2].samples[..], samples[2000..]);
    }

    #[test]
    fn overlap_keeps_window_tail() {
        let mut w = window(1000, 1000, 400);
        let first: Vec<i16> = (0..1000).map(|i| i as i16).collect();
        w.append(&first, 0).unwrap();

        // The ring slid left by 400: its head now holds samples 400..1000.
        // 400 more samples complete the next window.
        let second: Vec<i16> = (1000..1400).map(|i| i as i16).collect();
        let chunks = w.append(&second, 0).unwrap();

        assert_eq!(chunks.len(), 1);
        let expected: Vec<i16> = (400..1400).map(|i| i as i16).collect();
        assert_eq!(chunks[0].samples, expected);
    }

    #[test]
    fn stride_equal_to_window_resets_cursor() {
        let mut w = window(1000, 1000, 1000);
        w.append(&vec![1i16; 1000], 0).unwrap();
        assert_eq!(w.cursor(), 0);
    }

    #[test]
    fn stride_larger_than_window_resets_cursor() {
        let mut w = window(1000, 1000, 1500);
        w.append(&vec![1i16; 1000], 0).unwrap();
        assert_eq!(w.cursor(), 0);
    }

    #[test]
    fn timestamps_advance_by_stride() {
        let mut w = window(1000, 1000, 400);
        let chunks = w.append(&vec![0i16; 1000], 10_000).unwrap();
        assert_eq!(chunks[0].start_ms, 10_000);
        assert_eq!(chunks[0].end_ms, 11_000);

        let chunks = w.append(&vec![0i16; 400], 11_000).unwrap();
        assert_eq!(chunks[0].start_ms, 10_400);
        assert_eq!(chunks[0].end_ms, 11_400);
    }

    #[test]
    fn every_emission_spans_exactly_one_window() {
        let mut w = window(1000, 1000, 300);
        let chunks = w.append(&vec![0i16; 5000], 0).unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.end_ms - chunk.start_ms, 1000);
        }
    }

    #[test]
    fn chunk_does_not_alias_the_ring() {
        let mut w = window(1000, 1000, 400);
        let chunks = w.append(&vec![5i16; 1000], 0).unwrap();
        let snapshot = chunks[0].samples.clone();

        // Mutate the ring by appending more data
        w.append(&vec![-5i16; 400], 0).unwrap();
        assert_eq!(chunks[0].samples, snapshot);
    }
}
