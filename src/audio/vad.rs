//! Voice activity detection over completed analysis windows.
//!
//! Unlike frame-level gates, this VAD judges whole windows just before they
//! are sent for transcription. It combines the window's RMS against an
//! adaptive noise floor with a rolling average of the zero-crossing rate;
//! low-frequency rumble has energy but few crossings, speech has both.

use crate::audio::rms;
use crate::config::VadConfig;
use std::collections::VecDeque;

/// Outcome of gating one window.
#[derive(Debug, Clone, Copy)]
pub struct VadDecision {
    /// True when the window should be transcribed.
    pub is_speech: bool,
    /// Combined energy/ZCR score compared against the sensitivity.
    pub score: f32,
    /// Window RMS in s16 units.
    pub rms: f32,
    /// Effective threshold (static floor vs adaptive noise floor).
    pub threshold: f32,
}

/// Window-level voice activity detector for one track.
pub struct WindowVad {
    config: VadConfig,
    noise_floor: f32,
    zcr_window: VecDeque<f32>,
    zcr_capacity: usize,
}

impl WindowVad {
    /// Creates a detector.
    ///
    /// `window_ms` is the analysis-window length the chunker emits; the ZCR
    /// rolling window spans `max(1, round(vad_window_ms / window_ms · 4))`
    /// entries.
    pub fn new(config: VadConfig, window_ms: u32) -> Self {
        let zcr_capacity =
            ((config.window_ms as f32 / window_ms as f32) * 4.0).round().max(1.0) as usize;
        Self {
            config,
            noise_floor: 0.0,
            zcr_window: VecDeque::with_capacity(zcr_capacity),
            zcr_capacity,
        }
    }

    /// Judges a completed window and updates the adaptive state.
    pub fn assess(&mut self, samples: &[i16]) -> VadDecision {
        let r = rms(samples);
        self.noise_floor = 0.95 * self.noise_floor + 0.05 * r;
        let threshold = (1.6 * self.noise_floor).max(self.config.silence_rms_threshold);

        let zcr = if samples.is_empty() {
            0.0
        } else {
            zero_crossings(samples) as f32 / samples.len() as f32
        };
        if self.zcr_window.len() == self.zcr_capacity {
            self.zcr_window.pop_front();
        }
        self.zcr_window.push_back(zcr);
        let zcr_avg: f32 =
            self.zcr_window.iter().sum::<f32>() / self.zcr_window.len() as f32;

        let score = 0.7 * (r / threshold) + 0.3 * zcr_avg;

        VadDecision {
            is_speech: score >= self.config.sensitivity,
            score,
            rms: r,
            threshold,
        }
    }

    /// Clears the adaptive state.
    pub fn reset(&mut self) {
        self.noise_floor = 0.0;
        self.zcr_window.clear();
    }
}

/// Counts sign changes in a sample block.
pub fn zero_crossings(samples: &[i16]) -> usize {
    samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0) != (pair[1] >= 0))
        .count()
}
