//! Automatic gain control.
//!
//! A slow loop that scales incoming buffers toward a target RMS. Both the
//! RMS estimate and the gain are exponentially smoothed with the same
//! coefficient, and the desired gain is clamped so near-silent buffers
//! cannot drive the gain to extremes.

use crate::audio::rms;
use crate::config::AgcConfig;

/// Smoothed-gain state for one track.
#[derive(Debug)]
pub struct Agc {
    config: AgcConfig,
    smoothed_rms: f32,
    gain: f32,
}

impl Agc {
    /// Creates an AGC with unity gain and a cold RMS estimate.
    pub fn new(config: AgcConfig) -> Self {
        Self {
            config,
            smoothed_rms: 0.0,
            gain: 1.0,
        }
    }

    /// Applies gain to a mono buffer in place.
    ///
    /// Buffers whose smoothed gain sits within 0.05 of unity pass through
    /// untouched, so a well-leveled source is never rescaled.
    pub fn process(&mut self, samples: &mut [i16]) {
        if samples.is_empty() {
            return;
        }

        let s = self.config.smoothing;
        let r = rms(samples);
        self.smoothed_rms = (1.0 - s) * self.smoothed_rms + s * r;

        let desired = (self.config.target_rms / self.smoothed_rms.max(1.0))
            .clamp(self.config.min_gain, self.config.max_gain);
        self.gain = (1.0 - s) * self.gain + s * desired;

        if (self.gain - 1.0).abs() < 0.05 {
            return;
        }

        for sample in samples.iter_mut() {
            let scaled = (*sample as f32 * self.gain)
                .round()
                .clamp(i16::MIN as f32, i16::MAX as f32);
            *sample = scaled as i16;
        }
    }

    /// Current smoothed gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Current smoothed RMS estimate.
    pub fn smoothed_rms(&self) -> f32 {
        self.smoothed_rms
    }
}
