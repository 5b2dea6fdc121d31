//! Frame normalization: raw room frames to canonical s16le mono.
//!
//! Handles the two layouts the room transport actually delivers (mono and
//! interleaved stereo) and resamples to the configured rate. The resampler is
//! intentionally crude: a first-order exponential pre-filter followed by
//! linear interpolation. Windows are seconds long and the downstream features
//! are energy- and text-based, not spectral, so this is sufficient.

use crate::error::{Result, RoomscribeError};
use crate::transport::RoomAudioFrame;
use tracing::warn;

/// Converts incoming room frames to s16le mono at a fixed target rate.
///
/// One normalizer per subscribed track; it owns the warn-once flags for
/// sample-rate and channel-count mismatches.
pub struct FrameNormalizer {
    target_rate: u32,
    rate_warned: bool,
    channels_warned: bool,
}

impl FrameNormalizer {
    /// Creates a normalizer targeting the given sample rate.
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            rate_warned: false,
            channels_warned: false,
        }
    }

    /// Normalizes one frame to mono samples at the target rate.
    ///
    /// Channel layouts other than mono and stereo are rejected; the frame is
    /// dropped by the caller.
    pub fn normalize(&mut self, frame: &RoomAudioFrame) -> Result<Vec<i16>> {
        let samples = decode_s16le(&frame.data);

        let mono = match frame.channels {
            1 => samples,
            2 => {
                if !self.channels_warned {
                    self.channels_warned = true;
                    warn!(channels = frame.channels, "downmixing stereo track to mono");
                }
                stereo_to_mono(&samples)
            }
            other => {
                return Err(RoomscribeError::UnsupportedChannelLayout { channels: other });
            }
        };

        if frame.sample_rate == self.target_rate {
            return Ok(mono);
        }

        if !self.rate_warned {
            self.rate_warned = true;
            warn!(
                from = frame.sample_rate,
                to = self.target_rate,
                "resampling track"
            );
        }
        Ok(resample(&mono, frame.sample_rate, self.target_rate))
    }
}

/// Reinterprets a little-endian byte payload as s16 samples.
///
/// A trailing odd byte is ignored.
pub fn decode_s16le(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Averages interleaved stereo pairs into mono: `round((L+R)/2)`.
pub fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| {
            let left = pair[0] as f32;
            let right = pair[1] as f32;
            ((left + right) / 2.0).round() as i16
        })
        .collect()
}

/// Resamples `samples` from `from_rate` to `to_rate`.
///
/// Identity rates return the input unchanged, bit-exact. Otherwise the input
/// passes through a first-order exponential smoother with
/// `alpha = min(1, 1.5·to/from)` and is linearly interpolated onto an output
/// of `round(len·to/from)` samples, each clamped to the s16 range.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let alpha = (1.5 * to_rate as f64 / from_rate as f64).min(1.0);
    let mut filtered = Vec::with_capacity(samples.len());
    let mut state = samples[0] as f64;
    for &sample in samples {
        state += alpha * (sample as f64 - state);
        filtered.push(state);
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).round() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 / ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            let value = if source_idx + 1 >= filtered.len() {
                filtered[source_idx.min(filtered.len() - 1)]
            } else {
                let left = filtered[source_idx];
                let right = filtered[source_idx + 1];
                left + (right - left) * fraction
            };

            value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sample_rate: u32, channels: u16, samples: &[i16]) -> RoomAudioFrame {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for &s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        RoomAudioFrame {
            sample_rate,
            channels,
            samples_per_channel: (samples.len() / channels as usize) as u32,
            data,
        }
    }

    #[test]
    fn decode_s16le_roundtrip() {
        let samples = vec![0i16, 1, -1, i16::MAX, i16::MIN];
        let mut data = Vec::new();
        for &s in &samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        assert_eq!(decode_s16le(&data), samples);
    }

    #[test]
    fn decode_s16le_ignores_trailing_byte() {
        assert_eq!(decode_s16le(&[0x01, 0x00, 0xFF]), vec![1i16]);
    }

    #[test]
    fn stereo_to_mono_identity_pairs() {
        // stereoToMono([a,a,b,b,c,c]) == [a,b,c]
        let stereo = vec![100i16, 100, 200, 200, 300, 300];
        assert_eq!(stereo_to_mono(&stereo), vec![100i16, 200, 300]);
    }

    #[test]
    fn stereo_to_mono_averages_with_rounding() {
        let stereo = vec![100i16, 201, -100, 100];
        // (100+201)/2 = 150.5 → 151, (-100+100)/2 = 0
        assert_eq!(stereo_to_mono(&stereo), vec![151i16, 0]);
    }

    #[test]
    fn resample_identity_is_bit_exact() {
        let samples = vec![123i16, -456, 789, 0, i16::MAX];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn resample_48k_to_16k_length() {
        let samples = vec![1000i16; 4800];
        let out = resample(&samples, 48000, 16000);
        assert!(
            (out.len() as i64 - 1600).abs() <= 1,
            "expected ~1600, got {}",
            out.len()
        );
    }

    #[test]
    fn resample_preserves_dc_level() {
        let samples = vec![1000i16; 4800];
        let out = resample(&samples, 48000, 16000);
        // After the filter settles, values stay near the input level
        assert!(out[out.len() / 2..].iter().all(|&s| (995..=1005).contains(&s)));
    }

    #[test]
    fn resample_upsample_length() {
        let samples = vec![500i16; 800];
        let out = resample(&samples, 8000, 16000);
        assert_eq!(out.len(), 1600);
    }

    #[test]
    fn resample_clamps_to_s16() {
        let samples = vec![i16::MAX; 3000];
        let out = resample(&samples, 48000, 16000);
        assert!(out.iter().all(|&s| s <= i16::MAX));
    }

    #[test]
    fn resample_empty_input() {
        assert!(resample(&[], 48000, 16000).is_empty());
    }

    #[test]
    fn normalize_mono_at_target_rate_is_passthrough() {
        let mut normalizer = FrameNormalizer::new(16000);
        let out = normalizer
            .normalize(&frame(16000, 1, &[10, 20, 30]))
            .unwrap();
        assert_eq!(out, vec![10i16, 20, 30]);
    }

    #[test]
    fn normalize_stereo_48k_frame() {
        // 4800 samples per channel at 48 kHz stereo → ~1600 mono at 16 kHz
        let interleaved: Vec<i16> = (0..9600).map(|_| 1000i16).collect();
        let mut normalizer = FrameNormalizer::new(16000);
        let out = normalizer.normalize(&frame(48000, 2, &interleaved)).unwrap();
        assert!(
            (out.len() as i64 - 1600).abs() <= 1,
            "expected ~1600, got {}",
            out.len()
        );
    }

    #[test]
    fn normalize_rejects_unsupported_layout() {
        let mut normalizer = FrameNormalizer::new(16000);
        let result = normalizer.normalize(&frame(16000, 6, &[0i16; 12]));
        match result {
            Err(RoomscribeError::UnsupportedChannelLayout { channels }) => {
                assert_eq!(channels, 6)
            }
            other => panic!("expected UnsupportedChannelLayout, got {:?}", other),
        }
    }

    #[test]
    fn normalize_warns_once_per_track() {
        let mut normalizer = FrameNormalizer::new(16000);
        normalizer.normalize(&frame(48000, 2, &[0i16; 96])).unwrap();
        assert!(normalizer.rate_warned);
        assert!(normalizer.channels_warned);
        // Flags stay set; further frames do not re-warn
        normalizer.normalize(&frame(48000, 2, &[0i16; 96])).unwrap();
        assert!(normalizer.rate_warned);
    }
}
