//! WAV encoding for STT payloads and decoding for pipe mode.
//!
//! The STT service accepts a canonical 44-byte-header WAV: RIFF/WAVE, a
//! 16-byte fmt chunk (PCM code 1, 16 bits per sample), then the data chunk
//! with raw s16le samples. `hound` writes exactly that layout for a
//! 16-bit integer format.

use crate::error::{Result, RoomscribeError};
use std::io::{Cursor, Read};

/// Encodes mono/interleaved s16 samples as an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| RoomscribeError::Other(
                format!("Failed to start WAV encode: {}", e),
            ))?;
        let mut sample_writer = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            sample_writer.write_sample(sample);
        }
        sample_writer
            .flush()
            .map_err(|e| RoomscribeError::Other(format!("Failed to write WAV samples: {}", e)))?;
        writer
            .finalize()
            .map_err(|e| RoomscribeError::Other(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

/// Decoded WAV contents, kept at the source rate and layout.
///
/// Pipe mode feeds these through the pipeline as raw room frames so the
/// normalizer sees the same input it would from a live track.
pub struct WavContents {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved s16 samples.
    pub samples: Vec<i16>,
}

/// Reads a whole WAV file from any reader.
pub fn decode_wav(reader: Box<dyn Read + Send>) -> Result<WavContents> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| RoomscribeError::Other(
        format!("Failed to parse WAV file: {}", e),
    ))?;

    let spec = wav_reader.spec();
    let samples: Vec<i16> = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RoomscribeError::Other(format!("Failed to read WAV samples: {}", e)))?;

    Ok(WavContents {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_canonical_44_bytes() {
        let wav = encode_wav(&[0i16; 100], 16000, 1).unwrap();
        assert_eq!(wav.len(), 44 + 200);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        // fmt chunk length 16, PCM format code 1
        assert_eq!(u32::from_le_bytes(wav[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(wav[20..22].try_into().unwrap()), 1);
        assert_eq!(&wav[36..40], b"data");
    }

    #[test]
    fn header_fields_match_format() {
        let wav = encode_wav(&[0i16; 10], 16000, 1).unwrap();
        let channels = u16::from_le_bytes(wav[22..24].try_into().unwrap());
        let sample_rate = u32::from_le_bytes(wav[24..28].try_into().unwrap());
        let byte_rate = u32::from_le_bytes(wav[28..32].try_into().unwrap());
        let block_align = u16::from_le_bytes(wav[32..34].try_into().unwrap());
        let bits = u16::from_le_bytes(wav[34..36].try_into().unwrap());

        assert_eq!(channels, 1);
        assert_eq!(sample_rate, 16000);
        assert_eq!(byte_rate, 16000 * 2);
        assert_eq!(block_align, 2);
        assert_eq!(bits, 16);
    }

    #[test]
    fn data_chunk_length_matches_payload() {
        let wav = encode_wav(&[1i16, -1, 2, -2], 16000, 1).unwrap();
        let data_len = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_len, 8);
        assert_eq!(&wav[44..46], &1i16.to_le_bytes());
        assert_eq!(&wav[46..48], &(-1i16).to_le_bytes());
    }

    #[test]
    fn riff_length_covers_whole_file() {
        let wav = encode_wav(&[0i16; 50], 16000, 1).unwrap();
        let riff_len = u32::from_le_bytes(wav[4..8].try_into().unwrap());
        assert_eq!(riff_len as usize, wav.len() - 8);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let samples = vec![100i16, -200, 300, -400, i16::MAX, i16::MIN];
        let wav = encode_wav(&samples, 16000, 1).unwrap();

        let decoded = decode_wav(Box::new(Cursor::new(wav))).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn decode_stereo_keeps_layout() {
        let samples = vec![1i16, 2, 3, 4];
        let wav = encode_wav(&samples, 48000, 2).unwrap();

        let decoded = decode_wav(Box::new(Cursor::new(wav))).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 48000);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn decode_rejects_garbage() {
        let garbage = vec![0u8, 1, 2, 3, 4, 5];
        assert!(decode_wav(Box::new(Cursor::new(garbage))).is_err());
    }
}
