//! Minimal PCM16 WAV reader/writer, used by offline test tooling and the
//! TTS worker stub to materialize synthesized audio for inspection. Only
//! mono/stereo PCM16 `data` chunks round-trip; anything else is an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WavError>;

#[derive(Error, Debug)]
pub enum WavError {
    #[error("not a RIFF/WAVE file")]
    BadMagic,
    #[error("unsupported format: only PCM16 is supported")]
    UnsupportedFormat,
    #[error("truncated file")]
    Truncated,
}

#[derive(Debug, Clone)]
pub struct WavPcm16 {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl WavPcm16 {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 44 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(WavError::BadMagic);
        }

        let mut pos = 12;
        let mut fmt: Option<(u16, u16, u32)> = None; // (format_tag, channels, sample_rate)
        let mut bits_per_sample = 0u16;
        let mut data: Option<&[u8]> = None;

        while pos + 8 <= bytes.len() {
            let chunk_id = &bytes[pos..pos + 4];
            let chunk_size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
            let body_start = pos + 8;
            if body_start + chunk_size > bytes.len() {
                return Err(WavError::Truncated);
            }
            let body = &bytes[body_start..body_start + chunk_size];

            match chunk_id {
                b"fmt " => {
                    if body.len() < 16 {
                        return Err(WavError::Truncated);
                    }
                    let format_tag = u16::from_le_bytes(body[0..2].try_into().unwrap());
                    let channels = u16::from_le_bytes(body[2..4].try_into().unwrap());
                    let sample_rate = u32::from_le_bytes(body[4..8].try_into().unwrap());
                    bits_per_sample = u16::from_le_bytes(body[14..16].try_into().unwrap());
                    fmt = Some((format_tag, channels, sample_rate));
                }
                b"data" => {
                    data = Some(body);
                }
                _ => {}
            }

            pos = body_start + chunk_size + (chunk_size % 2);
        }

        let (format_tag, channels, sample_rate) = fmt.ok_or(WavError::Truncated)?;
        let data = data.ok_or(WavError::Truncated)?;

        if format_tag != 1 || bits_per_sample != 16 {
            return Err(WavError::UnsupportedFormat);
        }

        let samples = data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();

        Ok(WavPcm16 {
            sample_rate,
            channels,
            samples,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let data_bytes: Vec<u8> = self.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let byte_rate = self.sample_rate * self.channels as u32 * 2;
        let block_align = self.channels * 2;

        let mut out = Vec::with_capacity(44 + data_bytes.len());
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + data_bytes.len()) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&data_bytes);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_round_trip_preserves_data_chunk_bytes() {
        let wav = WavPcm16 {
            sample_rate: 8000,
            channels: 1,
            samples: vec![0, 100, -100, 32767, -32768, 42],
        };
        let bytes = wav.serialize();
        let parsed = WavPcm16::parse(&bytes).unwrap();
        assert_eq!(parsed.sample_rate, 8000);
        assert_eq!(parsed.channels, 1);
        assert_eq!(parsed.samples, wav.samples);
    }

    #[test]
    fn stereo_round_trip_preserves_data_chunk_bytes() {
        let wav = WavPcm16 {
            sample_rate: 16000,
            channels: 2,
            samples: vec![1, -1, 2, -2, 3, -3],
        };
        let bytes = wav.serialize();
        let parsed = WavPcm16::parse(&bytes).unwrap();
        assert_eq!(parsed.channels, 2);
        assert_eq!(parsed.samples, wav.samples);
    }

    #[test]
    fn rejects_non_riff_input() {
        assert!(matches!(WavPcm16::parse(b"not a wav"), Err(WavError::BadMagic)));
    }
}
