//! Common length-prefixed TCP framing (spec §6 "TCP wire framing"):
//! HELLO, Text, Float PCM, and the TTS audio chunk, all sharing the same
//! `[u32 be length]...` shape and the same BYE sentinel.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub type Result<T> = std::result::Result<T, Error>;

/// `length == 0xFFFFFFFF` terminates any framed stream.
pub const BYE_SENTINEL: u32 = 0xFFFF_FFFF;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("illegal zero-length frame")]
    ZeroLength,
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: u32, max: u32 },
    #[error("frame payload is not valid utf-8")]
    NotUtf8,
    #[error("stream ended with a BYE sentinel")]
    Bye,
}

/// Read a raw length-prefixed payload. `length == 0` is always a protocol
/// error; `length == BYE_SENTINEL` is reported as `Error::Bye`; anything
/// over `max_len` is rejected without reading the body.
pub async fn read_framed<R: AsyncRead + Unpin>(reader: &mut R, max_len: u32) -> Result<Vec<u8>> {
    let len = reader.read_u32().await?;
    if len == BYE_SENTINEL {
        return Err(Error::Bye);
    }
    if len == 0 {
        return Err(Error::ZeroLength);
    }
    if len > max_len {
        return Err(Error::TooLarge { len, max: max_len });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a raw length-prefixed payload. Caller is responsible for
/// serializing writes to the same socket (spec §5 "small per-socket
/// mutex").
pub async fn write_framed<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    Ok(())
}

/// Write the BYE sentinel frame.
pub async fn write_bye<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    writer.write_u32(BYE_SENTINEL).await?;
    Ok(())
}

/// Read the opening HELLO frame and decode it as a UTF-8 call id.
pub async fn read_hello<R: AsyncRead + Unpin>(reader: &mut R, max_len: u32) -> Result<String> {
    let bytes = read_framed(reader, max_len).await?;
    String::from_utf8(bytes).map_err(|_| Error::NotUtf8)
}

/// Write a HELLO frame carrying `call_id` as UTF-8.
pub async fn write_hello<W: AsyncWrite + Unpin>(writer: &mut W, call_id: &str) -> Result<()> {
    write_framed(writer, call_id.as_bytes()).await
}

/// Read a UTF-8 text frame (transcripts, LLM replies).
pub async fn read_text<R: AsyncRead + Unpin>(reader: &mut R, max_len: u32) -> Result<String> {
    let bytes = read_framed(reader, max_len).await?;
    String::from_utf8(bytes).map_err(|_| Error::NotUtf8)
}

/// Write a UTF-8 text frame.
pub async fn write_text<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<()> {
    write_framed(writer, text.as_bytes()).await
}

/// Read a float32-little-endian PCM frame, returning decoded samples.
/// `max_len` is a byte limit, matching the wire length prefix.
pub async fn read_float_pcm<R: AsyncRead + Unpin>(reader: &mut R, max_len: u32) -> Result<Vec<f32>> {
    let bytes = read_framed(reader, max_len).await?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Write samples as a float32-little-endian PCM frame.
pub async fn write_float_pcm<W: AsyncWrite + Unpin>(writer: &mut W, samples: &[f32]) -> Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    write_framed(writer, &bytes).await
}

/// A TTS audio chunk as sent to the outbound processor (spec §4.C).
#[derive(Debug, Clone)]
pub struct TtsChunk {
    pub sample_rate: u32,
    pub chunk_id: u32,
    pub payload: Vec<u8>,
}

impl TtsChunk {
    /// `true` if the payload is float32-LE PCM (a multiple of 4 bytes);
    /// otherwise it's treated as already-encoded µ-law.
    pub fn is_float_pcm(&self) -> bool {
        self.payload.len() % 4 == 0
    }
}

/// Read one `[length][sample_rate][chunk_id][payload]` frame. `length == 0`
/// is the BYE signal for this framing (distinct from the generic
/// `0xFFFFFFFF` sentinel, per spec §4.C: "`length == 0` is BYE").
pub async fn read_tts_chunk<R: AsyncRead + Unpin>(reader: &mut R, max_payload: u32) -> Result<Option<TtsChunk>> {
    let length = reader.read_u32().await?;
    if length == 0 {
        return Ok(None);
    }
    if length > max_payload {
        return Err(Error::TooLarge { len: length, max: max_payload });
    }
    let sample_rate = reader.read_u32().await?;
    let chunk_id = reader.read_u32().await?;
    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Some(TtsChunk {
        sample_rate,
        chunk_id,
        payload,
    }))
}

/// Write a TTS audio chunk frame.
pub async fn write_tts_chunk<W: AsyncWrite + Unpin>(writer: &mut W, chunk: &TtsChunk) -> Result<()> {
    writer.write_u32(chunk.payload.len() as u32).await?;
    writer.write_u32(chunk.sample_rate).await?;
    writer.write_u32(chunk.chunk_id).await?;
    writer.write_all(&chunk.payload).await?;
    Ok(())
}

/// Write the BYE signal for the TTS audio chunk framing (`length == 0`).
pub async fn write_tts_bye<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    writer.write_u32(0).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn hello_round_trips() {
        let (mut a, mut b) = duplex(1024);
        write_hello(&mut a, "34").await.unwrap();
        let got = read_hello(&mut b, 4096).await.unwrap();
        assert_eq!(got, "34");
    }

    #[tokio::test]
    async fn float_pcm_round_trips_without_partial_reads() {
        let (mut a, mut b) = duplex(1 << 20);
        let samples: Vec<f32> = (0..400).map(|i| i as f32 / 400.0).collect();
        write_float_pcm(&mut a, &samples).await.unwrap();
        let got = read_float_pcm(&mut b, 1 << 20).await.unwrap();
        assert_eq!(got, samples);
    }

    #[tokio::test]
    async fn zero_length_is_a_protocol_error() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&0u32.to_be_bytes()).await.unwrap();
        let err = read_framed(&mut b, 4096).await.unwrap_err();
        assert!(matches!(err, Error::ZeroLength));
    }

    #[tokio::test]
    async fn bye_sentinel_is_reported() {
        let (mut a, mut b) = duplex(64);
        write_bye(&mut a).await.unwrap();
        let err = read_framed(&mut b, 4096).await.unwrap_err();
        assert!(matches!(err, Error::Bye));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_without_reading_body() {
        let (mut a, mut b) = duplex(1 << 21);
        let huge = vec![0u8; (10 * 1024 * 1024) + 1];
        a.write_u32(huge.len() as u32).await.unwrap();
        let err = read_framed(&mut b, 10 * 1024 * 1024).await.unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
    }

    #[tokio::test]
    async fn tts_chunk_round_trips() {
        let (mut a, mut b) = duplex(1 << 16);
        let chunk = TtsChunk {
            sample_rate: 16000,
            chunk_id: 7,
            payload: vec![1, 2, 3, 4],
        };
        write_tts_chunk(&mut a, &chunk).await.unwrap();
        let got = read_tts_chunk(&mut b, 1 << 20).await.unwrap().unwrap();
        assert_eq!(got.sample_rate, 16000);
        assert_eq!(got.chunk_id, 7);
        assert_eq!(got.payload, vec![1, 2, 3, 4]);
        assert!(got.is_float_pcm());
    }

    #[tokio::test]
    async fn tts_chunk_zero_length_is_bye() {
        let (mut a, mut b) = duplex(64);
        write_tts_bye(&mut a).await.unwrap();
        let got = read_tts_chunk(&mut b, 1 << 20).await.unwrap();
        assert!(got.is_none());
    }
}
