//! The per-process µ-law FIFO that absorbs bursty TTS chunks between
//! scheduler ticks, plus the TTS chunk-id de-duplication gate (spec §4.C
//! "Convert-and-enqueue", "Backpressure").

use std::collections::VecDeque;

use tracing::warn;

pub const FRAME_BYTES: usize = 160;
/// ~12 seconds of 8 kHz µ-law audio (spec §4.C "Backpressure").
pub const CAP_BYTES: usize = 600 * FRAME_BYTES;

pub struct OutboundFifo {
    buf: VecDeque<u8>,
    last_chunk_id: Option<u32>,
}

impl OutboundFifo {
    pub fn new() -> Self {
        OutboundFifo {
            buf: VecDeque::with_capacity(CAP_BYTES),
            last_chunk_id: None,
        }
    }

    /// `true` if `chunk_id` is strictly greater than the last accepted id
    /// for this call (spec §8 property 5); accepting it also records it.
    pub fn accept_chunk_id(&mut self, chunk_id: u32) -> bool {
        if let Some(last) = self.last_chunk_id {
            if chunk_id <= last {
                return false;
            }
        }
        self.last_chunk_id = Some(chunk_id);
        true
    }

    /// Append µ-law bytes, trimming the oldest bytes if this would exceed
    /// the 12 s cap (spec §4.C "on insert that would exceed the cap, the
    /// oldest bytes are trimmed to fit").
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().copied());
        if self.buf.len() > CAP_BYTES {
            let overflow = self.buf.len() - CAP_BYTES;
            warn!(overflow, "outbound FIFO over cap, trimming oldest bytes");
            self.buf.drain(0..overflow);
        }
    }

    /// Take exactly one 160-byte frame if available.
    pub fn take_frame(&mut self) -> Option<Vec<u8>> {
        if self.buf.len() < FRAME_BYTES {
            return None;
        }
        Some(self.buf.drain(0..FRAME_BYTES).collect())
    }
}

impl Default for OutboundFifo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_stale_chunk_ids_are_rejected() {
        let mut fifo = OutboundFifo::new();
        assert!(fifo.accept_chunk_id(1));
        assert!(fifo.accept_chunk_id(2));
        assert!(!fifo.accept_chunk_id(2)); // duplicate
        assert!(fifo.accept_chunk_id(3));
        assert!(!fifo.accept_chunk_id(1)); // stale
    }

    #[test]
    fn overflow_trims_oldest_bytes_first() {
        let mut fifo = OutboundFifo::new();
        fifo.push(&vec![1u8; CAP_BYTES]);
        fifo.push(&[2, 2, 2]);
        assert_eq!(fifo.buf.len(), CAP_BYTES);
        assert_eq!(fifo.buf.back(), Some(&2));
    }

    #[test]
    fn take_frame_requires_full_frame() {
        let mut fifo = OutboundFifo::new();
        fifo.push(&[0u8; FRAME_BYTES - 1]);
        assert!(fifo.take_frame().is_none());
        fifo.push(&[0u8; 1]);
        assert!(fifo.take_frame().is_some());
    }
}
