use std::net::SocketAddr;

use rand::Rng;

use crate::header::RtpHeader;

/// Per-call RTP send state (spec §3 "RTP send state"). Sequence increments
/// by 1 and timestamp by 160 per 20 ms packet; the peer address is only
/// known once symmetric RTP has pinned it from the first inbound packet.
pub struct RtpSendState {
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
    peer: Option<SocketAddr>,
}

impl RtpSendState {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        RtpSendState {
            sequence: rng.gen(),
            timestamp: rng.gen(),
            ssrc: rng.gen(),
            peer: None,
        }
    }

    /// Pin the destination from the first inbound packet. Subsequent calls
    /// are no-ops — the peer address never moves mid-call.
    pub fn pin_peer(&mut self, addr: SocketAddr) {
        if self.peer.is_none() {
            self.peer = Some(addr);
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Build the next outgoing RTP packet for a 160-byte (20 ms @ 8 kHz)
    /// PCMU frame, advancing sequence/timestamp. Returns `None` if the
    /// peer address hasn't been pinned yet — callers must not send before
    /// the first inbound packet arrives.
    pub fn next_packet(&mut self, payload_type: u8, payload: &[u8]) -> Option<(SocketAddr, Vec<u8>)> {
        let peer = self.peer?;
        let header = RtpHeader {
            payload_type,
            sequence: self.sequence,
            timestamp: self.timestamp,
            ssrc: self.ssrc,
        };
        let mut out = Vec::new();
        header.encode(payload, &mut out);

        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(160);

        Some((peer, out))
    }
}

impl Default for RtpSendState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_packet_emitted_before_peer_pinned() {
        let mut state = RtpSendState::new();
        assert!(state.next_packet(0, &[0u8; 160]).is_none());
    }

    #[test]
    fn sequence_and_timestamp_advance_monotonically() {
        let mut state = RtpSendState::new();
        let addr: SocketAddr = "127.0.0.1:5060".parse().unwrap();
        state.pin_peer(addr);

        let (_, p1) = state.next_packet(0, &[0u8; 160]).unwrap();
        let (_, p2) = state.next_packet(0, &[0u8; 160]).unwrap();

        let (h1, _) = RtpHeader::parse(&p1).unwrap();
        let (h2, _) = RtpHeader::parse(&p2).unwrap();

        assert_eq!(h2.sequence, h1.sequence.wrapping_add(1));
        assert_eq!(h2.timestamp, h1.timestamp.wrapping_add(160));
    }

    #[test]
    fn peer_address_pins_once_and_does_not_move() {
        let mut state = RtpSendState::new();
        let a: SocketAddr = "127.0.0.1:1000".parse().unwrap();
        let b: SocketAddr = "127.0.0.1:2000".parse().unwrap();
        state.pin_peer(a);
        state.pin_peer(b);
        assert_eq!(state.peer(), Some(a));
    }
}
