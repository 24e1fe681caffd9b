use thiserror::Error;

pub const HEADER_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum Error {
    #[error("RTP packet shorter than the 12-byte header")]
    Truncated,
    #[error("unsupported RTP version {0}")]
    UnsupportedVersion(u8),
}

/// A parsed RTP version-2 header, with padding/extension/CSRC assumed
/// absent (spec §6: "Version 2, no padding/extension/CSRC").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    pub fn parse(packet: &[u8]) -> Result<(RtpHeader, &[u8]), Error> {
        if packet.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }
        let version = packet[0] >> 6;
        if version != 2 {
            return Err(Error::UnsupportedVersion(version));
        }
        let payload_type = packet[1] & 0x7F;
        let sequence = u16::from_be_bytes([packet[2], packet[3]]);
        let timestamp = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
        let ssrc = u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]);

        Ok((
            RtpHeader {
                payload_type,
                sequence,
                timestamp,
                ssrc,
            },
            &packet[HEADER_LEN..],
        ))
    }

    /// Serialize the 12-byte header followed by `payload`.
    pub fn encode(&self, payload: &[u8], out: &mut Vec<u8>) {
        out.clear();
        out.reserve(HEADER_LEN + payload.len());
        out.push(0x80); // version 2, no padding, no extension, no CSRC
        out.push(self.payload_type & 0x7F);
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.ssrc.to_be_bytes());
        out.extend_from_slice(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_parse_round_trips_fields() {
        let header = RtpHeader {
            payload_type: 0,
            sequence: 1234,
            timestamp: 987_654,
            ssrc: 0xdead_beef,
        };
        let mut buf = Vec::new();
        header.encode(&[1, 2, 3], &mut buf);
        assert_eq!(buf.len(), HEADER_LEN + 3);

        let (parsed, payload) = RtpHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn rejects_truncated_packet() {
        assert!(matches!(RtpHeader::parse(&[0x80, 0, 0]), Err(Error::Truncated)));
    }
}
