//! UDP rendezvous datagrams: `REGISTER:<call_id>` and `BYE:<call_id>`,
//! ASCII, no response (spec §6 "UDP REGISTER (rendezvous)").

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("malformed rendezvous datagram: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousMessage {
    Register(u32),
    Bye(u32),
}

impl RendezvousMessage {
    pub fn parse(datagram: &[u8]) -> Result<RendezvousMessage, Error> {
        let text = std::str::from_utf8(datagram)
            .map_err(|_| Error::Malformed("non-ascii datagram".into()))?;
        let (tag, call_id) = text
            .split_once(':')
            .ok_or_else(|| Error::Malformed(text.to_string()))?;
        let call_id: u32 = call_id
            .trim()
            .parse()
            .map_err(|_| Error::Malformed(format!("bad call id: {call_id}")))?;
        match tag {
            "REGISTER" => Ok(RendezvousMessage::Register(call_id)),
            "BYE" => Ok(RendezvousMessage::Bye(call_id)),
            other => Err(Error::Malformed(format!("unknown tag: {other}"))),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            RendezvousMessage::Register(call_id) => format!("REGISTER:{call_id}").into_bytes(),
            RendezvousMessage::Bye(call_id) => format!("BYE:{call_id}").into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_round_trips() {
        let msg = RendezvousMessage::Register(34);
        let bytes = msg.encode();
        assert_eq!(RendezvousMessage::parse(&bytes).unwrap(), msg);
    }

    #[test]
    fn bye_round_trips() {
        let msg = RendezvousMessage::Bye(34);
        let bytes = msg.encode();
        assert_eq!(RendezvousMessage::parse(&bytes).unwrap(), msg);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(RendezvousMessage::parse(b"PING:34").is_err());
    }
}
