//! A deliberately small SIP 2.0 message model: just enough of RFC 3261 to
//! drive REGISTER / INVITE / ACK / BYE / NOTIFY over UDP (spec §4.A, §6).
//! No proxying, no TLS, no IPv6 — see spec.md Non-goals.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Register,
    Invite,
    Ack,
    Bye,
    Cancel,
    Options,
    Notify,
    Other(String),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Register => "REGISTER",
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Options => "OPTIONS",
            Method::Notify => "NOTIFY",
            Method::Other(s) => s,
        };
        write!(f, "{s}")
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "REGISTER" => Method::Register,
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "OPTIONS" => Method::Options,
            "NOTIFY" => Method::Notify,
            other => Method::Other(other.to_string()),
        }
    }
}

/// Ordered, case-insensitive-lookup header list. SIP allows repeated
/// headers (e.g. `Via`), so this is not a map.
#[derive(Debug, Clone, Default)]
pub struct Headers(pub Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace the first header matching `name` (dropping any others with
    /// the same name), or append if none exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.0.push((name, value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Request {
        method: Method,
        uri: String,
        headers: Headers,
        body: Vec<u8>,
    },
    Response {
        status: u16,
        reason: String,
        headers: Headers,
        body: Vec<u8>,
    },
}

impl Message {
    pub fn headers(&self) -> &Headers {
        match self {
            Message::Request { headers, .. } => headers,
            Message::Response { headers, .. } => headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            Message::Request { headers, .. } => headers,
            Message::Response { headers, .. } => headers,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        self.headers().get("Call-ID")
    }

    pub fn cseq(&self) -> Option<(u32, Method)> {
        let raw = self.headers().get("CSeq")?;
        let mut parts = raw.split_whitespace();
        let seq: u32 = parts.next()?.parse().ok()?;
        let method = Method::from(parts.next()?);
        Some((seq, method))
    }

    /// Parse a raw datagram payload into a SIP message.
    pub fn parse(raw: &[u8]) -> Result<Message> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::Malformed(format!("non-utf8 message: {e}")))?;

        let split_at = text
            .find("\r\n\r\n")
            .ok_or_else(|| Error::Malformed("no header/body separator".into()))?;
        let head = &text[..split_at];
        let body_start = split_at + 4;
        let body = raw[body_start.min(raw.len())..].to_vec();

        let mut lines = head.split("\r\n");
        let start_line = lines
            .next()
            .ok_or_else(|| Error::Malformed("empty message".into()))?;

        let mut headers = Headers::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Malformed(format!("malformed header line: {line}")))?;
            headers.push(name.trim(), value.trim());
        }

        if let Some(rest) = start_line.strip_prefix("SIP/2.0 ") {
            let (code, reason) = rest
                .split_once(' ')
                .unwrap_or((rest.trim_end(), ""));
            let status: u16 = code
                .parse()
                .map_err(|_| Error::Malformed(format!("bad status code: {code}")))?;
            return Ok(Message::Response {
                status,
                reason: reason.to_string(),
                headers,
                body,
            });
        }

        let mut parts = start_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| Error::Malformed("missing method".into()))?;
        let uri = parts
            .next()
            .ok_or_else(|| Error::Malformed("missing request-uri".into()))?;
        Ok(Message::Request {
            method: Method::from(method),
            uri: uri.to_string(),
            headers,
            body,
        })
    }

    /// Serialize to wire bytes, filling in Content-Length.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        match self {
            Message::Request { method, uri, .. } => {
                out.push_str(&format!("{method} {uri} SIP/2.0\r\n"));
            }
            Message::Response { status, reason, .. } => {
                out.push_str(&format!("SIP/2.0 {status} {reason}\r\n"));
            }
        }
        for (name, value) in &self.headers().0 {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        let body = match self {
            Message::Request { body, .. } => body,
            Message::Response { body, .. } => body,
        };
        out.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(body);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_invite_request_line_and_headers() {
        let raw = b"INVITE sip:1001@local SIP/2.0\r\n\
Call-ID: A@pbx\r\n\
From: <sip:+15551234567@pbx>;tag=1\r\n\
To: <sip:1001@local>\r\n\
CSeq: 1 INVITE\r\n\
Content-Length: 0\r\n\r\n";
        let msg = Message::parse(raw).unwrap();
        match &msg {
            Message::Request { method, uri, .. } => {
                assert_eq!(*method, Method::Invite);
                assert_eq!(uri, "sip:1001@local");
            }
            _ => panic!("expected request"),
        }
        assert_eq!(msg.call_id(), Some("A@pbx"));
        assert_eq!(msg.cseq(), Some((1, Method::Invite)));
    }

    #[test]
    fn parses_response_status_line() {
        let raw = b"SIP/2.0 401 Unauthorized\r\nCall-ID: x\r\nContent-Length: 0\r\n\r\n";
        let msg = Message::parse(raw).unwrap();
        match msg {
            Message::Response { status, .. } => assert_eq!(status, 401),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let mut headers = Headers::new();
        headers.push("Call-ID", "abc").push("CSeq", "2 BYE");
        let msg = Message::Request {
            method: Method::Bye,
            uri: "sip:1001@local".into(),
            headers,
            body: Vec::new(),
        };
        let bytes = msg.to_bytes();
        let parsed = Message::parse(&bytes).unwrap();
        assert_eq!(parsed.call_id(), Some("abc"));
    }
}
