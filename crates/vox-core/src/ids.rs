use std::fmt;

/// Numeric call id: the sole key used to derive every per-call port and
/// channel name. Always the database row id of the `calls` table, never the
/// opaque SIP `Call-ID` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(pub u32);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CallId {
    fn from(v: u32) -> Self {
        CallId(v)
    }
}

/// SIP line identifier; determines the RTP listen port offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LineId {
    fn from(v: u32) -> Self {
        LineId(v)
    }
}
