//! The per-process control socket command protocol: `ACTIVATE <call_id>`,
//! `DEACTIVATE`, `SHUTDOWN` (spec §4.B/§4.C "Control interface", §6
//! "Control socket").

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("unrecognized control command: {0}")]
    Unrecognized(String),
    #[error("ACTIVATE requires a numeric call id")]
    BadCallId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Activate(u32),
    Deactivate,
    Shutdown,
}

impl ControlCommand {
    /// Parse one line of control-socket input (newline already stripped).
    pub fn parse(line: &str) -> Result<ControlCommand, Error> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("ACTIVATE") {
            let call_id: u32 = rest
                .trim()
                .parse()
                .map_err(|_| Error::BadCallId)?;
            return Ok(ControlCommand::Activate(call_id));
        }
        match line {
            "DEACTIVATE" => Ok(ControlCommand::Deactivate),
            "SHUTDOWN" => Ok(ControlCommand::Shutdown),
            other => Err(Error::Unrecognized(other.to_string())),
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            ControlCommand::Activate(call_id) => format!("ACTIVATE {call_id}"),
            ControlCommand::Deactivate => "DEACTIVATE".to_string(),
            ControlCommand::Shutdown => "SHUTDOWN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_activate_with_call_id() {
        assert_eq!(
            ControlCommand::parse("ACTIVATE 34").unwrap(),
            ControlCommand::Activate(34)
        );
    }

    #[test]
    fn parses_deactivate_and_shutdown() {
        assert_eq!(ControlCommand::parse("DEACTIVATE").unwrap(), ControlCommand::Deactivate);
        assert_eq!(ControlCommand::parse("SHUTDOWN").unwrap(), ControlCommand::Shutdown);
    }

    #[test]
    fn rejects_malformed_activate() {
        assert_eq!(ControlCommand::parse("ACTIVATE abc"), Err(Error::BadCallId));
    }

    #[test]
    fn round_trips_through_to_line() {
        let cmd = ControlCommand::Activate(7);
        assert_eq!(ControlCommand::parse(&cmd.to_line()).unwrap(), cmd);
    }
}
