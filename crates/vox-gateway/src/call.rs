//! Per-call state machine: `Idle -> Ringing -> Establishing -> Active ->
//! Terminating -> Idle` (spec §4.A "State machine per call").

use std::net::SocketAddr;

use vox_core::{CallId, LineId};
use vox_rtp::RtpSendState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Ringing,
    Establishing,
    Active,
    Terminating,
}

/// Everything the gateway owns for one call, moved into the per-call task
/// and dropped on teardown (DESIGN.md: per-call data owned by a struct
/// moved into the per-call task, not scattered atomics).
pub struct CallSession {
    pub call_id: CallId,
    pub line_id: LineId,
    pub sip_call_id: String,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    pub remote_sip_addr: SocketAddr,
    pub db_row_id: i64,
    pub rtp_port: u16,
    pub state: CallState,
    pub rtp_send: RtpSendState,
    pub tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl CallSession {
    pub fn new(
        call_id: CallId,
        line_id: LineId,
        sip_call_id: String,
        remote_sip_addr: SocketAddr,
        db_row_id: i64,
        rtp_port: u16,
    ) -> Self {
        CallSession {
            call_id,
            line_id,
            sip_call_id,
            from_tag: None,
            to_tag: None,
            remote_sip_addr,
            db_row_id,
            rtp_port,
            state: CallState::Ringing,
            rtp_send: RtpSendState::new(),
            tasks: Vec::new(),
        }
    }

    /// Advance the FSM, rejecting transitions the spec doesn't name.
    pub fn transition(&mut self, next: CallState) -> bool {
        let allowed = matches!(
            (self.state, next),
            (CallState::Idle, CallState::Ringing)
                | (CallState::Ringing, CallState::Establishing)
                | (CallState::Establishing, CallState::Active)
                | (CallState::Ringing, CallState::Terminating)
                | (CallState::Establishing, CallState::Terminating)
                | (CallState::Active, CallState::Terminating)
                | (CallState::Terminating, CallState::Idle)
        );
        if allowed {
            self.state = next;
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CallSession {
        CallSession::new(
            CallId(1),
            LineId(1),
            "A@pbx".into(),
            "10.0.0.5:5060".parse().unwrap(),
            1,
            10001,
        )
    }

    #[test]
    fn full_lifecycle_transitions_in_order() {
        let mut call = session();
        assert!(call.transition(CallState::Establishing));
        assert!(call.transition(CallState::Active));
        assert!(call.transition(CallState::Terminating));
        assert!(call.transition(CallState::Idle));
    }

    #[test]
    fn cannot_skip_establishing() {
        let mut call = session();
        assert!(!call.transition(CallState::Active));
        assert_eq!(call.state, CallState::Ringing);
    }
}
