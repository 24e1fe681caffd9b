//! Process-wide owning structure for the gateway's mutable state
//! (DESIGN.md: "model this as a single owning structure accessed through
//! explicit handles; do not scatter atomics for the same conceptual
//! field").

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use vox_core::config::SipLineConfig;
use vox_core::{CallId, LineId};
use vox_store::{LineStatus, Store};

use crate::call::CallSession;

/// Runtime bookkeeping for one configured SIP line, layered on top of its
/// static config.
pub struct LineRuntime {
    pub config: SipLineConfig,
    pub status: Mutex<LineStatus>,
    /// Call-ID reused across a REGISTER/challenge/re-REGISTER sequence.
    pub register_call_id: Mutex<String>,
    pub cseq: std::sync::atomic::AtomicU32,
    pub auth_failures: std::sync::atomic::AtomicU32,
}

impl LineRuntime {
    pub fn new(config: SipLineConfig) -> Self {
        LineRuntime {
            config,
            status: Mutex::new(LineStatus::Disconnected),
            register_call_id: Mutex::new(String::new()),
            cseq: std::sync::atomic::AtomicU32::new(0),
            auth_failures: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn next_cseq(&self) -> u32 {
        self.cseq.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
    }
}

pub struct GatewayState {
    pub local_ip: String,
    pub store: Arc<Store>,
    pub lines: DashMap<LineId, Arc<LineRuntime>>,
    pub calls: DashMap<CallId, Arc<Mutex<CallSession>>>,
    /// Maps the opaque SIP `Call-ID` header to the numeric routing key, so
    /// in-dialog requests (ACK/BYE) can find the session (spec §9
    /// "Session across processes").
    pub sip_call_id_index: DashMap<String, CallId>,
    pub inbound_control_path: String,
    pub outbound_control_path: String,
}

impl GatewayState {
    pub fn new(
        local_ip: String,
        store: Arc<Store>,
        lines: Vec<SipLineConfig>,
        inbound_control_path: String,
        outbound_control_path: String,
    ) -> Self {
        let map = DashMap::new();
        for line in lines {
            map.insert(LineId(line.line_id), Arc::new(LineRuntime::new(line)));
        }
        GatewayState {
            local_ip,
            store,
            lines: map,
            calls: DashMap::new(),
            sip_call_id_index: DashMap::new(),
            inbound_control_path,
            outbound_control_path,
        }
    }

    pub fn find_call_by_sip_id(&self, sip_call_id: &str) -> Option<Arc<Mutex<CallSession>>> {
        let call_id = *self.sip_call_id_index.get(sip_call_id)?;
        self.calls.get(&call_id).map(|e| e.value().clone())
    }

    pub fn remove_call(&self, call_id: CallId, sip_call_id: &str) {
        self.calls.remove(&call_id);
        self.sip_call_id_index.remove(sip_call_id);
    }

    /// Find which configured line has an in-flight REGISTER whose
    /// `Call-ID` matches an incoming response, so it can be routed back
    /// to the waiting `register_once` task.
    pub fn find_line_by_register_call_id(&self, sip_call_id: &str) -> Option<LineId> {
        self.lines
            .iter()
            .find(|e| *e.value().register_call_id.lock() == sip_call_id)
            .map(|e| *e.key())
    }
}
