//! UDP REGISTER listener at a fixed port shared by every call (spec §6
//! "UDP 13000 (STT worker's listener)"). Each REGISTER spins up the
//! per-call TCP listener the inbound processor then dials.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{info, warn};
use vox_core::ports::STT_REGISTER_PORT;
use vox_wire::rendezvous::RendezvousMessage;

use crate::session;
use crate::state::{SessionEntry, SttState};

pub async fn run(state: Arc<SttState>) {
    let socket = match UdpSocket::bind(("0.0.0.0", STT_REGISTER_PORT)).await {
        Ok(s) => s,
        Err(e) => {
            warn!(port = STT_REGISTER_PORT, error = %e, "failed binding STT rendezvous socket");
            return;
        }
    };
    info!(port = STT_REGISTER_PORT, "STT rendezvous listener bound");

    let mut buf = vec![0u8; 256];
    loop {
        let (len, _src) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "STT rendezvous recv error");
                continue;
            }
        };
        match RendezvousMessage::parse(&buf[..len]) {
            Ok(RendezvousMessage::Register(call_id)) => {
                if state.sessions.contains_key(&call_id) {
                    continue;
                }
                let last_activity = Arc::new(Mutex::new(Instant::now()));
                let recognizer = state.recognizer.clone();
                let store = state.store.clone();
                let llm_addr = state.llm_addr.clone();
                let session_last_activity = last_activity.clone();
                let cleanup_state = state.clone();
                let handle = tokio::spawn(async move {
                    session::run(call_id, recognizer, store, llm_addr, session_last_activity).await;
                    cleanup_state.sessions.remove(&call_id);
                });
                state.sessions.insert(call_id, SessionEntry { last_activity, handle });
            }
            Ok(RendezvousMessage::Bye(call_id)) => {
                if let Some((_, entry)) = state.sessions.remove(&call_id) {
                    entry.handle.abort();
                }
            }
            Err(e) => warn!(error = %e, "malformed STT rendezvous datagram"),
        }
    }
}
