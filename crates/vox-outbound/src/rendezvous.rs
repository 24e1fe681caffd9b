//! UDP REGISTER listener: the downstream TTS worker announces it's ready
//! to stream audio for this call (spec §4.C "RegisterListener",
//! "On REGISTER(call_id) received").

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{info, warn};
use vox_core::ports::outbound_register_port;
use vox_core::CallId;
use vox_wire::rendezvous::RendezvousMessage;

use crate::fifo::OutboundFifo;
use crate::tts_link;

pub async fn run(
    call_id: u32,
    fifo: Arc<Mutex<OutboundFifo>>,
    tts_connected: Arc<AtomicBool>,
    mut cancel: watch::Receiver<bool>,
) {
    let port = outbound_register_port(CallId(call_id));
    let socket = match UdpSocket::bind(("0.0.0.0", port)).await {
        Ok(s) => s,
        Err(e) => {
            warn!(call_id, port, error = %e, "failed binding rendezvous socket");
            return;
        }
    };
    info!(call_id, port, "rendezvous listener bound");

    let mut buf = vec![0u8; 256];
    loop {
        let recv = tokio::select! {
            r = socket.recv_from(&mut buf) => r,
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return;
                }
                continue;
            }
        };
        let (len, _src) = match recv {
            Ok(pair) => pair,
            Err(e) => {
                warn!(call_id, error = %e, "rendezvous recv error");
                continue;
            }
        };
        match RendezvousMessage::parse(&buf[..len]) {
            Ok(RendezvousMessage::Register(id)) if id == call_id => {
                let fifo = fifo.clone();
                let tts_connected = tts_connected.clone();
                tokio::spawn(tts_link::connect_and_stream(call_id, fifo, tts_connected));
            }
            Ok(RendezvousMessage::Bye(id)) if id == call_id => {
                info!(call_id, "rendezvous BYE received");
            }
            Ok(_) => {} // rendezvous for a different call id, not ours
            Err(e) => warn!(call_id, error = %e, "malformed rendezvous datagram"),
        }
    }
}
