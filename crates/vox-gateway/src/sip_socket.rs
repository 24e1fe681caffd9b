//! The single UDP socket used for both REGISTER egress and SIP ingress.
//! Source-port stability matters here: the PBX replies to the same
//! 4-tuple for the life of the process (spec §4.A "Start(lines)").

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use vox_core::LineId;
use vox_sip::Message;

/// A one-second receive timeout lets the recv loop observe `running ==
/// false` promptly on shutdown (spec §5 "Cancellation and timeouts").
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

pub struct SipSocket {
    socket: UdpSocket,
    pub running: AtomicBool,
    /// Responses to an in-flight REGISTER are routed back to the waiting
    /// `RegisterLine` call via a one-shot channel, keyed by line.
    pending_register: DashMap<LineId, oneshot::Sender<Message>>,
}

impl SipSocket {
    pub async fn bind(local_addr: SocketAddr) -> std::io::Result<Arc<SipSocket>> {
        let socket = UdpSocket::bind(local_addr).await?;
        Ok(Arc::new(SipSocket {
            socket,
            running: AtomicBool::new(true),
            pending_register: DashMap::new(),
        }))
    }

    pub fn local_port(&self) -> u16 {
        self.socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or_default()
    }

    pub async fn send_to(&self, msg: &Message, dest: SocketAddr) {
        let bytes = msg.to_bytes();
        if let Err(e) = self.socket.send_to(&bytes, dest).await {
            warn!(%dest, error = %e, "failed sending SIP datagram");
        }
    }

    /// Register interest in the next response routed to this line, then
    /// wait up to 5 seconds (spec §5 "REGISTER response uses a 5-second
    /// condition-variable wait, then fails the attempt").
    pub fn await_register_response(&self, line: LineId) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.pending_register.insert(line, tx);
        rx
    }

    pub const REGISTER_WAIT: Duration = Duration::from_secs(5);

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Receive one datagram, or `None` on timeout/shutdown. Callers loop
    /// this and dispatch by message kind.
    pub async fn recv_one(&self) -> Option<(Message, SocketAddr)> {
        let mut buf = vec![0u8; 4096];
        let recv = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf)).await;
        let (len, src) = match recv {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!(error = %e, "SIP socket recv error");
                return None;
            }
            Err(_) => return None, // timeout: give the caller a chance to check `running`
        };
        buf.truncate(len);
        match Message::parse(&buf) {
            Ok(msg) => Some((msg, src)),
            Err(e) => {
                debug!(error = %e, "dropping malformed SIP datagram");
                None
            }
        }
    }

    /// Route a response to a waiting REGISTER, if there's a line (derived
    /// by the caller from `CSeq`/`Call-ID` bookkeeping) expecting one.
    pub fn complete_register(&self, line: LineId, msg: Message) {
        if let Some((_, tx)) = self.pending_register.remove(&line) {
            let _ = tx.send(msg);
        }
    }
}
