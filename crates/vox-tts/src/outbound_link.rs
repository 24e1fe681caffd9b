//! Per-call listener and connection to the outbound processor (spec
//! §4.C "dial TCP 127.0.0.1:9002 + call_id where the TTS worker is
//! listening"; spec §6 "UDP REGISTER ... or UDP 13000 + call_id
//! (outbound processor's listener)"). TTS is the listener side here:
//! it binds first, announces readiness, then accepts the outbound
//! processor's dial-in.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tracing::{info, warn};
use vox_core::ports::{outbound_register_port, tts_outbound_listen_port};
use vox_core::CallId;
use vox_wire::frame::{self, TtsChunk};
use vox_wire::rendezvous::RendezvousMessage;

const SAMPLE_RATE: u32 = 16000;
const HELLO_MAX_LEN: u32 = 4096;

pub struct OutboundLink {
    call_id: u32,
    stream: Mutex<Option<TcpStream>>,
    next_chunk_id: AtomicU32,
}

impl OutboundLink {
    pub fn new(call_id: u32) -> Self {
        OutboundLink {
            call_id,
            stream: Mutex::new(None),
            next_chunk_id: AtomicU32::new(1),
        }
    }

    /// Bind the per-call listener, announce via rendezvous, and accept
    /// the outbound processor's connection. Idempotent: a second call
    /// while already connected is a no-op.
    pub async fn ensure_connected(&self) {
        if self.stream.lock().await.is_some() {
            return;
        }

        let listen_port = tts_outbound_listen_port(CallId(self.call_id));
        let listener = match TcpListener::bind(("127.0.0.1", listen_port)).await {
            Ok(l) => l,
            Err(e) => {
                warn!(call_id = self.call_id, listen_port, error = %e, "failed binding TTS per-call listener");
                return;
            }
        };

        let announce = match UdpSocket::bind("0.0.0.0:0").await {
            Ok(s) => s,
            Err(e) => {
                warn!(call_id = self.call_id, error = %e, "failed binding rendezvous announce socket");
                return;
            }
        };
        let register_port = outbound_register_port(CallId(self.call_id));
        let datagram = RendezvousMessage::Register(self.call_id).encode();
        if let Err(e) = announce.send_to(&datagram, ("127.0.0.1", register_port)).await {
            warn!(call_id = self.call_id, error = %e, "failed announcing TTS readiness to outbound");
            return;
        }

        let (mut stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(call_id = self.call_id, error = %e, "outbound processor did not connect");
                return;
            }
        };
        match frame::read_hello(&mut stream, HELLO_MAX_LEN).await {
            Ok(_) => {}
            Err(e) => {
                warn!(call_id = self.call_id, error = %e, "HELLO read failed from outbound processor");
                return;
            }
        }

        info!(call_id = self.call_id, "outbound processor connected");
        *self.stream.lock().await = Some(stream);
    }

    pub async fn send_audio(&self, samples: &[f32]) {
        self.ensure_connected().await;
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return;
        };
        let chunk_id = self.next_chunk_id.fetch_add(1, Ordering::SeqCst);
        let mut payload = Vec::with_capacity(samples.len() * 4);
        for s in samples {
            payload.extend_from_slice(&s.to_le_bytes());
        }
        let chunk = TtsChunk {
            sample_rate: SAMPLE_RATE,
            chunk_id,
            payload,
        };
        if let Err(e) = frame::write_tts_chunk(stream, &chunk).await {
            warn!(call_id = self.call_id, error = %e, "failed streaming audio to outbound processor");
            *guard = None;
        }
    }
}
