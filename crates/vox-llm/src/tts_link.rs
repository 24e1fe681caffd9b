//! Outward TCP connection to the TTS worker for one call (spec §4.E
//! "opening an outward TCP connection to the downstream TTS endpoint
//! and writing the same length-prefixed framing (HELLO once per
//! call)").

use tokio::net::TcpStream;
use tracing::warn;
use vox_wire::frame;

pub struct TtsLink {
    addr: (String, u16),
    call_id: u32,
    stream: Option<TcpStream>,
}

impl TtsLink {
    pub fn new(addr: (String, u16), call_id: u32) -> Self {
        TtsLink {
            addr,
            call_id,
            stream: None,
        }
    }

    async fn ensure_connected(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }
        match TcpStream::connect((self.addr.0.as_str(), self.addr.1)).await {
            Ok(mut stream) => {
                if let Err(e) = frame::write_hello(&mut stream, &self.call_id.to_string()).await {
                    warn!(call_id = self.call_id, error = %e, "failed sending HELLO to TTS");
                    return false;
                }
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                warn!(call_id = self.call_id, addr = ?self.addr, error = %e, "failed connecting to TTS");
                false
            }
        }
    }

    pub async fn send_text(&mut self, text: &str) {
        if !self.ensure_connected().await {
            return;
        }
        let stream = self.stream.as_mut().expect("connected above");
        if let Err(e) = frame::write_text(stream, text).await {
            warn!(call_id = self.call_id, error = %e, "failed forwarding reply to TTS");
            self.stream = None;
        }
    }

    pub async fn close(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            let _ = frame::write_bye(stream).await;
        }
        self.stream = None;
    }
}
