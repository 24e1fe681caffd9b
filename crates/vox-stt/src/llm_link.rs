//! Outward TCP connection to the LLM worker for one call (spec §4.D
//! "LLM TCP"). The generic wire framing carries a single HELLO at the
//! start of a connection, so each call gets its own dedicated, lazily
//! opened connection rather than multiplexing several calls' HELLOs
//! onto one shared socket (see DESIGN.md for this Open Question's
//! resolution).

use tokio::net::TcpStream;
use tracing::warn;
use vox_wire::frame;

pub struct LlmLink {
    addr: (String, u16),
    call_id: u32,
    stream: Option<TcpStream>,
}

impl LlmLink {
    pub fn new(addr: (String, u16), call_id: u32) -> Self {
        LlmLink {
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
                    warn!(call_id = self.call_id, error = %e, "failed sending HELLO to LLM");
                    return false;
                }
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                warn!(call_id = self.call_id, addr = ?self.addr, error = %e, "failed connecting to LLM");
                false
            }
        }
    }

    /// Forward one transcript segment. Connection errors drop the
    /// connection so the next call retries from a clean HELLO.
    pub async fn send_transcript(&mut self, text: &str) {
        if !self.ensure_connected().await {
            return;
        }
        let stream = self.stream.as_mut().expect("connected above");
        if let Err(e) = frame::write_text(stream, text).await {
            warn!(call_id = self.call_id, error = %e, "failed forwarding transcript to LLM");
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
