//! One per-call recognition session: accept the inbound processor's
//! connection, read HELLO, then the float PCM frame loop, forwarding
//! non-empty transcripts to persistence and to the LLM worker (spec
//! §4.D "Frame loop").

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{info, warn};
use vox_store::Store;
use vox_wire::frame;

use crate::llm_link::LlmLink;
use crate::recognizer::Recognizer;

const HELLO_MAX_LEN: u32 = 4096;
const FRAME_MAX_LEN: u32 = 2_000_000;

pub async fn run(
    call_id: u32,
    recognizer: Arc<Mutex<dyn Recognizer>>,
    store: Arc<Store>,
    llm_addr: (String, u16),
    last_activity: Arc<Mutex<Instant>>,
) {
    let port = vox_core::ports::stt_listen_port(vox_core::CallId(call_id));
    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(l) => l,
        Err(e) => {
            warn!(call_id, port, error = %e, "failed binding STT per-call listener");
            return;
        }
    };

    let (mut stream, _) = match listener.accept().await {
        Ok(pair) => pair,
        Err(e) => {
            warn!(call_id, error = %e, "STT accept failed");
            return;
        }
    };

    match frame::read_hello(&mut stream, HELLO_MAX_LEN).await {
        Ok(hello_id) if hello_id == call_id.to_string() => {}
        Ok(other) => {
            warn!(call_id, got = %other, "HELLO call id mismatch");
            return;
        }
        Err(e) => {
            warn!(call_id, error = %e, "HELLO read failed");
            return;
        }
    }

    info!(call_id, "STT session established");
    let mut llm = LlmLink::new(llm_addr, call_id);

    loop {
        *last_activity.lock() = Instant::now();
        match frame::read_float_pcm(&mut stream, FRAME_MAX_LEN).await {
            Ok(samples) => {
                let transcript = recognizer.lock().recognize(&samples);
                if transcript.is_empty() {
                    continue;
                }
                if let Err(e) = store.append_transcription(call_id as i64, &transcript) {
                    warn!(call_id, error = %e, "failed persisting transcript");
                }
                llm.send_transcript(&transcript).await;
            }
            Err(vox_wire::frame::Error::Bye) => {
                info!(call_id, "inbound processor sent BYE");
                break;
            }
            Err(e) => {
                warn!(call_id, error = %e, "STT frame read error, ending session");
                break;
            }
        }
    }

    llm.close().await;
}
