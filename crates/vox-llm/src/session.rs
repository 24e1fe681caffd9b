//! One per-call LLM connection: HELLO, then a transcript-in/reply-out
//! loop, then BYE (spec §4.E "Per-connection protocol identical to
//! STT->LLM above").

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tracing::{info, warn};
use vox_store::Store;
use vox_wire::frame;

use crate::generator::Generator;
use crate::tts_link::TtsLink;

const HELLO_MAX_LEN: u32 = 4096;
const TEXT_MAX_LEN: u32 = 1 << 20;

pub async fn run(
    mut stream: TcpStream,
    generator: Arc<Mutex<dyn Generator>>,
    store: Arc<Store>,
    tts_addr: (String, u16),
) {
    let call_id: u32 = match frame::read_hello(&mut stream, HELLO_MAX_LEN).await {
        Ok(id_str) => match id_str.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(hello = %id_str, "non-numeric call id in LLM HELLO");
                return;
            }
        },
        Err(e) => {
            warn!(error = %e, "HELLO read failed on LLM connection");
            return;
        }
    };

    info!(call_id, "LLM session established");
    let mut tts = TtsLink::new(tts_addr, call_id);

    loop {
        match frame::read_text(&mut stream, TEXT_MAX_LEN).await {
            Ok(transcript) => {
                if transcript.is_empty() {
                    continue;
                }
                let reply = generator.lock().reply(call_id, &transcript);
                if let Err(e) = frame::write_text(&mut stream, &reply).await {
                    warn!(call_id, error = %e, "failed writing reply back to caller");
                    break;
                }
                if let Err(e) = store.append_llm_response(call_id as i64, &reply) {
                    warn!(call_id, error = %e, "failed persisting LLM reply");
                }
                tts.send_text(&reply).await;
            }
            Err(vox_wire::frame::Error::Bye) => {
                info!(call_id, "caller sent BYE");
                break;
            }
            Err(e) => {
                warn!(call_id, error = %e, "LLM frame read error, ending session");
                break;
            }
        }
    }

    tts.close().await;
}
