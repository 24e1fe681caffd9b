//! One per-call connection from the LLM worker: HELLO, then a stream
//! of text chunks to synthesize (spec §4.E "TTS worker ... Listens on
//! TCP 8090 for text chunks").

use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{info, warn};
use vox_wire::frame;

use crate::state::TtsState;

const HELLO_MAX_LEN: u32 = 4096;
const TEXT_MAX_LEN: u32 = 1 << 20;

pub async fn run(mut stream: TcpStream, state: Arc<TtsState>) {
    let call_id: u32 = match frame::read_hello(&mut stream, HELLO_MAX_LEN).await {
        Ok(id_str) => match id_str.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(hello = %id_str, "non-numeric call id in TTS HELLO");
                return;
            }
        },
        Err(e) => {
            warn!(error = %e, "HELLO read failed on TTS connection");
            return;
        }
    };

    info!(call_id, "TTS session established");
    let link = state.link_for(call_id);

    loop {
        match frame::read_text(&mut stream, TEXT_MAX_LEN).await {
            Ok(text) => {
                if text.is_empty() {
                    continue;
                }
                let permit = state
                    .concurrency
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("concurrency semaphore is never closed");
                let synthesizer = state.synthesizer.clone();
                let link = link.clone();
                let state_for_task = state.clone();
                let call_id_for_task = call_id;
                tokio::spawn(async move {
                    let _permit = permit;
                    let samples = synthesizer.synthesize(&text);
                    if samples.is_empty() {
                        return;
                    }
                    link.send_audio(&samples).await;
                    state_for_task.chunks_synthesized.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    tracing::debug!(call_id = call_id_for_task, samples = samples.len(), "synthesized chunk streamed");
                });
            }
            Err(vox_wire::frame::Error::Bye) => {
                info!(call_id, "LLM worker sent BYE");
                break;
            }
            Err(e) => {
                warn!(call_id, error = %e, "TTS frame read error, ending session");
                break;
            }
        }
    }

    state.links.remove(&call_id);
}
