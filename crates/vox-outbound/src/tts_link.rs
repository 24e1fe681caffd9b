//! Outward TCP connection to the TTS worker's per-call audio listener,
//! and the chunk-to-µ-law conversion pipeline (spec §4.C "On REGISTER",
//! "TTS chunk framing (inbound)", "Convert-and-enqueue").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tracing::{info, warn};
use vox_codec::g711::encode_from_f32;
use vox_codec::resample::downsample_to_8k;
use vox_core::ports::tts_outbound_listen_port;
use vox_core::CallId;
use vox_wire::frame::{self, TtsChunk};

use crate::fifo::OutboundFifo;

/// 5×200 ms then 5×1000 ms (spec §4.C "Retry up to 10 times with
/// graduated backoff").
fn backoff_schedule() -> impl Iterator<Item = Duration> {
    std::iter::repeat(Duration::from_millis(200))
        .take(5)
        .chain(std::iter::repeat(Duration::from_millis(1000)).take(5))
}

const MAX_TTS_PAYLOAD: u32 = 10 * 1024 * 1024;

async fn connect_with_retry(call_id: u32) -> Option<TcpStream> {
    let port = tts_outbound_listen_port(CallId(call_id));
    for delay in backoff_schedule() {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                warn!(call_id, port, error = %e, "TTS connect attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}

fn convert_to_mulaw(chunk: &TtsChunk) -> Vec<u8> {
    if chunk.is_float_pcm() {
        let samples: Vec<f32> = chunk
            .payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let eight_khz = downsample_to_8k(&samples, chunk.sample_rate);
        let mut out = Vec::new();
        encode_from_f32(&eight_khz, &mut out);
        out
    } else {
        chunk.payload.clone()
    }
}

/// Dial the TTS worker for this call, then forward converted audio chunks
/// into `fifo` until the connection closes or sends BYE.
pub async fn connect_and_stream(call_id: u32, fifo: Arc<Mutex<OutboundFifo>>, tts_connected: Arc<AtomicBool>) {
    let Some(mut stream) = connect_with_retry(call_id).await else {
        warn!(call_id, "giving up on TTS connection for this call");
        return;
    };
    if let Err(e) = frame::write_hello(&mut stream, &call_id.to_string()).await {
        warn!(call_id, error = %e, "failed sending HELLO to TTS");
        return;
    }

    tts_connected.store(true, Ordering::SeqCst);
    info!(call_id, "TTS connected");

    loop {
        match frame::read_tts_chunk(&mut stream, MAX_TTS_PAYLOAD).await {
            Ok(Some(chunk)) => {
                let accepted = fifo.lock().accept_chunk_id(chunk.chunk_id);
                if !accepted {
                    continue;
                }
                let mulaw = convert_to_mulaw(&chunk);
                fifo.lock().push(&mulaw);
            }
            Ok(None) => {
                info!(call_id, "TTS sent BYE");
                break;
            }
            Err(e) => {
                warn!(call_id, error = %e, "TTS stream error, reverting to silence until next REGISTER");
                break;
            }
        }
    }

    tts_connected.store(false, Ordering::SeqCst);
}
