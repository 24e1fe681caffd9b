//! Ring consumer -> decode -> band-limit/upsample -> VAD-chunk -> TCP
//! forward to STT pipeline (spec §4.B "Pipeline stages").

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::warn;
use vox_codec::g711::decode_to_f32;
use vox_codec::resample::upsample_8k_to_16k;
use vox_codec::VadChunker;
use vox_core::ports::{stt_listen_port, STT_REGISTER_PORT};
use vox_core::CallId;
use vox_shm::{inbound_channel_name, ShmRing};
use vox_wire::frame;
use vox_wire::rendezvous::RendezvousMessage;

/// How long to wait between empty-ring polls (spec §5 "callers poll with
/// short sleeps rather than block").
const RING_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// STT binds its per-call listener only after seeing our REGISTER, so the
/// first connect attempts are expected to race it briefly.
const STT_CONNECT_RETRIES: u32 = 10;
const STT_CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

async fn announce_to_stt(call_id: u32) {
    let socket = match tokio::net::UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => s,
        Err(e) => {
            warn!(call_id, error = %e, "failed binding rendezvous announce socket");
            return;
        }
    };
    let datagram = RendezvousMessage::Register(call_id).encode();
    if let Err(e) = socket.send_to(&datagram, ("127.0.0.1", STT_REGISTER_PORT)).await {
        warn!(call_id, error = %e, "failed announcing call to STT");
    }
}

async fn dial_stt(call_id: u32) -> Option<TcpStream> {
    let port = stt_listen_port(CallId(call_id));
    for attempt in 0..STT_CONNECT_RETRIES {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(s) => return Some(s),
            Err(e) if attempt + 1 == STT_CONNECT_RETRIES => {
                warn!(call_id, port, error = %e, "failed connecting to STT");
                return None;
            }
            Err(_) => tokio::time::sleep(STT_CONNECT_RETRY_DELAY).await,
        }
    }
    None
}

pub async fn run(call_id: u32, mut cancel: watch::Receiver<bool>) {
    let name = inbound_channel_name(call_id);
    let mut ring = match ShmRing::create_or_open(&name, call_id, 2048, 512, false) {
        Ok(r) => r,
        Err(e) => {
            warn!(call_id, error = %e, "failed opening inbound ring as consumer");
            return;
        }
    };
    ring.set_role_consumer(true);

    announce_to_stt(call_id).await;
    let Some(mut stream) = dial_stt(call_id).await else {
        return;
    };
    if let Err(e) = frame::write_hello(&mut stream, &call_id.to_string()).await {
        warn!(call_id, error = %e, "failed sending HELLO to STT");
        return;
    }

    let mut vad = VadChunker::new();

    loop {
        if *cancel.borrow() {
            let _ = frame::write_bye(&mut stream).await;
            return;
        }

        let Some(payload) = ring.read_frame() else {
            tokio::select! {
                _ = tokio::time::sleep(RING_POLL_INTERVAL) => {}
                _ = cancel.changed() => {}
            }
            continue;
        };

        let mut floats = Vec::new();
        decode_to_f32(&payload, &mut floats);
        let upsampled = upsample_8k_to_16k(&floats);

        for chunk in vad.push(&upsampled) {
            if let Err(e) = frame::write_float_pcm(&mut stream, &chunk).await {
                warn!(call_id, error = %e, "STT write failed, ending forwarding loop");
                return;
            }
        }
    }
}
