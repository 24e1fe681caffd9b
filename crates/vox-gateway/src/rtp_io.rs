//! Per-call RTP receive/send loops bridging the UDP media socket to the
//! shared-memory rings (spec §4.A `RtpReceive`/`RtpSend`).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{info, trace, warn};
use vox_core::ports::{PT_PCMU, SHM_HEARTBEAT_TIMEOUT};
use vox_core::CallId;
use vox_rtp::RtpHeader;
use vox_shm::ShmRing;

use crate::call::CallSession;

const RING_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Own the RTP socket for one call and run both directions until the
/// socket is dropped (the caller aborts these tasks on BYE).
pub async fn rtp_receive_loop(
    socket: Arc<UdpSocket>,
    session: Arc<Mutex<CallSession>>,
    inbound_ring: Arc<ShmRing>,
) {
    let mut buf = vec![0u8; 2048];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "RTP recv error, ending receive loop");
                return;
            }
        };
        let (header, payload) = match RtpHeader::parse(&buf[..len]) {
            Ok(pair) => pair,
            Err(e) => {
                trace!(error = %e, "dropping malformed RTP packet");
                continue;
            }
        };
        pin_peer_once(&session, peer);
        let _ = inbound_ring.write_frame(payload);
        let _ = header; // sequence/timestamp of the inbound stream are not relayed
    }
}

fn pin_peer_once(session: &Arc<Mutex<CallSession>>, peer: SocketAddr) {
    session.lock().rtp_send.pin_peer(peer);
}

/// Poll the outbound ring for 160-byte µ-law frames and send each as RTP,
/// at whatever cadence the outbound scheduler produces them (spec §4.A
/// `RtpSend`: "dequeue ... emitted by the outbound scheduler").
pub async fn rtp_send_loop(
    socket: Arc<UdpSocket>,
    session: Arc<Mutex<CallSession>>,
    outbound_ring: Arc<ShmRing>,
    call_id: CallId,
) {
    loop {
        let frame = outbound_ring.read_frame();
        let Some(payload) = frame else {
            if !outbound_ring.is_peer_alive(SHM_HEARTBEAT_TIMEOUT) {
                trace!(call_id = call_id.0, "outbound ring producer looks dead");
            }
            tokio::time::sleep(RING_POLL_INTERVAL).await;
            continue;
        };

        let packet = {
            let mut guard = session.lock();
            guard.rtp_send.next_packet(PT_PCMU, &payload)
        };
        let Some((peer, bytes)) = packet else {
            // peer not pinned yet: no inbound RTP has arrived, nothing to send to
            continue;
        };
        if let Err(e) = socket.send_to(&bytes, peer).await {
            warn!(call_id = call_id.0, error = %e, "RTP send error");
        }
    }
}

pub async fn bind_rtp_socket(port: u16) -> std::io::Result<Arc<UdpSocket>> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    info!(port, "RTP socket bound");
    Ok(Arc::new(socket))
}
