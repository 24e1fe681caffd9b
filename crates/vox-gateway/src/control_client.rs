//! Client side of the Unix-domain control socket that the gateway uses to
//! tell the inbound/outbound processors to start or stop forwarding for a
//! call (spec §4.A "Entering Establishing ... sends control-socket
//! ACTIVATE <call_id> to both processors").

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::warn;

pub async fn send_activate(control_path: &str, call_id: u32) {
    send_line(control_path, &format!("ACTIVATE {call_id}\n")).await;
}

pub async fn send_deactivate(control_path: &str) {
    send_line(control_path, "DEACTIVATE\n").await;
}

async fn send_line(control_path: &str, line: &str) {
    match UnixStream::connect(control_path).await {
        Ok(mut stream) => {
            if let Err(e) = stream.write_all(line.as_bytes()).await {
                warn!(control_path, error = %e, "failed writing control command");
            }
        }
        Err(e) => {
            warn!(control_path, error = %e, "failed connecting to control socket");
        }
    }
}
