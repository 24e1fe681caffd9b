//! Unix-domain control socket listener (spec §4.B "Control interface").

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;
use tracing::{info, warn};
use vox_wire::control::ControlCommand;

use crate::state::InboundState;

pub async fn run_control_listener(path: String, state: Arc<InboundState>) {
    let _ = std::fs::remove_file(&path);
    let listener = match UnixListener::bind(&path) {
        Ok(l) => l,
        Err(e) => {
            warn!(path, error = %e, "failed binding control socket");
            return;
        }
    };
    info!(path, "control socket listening");

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "control socket accept error");
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match ControlCommand::parse(&line) {
                    Ok(ControlCommand::Activate(call_id)) => state.activate(call_id).await,
                    Ok(ControlCommand::Deactivate) => state.deactivate().await,
                    Ok(ControlCommand::Shutdown) => {
                        state.deactivate().await;
                        state.stop();
                    }
                    Err(e) => warn!(line, error = %e, "malformed control command"),
                }
            }
        });
    }
}
