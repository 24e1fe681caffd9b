//! Inbound processor: phone audio -> STT (spec §4.B).

mod consumer;
mod control;
mod state;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use vox_core::telemetry;

use state::InboundState;

#[derive(Parser, Debug)]
#[command(name = "vox-inbound", about = "Inbound audio processor (phone -> STT)")]
struct Args {
    #[arg(long, default_value = "/tmp/voxbridge-inbound.sock")]
    control_socket: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");
    let args = Args::parse();

    let state = Arc::new(InboundState::new());
    let control_state = state.clone();
    let control_task = tokio::spawn(control::run_control_listener(args.control_socket, control_state));

    while state.running.load(Ordering::SeqCst) {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }

    control_task.abort();
    Ok(())
}
