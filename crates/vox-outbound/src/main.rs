//! Outbound processor: TTS -> phone audio (spec §4.C).

mod control;
mod fifo;
mod rendezvous;
mod scheduler;
mod state;
mod tts_link;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use vox_core::telemetry;

use state::OutboundState;

#[derive(Parser, Debug)]
#[command(name = "vox-outbound", about = "Outbound audio processor (TTS -> phone)")]
struct Args {
    #[arg(long, default_value = "/tmp/voxbridge-outbound.sock")]
    control_socket: String,

    /// Optional raw µ-law file cycled as a test tone while TTS is not
    /// connected (spec §4.C "if an optional test µ-law ring is loaded").
    #[arg(long)]
    test_tone_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");
    let args = Args::parse();

    let test_tone = match &args.test_tone_file {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(path, error = %e, "failed reading test tone file, falling back to silence");
                None
            }
        },
        None => None,
    };

    let state = Arc::new(OutboundState::new(test_tone));
    let control_state = state.clone();
    let control_task = tokio::spawn(control::run_control_listener(args.control_socket, control_state));

    while state.running.load(Ordering::SeqCst) {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }

    control_task.abort();
    Ok(())
}
