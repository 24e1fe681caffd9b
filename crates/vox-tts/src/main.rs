//! TTS worker: process (E-TTS), interface contract only (spec §4.E).

mod outbound_link;
mod session;
mod state;
mod synthesizer;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use vox_core::telemetry;
use vox_store::{ServiceStatus, Store};

use state::{default_concurrency, TtsState};
use synthesizer::{StubSynthesizer, Synthesizer};

/// Stdout heartbeat interval (spec §4.E "stdout heartbeat statistics
/// are contract-level behaviors").
const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "vox-tts", about = "Speech synthesis worker")]
struct Args {
    #[arg(long, default_value = "voxbridge.db")]
    db_path: String,

    #[arg(long, default_value = "stub")]
    model_path: String,

    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");
    let args = Args::parse();

    let store = Arc::new(Store::open(&args.db_path)?);
    store.set_service_config_atomic("tts", true, &args.model_path, ServiceStatus::Starting)?;

    let synthesizer = StubSynthesizer::new();
    if let Err(e) = synthesizer.warm_up() {
        error!(error = %e, "TTS model warm-up failed, surfacing service status error");
        store.set_service_config_atomic("tts", true, &args.model_path, ServiceStatus::Error)?;
        return Err(e);
    }
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(synthesizer);

    let concurrency = args.concurrency.unwrap_or_else(default_concurrency);
    let state = Arc::new(TtsState::new(synthesizer, concurrency));
    let chunks_synthesized = Arc::new(AtomicU64::new(0));

    let listener = TcpListener::bind(("0.0.0.0", vox_core::ports::TTS_PORT)).await?;
    store.set_service_config_atomic("tts", true, &args.model_path, ServiceStatus::Running)?;
    info!(port = vox_core::ports::TTS_PORT, concurrency, "TTS worker listening");

    let heartbeat_counter = chunks_synthesized.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            println!(
                "vox-tts heartbeat: {} chunks synthesized since start",
                heartbeat_counter.load(Ordering::Relaxed)
            );
        }
    });

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "TTS accept error");
                continue;
            }
        };
        tokio::spawn(session::run(stream, state.clone()));
    }
}
