//! LLM worker: process (E-LLM), interface contract only (spec §4.E).

mod generator;
mod session;
mod state;
mod tts_link;

use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{info, warn};
use vox_core::telemetry;
use vox_store::{ServiceStatus, Store};

use generator::{Generator, StubGenerator};
use state::LlmState;

#[derive(Parser, Debug)]
#[command(name = "vox-llm", about = "LLM conversation worker")]
struct Args {
    #[arg(long, default_value = "voxbridge.db")]
    db_path: String,

    #[arg(long, default_value = "127.0.0.1")]
    tts_host: String,

    #[arg(long, default_value_t = vox_core::ports::TTS_PORT)]
    tts_port: u16,

    #[arg(long, default_value = "stub")]
    model_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");
    let args = Args::parse();

    let store = Arc::new(Store::open(&args.db_path)?);
    store.set_service_config_atomic("llm", true, &args.model_path, ServiceStatus::Starting)?;

    let generator: Arc<Mutex<dyn Generator>> = Arc::new(Mutex::new(StubGenerator::new()));
    let state = Arc::new(LlmState::new(generator, store.clone(), (args.tts_host, args.tts_port)));

    let listener = TcpListener::bind(("0.0.0.0", vox_core::ports::LLM_PORT)).await?;
    store.set_service_config_atomic("llm", true, &args.model_path, ServiceStatus::Running)?;
    info!(port = vox_core::ports::LLM_PORT, "LLM worker listening");

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "LLM accept error");
                continue;
            }
        };
        let generator = state.generator.clone();
        let store = state.store.clone();
        let tts_addr = state.tts_addr.clone();
        tokio::spawn(session::run(stream, generator, store, tts_addr));
    }
}
