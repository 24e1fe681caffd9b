//! STT worker: process (D), the recognition edge (spec §4.D).

mod llm_link;
mod reaper;
mod recognizer;
mod rendezvous;
mod session;
mod state;

use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tracing::error;
use vox_core::telemetry;
use vox_store::{ServiceStatus, Store};

use recognizer::{Recognizer, StubRecognizer};
use state::SttState;

#[derive(Parser, Debug)]
#[command(name = "vox-stt", about = "Speech recognition worker")]
struct Args {
    #[arg(long, default_value = "voxbridge.db")]
    db_path: String,

    #[arg(long, default_value = "127.0.0.1")]
    llm_host: String,

    #[arg(long, default_value_t = vox_core::ports::LLM_PORT)]
    llm_port: u16,

    #[arg(long, default_value = "stub")]
    model_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");
    let args = Args::parse();

    let store = Arc::new(Store::open(&args.db_path)?);
    store.set_service_config_atomic("stt", true, &args.model_path, ServiceStatus::Starting)?;

    let mut recognizer = StubRecognizer::new();
    if let Err(e) = recognizer.warm_up() {
        error!(error = %e, "STT model warm-up failed, surfacing service status error");
        store.set_service_config_atomic("stt", true, &args.model_path, ServiceStatus::Error)?;
        return Err(e);
    }
    let recognizer: Arc<Mutex<dyn Recognizer>> = Arc::new(Mutex::new(recognizer));

    store.set_service_config_atomic("stt", true, &args.model_path, ServiceStatus::Running)?;

    let state = Arc::new(SttState::new(recognizer, store, (args.llm_host, args.llm_port)));

    let rendezvous_task = tokio::spawn(rendezvous::run(state.clone()));
    let reaper_task = tokio::spawn(reaper::run(state));

    tokio::signal::ctrl_c().await?;
    rendezvous_task.abort();
    reaper_task.abort();
    Ok(())
}
