//! Idle-session reaper (spec §4.D "Idle reap": "Sessions inactive for
//! 5 minutes are destroyed").

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::state::SttState;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const SCAN_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(state: Arc<SttState>) {
    loop {
        tokio::time::sleep(SCAN_INTERVAL).await;
        let idle: Vec<u32> = state
            .sessions
            .iter()
            .filter(|entry| entry.value().last_activity.lock().elapsed() > IDLE_TIMEOUT)
            .map(|entry| *entry.key())
            .collect();
        for call_id in idle {
            if let Some((_, entry)) = state.sessions.remove(&call_id) {
                entry.handle.abort();
                info!(call_id, "reaped idle STT session");
            }
        }
    }
}
