//! Single-active-call state for the inbound processor.
//!
//! The control protocol's `DEACTIVATE` carries no `call_id` (spec §6
//! "Control socket": `ACTIVATE <call_id>`, `DEACTIVATE`, `SHUTDOWN`), so
//! this processor tracks one current call at a time; a second `ACTIVATE`
//! deactivates whatever was running first. See DESIGN.md for the Open
//! Question this resolves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::consumer;

/// Bounded wait for the forwarding loop to drain and send BYE before a
/// hard abort (spec §4.B "DEACTIVATE drains in-flight chunks with a
/// bounded wait then closes cleanly with BYE").
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

struct ActiveCall {
    call_id: u32,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct InboundState {
    pub running: AtomicBool,
    current: Mutex<Option<ActiveCall>>,
}

impl InboundState {
    pub fn new() -> Self {
        InboundState {
            running: AtomicBool::new(true),
            current: Mutex::new(None),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn activate(self: &std::sync::Arc<Self>, call_id: u32) {
        self.deactivate().await;
        info!(call_id, "activating inbound forwarding");
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(consumer::run(call_id, rx));
        *self.current.lock() = Some(ActiveCall {
            call_id,
            cancel: tx,
            handle,
        });
    }

    pub async fn deactivate(&self) {
        let prev = self.current.lock().take();
        let Some(active) = prev else {
            return;
        };
        let _ = active.cancel.send(true);
        let abort_handle = active.handle.abort_handle();
        if tokio::time::timeout(DRAIN_TIMEOUT, active.handle).await.is_err() {
            abort_handle.abort();
            info!(call_id = active.call_id, "drain timed out, forwarding loop aborted");
        } else {
            info!(call_id = active.call_id, "deactivated inbound forwarding");
        }
    }
}

impl Default for InboundState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn second_activate_tears_down_the_first_call() {
        let state = Arc::new(InboundState::new());
        state.activate(1).await;
        assert!(state.current.lock().is_some());
        state.activate(2).await;
        let current = state.current.lock();
        assert_eq!(current.as_ref().unwrap().call_id, 2);
    }
}
