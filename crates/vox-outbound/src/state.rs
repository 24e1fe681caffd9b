//! Single-active-call state for the outbound processor.
//!
//! The control protocol's `DEACTIVATE` carries no `call_id` (spec §6
//! "Control socket": `ACTIVATE <call_id>`, `DEACTIVATE`, `SHUTDOWN`), so
//! this processor tracks one current call at a time; a second `ACTIVATE`
//! deactivates whatever was running first. See DESIGN.md for the Open
//! Question this resolves. This mirrors vox-inbound's resolution but
//! additionally owns the per-call FIFO and TTS-connected flag that the
//! scheduler and rendezvous tasks both read and write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::fifo::OutboundFifo;
use crate::{rendezvous, scheduler};

/// Bounded wait for the scheduler and rendezvous tasks to stop before a
/// hard abort (spec §4.B/§4.C "DEACTIVATE ... bounded wait then closes
/// cleanly").
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

struct ActiveCall {
    call_id: u32,
    cancel: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    rendezvous: JoinHandle<()>,
}

pub struct OutboundState {
    pub running: AtomicBool,
    test_tone: Option<Vec<u8>>,
    current: Mutex<Option<ActiveCall>>,
}

impl OutboundState {
    pub fn new(test_tone: Option<Vec<u8>>) -> Self {
        OutboundState {
            running: AtomicBool::new(true),
            test_tone,
            current: Mutex::new(None),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn activate(self: &Arc<Self>, call_id: u32) {
        self.deactivate().await;
        info!(call_id, "activating outbound scheduling");

        let fifo = Arc::new(Mutex::new(OutboundFifo::new()));
        let tts_connected = Arc::new(AtomicBool::new(false));
        let (tx, rx) = watch::channel(false);

        let scheduler_handle = tokio::spawn(scheduler::run(
            call_id,
            fifo.clone(),
            tts_connected.clone(),
            self.test_tone.clone(),
            rx.clone(),
        ));
        let rendezvous_handle = tokio::spawn(rendezvous::run(call_id, fifo, tts_connected, rx));

        *self.current.lock() = Some(ActiveCall {
            call_id,
            cancel: tx,
            scheduler: scheduler_handle,
            rendezvous: rendezvous_handle,
        });
    }

    pub async fn deactivate(&self) {
        let prev = self.current.lock().take();
        let Some(active) = prev else {
            return;
        };
        let _ = active.cancel.send(true);

        let scheduler_abort = active.scheduler.abort_handle();
        let rendezvous_abort = active.rendezvous.abort_handle();
        let drained = tokio::time::timeout(
            DRAIN_TIMEOUT,
            futures_join(active.scheduler, active.rendezvous),
        )
        .await;
        if drained.is_err() {
            scheduler_abort.abort();
            rendezvous_abort.abort();
            info!(call_id = active.call_id, "drain timed out, outbound tasks aborted");
        } else {
            info!(call_id = active.call_id, "deactivated outbound scheduling");
        }
    }
}

async fn futures_join(a: JoinHandle<()>, b: JoinHandle<()>) {
    let _ = tokio::join!(a, b);
}

impl Default for OutboundState {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_activate_tears_down_the_first_call() {
        let state = Arc::new(OutboundState::new(None));
        state.activate(9101).await;
        assert!(state.current.lock().is_some());
        state.activate(9102).await;
        let current = state.current.lock();
        assert_eq!(current.as_ref().unwrap().call_id, 9102);
    }
}
