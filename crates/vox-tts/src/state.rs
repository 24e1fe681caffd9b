//! Process-wide state: the shared synthesizer handle, the concurrency
//! semaphore, and the per-call outbound links (spec §4.E "Concurrency
//! is gated by a configurable semaphore").

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Semaphore;

use crate::outbound_link::OutboundLink;
use crate::synthesizer::Synthesizer;

pub struct TtsState {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub concurrency: Arc<Semaphore>,
    pub links: DashMap<u32, Arc<OutboundLink>>,
    pub chunks_synthesized: AtomicU64,
}

impl TtsState {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, concurrency: usize) -> Self {
        TtsState {
            synthesizer,
            concurrency: Arc::new(Semaphore::new(concurrency)),
            links: DashMap::new(),
            chunks_synthesized: AtomicU64::new(0),
        }
    }

    pub fn link_for(&self, call_id: u32) -> Arc<OutboundLink> {
        self.links
            .entry(call_id)
            .or_insert_with(|| Arc::new(OutboundLink::new(call_id)))
            .clone()
    }
}

/// `min(4, hw_parallelism)` (spec §4.E).
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4)
}
