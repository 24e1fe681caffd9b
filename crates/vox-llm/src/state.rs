//! Process-wide state shared across all per-call LLM sessions.

use std::sync::Arc;

use parking_lot::Mutex;
use vox_store::Store;

use crate::generator::Generator;

pub struct LlmState {
    pub generator: Arc<Mutex<dyn Generator>>,
    pub store: Arc<Store>,
    pub tts_addr: (String, u16),
}

impl LlmState {
    pub fn new(generator: Arc<Mutex<dyn Generator>>, store: Arc<Store>, tts_addr: (String, u16)) -> Self {
        LlmState {
            generator,
            store,
            tts_addr,
        }
    }
}
