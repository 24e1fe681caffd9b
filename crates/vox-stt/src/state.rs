//! Process-wide state: the shared recognizer lock and the live session
//! registry used by the idle reaper (spec §4.D "Idle reap").

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use vox_store::Store;

use crate::recognizer::Recognizer;

pub struct SessionEntry {
    pub last_activity: Arc<Mutex<Instant>>,
    pub handle: JoinHandle<()>,
}

pub struct SttState {
    pub recognizer: Arc<Mutex<dyn Recognizer>>,
    pub store: Arc<Store>,
    pub llm_addr: (String, u16),
    pub sessions: DashMap<u32, SessionEntry>,
}

impl SttState {
    pub fn new(recognizer: Arc<Mutex<dyn Recognizer>>, store: Arc<Store>, llm_addr: (String, u16)) -> Self {
        SttState {
            recognizer,
            store,
            llm_addr,
            sessions: DashMap::new(),
        }
    }
}
