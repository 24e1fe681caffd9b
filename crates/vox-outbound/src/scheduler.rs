//! The continuous 20 ms output scheduler (spec §4.C "The scheduler").
//! Runs at a target cadence driven by absolute time so a slow tick never
//! accumulates drift (spec §9 "the scheduler's tick-to-tick interval is
//! driven by absolute time, not by accumulated sleep(20ms) delays").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::warn;
use vox_codec::g711::silence_frame;
use vox_core::ports::{DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE};
use vox_shm::{outbound_channel_name, ShmRing};

use crate::fifo::{OutboundFifo, FRAME_BYTES};

const TICK: Duration = Duration::from_millis(20);

pub async fn run(
    call_id: u32,
    fifo: Arc<Mutex<OutboundFifo>>,
    tts_connected: Arc<AtomicBool>,
    test_tone: Option<Vec<u8>>,
    mut cancel: watch::Receiver<bool>,
) {
    let name = outbound_channel_name(call_id);
    // The gateway creates both rings on INVITE; this processor only opens.
    let mut ring = match ShmRing::create_or_open(&name, call_id, DEFAULT_SLOT_SIZE, DEFAULT_SLOT_COUNT, false) {
        Ok(r) => r,
        Err(e) => {
            warn!(call_id, error = %e, "failed opening outbound ring as producer");
            return;
        }
    };
    ring.set_role_producer(true);

    let silence = silence_frame(FRAME_BYTES);
    let mut test_tone_cursor = 0usize;
    let mut next = Instant::now() + TICK;

    loop {
        if *cancel.borrow() {
            return;
        }

        let frame = fifo.lock().take_frame().unwrap_or_else(|| {
            if !tts_connected.load(Ordering::SeqCst) {
                if let Some(tone) = &test_tone {
                    if !tone.is_empty() {
                        let frame: Vec<u8> = (0..FRAME_BYTES)
                            .map(|i| tone[(test_tone_cursor + i) % tone.len()])
                            .collect();
                        test_tone_cursor = (test_tone_cursor + FRAME_BYTES) % tone.len();
                        return frame;
                    }
                }
            }
            silence.clone()
        });

        if let Err(e) = ring.write_frame(&frame) {
            warn!(call_id, error = %e, "failed writing outbound frame");
        }

        tokio::select! {
            _ = tokio::time::sleep_until(next) => {}
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return;
                }
            }
        }
        next += TICK;
    }
}
