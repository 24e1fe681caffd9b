//! The single-producer/single-consumer shared-memory audio ring that
//! bridges the SIP gateway and the inbound/outbound processors.
//!
//! Channel names follow `/ap_in_<call_id>` and `/ap_out_<call_id>`. One
//! ring per direction per call; layout matches spec §3 exactly: a fixed
//! header followed by `slot_count` fixed-size slots, each slot holding a
//! 4-byte little-endian payload length followed by the payload bytes.

mod ring;

pub use ring::{unlink, ShmRing, MAGIC};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("shm_open failed for {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ftruncate failed: {0}")]
    Truncate(std::io::Error),
    #[error("mmap failed: {0}")]
    Mmap(std::io::Error),
    #[error("ring header magic mismatch or unsized header")]
    BadHeader,
    #[error("payload of {len} bytes exceeds slot capacity {cap}")]
    PayloadTooLarge { len: usize, cap: usize },
}

/// Channel name for the inbound (phone -> STT) ring of a call.
pub fn inbound_channel_name(call_id: u32) -> String {
    format!("/ap_in_{call_id}")
}

/// Channel name for the outbound (TTS -> phone) ring of a call.
pub fn outbound_channel_name(call_id: u32) -> String {
    format!("/ap_out_{call_id}")
}
