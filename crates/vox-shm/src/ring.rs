use std::ffi::CString;
use std::fs::File;
use std::os::fd::{AsRawFd, FromRawFd};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use memmap2::{MmapMut, MmapOptions};
use tracing::{debug, trace, warn};

use crate::{Error, Result};

pub const MAGIC: u32 = 0x4150_4348; // 'APCH'
const VERSION: u32 = 1;
const HEADER_SIZE: usize = std::mem::size_of::<ShmHeader>();

const FLAG_PRODUCER: u32 = 0x1;
const FLAG_CONSUMER: u32 = 0x2;

/// Naturally-aligned fixed header at the start of the shared-memory region.
/// Layout must be stable across processes built from the same source, which
/// in practice means `#[repr(C)]` and no host-dependent types.
#[repr(C)]
struct ShmHeader {
    magic: AtomicU32,
    version: AtomicU32,
    call_id: AtomicU32,
    write_index: AtomicU32,
    read_index: AtomicU32,
    connected_flags: AtomicU32,
    producer_heartbeat_ns: AtomicU64,
    consumer_heartbeat_ns: AtomicU64,
    slot_size: AtomicU32,
    slot_count: AtomicU32,
    _reserved: [u8; 64],
}

/// One end (producer or consumer, or both in tests) of a shared-memory
/// audio ring.
pub struct ShmRing {
    name: String,
    _file: File,
    mmap: MmapMut,
    slot_size: u32,
    slot_count: u32,
    role_producer: bool,
    role_consumer: bool,
}

// Safety: the mmap'd region is accessed exclusively through atomic
// operations on its header fields and through non-overlapping slot
// read/write governed by the ring protocol; the type itself performs no
// unsynchronized access.
unsafe impl Send for ShmRing {}
unsafe impl Sync for ShmRing {}

impl ShmRing {
    /// Create (if `create`) or open an existing ring identified by `name`
    /// (e.g. `/ap_in_34`).
    pub fn create_or_open(
        name: &str,
        call_id: u32,
        slot_size: u32,
        slot_count: u32,
        create: bool,
    ) -> Result<Self> {
        let total_size = HEADER_SIZE + (slot_size as usize) * (slot_count as usize);
        let cname = CString::new(name).expect("channel name has no interior NUL");

        let oflag = if create {
            libc::O_CREAT | libc::O_RDWR
        } else {
            libc::O_RDWR
        };

        let raw_fd = unsafe { libc::shm_open(cname.as_ptr(), oflag, 0o666) };
        if raw_fd < 0 {
            return Err(Error::Open {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        let file = unsafe { File::from_raw_fd(raw_fd) };

        if create {
            let rc = unsafe { libc::ftruncate(file.as_raw_fd(), total_size as libc::off_t) };
            if rc != 0 {
                return Err(Error::Truncate(std::io::Error::last_os_error()));
            }
        }

        let mut mmap = unsafe {
            MmapOptions::new().len(total_size).map_mut(&file).map_err(Error::Mmap)?
        };
        if mmap.len() < total_size {
            return Err(Error::BadHeader);
        }

        let header = unsafe { &*(mmap.as_mut_ptr() as *const ShmHeader) };

        if create {
            header.magic.store(MAGIC, Ordering::Relaxed);
            header.version.store(VERSION, Ordering::Relaxed);
            header.call_id.store(call_id, Ordering::Relaxed);
            header.write_index.store(0, Ordering::Relaxed);
            header.read_index.store(0, Ordering::Relaxed);
            header.connected_flags.store(0, Ordering::Relaxed);
            header.producer_heartbeat_ns.store(0, Ordering::Relaxed);
            header.consumer_heartbeat_ns.store(0, Ordering::Relaxed);
            header.slot_size.store(slot_size, Ordering::Relaxed);
            header.slot_count.store(slot_count, Ordering::Relaxed);
            debug!(name, call_id, slot_size, slot_count, "created shm ring");
        } else if header.magic.load(Ordering::Relaxed) != MAGIC {
            return Err(Error::BadHeader);
        }

        let actual_slot_size = header.slot_size.load(Ordering::Relaxed);
        let actual_slot_count = header.slot_count.load(Ordering::Relaxed);

        Ok(ShmRing {
            name: name.to_string(),
            _file: file,
            mmap,
            slot_size: actual_slot_size,
            slot_count: actual_slot_count,
            role_producer: false,
            role_consumer: false,
        })
    }

    fn header(&self) -> &ShmHeader {
        unsafe { &*(self.mmap.as_ptr() as *const ShmHeader) }
    }

    fn data_ptr(&self) -> *mut u8 {
        unsafe { self.mmap.as_ptr().add(HEADER_SIZE) as *mut u8 }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    pub fn call_id(&self) -> u32 {
        self.header().call_id.load(Ordering::Relaxed)
    }

    pub fn set_role_producer(&mut self, on: bool) {
        self.role_producer = on;
        self.update_connected_flags();
    }

    pub fn set_role_consumer(&mut self, on: bool) {
        self.role_consumer = on;
        self.update_connected_flags();
    }

    fn update_connected_flags(&self) {
        let header = self.header();
        let mut flags = header.connected_flags.load(Ordering::Relaxed);
        if self.role_producer {
            flags |= FLAG_PRODUCER;
        } else {
            flags &= !FLAG_PRODUCER;
        }
        if self.role_consumer {
            flags |= FLAG_CONSUMER;
        } else {
            flags &= !FLAG_CONSUMER;
        }
        header.connected_flags.store(flags, Ordering::Relaxed);
    }

    /// Non-blocking write. Returns `false` without mutating the ring if it
    /// is full or the payload doesn't fit in a slot.
    pub fn write_frame(&self, payload: &[u8]) -> Result<bool> {
        let header = self.header();
        if payload.len() as u32 + 4 > self.slot_size {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                cap: self.slot_size as usize - 4,
            });
        }

        let w = header.write_index.load(Ordering::Acquire);
        let r = header.read_index.load(Ordering::Acquire);
        if (w + 1) % self.slot_count == r {
            trace!(ring = %self.name, "ring full, dropping write");
            return Ok(false);
        }

        let offset = (w as usize) * (self.slot_size as usize);
        unsafe {
            let slot = self.data_ptr().add(offset);
            std::ptr::write_unaligned(slot as *mut u32, payload.len() as u32);
            std::ptr::copy_nonoverlapping(payload.as_ptr(), slot.add(4), payload.len());
        }

        header
            .write_index
            .store((w + 1) % self.slot_count, Ordering::Release);
        self.heartbeat_producer();
        Ok(true)
    }

    /// Non-blocking read. Returns `None` if the ring is empty.
    pub fn read_frame(&self) -> Option<Vec<u8>> {
        let header = self.header();
        let w = header.write_index.load(Ordering::Acquire);
        let r = header.read_index.load(Ordering::Acquire);
        if w == r {
            return None;
        }

        let offset = (r as usize) * (self.slot_size as usize);
        let len = unsafe {
            let slot = self.data_ptr().add(offset);
            std::ptr::read_unaligned(slot as *const u32)
        };
        if len > self.slot_size - 4 {
            warn!(ring = %self.name, len, "corrupt slot length, treating as empty");
            return None;
        }

        let mut out = vec![0u8; len as usize];
        unsafe {
            let slot = self.data_ptr().add(offset);
            std::ptr::copy_nonoverlapping(slot.add(4), out.as_mut_ptr(), len as usize);
        }

        header
            .read_index
            .store((r + 1) % self.slot_count, Ordering::Release);
        self.heartbeat_consumer();
        Some(out)
    }

    /// True iff the ring currently holds no frames.
    pub fn is_empty(&self) -> bool {
        let header = self.header();
        header.write_index.load(Ordering::Acquire) == header.read_index.load(Ordering::Acquire)
    }

    /// True iff the peer (producer if we're the consumer, and vice versa)
    /// has heartbeat'd within `timeout`.
    pub fn is_peer_alive(&self, timeout: Duration) -> bool {
        let header = self.header();
        let now = now_ns();
        let timeout_ns = timeout.as_nanos() as u64;
        if self.role_producer {
            let hb = header.consumer_heartbeat_ns.load(Ordering::Relaxed);
            return now.saturating_sub(hb) < timeout_ns;
        }
        if self.role_consumer {
            let hb = header.producer_heartbeat_ns.load(Ordering::Relaxed);
            return now.saturating_sub(hb) < timeout_ns;
        }
        let hp = header.producer_heartbeat_ns.load(Ordering::Relaxed);
        let hc = header.consumer_heartbeat_ns.load(Ordering::Relaxed);
        now.saturating_sub(hp) < timeout_ns || now.saturating_sub(hc) < timeout_ns
    }

    fn heartbeat_producer(&self) {
        self.header()
            .producer_heartbeat_ns
            .store(now_ns(), Ordering::Relaxed);
    }

    fn heartbeat_consumer(&self) {
        self.header()
            .consumer_heartbeat_ns
            .store(now_ns(), Ordering::Relaxed);
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Remove the named shared-memory object. Best-effort; call once from
/// whichever side is responsible for teardown (the SIP gateway, which
/// creates the rings).
pub fn unlink(name: &str) {
    if let Ok(cname) = CString::new(name) {
        unsafe {
            libc::shm_unlink(cname.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ring(tag: &str) -> ShmRing {
        let name = format!("/vox_test_{}_{}", tag, std::process::id());
        unlink(&name);
        let mut ring = ShmRing::create_or_open(&name, 1, 64, 4, true).unwrap();
        ring.set_role_producer(true);
        ring.set_role_consumer(true);
        ring
    }

    #[test]
    fn empty_ring_reads_none() {
        let ring = test_ring("empty");
        assert!(ring.read_frame().is_none());
        assert!(ring.is_empty());
        unlink(ring.name());
    }

    #[test]
    fn write_then_read_roundtrips() {
        let ring = test_ring("roundtrip");
        assert!(ring.write_frame(b"hello").unwrap());
        assert!(!ring.is_empty());
        let out = ring.read_frame().unwrap();
        assert_eq!(out, b"hello");
        assert!(ring.is_empty());
        unlink(ring.name());
    }

    #[test]
    fn full_ring_rejects_write_without_mutation() {
        // slot_count = 4 means only 3 usable slots before (w+1)%N == r.
        let ring = test_ring("full");
        assert!(ring.write_frame(b"a").unwrap());
        assert!(ring.write_frame(b"b").unwrap());
        assert!(ring.write_frame(b"c").unwrap());
        // Ring is now full: (w+1) % 4 == r.
        assert!(!ring.write_frame(b"d").unwrap());

        // A failed write must not have mutated ring state: draining still
        // yields exactly the three frames written, in order.
        assert_eq!(ring.read_frame().unwrap(), b"a");
        assert_eq!(ring.read_frame().unwrap(), b"b");
        assert_eq!(ring.read_frame().unwrap(), b"c");
        assert!(ring.read_frame().is_none());
        unlink(ring.name());
    }

    #[test]
    fn payload_too_large_is_rejected() {
        let ring = test_ring("toolarge");
        let payload = vec![0u8; 128];
        assert!(ring.write_frame(&payload).is_err());
        unlink(ring.name());
    }
}
