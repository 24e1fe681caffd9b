//! The wire protocols that let the five voxbridge processes rendezvous
//! and stream past each other without a central registry (spec §6):
//! length-prefixed TCP framing, the Unix control socket, and the UDP
//! REGISTER rendezvous datagram.

pub mod control;
pub mod frame;
pub mod rendezvous;

pub use frame::{Error, Result};
