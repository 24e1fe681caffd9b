//! SIP 2.0 message handling for the gateway process: parsing, digest
//! authentication, caller-number normalization, and SDP answer building.
//! Supports exactly the subset RFC 3261 subset spec.md names — UDP
//! transport only, no proxying.

pub mod digest;
pub mod error;
pub mod message;
pub mod number;
pub mod sdp;

pub use error::{Error, Result};
pub use message::{Headers, Message, Method};
