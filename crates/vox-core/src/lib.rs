//! Shared types and ambient plumbing used by every voxbridge process.

pub mod config;
pub mod error;
pub mod ids;
pub mod ports;
pub mod telemetry;

pub use error::{Error, Result};
pub use ids::{CallId, LineId};
