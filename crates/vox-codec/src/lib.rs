//! Audio codec, resampling, VAD, and WAV primitives shared by the inbound
//! and outbound processors. Plain functions over plain data, not methods
//! on a base-processor hierarchy — see DESIGN.md.

pub mod g711;
pub mod resample;
pub mod vad;
pub mod wav;

pub use vad::VadChunker;
