//! The synthesis interface itself is an interface contract only (spec
//! §4.E "TTS worker ... eager model preload ... are contract-level
//! behaviors, not algorithmic"); this module owns the trait and a stub
//! implementation.
//!
//! Unlike the STT recognizer, synthesis here is deliberately `&self`
//! (not `&mut self`): the semaphore in `state.rs` is what bounds
//! concurrency, not a model-exclusivity lock, matching spec §4.E's
//! "Concurrency is gated by a configurable semaphore".

pub trait Synthesizer: Send + Sync {
    fn warm_up(&self) -> anyhow::Result<()>;

    /// Synthesize 16 kHz float PCM for one text chunk.
    fn synthesize(&self, text: &str) -> Vec<f32>;
}

pub struct StubSynthesizer;

impl StubSynthesizer {
    pub fn new() -> Self {
        StubSynthesizer
    }
}

impl Default for StubSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for StubSynthesizer {
    fn warm_up(&self) -> anyhow::Result<()> {
        let _ = self.synthesize("");
        Ok(())
    }

    fn synthesize(&self, text: &str) -> Vec<f32> {
        // 40 ms of 440 Hz tone per character, capped, standing in for a
        // real synthesis backend.
        const SAMPLE_RATE: f32 = 16000.0;
        let samples_per_char = (SAMPLE_RATE * 0.04) as usize;
        let len = (text.len().max(1) * samples_per_char).min(SAMPLE_RATE as usize * 4);
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE).sin() * 0.3)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_still_warms_up() {
        let s = StubSynthesizer::new();
        assert!(s.warm_up().is_ok());
    }

    #[test]
    fn longer_text_produces_more_samples() {
        let s = StubSynthesizer::new();
        assert!(s.synthesize("hello world").len() > s.synthesize("hi").len());
    }
}
