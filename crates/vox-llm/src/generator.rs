//! The reply-generation interface itself is an interface contract only
//! (spec §4.E "LLM worker ... interface contracts only"); this module
//! owns the trait and a stub good enough to exercise the session
//! plumbing around it.

/// Shared by all calls under one lock, mirroring the STT recognizer's
/// exclusivity model (spec §4.D "recognition is not re-entrant") since
/// a real model backing this worker would carry the same constraint.
pub trait Generator: Send {
    fn reply(&mut self, call_id: u32, transcript: &str) -> String;
}

pub struct StubGenerator {
    turn_counter: u64,
}

impl StubGenerator {
    pub fn new() -> Self {
        StubGenerator { turn_counter: 0 }
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for StubGenerator {
    fn reply(&mut self, call_id: u32, transcript: &str) -> String {
        self.turn_counter += 1;
        tracing::debug!(call_id, turn = self.turn_counter, "generating reply");
        format!("Got it: {transcript}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_echoes_transcript() {
        let mut g = StubGenerator::new();
        let reply = g.reply(1, "hello there");
        assert_eq!(reply, "Got it: hello there");
    }
}
