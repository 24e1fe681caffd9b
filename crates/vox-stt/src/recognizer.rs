//! The recognition interface itself is external (spec §4.D "The
//! recognition algorithm itself is external; the core owns the framing,
//! session lifecycle, and routing"); this module owns only that
//! contract and a stub implementation good enough to exercise it.

/// A speech recognizer shared by all sessions under an exclusive lock
/// (spec §4.D "recognition is not re-entrant").
pub trait Recognizer: Send {
    /// Pre-compile lazy kernels with a short silent buffer before serving
    /// real sessions (spec §4.D "Model preloading and warm-up").
    fn warm_up(&mut self) -> anyhow::Result<()>;

    /// Produce a transcript segment for one decoded chunk of 16 kHz
    /// float PCM. An empty string means nothing recognizable.
    fn recognize(&mut self, samples: &[f32]) -> String;
}

/// Energy-gated placeholder recognizer: stands in for the external
/// speech model behind the trait above.
pub struct StubRecognizer {
    warmed_up: bool,
    chunk_counter: u64,
}

impl StubRecognizer {
    pub fn new() -> Self {
        StubRecognizer {
            warmed_up: false,
            chunk_counter: 0,
        }
    }
}

impl Default for StubRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for StubRecognizer {
    fn warm_up(&mut self) -> anyhow::Result<()> {
        let silence = vec![0.0f32; 1600];
        let _ = self.recognize(&silence);
        self.warmed_up = true;
        Ok(())
    }

    fn recognize(&mut self, samples: &[f32]) -> String {
        if !self.warmed_up || samples.is_empty() {
            return String::new();
        }
        let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
        if rms < 0.01 {
            return String::new();
        }
        self.chunk_counter += 1;
        format!("[utterance {}]", self.chunk_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_produces_no_transcript() {
        let mut r = StubRecognizer::new();
        r.warm_up().unwrap();
        assert_eq!(r.recognize(&vec![0.0; 1600]), "");
    }

    #[test]
    fn loud_chunk_produces_a_transcript() {
        let mut r = StubRecognizer::new();
        r.warm_up().unwrap();
        let loud: Vec<f32> = (0..1600).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert_eq!(r.recognize(&loud), "[utterance 1]");
    }

    #[test]
    fn unwarmed_recognizer_stays_silent() {
        let mut r = StubRecognizer::new();
        let loud = vec![0.5f32; 1600];
        assert_eq!(r.recognize(&loud), "");
    }
}
