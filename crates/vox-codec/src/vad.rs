//! Hysteresis-gated voice-activity chunker (spec §4.B step 4).
//!
//! Operates on 16 kHz float32 frames in 10 ms windows. See DESIGN.md for
//! the resolution of the Open Question around how a short inter-utterance
//! silence gap interacts with the 900 ms hangover: a gap shorter than the
//! hangover does not close the chunk, it merges into it, and the hangover
//! timer is what finally closes a multi-burst chunk.

use std::collections::VecDeque;

const SAMPLE_RATE: usize = 16_000;
const WINDOW_MS: usize = 10;
const BASE_RMS: f32 = 0.02;
const START_MULTIPLIER: f32 = 1.05;
const STOP_MULTIPLIER: f32 = 0.5;
const PREROLL_MS: usize = 350;
const HANGOVER_MS: usize = 900;
const MIN_CHUNK_MS: usize = 800;
const MAX_CHUNK_MS: usize = 4000;
const OVERLAP_MS: usize = 250;

fn ms_to_samples(ms: usize) -> usize {
    SAMPLE_RATE * ms / 1000
}

pub struct VadChunker {
    window_samples: usize,
    start_thresh: f32,
    stop_thresh: f32,
    preroll_cap: usize,
    hangover_samples: usize,
    min_chunk_samples: usize,
    max_chunk_samples: usize,
    overlap_samples: usize,

    preroll: VecDeque<f32>,
    active: bool,
    collected: Vec<f32>,
    silence_run: usize,
    leftover: Vec<f32>,
}

impl VadChunker {
    pub fn new() -> Self {
        VadChunker {
            window_samples: ms_to_samples(WINDOW_MS),
            start_thresh: BASE_RMS * START_MULTIPLIER,
            stop_thresh: BASE_RMS * STOP_MULTIPLIER,
            preroll_cap: ms_to_samples(PREROLL_MS),
            hangover_samples: ms_to_samples(HANGOVER_MS),
            min_chunk_samples: ms_to_samples(MIN_CHUNK_MS),
            max_chunk_samples: ms_to_samples(MAX_CHUNK_MS),
            overlap_samples: ms_to_samples(OVERLAP_MS),
            preroll: VecDeque::new(),
            active: false,
            collected: Vec::new(),
            silence_run: 0,
            leftover: Vec::new(),
        }
    }

    /// Feed newly-available 16 kHz float samples; returns zero or more
    /// completed chunks in arrival order.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.leftover.extend_from_slice(samples);
        let mut emitted = Vec::new();

        while self.leftover.len() >= self.window_samples {
            let window: Vec<f32> = self.leftover.drain(0..self.window_samples).collect();
            let rms = rms(&window);

            if !self.active {
                self.preroll.extend(window.iter().copied());
                while self.preroll.len() > self.preroll_cap {
                    self.preroll.pop_front();
                }
                if rms >= self.start_thresh {
                    self.active = true;
                    // `self.preroll` already has `window` as its tail (it was
                    // appended above), so collected starts as exactly the
                    // preroll — appending `window` again would duplicate it.
                    self.collected = self.preroll.iter().copied().collect();
                    self.silence_run = 0;
                }
                continue;
            }

            self.collected.extend(window.iter().copied());
            if rms < self.stop_thresh {
                self.silence_run += window.len();
            } else {
                self.silence_run = 0;
            }

            if self.collected.len() >= self.max_chunk_samples {
                let chunk = std::mem::take(&mut self.collected);
                let overlap_start = chunk.len().saturating_sub(self.overlap_samples);
                self.collected = chunk[overlap_start..].to_vec();
                self.silence_run = 0;
                emitted.push(chunk);
            } else if self.silence_run >= self.hangover_samples {
                let mut chunk = std::mem::take(&mut self.collected);
                // the hangover tail itself is silence, not utterance audio
                let trim = self.silence_run.min(chunk.len());
                chunk.truncate(chunk.len() - trim);
                self.active = false;
                self.silence_run = 0;
                self.preroll.clear();
                if chunk.len() >= self.min_chunk_samples {
                    emitted.push(chunk);
                }
                // else: below the minimum and not forced by a max-length
                // cut — discarded per spec §8 boundary behavior.
            }
        }

        emitted
    }
}

impl Default for VadChunker {
    fn default() -> Self {
        Self::new()
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(ms: usize) -> Vec<f32> {
        vec![0.0; ms_to_samples(ms)]
    }

    fn tone(ms: usize, amplitude: f32) -> Vec<f32> {
        let n = ms_to_samples(ms);
        (0..n)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 300.0 * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn pure_silence_produces_no_chunks() {
        let mut vad = VadChunker::new();
        let chunks = vad.push(&silence(5000));
        assert!(chunks.is_empty());
    }

    #[test]
    fn long_speech_is_cut_at_four_seconds_with_overlap() {
        let mut vad = VadChunker::new();
        // amplitude chosen so RMS of a sine of this peak clears start_thresh
        let mut chunks = vad.push(&tone(6000, 0.05));
        chunks.extend(vad.push(&silence(2000)));

        assert!(!chunks.is_empty());
        for c in &chunks[..chunks.len() - 1] {
            let dur_ms = c.len() * 1000 / SAMPLE_RATE;
            assert!(dur_ms <= MAX_CHUNK_MS + 1, "chunk exceeded 4s: {dur_ms}ms");
        }
    }

    #[test]
    fn short_burst_below_minimum_is_dropped() {
        let mut vad = VadChunker::new();
        let mut chunks = vad.push(&silence(200));
        chunks.extend(vad.push(&tone(300, 0.05)));
        chunks.extend(vad.push(&silence(2000)));
        assert!(chunks.is_empty(), "300ms burst should be dropped as below minimum");
    }

    #[test]
    fn speech_between_silences_yields_one_chunk_with_preroll() {
        let mut vad = VadChunker::new();
        let mut chunks = vad.push(&silence(500));
        chunks.extend(vad.push(&tone(1200, 0.05)));
        chunks.extend(vad.push(&silence(2000)));

        assert_eq!(chunks.len(), 1);
        let dur_ms = chunks[0].len() * 1000 / SAMPLE_RATE;
        // includes up to 350ms pre-roll plus the 1.2s burst.
        assert!(dur_ms >= 1200 && dur_ms <= 1200 + PREROLL_MS + 50);
    }
}
