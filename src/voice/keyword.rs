//! Keyword spotting over raw microphone frames
//!
//! The listening loop feeds fixed-size f32 frames through a
//! [`KeywordEngine`]; the engine says when the keyword (or, for the default
//! energy engine, a complete speech burst) has been heard.

use crate::Result;

/// Minimum RMS energy to consider a frame speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum accumulated speech before a burst counts (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends a burst (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Pulls successive audio frames for the listening loop
///
/// Implementations typically block for one frame's worth of wall time. The
/// trait is deliberately not `Send`: sources wrap audio streams that must be
/// created and consumed on the listening thread itself.
pub trait FrameSource {
    /// Block until the next frame of mono f32 samples is available
    ///
    /// # Errors
    ///
    /// Returns error if the underlying audio stream fails
    fn read_frame(&mut self) -> Result<Vec<f32>>;
}

/// Decides whether a keyword occurred in the frame stream
pub trait KeywordEngine {
    /// Feed one frame; returns true on a detection
    fn detect(&mut self, frame: &[f32]) -> bool;

    /// Human-readable engine name for status reporting
    fn name(&self) -> &str;
}

/// State of the energy engine's burst tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstState {
    Idle,
    Listening,
}

/// Default [`KeywordEngine`]: RMS energy burst detection
///
/// Fires when a sustained speech burst is followed by silence. No actual
/// keyword matching happens; any loud-enough utterance triggers. Good
/// enough to drive the toy without a third-party spotting service.
pub struct EnergyKeywordEngine {
    keyword: String,
    state: BurstState,
    speech_samples: usize,
    silence_counter: usize,
}

impl EnergyKeywordEngine {
    #[must_use]
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase().trim().to_string(),
            state: BurstState::Idle,
            speech_samples: 0,
            silence_counter: 0,
        }
    }

    fn reset(&mut self) {
        self.state = BurstState::Idle;
        self.speech_samples = 0;
        self.silence_counter = 0;
    }
}

impl KeywordEngine for EnergyKeywordEngine {
    fn detect(&mut self, frame: &[f32]) -> bool {
        let energy = calculate_energy(frame);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            BurstState::Idle => {
                if is_speech {
                    self.state = BurstState::Listening;
                    self.speech_samples = frame.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected, listening");
                }
            }
            BurstState::Listening => {
                if is_speech {
                    self.speech_samples += frame.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += frame.len();
                }

                if self.silence_counter > SILENCE_SAMPLES
                    && self.speech_samples > MIN_SPEECH_SAMPLES
                {
                    tracing::debug!(samples = self.speech_samples, "speech burst complete");
                    self.reset();
                    return true;
                }

                // Too much silence without enough speech
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    self.reset();
                }
            }
        }

        false
    }

    fn name(&self) -> &str {
        &self.keyword
    }
}

/// RMS energy of a frame
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_of_silence_is_near_zero() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);
    }

    #[test]
    fn burst_followed_by_silence_triggers() {
        let mut engine = EnergyKeywordEngine::new("alexa");
        let loud = vec![0.5f32; 1600];
        let quiet = vec![0.0f32; 1600];

        // Four loud frames cross the minimum speech threshold
        for _ in 0..4 {
            assert!(!engine.detect(&loud));
        }

        // Silence after the burst eventually fires exactly once
        let mut fired = 0;
        for _ in 0..8 {
            if engine.detect(&quiet) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn silence_alone_never_triggers() {
        let mut engine = EnergyKeywordEngine::new("alexa");
        let quiet = vec![0.0f32; 1600];
        for _ in 0..50 {
            assert!(!engine.detect(&quiet));
        }
    }
}
