//! Voice stack: microphone capture, cloud speech services, playback, and
//! the wake-word-driven conversation loop

pub mod capture;
pub mod chat;
pub mod keyword;
pub mod pipeline;
pub mod playback;
pub mod stt;
pub mod tts;
pub mod wake;

pub use capture::{AudioCapture, MicFrameSource, MicRecorder, Recorder, SAMPLE_RATE, samples_to_wav};
pub use chat::{ChatClient, Responder};
pub use keyword::{EnergyKeywordEngine, FrameSource, KeywordEngine};
pub use pipeline::{ConversationPipeline, TurnOutcome};
pub use playback::{AudioPlayback, SpeakerPlayer, SpeechPlayer};
pub use stt::{SpeechToText, Transcriber};
pub use tts::{Synthesizer, TextToSpeech};
pub use wake::{
    EngineFactory, SourceFactory, TurnKind, TurnRequest, WakeWordDetector, WakeWordStatus,
};
