//! Error types for the fluff gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the fluff gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Argument out of range or malformed, rejected before any device I/O
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation requires an active device session
    #[error("not connected: {0}")]
    NotConnected(String),

    /// Referenced file does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Audio shape outside the supported PCM profile
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Cloud service returned an error status or malformed body
    #[error("upstream service error: {0}")]
    UpstreamService(String),

    /// Transcription produced no usable text, the voice turn was abandoned
    #[error("empty transcript, nothing to respond to")]
    EmptyTranscript,

    /// Every available audio upload method failed
    #[error("all upload methods failed:\n{0}")]
    TransportExhausted(String),

    /// Device link error
    #[error("device error: {0}")]
    Device(String),

    /// Audio capture/playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Wake word detection error
    #[error("wake word error: {0}")]
    WakeWord(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
