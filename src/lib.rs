//! Fluff Gateway - browser and voice control for a BLE animatronic toy
//!
//! This library provides the core functionality for the fluff gateway:
//! - Device control (scan, connect, antenna color, actions, audio upload)
//! - Toy audio container encoding
//! - Wake word detection and the voice conversation pipeline
//! - HTTP API for the browser control page
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │     Browser UI   │   Wake word (microphone)          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Fluff Gateway                        │
//! │   Controller  │  Codec  │  Pipeline  │  Detector    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │     Toy (BLE / simulated)   │   OpenAI (STT/chat/TTS)│
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod device;
pub mod error;
pub mod events;
pub mod voice;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use events::EventLog;
