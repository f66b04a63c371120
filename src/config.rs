//! Configuration for the fluff gateway
//!
//! Everything is environment-driven so the gateway can be pointed at a real
//! toy or run fully simulated without a config file.

use std::env;

use crate::device::LinkMode;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Device link mode, fixed for the process lifetime
    pub mode: LinkMode,

    /// HTTP API port
    pub port: u16,

    /// Preferred BLE address to connect to when none is given explicitly
    pub preferred_address: Option<String>,

    /// Wake word detector configuration
    pub wake: WakeConfig,

    /// OpenAI conversation configuration
    pub openai: OpenAiConfig,
}

/// Wake word detector configuration
#[derive(Debug, Clone, Default)]
pub struct WakeConfig {
    /// Enable the detector (`FLUFF_WAKE_ENABLED`)
    pub enabled: bool,

    /// Keyword engine access key (`FLUFF_WAKE_ACCESS_KEY`)
    pub access_key: String,

    /// Keyword to listen for (`FLUFF_WAKE_KEYWORD`)
    pub keyword: String,
}

/// OpenAI conversation configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Enable the conversation pipeline after a wake word hit
    /// (`FLUFF_OPENAI_ENABLED`)
    pub enabled: bool,

    /// API key (`OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Seconds of microphone audio to record per turn (`FLUFF_RECORD_SECS`)
    pub record_secs: u64,

    /// Transcription model
    pub stt_model: String,

    /// Chat model
    pub chat_model: String,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// Persona instruction prepended to every chat request
    pub persona_prompt: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            record_secs: 5,
            stt_model: "whisper-1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            tts_voice: "nova".to_string(),
            tts_speed: 1.1,
            persona_prompt: "Você só responde um Oi animado!".to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Whether the conversation pipeline can actually run
    #[must_use]
    pub fn active(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// `port` overrides `FLUFF_PORT` when given (CLI flag wins).
    #[must_use]
    pub fn from_env(port: Option<u16>) -> Self {
        let mode = if env_bool("FLUFF_MOCK", true) {
            LinkMode::Simulated
        } else {
            LinkMode::Real
        };

        let port = port
            .or_else(|| env::var("FLUFF_PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        let preferred_address = env::var("FURBY_ADDRESS")
            .ok()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let wake = WakeConfig {
            enabled: env_bool("FLUFF_WAKE_ENABLED", false),
            access_key: env::var("FLUFF_WAKE_ACCESS_KEY")
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
            keyword: env::var("FLUFF_WAKE_KEYWORD").unwrap_or_else(|_| "alexa".to_string()),
        };

        let defaults = OpenAiConfig::default();
        let openai = OpenAiConfig {
            enabled: env_bool("FLUFF_OPENAI_ENABLED", false),
            api_key: env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            record_secs: env::var("FLUFF_RECORD_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.record_secs),
            persona_prompt: env::var("FLUFF_PERSONA_PROMPT")
                .unwrap_or(defaults.persona_prompt),
            ..defaults
        };

        Self {
            mode,
            port,
            preferred_address,
            wake,
            openai,
        }
    }
}

/// Parse a boolean environment variable ("true"/"false", case-insensitive)
fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_active_requires_key_and_flag() {
        let mut cfg = OpenAiConfig::default();
        assert!(!cfg.active());

        cfg.enabled = true;
        assert!(!cfg.active());

        cfg.api_key = Some("sk-test".to_string());
        assert!(cfg.active());
    }
}
