//! Text-to-speech (TTS) processing

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Synthesis request timeout
const TTS_TIMEOUT: Duration = Duration::from_secs(120);

/// Turns reply text into a playable audio file
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` into a temporary MP3 file and return its path
    ///
    /// The caller owns the returned path and is responsible for deleting it.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or streaming the body fails
    async fn synthesize(&self, text: &str) -> Result<PathBuf>;
}

/// [`Synthesizer`] backed by the OpenAI speech API
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the client cannot be built
    pub fn new(api_key: String, model: String, voice: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(TTS_TIMEOUT)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key,
            model,
            voice,
            speed,
        })
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<PathBuf> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "TTS request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::UpstreamService(format!(
                "TTS error {status}: {body}"
            )));
        }

        let path = tempfile::Builder::new()
            .prefix("fluff-tts-")
            .suffix(".mp3")
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(|e| Error::Io(e.error))?;

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::Http)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(path = %path.display(), "speech synthesized");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = TextToSpeech::new(
            String::new(),
            "gpt-4o-mini-tts".to_string(),
            "nova".to_string(),
            1.1,
        );
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
