//! Speech-to-text (STT) processing

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Transcription request timeout
const STT_TIMEOUT: Duration = Duration::from_secs(90);

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Turns a recorded WAV file into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the WAV file at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the service rejects the audio
    async fn transcribe(&self, path: &Path) -> Result<String>;
}

/// [`Transcriber`] backed by OpenAI Whisper
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl SpeechToText {
    /// Create a new STT instance
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the client cannot be built
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(STT_TIMEOUT)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        let audio = tokio::fs::read(path).await?;
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::UpstreamService(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::UpstreamService(format!(
                "transcription error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}
