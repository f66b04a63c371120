//! Chat reply generation

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Chat request timeout
const CHAT_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Produces the toy's spoken reply to a transcript
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply for the user's transcribed speech
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is malformed
    async fn respond(&self, transcript: &str) -> Result<String>;
}

/// [`Responder`] backed by the OpenAI chat completions API
///
/// Every request carries the persona instruction as the system message; the
/// gateway keeps no conversation history between turns.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    persona: String,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the client cannot be built
    pub fn new(api_key: String, model: String, persona: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for chat".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key,
            model,
            persona,
        })
    }
}

#[async_trait]
impl Responder for ChatClient {
    async fn respond(&self, transcript: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.persona,
                },
                ChatMessage {
                    role: "user",
                    content: transcript,
                },
            ],
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::UpstreamService(format!(
                "chat error {status}: {body}"
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        let reply = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::info!(reply = %reply, "chat reply generated");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = ChatClient::new(
            String::new(),
            "gpt-4o-mini".to_string(),
            "persona".to_string(),
        );
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn response_body_extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"oi!"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        assert_eq!(reply, "oi!");
    }
}
