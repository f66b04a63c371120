//! One voice turn: record, transcribe, respond, synthesize, play, act
//!
//! Stages run strictly in order and each one gates the next. A failed stage
//! aborts the rest of the turn with an error the caller logs and swallows;
//! the listening loop keeps running regardless of how a turn ends.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::device::DeviceController;
use crate::events::EventLog;
use crate::{Error, Result};

use super::capture::Recorder;
use super::chat::Responder;
use super::playback::SpeechPlayer;
use super::stt::Transcriber;
use super::tts::Synthesizer;

/// What a completed turn said and heard
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub transcript: String,
    pub reply: String,
}

/// Runs the full voice turn against injected stage implementations
pub struct ConversationPipeline {
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    responder: Arc<dyn Responder>,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn SpeechPlayer>,
    controller: Arc<DeviceController>,
    log: EventLog,
    record_secs: u64,
}

impl ConversationPipeline {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn SpeechPlayer>,
        controller: Arc<DeviceController>,
        log: EventLog,
        record_secs: u64,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            responder,
            synthesizer,
            player,
            controller,
            log,
            record_secs,
        }
    }

    /// Run one complete voice turn
    ///
    /// Temporary files for the recording and the synthesized reply are
    /// deleted on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the failing stage's error; `EmptyTranscript` when nothing
    /// usable was heard.
    pub async fn run_turn(&self) -> Result<TurnOutcome> {
        self.log
            .add(format!("[turn] recording {}s of audio...", self.record_secs));
        let recording = self
            .recorder
            .record(Duration::from_secs(self.record_secs))
            .await?;

        self.log.add("[turn] transcribing...");
        let transcript_result = self.transcriber.transcribe(&recording).await;
        remove_temp(&self.log, &recording);
        let transcript = transcript_result?.trim().to_string();

        if transcript.is_empty() {
            self.log.add("[turn] nothing heard, turn abandoned");
            return Err(Error::EmptyTranscript);
        }
        self.log.add(format!("[turn] heard: {transcript}"));

        self.log.add("[turn] generating reply...");
        let reply = self.responder.respond(&transcript).await?;
        self.log.add(format!("[turn] reply: {reply}"));

        self.log.add("[turn] synthesizing speech...");
        let speech = self.synthesizer.synthesize(&reply).await?;

        self.log.add("[turn] playing reply...");
        let play_result = self.player.play(&speech).await;
        remove_temp(&self.log, &speech);
        play_result?;

        self.log.add("[turn] dispatching gesture...");
        self.controller.random_action().await?;

        self.log.add("[turn] done");
        Ok(TurnOutcome { transcript, reply })
    }
}

/// Delete a temporary stage file, logging (not failing) on error
fn remove_temp(log: &EventLog, path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log.add(format!(
            "[turn] temp cleanup failed for {}: {e}",
            path.display()
        ));
    }
}
