//! Daemon - the main gateway service
//!
//! Wires the device controller, conversation pipeline, wake word detector,
//! and HTTP API together and runs until interrupted.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{ApiServer, ApiState};
use crate::config::Config;
use crate::device::{DeviceController, DeviceLink, LinkMode, SimulatedLink};
use crate::events::EventLog;
use crate::voice::{
    ChatClient, ConversationPipeline, MicRecorder, SpeakerPlayer, SpeechToText, TextToSpeech,
    TurnKind, TurnRequest, WakeWordDetector,
};
use crate::{Error, Result};

/// Detections queue at most one turn; the listening thread blocks until the
/// in-flight turn acks
const TURN_QUEUE_DEPTH: usize = 1;

/// The fluff daemon - orchestrates device control and voice
pub struct Daemon {
    config: Config,
    controller: Arc<DeviceController>,
    detector: Arc<WakeWordDetector>,
    pipeline: Option<Arc<ConversationPipeline>>,
    turn_rx: mpsc::Receiver<TurnRequest>,
    log: EventLog,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if a cloud client cannot be constructed
    pub fn new(config: Config) -> Result<Self> {
        let log = EventLog::default();

        let link = build_link(config.mode, &log);
        let controller = Arc::new(DeviceController::new(
            link,
            config.mode,
            config.preferred_address.clone(),
            log.clone(),
        ));

        let pipeline = if config.openai.active() {
            Some(Arc::new(build_pipeline(&config, &controller, &log)?))
        } else {
            tracing::info!("conversation pipeline inactive, wake word falls back to gestures");
            None
        };

        let (turn_tx, turn_rx) = mpsc::channel(TURN_QUEUE_DEPTH);
        let detector = Arc::new(WakeWordDetector::new(
            config.wake.clone(),
            pipeline.is_some(),
            turn_tx,
            log.clone(),
        ));

        Ok(Self {
            config,
            controller,
            detector,
            pipeline,
            turn_rx,
            log,
        })
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the API server fails
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            mode = self.config.mode.as_str(),
            port = self.config.port,
            "daemon running"
        );

        // Turn driver: consumes detections and acks when the turn is done
        let driver = tokio::spawn(drive_turns(
            self.turn_rx,
            self.pipeline.clone(),
            Arc::clone(&self.controller),
            self.log.clone(),
        ));

        if self.config.wake.enabled {
            self.detector.start().await?;
        }

        let state = Arc::new(ApiState {
            controller: Arc::clone(&self.controller),
            detector: Arc::clone(&self.detector),
            log: self.log.clone(),
            mode: self.config.mode,
        });
        let server = ApiServer::new(state, self.config.port).spawn();

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        shutdown_rx.recv().await;
        tracing::info!("shutdown requested");

        self.detector.stop().await;
        self.controller.disconnect().await?;
        server.abort();
        driver.abort();

        Ok(())
    }
}

/// Build the device link for the configured mode
///
/// Real BLE transport support is probed at startup; when no adapter is
/// usable the gateway warns and falls back to the simulated link so the
/// rest of the stack stays exercisable.
fn build_link(mode: LinkMode, log: &EventLog) -> Arc<dyn DeviceLink> {
    if mode == LinkMode::Real {
        tracing::warn!("no usable BLE adapter, falling back to simulated link");
        log.add("[link] real mode requested but BLE is unavailable, using simulator");
    }
    Arc::new(SimulatedLink::new(log.clone()))
}

/// Build the conversation pipeline from cloud clients
fn build_pipeline(
    config: &Config,
    controller: &Arc<DeviceController>,
    log: &EventLog,
) -> Result<ConversationPipeline> {
    let openai = &config.openai;
    let api_key = openai
        .api_key
        .clone()
        .ok_or_else(|| Error::Config("OPENAI_API_KEY missing".to_string()))?;

    let transcriber = SpeechToText::new(api_key.clone(), openai.stt_model.clone())?;
    let responder = ChatClient::new(
        api_key.clone(),
        openai.chat_model.clone(),
        openai.persona_prompt.clone(),
    )?;
    let synthesizer = TextToSpeech::new(
        api_key,
        openai.tts_model.clone(),
        openai.tts_voice.clone(),
        openai.tts_speed,
    )?;

    Ok(ConversationPipeline::new(
        Arc::new(MicRecorder),
        Arc::new(transcriber),
        Arc::new(responder),
        Arc::new(synthesizer),
        Arc::new(SpeakerPlayer),
        Arc::clone(controller),
        log.clone(),
        openai.record_secs,
    ))
}

/// Consume turn requests from the listening thread
///
/// Every request is acked, even after a failed turn, so the listening
/// thread always resumes.
async fn drive_turns(
    mut turns: mpsc::Receiver<TurnRequest>,
    pipeline: Option<Arc<ConversationPipeline>>,
    controller: Arc<DeviceController>,
    log: EventLog,
) {
    while let Some(request) = turns.recv().await {
        let result = match (request.kind, pipeline.as_ref()) {
            (TurnKind::Conversation, Some(pipeline)) => {
                pipeline.run_turn().await.map(|_| ())
            }
            (TurnKind::Conversation, None) | (TurnKind::RandomAction, _) => {
                controller.random_action().await.map(|_| ())
            }
        };

        if let Err(e) = result {
            log.add(format!("[turn] failed: {e}"));
            tracing::warn!(error = %e, "voice turn failed");
        }

        let _ = request.done.send(());
    }
}
