//! Wake word detection lifecycle
//!
//! The detector owns a dedicated OS thread that blocks on microphone
//! frames. Detections cross into async land over a bounded channel of
//! [`TurnRequest`]s; the listening thread then blocks on the turn's
//! completion ack so it never re-triggers on the gateway's own speech.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc, oneshot};

use crate::Result;
use crate::config::WakeConfig;
use crate::events::EventLog;

use super::capture::MicFrameSource;
use super::keyword::{EnergyKeywordEngine, FrameSource, KeywordEngine};

/// Pause after a completed turn before listening resumes
const DEBOUNCE: Duration = Duration::from_secs(2);

/// How long `stop` waits for the listening thread before detaching
const STOP_GRACE: Duration = Duration::from_secs(2);

/// What to do when the keyword is heard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Fire one random canned gesture
    RandomAction,
    /// Run the full conversation pipeline
    Conversation,
}

/// One detection, sent from the listening thread to the turn driver
pub struct TurnRequest {
    pub kind: TurnKind,
    /// Acked when the turn finishes, releasing the listening thread
    pub done: oneshot::Sender<()>,
}

/// Detector status for the HTTP surface
#[derive(Debug, Clone, serde::Serialize)]
pub struct WakeWordStatus {
    pub enabled: bool,
    pub running: bool,
    pub keyword: String,
    pub conversation_active: bool,
}

/// Builds the frame source on the listening thread (audio streams must not
/// cross threads)
pub type SourceFactory = Arc<dyn Fn() -> Result<Box<dyn FrameSource>> + Send + Sync>;

/// Builds a fresh keyword engine per listening session
pub type EngineFactory = Box<dyn Fn() -> Box<dyn KeywordEngine + Send> + Send + Sync>;

/// Owns the listening thread and its start/stop lifecycle
pub struct WakeWordDetector {
    config: WakeConfig,
    conversation_active: bool,
    turns: mpsc::Sender<TurnRequest>,
    log: EventLog,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<std::thread::JoinHandle<()>>>,
    source_factory: SourceFactory,
    engine_factory: EngineFactory,
}

impl WakeWordDetector {
    /// Create a detector over the default microphone and energy engine
    #[must_use]
    pub fn new(
        config: WakeConfig,
        conversation_active: bool,
        turns: mpsc::Sender<TurnRequest>,
        log: EventLog,
    ) -> Self {
        let keyword = config.keyword.clone();
        Self::with_sources(
            config,
            conversation_active,
            turns,
            log,
            Arc::new(|| Ok(Box::new(MicFrameSource::new()?) as Box<dyn FrameSource>)),
            Box::new(move || Box::new(EnergyKeywordEngine::new(&keyword))),
        )
    }

    /// Create a detector with injected source and engine factories
    #[must_use]
    pub fn with_sources(
        config: WakeConfig,
        conversation_active: bool,
        turns: mpsc::Sender<TurnRequest>,
        log: EventLog,
        source_factory: SourceFactory,
        engine_factory: EngineFactory,
    ) -> Self {
        Self {
            config,
            conversation_active,
            turns,
            log,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
            source_factory,
            engine_factory,
        }
    }

    /// Whether the listening thread is alive
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> WakeWordStatus {
        WakeWordStatus {
            enabled: self.config.enabled,
            running: self.is_running(),
            keyword: self.config.keyword.clone(),
            conversation_active: self.conversation_active,
        }
    }

    /// Start the listening thread
    ///
    /// A no-op (logged, not an error) when the detector is disabled, has no
    /// access key, or is already running.
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be spawned
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            self.log.add("[wake] detector disabled by configuration");
            return Ok(());
        }
        if self.config.access_key.is_empty() {
            self.log
                .add("[wake] no access key configured, detector not started");
            return Ok(());
        }

        let mut handle = self.handle.lock().await;
        if self.running.load(Ordering::SeqCst) {
            self.log.add("[wake] already listening");
            return Ok(());
        }

        let source_factory = Arc::clone(&self.source_factory);
        let engine = (self.engine_factory)();
        let running = Arc::clone(&self.running);
        let turns = self.turns.clone();
        let log = self.log.clone();
        let kind = if self.conversation_active {
            TurnKind::Conversation
        } else {
            TurnKind::RandomAction
        };
        let keyword = self.config.keyword.clone();

        running.store(true, Ordering::SeqCst);
        let thread = match std::thread::Builder::new()
            .name("wake-listener".to_string())
            .spawn(move || {
                listening_loop(source_factory(), engine, &running, &turns, kind, &log);
                running.store(false, Ordering::SeqCst);
            }) {
            Ok(thread) => thread,
            Err(e) => {
                // A failed spawn must not leave the flag claiming a
                // listener exists
                self.running.store(false, Ordering::SeqCst);
                return Err(crate::Error::Io(e));
            }
        };

        *handle = Some(thread);
        self.log
            .add(format!("[wake] listening for keyword '{keyword}'"));
        Ok(())
    }

    /// Stop the listening thread
    ///
    /// Waits a bounded grace period for the thread to notice the flag; a
    /// thread still blocked after that is detached with a log line rather
    /// than stalling the caller.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let mut handle = self.handle.lock().await;
        let Some(thread) = handle.take() else {
            self.log.add("[wake] detector was not running");
            return;
        };

        let start = Instant::now();
        while !thread.is_finished() && start.elapsed() < STOP_GRACE {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if thread.is_finished() {
            let _ = thread.join();
            self.log.add("[wake] detector stopped");
        } else {
            self.log
                .add("[wake] listener did not exit in time, detaching");
        }
    }
}

/// The blocking listen loop; runs on the dedicated thread
fn listening_loop(
    source: Result<Box<dyn FrameSource>>,
    mut engine: Box<dyn KeywordEngine + Send>,
    running: &AtomicBool,
    turns: &mpsc::Sender<TurnRequest>,
    kind: TurnKind,
    log: &EventLog,
) {
    let mut source = match source {
        Ok(source) => source,
        Err(e) => {
            log.add(format!("[wake] audio source unavailable: {e}"));
            return;
        }
    };

    while running.load(Ordering::SeqCst) {
        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                // Transient capture errors must not kill the loop
                log.add(format!("[wake] frame read failed: {e}"));
                std::thread::sleep(Duration::from_millis(250));
                continue;
            }
        };

        if !engine.detect(&frame) {
            continue;
        }

        log.add("[wake] keyword detected");
        let (done_tx, done_rx) = oneshot::channel();
        if turns
            .blocking_send(TurnRequest {
                kind,
                done: done_tx,
            })
            .is_err()
        {
            log.add("[wake] turn channel closed, stopping listener");
            return;
        }

        // Block until the turn handler acks so the engine never hears the
        // gateway's own reply.
        let _ = done_rx.blocking_recv();

        // Hold off after the turn finishes so a decaying echo of the
        // reply cannot re-trigger the engine; sliced so stop() stays
        // responsive.
        let lull = Instant::now();
        while running.load(Ordering::SeqCst) && lull.elapsed() < DEBOUNCE {
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}
