//! Conversation pipeline integration tests

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use fluff_gateway::device::{
    ActionCommand, AntennaColor, DeviceController, DeviceLink, DiscoveredDevice, LinkMode,
    UploadMethod,
};
use fluff_gateway::voice::{
    ConversationPipeline, Recorder, Responder, SpeechPlayer, Synthesizer, Transcriber,
};
use fluff_gateway::{Error, EventLog, Result};

/// Link that accepts everything silently
struct NullLink;

#[async_trait]
impl DeviceLink for NullLink {
    async fn discover(&self, _timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        Ok(Vec::new())
    }
    async fn connect(&self, address: Option<&str>) -> Result<String> {
        Ok(address.unwrap_or("AA:BB:CC:DD:EE:FF").to_string())
    }
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
    async fn set_antenna_color(&self, _color: AntennaColor) -> Result<()> {
        Ok(())
    }
    async fn trigger_action(&self, _cmd: ActionCommand) -> Result<()> {
        Ok(())
    }
    async fn upload_audio(&self, _method: UploadMethod, _path: &Path) -> Result<()> {
        Ok(())
    }
}

struct FakeRecorder {
    dir: PathBuf,
}

#[async_trait]
impl Recorder for FakeRecorder {
    async fn record(&self, _duration: Duration) -> Result<PathBuf> {
        let path = self.dir.join("recording.wav");
        std::fs::write(&path, b"fake wav")?;
        Ok(path)
    }
}

struct FakeTranscriber {
    text: String,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        self.called.store(true, Ordering::SeqCst);
        assert!(path.exists(), "recording must exist while transcribing");
        Ok(self.text.clone())
    }
}

struct FakeResponder {
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Responder for FakeResponder {
    async fn respond(&self, transcript: &str) -> Result<String> {
        self.called.store(true, Ordering::SeqCst);
        Ok(format!("echo: {transcript}"))
    }
}

struct FakeSynthesizer {
    dir: PathBuf,
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<PathBuf> {
        self.called.store(true, Ordering::SeqCst);
        let path = self.dir.join("reply.mp3");
        std::fs::write(&path, b"fake mp3")?;
        Ok(path)
    }
}

struct FakePlayer {
    called: Arc<AtomicBool>,
    fail: bool,
}

#[async_trait]
impl SpeechPlayer for FakePlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        self.called.store(true, Ordering::SeqCst);
        assert!(path.exists(), "reply must exist while playing");
        if self.fail {
            return Err(Error::Audio("speaker unavailable".to_string()));
        }
        Ok(())
    }
}

struct Harness {
    pipeline: ConversationPipeline,
    dir: tempfile::TempDir,
    transcriber_called: Arc<AtomicBool>,
    responder_called: Arc<AtomicBool>,
    synthesizer_called: Arc<AtomicBool>,
    player_called: Arc<AtomicBool>,
}

fn harness(transcript: &str, player_fails: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let log = EventLog::default();
    let controller = Arc::new(DeviceController::new(
        Arc::new(NullLink),
        LinkMode::Simulated,
        None,
        log.clone(),
    ));

    let transcriber_called = Arc::new(AtomicBool::new(false));
    let responder_called = Arc::new(AtomicBool::new(false));
    let synthesizer_called = Arc::new(AtomicBool::new(false));
    let player_called = Arc::new(AtomicBool::new(false));

    let pipeline = ConversationPipeline::new(
        Arc::new(FakeRecorder {
            dir: dir.path().to_path_buf(),
        }),
        Arc::new(FakeTranscriber {
            text: transcript.to_string(),
            called: Arc::clone(&transcriber_called),
        }),
        Arc::new(FakeResponder {
            called: Arc::clone(&responder_called),
        }),
        Arc::new(FakeSynthesizer {
            dir: dir.path().to_path_buf(),
            called: Arc::clone(&synthesizer_called),
        }),
        Arc::new(FakePlayer {
            called: Arc::clone(&player_called),
            fail: player_fails,
        }),
        controller,
        log,
        1,
    );

    Harness {
        pipeline,
        dir,
        transcriber_called,
        responder_called,
        synthesizer_called,
        player_called,
    }
}

#[tokio::test]
async fn full_turn_runs_every_stage_and_cleans_up() {
    let h = harness("hello toy", false);

    let outcome = h.pipeline.run_turn().await.unwrap();
    assert_eq!(outcome.transcript, "hello toy");
    assert_eq!(outcome.reply, "echo: hello toy");

    assert!(h.transcriber_called.load(Ordering::SeqCst));
    assert!(h.responder_called.load(Ordering::SeqCst));
    assert!(h.synthesizer_called.load(Ordering::SeqCst));
    assert!(h.player_called.load(Ordering::SeqCst));

    // Both stage temp files are gone
    assert!(!h.dir.path().join("recording.wav").exists());
    assert!(!h.dir.path().join("reply.mp3").exists());
}

#[tokio::test]
async fn empty_transcript_aborts_after_stage_two() {
    let h = harness("   ", false);

    let err = h.pipeline.run_turn().await.unwrap_err();
    assert!(matches!(err, Error::EmptyTranscript));

    assert!(h.transcriber_called.load(Ordering::SeqCst));
    assert!(!h.responder_called.load(Ordering::SeqCst));
    assert!(!h.synthesizer_called.load(Ordering::SeqCst));
    assert!(!h.player_called.load(Ordering::SeqCst));

    // The recording is still deleted
    assert!(!h.dir.path().join("recording.wav").exists());
}

#[tokio::test]
async fn playback_failure_still_deletes_the_reply() {
    let h = harness("hello toy", true);

    let err = h.pipeline.run_turn().await.unwrap_err();
    assert!(matches!(err, Error::Audio(_)));

    assert!(h.player_called.load(Ordering::SeqCst));
    assert!(!h.dir.path().join("recording.wav").exists());
    assert!(!h.dir.path().join("reply.mp3").exists());
}

#[tokio::test]
async fn transcript_whitespace_is_trimmed() {
    let h = harness("  hi there  ", false);

    let outcome = h.pipeline.run_turn().await.unwrap();
    assert_eq!(outcome.transcript, "hi there");
}
