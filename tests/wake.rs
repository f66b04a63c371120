//! Wake word detector lifecycle tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use fluff_gateway::config::WakeConfig;
use fluff_gateway::voice::{
    FrameSource, KeywordEngine, TurnKind, TurnRequest, WakeWordDetector,
};
use fluff_gateway::{Error, EventLog, Result};

/// Frame source driven by a script; yields silence forever afterwards
struct ScriptedSource {
    script: VecDeque<Result<Vec<f32>>>,
}

impl FrameSource for ScriptedSource {
    fn read_frame(&mut self) -> Result<Vec<f32>> {
        std::thread::sleep(Duration::from_millis(5));
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Engine that fires on any non-empty frame
struct NonEmptyEngine;

impl KeywordEngine for NonEmptyEngine {
    fn detect(&mut self, frame: &[f32]) -> bool {
        !frame.is_empty()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn detector(
    config: WakeConfig,
    conversation: bool,
    script: Vec<Result<Vec<f32>>>,
) -> (WakeWordDetector, mpsc::Receiver<TurnRequest>) {
    let (tx, rx) = mpsc::channel(1);
    let script = Arc::new(Mutex::new(VecDeque::from(script)));

    let detector = WakeWordDetector::with_sources(
        config,
        conversation,
        tx,
        EventLog::default(),
        Arc::new(move || {
            let script = std::mem::take(&mut *script.lock().unwrap());
            Ok(Box::new(ScriptedSource { script }) as Box<dyn FrameSource>)
        }),
        Box::new(|| Box::new(NonEmptyEngine)),
    );
    (detector, rx)
}

fn enabled_config() -> WakeConfig {
    WakeConfig {
        enabled: true,
        access_key: "test-key".to_string(),
        keyword: "alexa".to_string(),
    }
}

#[tokio::test]
async fn detection_requests_random_action_without_conversation() {
    let (detector, mut rx) = detector(enabled_config(), false, vec![Ok(vec![0.5; 1600])]);

    detector.start().await.unwrap();
    assert!(detector.is_running());

    let request = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("detection within deadline")
        .expect("channel open");
    assert_eq!(request.kind, TurnKind::RandomAction);
    request.done.send(()).unwrap();

    detector.stop().await;
    assert!(!detector.is_running());
}

#[tokio::test]
async fn detection_requests_conversation_when_active() {
    let (detector, mut rx) = detector(enabled_config(), true, vec![Ok(vec![0.5; 1600])]);

    detector.start().await.unwrap();

    let request = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("detection within deadline")
        .expect("channel open");
    assert_eq!(request.kind, TurnKind::Conversation);
    request.done.send(()).unwrap();

    detector.stop().await;
}

#[tokio::test]
async fn listening_loop_survives_frame_errors() {
    let script = vec![
        Err(Error::Audio("glitch".to_string())),
        Err(Error::Audio("glitch".to_string())),
        Ok(vec![0.5; 1600]),
    ];
    let (detector, mut rx) = detector(enabled_config(), false, script);

    detector.start().await.unwrap();

    let request = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("detection despite glitches")
        .expect("channel open");
    assert_eq!(request.kind, TurnKind::RandomAction);
    request.done.send(()).unwrap();

    detector.stop().await;
}

#[tokio::test]
async fn disabled_detector_start_is_a_logged_noop() {
    let config = WakeConfig {
        enabled: false,
        access_key: "test-key".to_string(),
        keyword: "alexa".to_string(),
    };
    let (detector, _rx) = detector(config, false, Vec::new());

    detector.start().await.unwrap();
    assert!(!detector.is_running());
}

#[tokio::test]
async fn missing_access_key_start_is_a_logged_noop() {
    let config = WakeConfig {
        enabled: true,
        access_key: String::new(),
        keyword: "alexa".to_string(),
    };
    let (detector, _rx) = detector(config, false, Vec::new());

    detector.start().await.unwrap();
    assert!(!detector.is_running());
}

#[tokio::test]
async fn start_twice_keeps_one_listener() {
    let (detector, mut rx) = detector(enabled_config(), false, vec![Ok(vec![0.5; 1600])]);

    detector.start().await.unwrap();
    detector.start().await.unwrap();

    let request = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("detection within deadline")
        .expect("channel open");
    request.done.send(()).unwrap();

    // The post-turn pause plus a single loud frame means no second request
    let second = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(second.is_err());

    detector.stop().await;
}

#[tokio::test]
async fn listening_pauses_after_a_long_turn_completes() {
    // A steady stream of loud frames keeps the engine firing; only the
    // post-turn hold-off keeps the gateway's own reply from starting
    // another turn.
    let script = (0..2000).map(|_| Ok(vec![0.5; 1600])).collect();
    let (detector, mut rx) = detector(enabled_config(), true, script);

    detector.start().await.unwrap();

    let request = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("detection within deadline")
        .expect("channel open");
    assert_eq!(request.kind, TurnKind::Conversation);

    // A turn that outlasts any window measured from detection time
    tokio::time::sleep(Duration::from_millis(2200)).await;
    request.done.send(()).unwrap();

    // Listening must not resume for two seconds after the ack
    let early = tokio::time::timeout(Duration::from_millis(1500), rx.recv()).await;
    assert!(
        early.is_err(),
        "detector re-triggered during the post-turn pause"
    );

    // ...and does resume once the pause lapses
    let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("listening resumed after the pause")
        .expect("channel open");
    next.done.send(()).unwrap();

    detector.stop().await;
}

#[tokio::test]
async fn detector_is_restartable_after_source_open_failure() {
    let (tx, _rx) = mpsc::channel(1);
    let attempts = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&attempts);

    let detector = WakeWordDetector::with_sources(
        enabled_config(),
        false,
        tx,
        EventLog::default(),
        Arc::new(move || {
            *counter.lock().unwrap() += 1;
            Err(Error::Audio("no capture device".to_string()))
        }),
        Box::new(|| Box::new(NonEmptyEngine)),
    );

    detector.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    // The listener exits once the source fails to open and clears the flag
    assert!(!detector.is_running());

    // A stuck flag would make this second start a silent no-op
    detector.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*attempts.lock().unwrap(), 2);

    detector.stop().await;
}

#[tokio::test]
async fn status_reflects_configuration() {
    let (detector, _rx) = detector(enabled_config(), true, Vec::new());

    let status = detector.status();
    assert!(status.enabled);
    assert!(!status.running);
    assert_eq!(status.keyword, "alexa");
    assert!(status.conversation_active);
}
