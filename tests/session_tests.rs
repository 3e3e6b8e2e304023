mod common;

use common::{ScriptedFrames, ScriptedRecognizer, ScriptedTransport};
use fred_drawers::audio::{CaptureError, ListenerConfig, UtteranceListener};
use fred_drawers::device::{DeviceLink, PollBudget};
use fred_drawers::intent::{Drawer, Intent};
use fred_drawers::kernel::{Dispatcher, SessionConfig, SessionEnd, VoiceSession};
use fred_drawers::services::stt::RecognitionError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

async fn run_session(
    frames: &mut ScriptedFrames,
    recognizer: &ScriptedRecognizer,
    transport: &ScriptedTransport,
    config: &SessionConfig,
    shutdown: CancellationToken,
) -> Result<SessionEnd, CaptureError> {
    let link = Arc::new(DeviceLink::new(transport.clone()));
    let mut listener = UtteranceListener::new(ListenerConfig::default());
    VoiceSession::new(frames, &mut listener, recognizer, link, config, shutdown)
        .run()
        .await
}

#[tokio::test(start_paused = true)]
async fn test_close_bottom_sends_close_then_lock() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().turn();
    let recognizer = ScriptedRecognizer::saying(&["close drawer two"]);

    let end = run_session(&mut frames, &recognizer, &transport, &SessionConfig::default(), CancellationToken::new())
        .await
        .unwrap();

    // Second turn hears only silence.
    assert_eq!(end, SessionEnd::NoSpeech);
    assert_eq!(
        transport.written(),
        strings(&["Listening...", "Recognizing...", "close_bottom_drawer", "lock_bottom", "Listening..."])
    );
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_joins_replies() {
    let transport = ScriptedTransport::new();
    transport.reply("close_bottom_drawer", "closed", Duration::ZERO);
    transport.reply("lock_bottom", "locked", Duration::from_millis(1500));
    let dispatcher = Dispatcher::new(Arc::new(DeviceLink::new(transport.clone())), PollBudget::VOICE);

    let report = dispatcher.dispatch(Intent::Close(Drawer::Bottom)).await;
    assert_eq!(report.as_deref(), Some("closed and locked"));

    assert_eq!(dispatcher.dispatch(Intent::Invalid).await, None);
    assert_eq!(transport.written(), strings(&["close_bottom_drawer", "lock_bottom"]));
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_folds_timeout_into_report() {
    let transport = ScriptedTransport::new();
    transport.silent("open_top_drawer");
    let dispatcher = Dispatcher::new(Arc::new(DeviceLink::new(transport)), PollBudget::TAG);

    let report = dispatcher.dispatch(Intent::Open(Drawer::Top)).await;
    assert_eq!(report.as_deref(), Some("No response received in time from Arduino"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_phrase_relistens_without_touching_drawers() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().turn().turn();
    let recognizer = ScriptedRecognizer::saying(&["banana"]);

    let end = run_session(&mut frames, &recognizer, &transport, &SessionConfig::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::Unintelligible);
    assert_eq!(recognizer.calls().len(), 2);
    assert_eq!(
        transport.written(),
        strings(&[
            "Listening...",
            "Recognizing...",
            "Listening...",
            "Recognizing...",
            "Unable to understand audio",
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn test_open_then_silence() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().turn();
    let recognizer = ScriptedRecognizer::saying(&["Open the top drawer please"]);

    let end = run_session(&mut frames, &recognizer, &transport, &SessionConfig::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::NoSpeech);
    assert_eq!(
        transport.written(),
        strings(&["Listening...", "Recognizing...", "open_top_drawer", "Listening..."])
    );
}

#[tokio::test(start_paused = true)]
async fn test_service_failure_is_shown_and_ends_session() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().turn();
    let recognizer = ScriptedRecognizer::new(vec![Err(RecognitionError::Service("quota exceeded".into()))]);

    let end = run_session(&mut frames, &recognizer, &transport, &SessionConfig::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::ServiceError("quota exceeded".into()));
    assert_eq!(
        transport.written(),
        strings(&["Listening...", "Recognizing...", "Unable to request results; quota exceeded"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_language_and_audio_reach_the_recognizer() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().turn();
    let recognizer = ScriptedRecognizer::new(vec![Err(RecognitionError::Unintelligible)]);
    let config = SessionConfig {
        language: "de-DE".to_string(),
        ..SessionConfig::default()
    };

    run_session(&mut frames, &recognizer, &transport, &config, CancellationToken::new())
        .await
        .unwrap();

    let calls = recognizer.calls();
    assert_eq!(calls.len(), 1);
    let (samples, language) = &calls[0];
    assert_eq!(language, "de-DE");
    // At least the one-second phrase, at most phrase plus pre-roll and trailing pause.
    assert!(*samples >= 16_000, "captured {} samples", samples);
    assert!(*samples < 2 * 16_000, "captured {} samples", samples);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_session_sends_nothing() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().turn();
    let recognizer = ScriptedRecognizer::saying(&["open the top drawer"]);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let end = run_session(&mut frames, &recognizer, &transport, &SessionConfig::default(), shutdown)
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::Cancelled);
    assert!(transport.written().is_empty());
    assert!(recognizer.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capture_fault_is_returned() {
    let transport = ScriptedTransport::new();
    let mut frames = ScriptedFrames::new().close_after(Duration::ZERO);
    let recognizer = ScriptedRecognizer::saying(&[]);

    let err = run_session(&mut frames, &recognizer, &transport, &SessionConfig::default(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, CaptureError::Closed);
    assert_eq!(transport.written(), strings(&["Listening..."]));
}
