//! End-to-end transcript lifecycle tests against an in-process stand-in for
//! the voice endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use koe_core::{ChatSession, KoeConfig, SubmitOutcome};

const AUDIO_BODY: &[u8] = b"RIFF\x00\x00\x00\x00WAVEfake-payload";

#[derive(Clone)]
struct MockVoice {
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
    fail_status: Arc<Mutex<Option<u16>>>,
    delay_ms: u64,
}

impl MockVoice {
    fn ok() -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            fail_status: Arc::new(Mutex::new(None)),
            delay_ms: 0,
        }
    }

    fn failing(status: u16) -> Self {
        let mock = Self::ok();
        mock.set_fail(Some(status));
        mock
    }

    fn slow(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::ok()
        }
    }

    fn set_fail(&self, status: Option<u16>) {
        *self.fail_status.lock().unwrap() = status;
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn last_query(&self) -> HashMap<String, String> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

async fn voice_handler(
    State(mock): State<MockVoice>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    mock.seen.lock().unwrap().push(params);
    if mock.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(mock.delay_ms)).await;
    }
    let fail = *mock.fail_status.lock().unwrap();
    match fail {
        Some(code) => StatusCode::from_u16(code).unwrap().into_response(),
        None => (StatusCode::OK, AUDIO_BODY.to_vec()).into_response(),
    }
}

/// Bind the mock on an ephemeral port and return the endpoint URL.
async fn start_mock(mock: MockVoice) -> String {
    let app = Router::new()
        .route("/api/voice", get(voice_handler))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/voice")
}

fn session_for(endpoint: String, media_dir: &std::path::Path) -> ChatSession {
    let mut cfg = KoeConfig::default();
    cfg.tts.endpoint = endpoint;
    cfg.chat.media_dir = media_dir.to_path_buf();
    cfg.chat.autoplay = false;
    ChatSession::new(cfg).unwrap()
}

#[tokio::test]
async fn successful_submission_resolves_with_audio() {
    let mock = MockVoice::ok();
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    let outcome = session.submit("Hello").await;
    assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));

    let snap = session.snapshot().await;
    assert_eq!(snap.entries.len(), 1);
    assert_eq!(snap.entries[0].text, "Hello");
    assert!(snap.entries[0].is_resolved());
    assert!(!snap.loading);
    assert!(snap.status.is_none());
    assert!(snap.error.is_none());

    if let koe_core::ExchangeStatus::Resolved { audio } = &snap.entries[0].status {
        assert_eq!(std::fs::read(audio.path()).unwrap(), AUDIO_BODY);
    } else {
        panic!("expected resolved exchange");
    }

    session.shutdown();
}

#[tokio::test]
async fn request_carries_all_wire_parameters() {
    let mock = MockVoice::ok();
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    session.submit("Hello").await;

    assert_eq!(mock.hits(), 1);
    let q = mock.last_query();
    assert_eq!(q.get("text").map(String::as_str), Some("Hello"));
    assert_eq!(q.get("model_id").map(String::as_str), Some("6"));
    assert_eq!(q.get("speaker_id").map(String::as_str), Some("0"));
    assert_eq!(q["sdp_ratio"].parse::<f32>().unwrap(), 0.2);
    assert_eq!(q["noise"].parse::<f32>().unwrap(), 0.6);
    assert_eq!(q["noise_w"].parse::<f32>().unwrap(), 0.8);
    assert_eq!(q["length"].parse::<f32>().unwrap(), 1.0);
    assert_eq!(q.get("language").map(String::as_str), Some("JP"));
    assert_eq!(q.get("style").map(String::as_str), Some("Neutral"));
}

#[tokio::test]
async fn whitespace_input_makes_no_network_call() {
    let mock = MockVoice::ok();
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    assert_eq!(session.submit("").await, SubmitOutcome::IgnoredEmpty);
    assert_eq!(session.submit("   \n").await, SubmitOutcome::IgnoredEmpty);

    assert_eq!(mock.hits(), 0);
    let snap = session.snapshot().await;
    assert!(snap.entries.is_empty());
    assert!(!snap.loading);
}

#[tokio::test]
async fn second_submission_while_busy_is_dropped() {
    let mock = MockVoice::slow(300);
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("first").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Optimistic append happened before the suspension point.
    let mid = session.snapshot().await;
    assert_eq!(mid.entries.len(), 1);
    assert!(mid.entries[0].is_pending());
    assert!(mid.loading);
    assert!(mid.status.is_some());

    assert_eq!(session.submit("second").await, SubmitOutcome::IgnoredBusy);

    let outcome = first.await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));

    let snap = session.snapshot().await;
    assert_eq!(snap.entries.len(), 1);
    assert_eq!(snap.entries[0].text, "first");
    assert_eq!(mock.hits(), 1);
    assert!(!snap.loading);
}

#[tokio::test]
async fn server_error_leaves_failed_turn_and_message() {
    let mock = MockVoice::failing(500);
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    let outcome = session.submit("Hello").await;
    assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));

    let snap = session.snapshot().await;
    assert_eq!(snap.entries.len(), 1);
    assert!(snap.entries[0].is_failed());
    let err = snap.error.expect("error message should be set");
    assert!(err.contains("500"), "got: {err}");
    assert!(err.contains("Internal Server Error"), "got: {err}");
    assert!(!snap.loading);
    assert!(snap.status.is_none());
}

#[tokio::test]
async fn over_limit_text_is_sent_and_stored_in_full() {
    let mock = MockVoice::ok();
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    let long = "a".repeat(100);
    session.submit(&long).await;

    let q = mock.last_query();
    assert_eq!(q.get("text").map(String::len), Some(100));

    let snap = session.snapshot().await;
    assert_eq!(snap.entries[0].text.len(), 100);
}

#[tokio::test]
async fn repeated_submissions_append_independently() {
    let mock = MockVoice::ok();
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    session.submit("same").await;
    session.submit("same").await;

    assert_eq!(mock.hits(), 2);
    let snap = session.snapshot().await;
    assert_eq!(snap.entries.len(), 2);
    assert_ne!(snap.entries[0].id, snap.entries[1].id);
    assert!(snap.entries.iter().all(|e| e.is_resolved()));
}

#[tokio::test]
async fn error_clears_on_next_successful_submission() {
    let mock = MockVoice::failing(502);
    let endpoint = start_mock(mock.clone()).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    session.submit("bad").await;
    let snap = session.snapshot().await;
    assert!(snap.error.is_some());
    assert!(snap.entries[0].is_failed());

    mock.set_fail(None);
    session.submit("good").await;

    let snap = session.snapshot().await;
    assert!(snap.error.is_none());
    assert_eq!(snap.entries.len(), 2);
    assert!(snap.entries[0].is_failed());
    assert!(snap.entries[1].is_resolved());
}

#[tokio::test]
async fn shutdown_releases_materialized_audio() {
    let mock = MockVoice::ok();
    let endpoint = start_mock(mock).await;
    let tmp = tempfile::tempdir().unwrap();
    let session = session_for(endpoint, tmp.path());

    session.submit("Hello").await;
    let snap = session.snapshot().await;
    let path = match &snap.entries[0].status {
        koe_core::ExchangeStatus::Resolved { audio } => audio.path().to_path_buf(),
        other => panic!("expected resolved exchange, got {other:?}"),
    };
    assert!(path.exists());

    session.shutdown();
    assert!(!path.exists());
}
