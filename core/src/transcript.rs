//! Transcript controller: the ordered exchange list and the single-flight
//! synthesis request lifecycle.
//!
//! One controller per chat session. A submission appends a pending exchange
//! before anything suspends, drives exactly one request against the voice
//! endpoint, then settles the exchange in place as resolved or failed. While
//! a request is in flight, further submissions are dropped (never queued);
//! that guard is the system's only concurrency property.

use crate::audio::{self, AudioHandle, AudioStore};
use crate::config::{ChatConfig, KoeConfig};
use crate::tts::{SynthesisParams, TtsClient};
use crate::utils::{gen_id, now_ms};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// One logical exchange: the user's text and its synthesis outcome.
#[derive(Clone, Debug)]
pub struct Exchange {
    pub id: String,
    pub text: String,
    pub status: ExchangeStatus,
    pub timestamp_ms: i64,
}

#[derive(Clone, Debug)]
pub enum ExchangeStatus {
    /// Request in flight (or about to be).
    Pending,
    /// Synthesis succeeded; the audio resource is playable.
    Resolved { audio: AudioHandle },
    /// Synthesis failed; the turn stays visible with no resolution.
    Failed,
}

impl Exchange {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, ExchangeStatus::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.status, ExchangeStatus::Resolved { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ExchangeStatus::Failed)
    }
}

/// Outcome of a submit call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A pending exchange was appended and the request ran to completion;
    /// inspect the snapshot for the result.
    Accepted { id: String },
    /// Input was empty after trimming; nothing happened.
    IgnoredEmpty,
    /// A request was already in flight; the submission was dropped.
    IgnoredBusy,
}

/// Cloned, render-ready view of the transcript state.
#[derive(Clone, Debug, Default)]
pub struct TranscriptSnapshot {
    pub entries: Vec<Exchange>,
    pub loading: bool,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Default)]
struct TranscriptState {
    entries: Vec<Exchange>,
    status: Option<String>,
    error: Option<String>,
}

struct Inner {
    client: TtsClient,
    store: AudioStore,
    params: SynthesisParams,
    chat: ChatConfig,
    state: Mutex<TranscriptState>,
    in_flight: AtomicBool,
}

/// Shareable controller handle. Clones refer to the same session.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(cfg: KoeConfig) -> Result<Self> {
        let client = TtsClient::new(cfg.tts)?;
        let store = AudioStore::new(&cfg.chat.media_dir);
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                store,
                params: cfg.params,
                chat: cfg.chat,
                state: Mutex::new(TranscriptState::default()),
                in_flight: AtomicBool::new(false),
            }),
        })
    }

    /// Submit one user utterance.
    ///
    /// Empty-after-trim input and submissions while a request is in flight
    /// are dropped silently (debug-logged). Accepted submissions append a
    /// pending exchange before the network call suspends, then settle it in
    /// place; a failed request leaves the turn visible as failed and sets
    /// the session error message. No retry, no rollback.
    pub async fn submit(&self, raw_text: &str) -> SubmitOutcome {
        let text = raw_text.trim();
        if text.is_empty() {
            debug!(target = "transcript", "submit ignored: empty text");
            return SubmitOutcome::IgnoredEmpty;
        }

        // At most one request in flight; the UI also disables its input
        // affordance while loading, but this guard is authoritative.
        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            debug!(target = "transcript", "submit ignored: request already in flight");
            return SubmitOutcome::IgnoredBusy;
        }

        let max = self.inner.chat.max_text_len;
        if max > 0 && text.chars().count() > max {
            // Advisory limit only: the full text is still sent and stored.
            debug!(
                target = "transcript",
                chars = text.chars().count(),
                max,
                "text exceeds configured limit; sending in full"
            );
        }

        let id = gen_id();
        let text = text.to_string();

        // Optimistic append: the user's turn is visible even if the request
        // later fails.
        {
            let mut st = self.inner.state.lock().await;
            st.entries.push(Exchange {
                id: id.clone(),
                text: text.clone(),
                status: ExchangeStatus::Pending,
                timestamp_ms: now_ms(),
            });
            st.error = None;
            st.status = Some("Generating audio...".to_string());
        }

        let result = self
            .inner
            .client
            .synthesize(&text, &self.inner.params)
            .await
            .and_then(|payload| self.inner.store.materialize(&id, &payload));

        let mut st = self.inner.state.lock().await;
        match result {
            Ok(handle) => {
                let status = ExchangeStatus::Resolved {
                    audio: handle.clone(),
                };
                settle(&mut st.entries, &id, status);
                info!(target = "transcript", id = %id, "exchange resolved");
                if self.inner.chat.autoplay {
                    self.schedule_autoplay(handle);
                }
            }
            Err(e) => {
                settle(&mut st.entries, &id, ExchangeStatus::Failed);
                warn!(target = "transcript", id = %id, error = %e, "exchange failed");
                st.error = Some(e.to_string());
            }
        }
        st.status = None;
        drop(st);
        self.inner.in_flight.store(false, Ordering::SeqCst);

        SubmitOutcome::Accepted { id }
    }

    /// Best-effort playback attempt scheduled after the resolved entry has
    /// been committed. Fire-and-forget: refusal is logged, never surfaced,
    /// and manual playback stays possible through the handle on the entry.
    fn schedule_autoplay(&self, handle: AudioHandle) {
        let delay = Duration::from_millis(self.inner.chat.autoplay_delay_ms);
        let player = self.inner.chat.player.clone();
        task::spawn(async move {
            sleep(delay).await;
            let res = task::spawn_blocking(move || audio::try_play(&handle, player.as_deref()));
            if let Err(e) = res.await {
                warn!(target = "transcript", error = %e, "autoplay task failed");
            }
        });
    }

    pub async fn snapshot(&self) -> TranscriptSnapshot {
        let st = self.inner.state.lock().await;
        TranscriptSnapshot {
            entries: st.entries.clone(),
            loading: self.inner.in_flight.load(Ordering::SeqCst),
            status: st.status.clone(),
            error: st.error.clone(),
        }
    }

    /// Release every audio resource materialized by this session.
    pub fn shutdown(&self) {
        self.inner.store.release_all();
    }
}

fn settle(entries: &mut [Exchange], id: &str, status: ExchangeStatus) {
    if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
        entry.status = status;
    }
}
