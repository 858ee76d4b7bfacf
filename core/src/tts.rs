//! HTTP client for the remote synthesis endpoint.
//!
//! The endpoint speaks the Style-BERT-VITS2 voice API: a GET on `/api/voice`
//! with the text and eight synthesis parameters as query strings, answering
//! with a binary audio body. The body is treated as an opaque, playable blob
//! and is never parsed or transcoded here.

use crate::{KoeError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed default synthesis parameters merged with the submitted text.
/// All fields are caller-overridable via config; the chat UI always uses
/// the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub model_id: u32,
    pub speaker_id: u32,
    pub sdp_ratio: f32,
    pub noise: f32,
    pub noise_w: f32,
    pub length: f32,
    pub language: String,
    pub style: String,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            model_id: 6,
            speaker_id: 0,
            sdp_ratio: 0.2,
            noise: 0.6,
            noise_w: 0.8,
            length: 1.0,
            language: "JP".to_string(),
            style: "Neutral".to_string(),
        }
    }
}

/// Configuration for TtsClient loaded from environment variables
#[derive(Debug, Clone)]
pub struct TtsClientConfig {
    pub endpoint: String, // e.g., http://127.0.0.1:5000/api/voice
    /// No timeout is enforced unless set; the transport's own behavior rules.
    pub request_timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for TtsClientConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("KOE_TTS_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://127.0.0.1:5000/api/voice".to_string()),
            request_timeout_ms: std::env::var("KOE_TTS_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
            user_agent: "koe/0.1".to_string(),
        }
    }
}

/// HTTP client for the voice endpoint
#[derive(Clone)]
pub struct TtsClient {
    http: Client,
    cfg: TtsClientConfig,
}

impl TtsClient {
    pub fn new(cfg: TtsClientConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&cfg.user_agent);
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder
            .build()
            .map_err(|e| KoeError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TtsClientConfig::default())
    }

    pub fn endpoint(&self) -> &str {
        &self.cfg.endpoint
    }

    /// Fetch synthesized audio for `text`.
    /// Contract:
    /// - Input: non-empty text plus the full parameter set; all nine query
    ///   parameters go out string-encoded on the wire
    /// - Output: the raw audio payload on any 2xx response
    /// - Error: one uniform condition for transport failures, and one
    ///   carrying the status line for non-2xx responses (body not inspected)
    pub async fn synthesize(&self, text: &str, params: &SynthesisParams) -> Result<Vec<u8>> {
        debug!(
            target = "tts",
            endpoint = %self.cfg.endpoint,
            chars = text.chars().count(),
            "requesting synthesis"
        );

        let resp = self
            .http
            .get(&self.cfg.endpoint)
            .query(&[("text", text)])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                warn!(target = "tts", error = %e, "synthesis request failed");
                KoeError::Transport(format!("synthesis request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(target = "tts", %status, "voice endpoint returned error");
            return Err(KoeError::ApiStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown error").to_string(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| KoeError::Transport(format!("failed to read audio body: {e}")))?;
        debug!(target = "tts", bytes = body.len(), "received audio payload");
        Ok(body.to_vec())
    }
}
