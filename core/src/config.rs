//! Session configuration: env-driven defaults with an optional TOML overlay.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tts::{SynthesisParams, TtsClientConfig};

/// High-level configuration for a chat session
#[derive(Clone, Debug, Default)]
pub struct KoeConfig {
    pub tts: TtsClientConfig,
    pub params: SynthesisParams,
    pub chat: ChatConfig,
}

/// Transcript/playback preferences
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Advisory input limit; over-limit text is logged but still sent and
    /// stored in full.
    pub max_text_len: usize,
    /// Where synthesized audio files are materialized.
    pub media_dir: PathBuf,
    pub autoplay: bool,
    pub autoplay_delay_ms: u64,
    /// Preferred player binary; falls back to aplay/paplay/ffplay on PATH.
    pub player: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_text_len: 75,
            media_dir: std::env::var("KOE_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            autoplay: std::env::var("KOE_AUTOPLAY")
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(true),
            autoplay_delay_ms: 100,
            player: std::env::var("KOE_PLAYER").ok().filter(|s| !s.is_empty()),
        }
    }
}

impl KoeConfig {
    /// Load configuration from a TOML file (path via KOE_CONFIG or
    /// ./koe.toml), overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("KOE_CONFIG").unwrap_or_else(|_| "koe.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::debug!(target = "config", path = %path, "no TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<KoeToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "config", error = %e, "failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "config", error = %e, "failed to read TOML; using defaults");
                default
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct KoeToml {
    #[serde(default)]
    tts: TtsToml,
    #[serde(default)]
    params: ParamsToml,
    #[serde(default)]
    chat: ChatToml,
}

#[derive(Debug, Default, Deserialize)]
struct TtsToml {
    endpoint: Option<String>,
    request_timeout_ms: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ParamsToml {
    model_id: Option<u32>,
    speaker_id: Option<u32>,
    sdp_ratio: Option<f32>,
    noise: Option<f32>,
    noise_w: Option<f32>,
    length: Option<f32>,
    language: Option<String>,
    style: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatToml {
    max_text_len: Option<usize>,
    media_dir: Option<PathBuf>,
    autoplay: Option<bool>,
    autoplay_delay_ms: Option<u64>,
    player: Option<String>,
}

impl KoeToml {
    fn overlay(self, mut base: KoeConfig) -> KoeConfig {
        if let Some(v) = self.tts.endpoint {
            base.tts.endpoint = v;
        }
        if let Some(v) = self.tts.request_timeout_ms {
            base.tts.request_timeout_ms = Some(v);
        }
        if let Some(v) = self.tts.user_agent {
            base.tts.user_agent = v;
        }

        if let Some(v) = self.params.model_id {
            base.params.model_id = v;
        }
        if let Some(v) = self.params.speaker_id {
            base.params.speaker_id = v;
        }
        if let Some(v) = self.params.sdp_ratio {
            base.params.sdp_ratio = v;
        }
        if let Some(v) = self.params.noise {
            base.params.noise = v;
        }
        if let Some(v) = self.params.noise_w {
            base.params.noise_w = v;
        }
        if let Some(v) = self.params.length {
            base.params.length = v;
        }
        if let Some(v) = self.params.language {
            base.params.language = v;
        }
        if let Some(v) = self.params.style {
            base.params.style = v;
        }

        if let Some(v) = self.chat.max_text_len {
            base.chat.max_text_len = v;
        }
        if let Some(v) = self.chat.media_dir {
            base.chat.media_dir = v;
        }
        if let Some(v) = self.chat.autoplay {
            base.chat.autoplay = v;
        }
        if let Some(v) = self.chat.autoplay_delay_ms {
            base.chat.autoplay_delay_ms = v;
        }
        if let Some(v) = self.chat.player {
            base.chat.player = Some(v);
        }

        base
    }
}
