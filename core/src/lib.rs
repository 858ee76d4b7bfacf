// Koe Core Library
// Chat-style TTS client: transcript controller, synthesis client, audio store

pub mod audio;
pub mod config;
pub mod transcript;
pub mod tts;

mod utils;

// Export core types
pub use audio::{AudioHandle, AudioStore};
pub use config::{ChatConfig, KoeConfig};
pub use transcript::{ChatSession, Exchange, ExchangeStatus, SubmitOutcome, TranscriptSnapshot};
pub use tts::{SynthesisParams, TtsClient, TtsClientConfig};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KoeError {
    #[error("API request failed: {status} {reason}")]
    ApiStatus { status: u16, reason: String },

    #[error("synthesis request failed: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KoeError>;
