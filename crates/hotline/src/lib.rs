//! # Hotline - Contact-Center Voice Agent
//!
//! Core of a simulated AI hotline agent: it classifies citizen requests against a
//! catalog of issue categories and speaks responses through a sequential speech
//! output queue (remote synthesis with a local voice fallback).

pub mod backend;
pub mod call;
pub mod classifier;
pub mod config;
pub mod speech;

#[cfg(test)]
mod speech_queue_tests;

pub use backend::{BackendClient, BackendError, HealthMonitor};
pub use call::{CallFlow, CallPhase, CallRecord, CallStats, CallTimings};
pub use classifier::{
    CatalogStore, CategoryRecord, Classifier, ClassificationService, Outcome, Urgency,
};
pub use config::{BackendConfig, HotlineConfig, SpeechConfig};
pub use speech::{QueueState, SpeechError, SpeechQueue, SpeechRequest};

/// Main error type for hotline operations
#[derive(Debug, thiserror::Error)]
pub enum HotlineError {
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Call error: {0}")]
    Call(String),

    #[error("Call ended")]
    CallEnded,
}

pub type Result<T> = std::result::Result<T, HotlineError>;
