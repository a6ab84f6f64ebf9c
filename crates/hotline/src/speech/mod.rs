//! Speech output for the hotline agent
//!
//! ## Architecture
//!
//! ```text
//!   enqueue(text) ──► SpeechQueue (per call session, FIFO)
//!                          │  one request in flight
//!                          ▼
//!               ┌── use_remote && remote available? ──┐
//!               │ yes                                  │ no
//!               ▼                                      ▼
//!     RemoteSynthesizer ──► decode ──► AudioSink    LocalVoice
//!               │ error / timeout                      ▲
//!               └──────────────────────────────────────┘
//! ```
//!
//! - **Remote**: backend `/api/synthesize`, best effort
//! - **Local**: platform voice, always the fallback

pub mod local;
pub mod playback;
pub mod queue;
pub mod remote;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub use local::{ConsoleVoice, LocalVoice, UnavailableVoice, Utterance};
pub use playback::{decode_audio, AudioClip, AudioSink, TimedSink};
pub use queue::{QueueState, SpeechOutputs, SpeechQueue};
pub use remote::{RemoteChannel, RemoteSynthesizer};

use crate::backend::BackendError;

/// Callback fired once a request has finished playing
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

/// One queued utterance
pub struct SpeechRequest {
    pub id: Uuid,
    pub text: String,
    /// Attempt remote synthesis before the local voice
    pub use_remote: bool,
    on_done: Option<Completion>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, use_remote: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            use_remote,
            on_done: None,
        }
    }

    pub fn with_completion(mut self, on_done: impl FnOnce() + Send + 'static) -> Self {
        self.on_done = Some(Box::new(on_done));
        self
    }

    /// Fire the completion callback; a panicking callback is contained
    pub(crate) fn complete(mut self) {
        if let Some(on_done) = self.on_done.take() {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(on_done));
            if outcome.is_err() {
                tracing::warn!("Completion callback for speech request {} panicked", self.id);
            }
        }
    }
}

impl fmt::Debug for SpeechRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechRequest")
            .field("id", &self.id)
            .field("text", &self.text)
            .field("use_remote", &self.use_remote)
            .field("has_completion", &self.on_done.is_some())
            .finish()
    }
}

/// Encoded audio formats returned by remote synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub enum AudioFormat {
    Wav,
    Mp3,
}

/// Speech processing errors
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Remote synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Local voice error: {0}")]
    Voice(String),

    #[error("Speech session closed")]
    Cancelled,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type SpeechResult<T> = Result<T, SpeechError>;

/// Rough speaking time at 150 words per minute, scaled by the speech rate
pub fn estimate_duration(text: &str, rate: f32) -> Duration {
    let word_count = text.split_whitespace().count();
    let minutes = word_count as f64 / 150.0;
    let rate = if rate > 0.0 { rate as f64 } else { 1.0 };
    Duration::from_millis((minutes * 60.0 * 1000.0 / rate) as u64)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn test_completion_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        SpeechRequest::new("Вітаю", true)
            .with_completion(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .complete();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_completion_is_contained() {
        SpeechRequest::new("Вітаю", false)
            .with_completion(|| panic!("callback failure"))
            .complete();
    }

    #[test]
    fn test_estimate_duration() {
        assert_eq!(estimate_duration("", 1.0), Duration::ZERO);
        assert_eq!(
            estimate_duration(&"слово ".repeat(150), 1.0),
            Duration::from_secs(60)
        );
        assert!(estimate_duration("одне два", 0.5) > estimate_duration("одне два", 1.0));
    }
}
