//! Local (platform) voice, the always-available fallback

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::info;

use super::{estimate_duration, SpeechResult};
use crate::config::SpeechConfig;

/// Parameters for one local utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, config: &SpeechConfig) -> Self {
        Self {
            text: text.into(),
            lang: config.language.clone(),
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

#[async_trait]
pub trait LocalVoice: Send + Sync {
    /// False when the platform has no speech engine
    fn is_available(&self) -> bool;

    /// Speak and resolve when the utterance ends or is cancelled
    async fn speak(&self, utterance: &Utterance) -> SpeechResult<()>;

    /// Silence the utterance in progress
    fn cancel(&self);
}

/// Voice that writes utterances to the log and holds for the estimated speaking time
#[derive(Debug, Default)]
pub struct ConsoleVoice {
    cancelled: Notify,
}

impl ConsoleVoice {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalVoice for ConsoleVoice {
    fn is_available(&self) -> bool {
        true
    }

    async fn speak(&self, utterance: &Utterance) -> SpeechResult<()> {
        info!(lang = %utterance.lang, "🔊 {}", utterance.text);

        let duration = estimate_duration(&utterance.text, utterance.rate);
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancelled.notified() => {}
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}

/// Stand-in for platforms without a speech engine
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableVoice;

#[async_trait]
impl LocalVoice for UnavailableVoice {
    fn is_available(&self) -> bool {
        false
    }

    async fn speak(&self, _utterance: &Utterance) -> SpeechResult<()> {
        Ok(())
    }

    fn cancel(&self) {}
}
