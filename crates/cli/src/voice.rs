//! Terminal stand-in for the local voice

use async_trait::async_trait;
use colored::Colorize;
use hotline::speech::{estimate_duration, LocalVoice, SpeechResult, Utterance};
use tokio::sync::Notify;

/// Prints each utterance and holds for its estimated speaking time
#[derive(Debug, Default)]
pub struct TerminalVoice {
    cancelled: Notify,
}

impl TerminalVoice {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalVoice for TerminalVoice {
    fn is_available(&self) -> bool {
        true
    }

    async fn speak(&self, utterance: &Utterance) -> SpeechResult<()> {
        println!("  {} {}", "🔊".bright_cyan(), utterance.text.bright_white());

        tokio::select! {
            _ = tokio::time::sleep(estimate_duration(&utterance.text, utterance.rate)) => {}
            _ = self.cancelled.notified() => {}
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}
