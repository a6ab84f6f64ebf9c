//! Simulated hotline call: greeting, caller request, classification, response

pub mod flow;
pub mod ledger;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub use flow::{CallFlow, CallReport, CallerInput, FixedCaller, SampleCaller};
pub use ledger::{CallLedger, CallRecord, CallStats, CallStatus};

/// Agent greeting when no conversation script supplies one
pub const GREETING: &str =
    "Доброго дня! Ви зателефонували на гарячу лінію контактного центру. Чим можу вам допомогти?";

/// Spoken instead of a response when classification is not confident enough
pub const ESCALATION_RESPONSE: &str = "Вибачте, я не зміг точно визначити тип вашого звернення. Зачекайте, я переключу вас на оператора.";

pub const CLOSING_RESOLVED: &str = "Чи можу я ще чимось допомогти?";

pub const CLOSING_ESCALATED: &str = "Переключаю на оператора. Будь ласка, залишайтесь на лінії.";

/// Responses at or below this confidence go to a human operator
pub const ESCALATION_THRESHOLD: f64 = 0.7;

/// Caller requests used by the demo caller
pub const SAMPLE_QUERIES: [&str; 8] = [
    "Доброго дня, у нас на території не прибрали сніг вже три дні.",
    "Алло, на мою машину впало дерево, потрібно терміново допомогу!",
    "У моїй квартирі протікає стеля зверху, вода капає на підлогу.",
    "Добрий день, у нас в будинку немає опалення вже другий день.",
    "Коли відключатимуть світло?",
    "Хочу поскаржитися на водія маршрутки.",
    "У нас немає холодної води в будинку з самого ранку.",
    "На дорозі величезна яма, машини не можуть проїхати.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum CallPhase {
    Idle,
    Greeting,
    Listening,
    Classifying,
    Responding,
    Closing,
}

impl std::fmt::Display for CallPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallPhase::Idle => "idle",
            CallPhase::Greeting => "greeting",
            CallPhase::Listening => "listening",
            CallPhase::Classifying => "classifying",
            CallPhase::Responding => "responding",
            CallPhase::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Who is speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Caller,
    Agent,
}

/// A turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: Option<f64>,
}

impl ConversationTurn {
    pub fn caller(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Caller,
            content: content.into(),
            timestamp: Utc::now(),
            confidence: None,
        }
    }

    pub fn agent(content: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            speaker: Speaker::Agent,
            content: content.into(),
            timestamp: Utc::now(),
            confidence,
        }
    }
}

/// Pauses between call steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CallTimings {
    /// Ringing before the agent picks up
    #[serde(default = "default_pickup_ms")]
    pub pickup_ms: u64,
    #[serde(default = "default_after_greeting_ms")]
    pub after_greeting_ms: u64,
    #[serde(default = "default_classify_ms")]
    pub classify_ms: u64,
    #[serde(default = "default_respond_ms")]
    pub respond_ms: u64,
    #[serde(default = "default_closing_ms")]
    pub closing_ms: u64,
}

fn default_pickup_ms() -> u64 {
    1500
}

fn default_after_greeting_ms() -> u64 {
    1000
}

fn default_classify_ms() -> u64 {
    1000
}

fn default_respond_ms() -> u64 {
    800
}

fn default_closing_ms() -> u64 {
    500
}

impl Default for CallTimings {
    fn default() -> Self {
        Self {
            pickup_ms: default_pickup_ms(),
            after_greeting_ms: default_after_greeting_ms(),
            classify_ms: default_classify_ms(),
            respond_ms: default_respond_ms(),
            closing_ms: default_closing_ms(),
        }
    }
}

impl CallTimings {
    /// No pauses at all
    pub fn zero() -> Self {
        Self {
            pickup_ms: 0,
            after_greeting_ms: 0,
            classify_ms: 0,
            respond_ms: 0,
            closing_ms: 0,
        }
    }

    pub fn pickup(&self) -> Duration {
        Duration::from_millis(self.pickup_ms)
    }

    pub fn after_greeting(&self) -> Duration {
        Duration::from_millis(self.after_greeting_ms)
    }

    pub fn classify(&self) -> Duration {
        Duration::from_millis(self.classify_ms)
    }

    pub fn respond(&self) -> Duration {
        Duration::from_millis(self.respond_ms)
    }

    pub fn closing(&self) -> Duration {
        Duration::from_millis(self.closing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_partial_config() {
        let timings: CallTimings = serde_json::from_str(r#"{"pickupMs": 0}"#).unwrap();

        assert_eq!(timings.pickup(), Duration::ZERO);
        assert_eq!(timings.respond(), Duration::from_millis(800));
        assert_eq!(timings.closing(), Duration::from_millis(500));
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(CallPhase::Classifying.to_string(), "classifying");
        assert_eq!(
            serde_json::to_string(&CallPhase::Responding).unwrap(),
            "\"responding\""
        );
    }
}
