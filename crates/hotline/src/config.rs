//! Hotline configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{call::CallTimings, HotlineError, Result};

/// Top-level configuration for the hotline agent
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HotlineConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub call: CallTimings,
}

impl HotlineConfig {
    /// Apply `HOTLINE_*` environment overrides on top of the current values
    pub fn apply_env(&mut self) {
        let non_empty = |key: &str| -> Option<String> {
            std::env::var(key)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(url) = non_empty("HOTLINE_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(user) = non_empty("HOTLINE_BACKEND_USER") {
            self.backend.username = Some(user);
        }
        if let Some(password) = non_empty("HOTLINE_BACKEND_PASSWORD") {
            self.backend.password = Some(password);
        }
        if let Some(flag) = non_empty("HOTLINE_REMOTE_TTS") {
            self.speech.use_remote_synthesis = flag == "true" || flag == "1";
        }
        if let Some(voice) = non_empty("HOTLINE_TTS_VOICE") {
            self.speech.voice = voice;
        }
        if let Some(timeout) = non_empty("HOTLINE_TTS_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.speech.remote_timeout_ms = timeout;
        }
        if let Some(lang) = non_empty("HOTLINE_SPEECH_LANG") {
            self.speech.language = lang;
        }
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HotlineError::Config(format!(
                "backend url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.backend.request_timeout_ms == 0 {
            return Err(HotlineError::Config(
                "backend.requestTimeoutMs must be positive".to_string(),
            ));
        }
        if self.speech.remote_timeout_ms == 0 {
            return Err(HotlineError::Config(
                "speech.remoteTimeoutMs must be positive".to_string(),
            ));
        }
        if !(self.speech.rate.is_finite() && self.speech.rate > 0.0) {
            return Err(HotlineError::Config(format!(
                "speech.rate must be positive, got {}",
                self.speech.rate
            )));
        }
        Ok(())
    }
}

/// Connection settings for the contact-center backend
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Interval between health probes
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_health_interval_secs() -> u64 {
    10
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            username: None,
            password: None,
            health_interval_secs: default_health_interval_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BackendConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Speech output settings shared by the remote and local voices
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Try backend synthesis before the local voice
    #[serde(default = "default_true")]
    pub use_remote_synthesis: bool,
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Upper bound on one remote synthesis call
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
    #[serde(default = "default_unit")]
    pub volume: f32,
    /// Delay before completing an utterance when no local voice exists
    #[serde(default = "default_unavailable_voice_delay_ms")]
    pub unavailable_voice_delay_ms: u64,
    #[serde(default = "default_true")]
    pub speaker_enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_voice() -> String {
    "default".to_string()
}

fn default_remote_timeout_ms() -> u64 {
    8000
}

fn default_language() -> String {
    "uk-UA".to_string()
}

fn default_rate() -> f32 {
    0.95
}

fn default_unit() -> f32 {
    1.0
}

fn default_unavailable_voice_delay_ms() -> u64 {
    1000
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            use_remote_synthesis: true,
            voice: default_voice(),
            remote_timeout_ms: default_remote_timeout_ms(),
            language: default_language(),
            rate: default_rate(),
            pitch: default_unit(),
            volume: default_unit(),
            unavailable_voice_delay_ms: default_unavailable_voice_delay_ms(),
            speaker_enabled: true,
        }
    }
}

impl SpeechConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn unavailable_voice_delay(&self) -> Duration {
        Duration::from_millis(self.unavailable_voice_delay_ms)
    }
}
