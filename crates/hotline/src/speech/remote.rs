//! Remote (backend) speech synthesis

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use bytes::Bytes;

use super::SpeechResult;
use crate::backend::BackendClient;

/// High-quality synthesis provided by a remote service
#[async_trait]
pub trait RemoteSynthesizer: Send + Sync {
    /// Encoded audio for `text` in the given voice
    async fn synthesize(&self, text: &str, voice: &str) -> SpeechResult<Bytes>;

    /// Whether the service is currently believed reachable
    fn is_available(&self) -> bool;
}

#[async_trait]
impl RemoteSynthesizer for BackendClient {
    async fn synthesize(&self, text: &str, voice: &str) -> SpeechResult<Bytes> {
        Ok(BackendClient::synthesize(self, text, voice).await?)
    }

    fn is_available(&self) -> bool {
        self.is_connected()
    }
}

/// A synthesizer plus the user's on/off toggle and the selected voice
#[derive(Clone)]
pub struct RemoteChannel {
    synthesizer: Arc<dyn RemoteSynthesizer>,
    voice: String,
    enabled: Arc<AtomicBool>,
}

impl RemoteChannel {
    pub fn new(synthesizer: Arc<dyn RemoteSynthesizer>, voice: impl Into<String>) -> Self {
        Self {
            synthesizer,
            voice: voice.into(),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enabled and reachable
    pub fn is_available(&self) -> bool {
        self.is_enabled() && self.synthesizer.is_available()
    }

    pub async fn synthesize(&self, text: &str) -> SpeechResult<Bytes> {
        self.synthesizer.synthesize(text, &self.voice).await
    }
}

impl std::fmt::Debug for RemoteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteChannel")
            .field("voice", &self.voice)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SpeechError;

    struct Offline;

    #[async_trait]
    impl RemoteSynthesizer for Offline {
        async fn synthesize(&self, _text: &str, _voice: &str) -> SpeechResult<Bytes> {
            Err(SpeechError::Synthesis("offline".to_string()))
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    struct Online;

    #[async_trait]
    impl RemoteSynthesizer for Online {
        async fn synthesize(&self, text: &str, voice: &str) -> SpeechResult<Bytes> {
            Ok(Bytes::from(format!("{}:{}", voice, text)))
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_channel_availability_follows_toggle() {
        let channel = RemoteChannel::new(Arc::new(Online), "default");
        assert!(channel.is_available());

        channel.set_enabled(false);
        assert!(!channel.is_available());

        let offline = RemoteChannel::new(Arc::new(Offline), "default");
        assert!(!offline.is_available());
    }

    #[tokio::test]
    async fn test_channel_passes_voice() {
        let channel = RemoteChannel::new(Arc::new(Online), "oksana");

        let audio = channel.synthesize("Вітаю").await.unwrap();

        assert_eq!(&audio[..], "oksana:Вітаю".as_bytes());
    }
}
