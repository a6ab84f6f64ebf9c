//! HTTP client for the contact-center backend
//!
//! Covers the endpoints the agent consumes: health, classification, speech
//! synthesis and the reference data (executors, categories, conversation
//! scripts). The backend itself is a separate service.

pub mod health;
pub mod references;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

pub use health::HealthMonitor;
pub use references::{ConversationScript, Executor, ReferenceKind, ScriptStep, StepKind};

use crate::{
    classifier::{CategoryRecord, Outcome},
    config::BackendConfig,
};
use references::{DataEnvelope, ItemEnvelope};

/// Smallest synthesized payload accepted as real audio
const MIN_AUDIO_BYTES: usize = 100;

/// Backend client errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Health report from `/api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub components: HashMap<String, serde_json::Value>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classification: Option<Outcome>,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReloadResponse {
    #[serde(default)]
    classifiers_count: Option<usize>,
}

/// Client for the contact-center backend API
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Last known reachability, maintained by [`HealthMonitor`] and [`Self::check_health`]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, connected: bool) {
        let previous = self.connected.swap(connected, Ordering::Relaxed);
        if previous != connected {
            if connected {
                info!("Backend {} is reachable", self.base_url);
            } else {
                info!("Backend {} unreachable, using local fallbacks", self.base_url);
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    async fn expect_success(response: reqwest::Response) -> BackendResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(body));
        }
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    // ============ Health ============

    pub async fn health(&self) -> BackendResult<HealthReport> {
        let response = self.request(Method::GET, "/api/health").send().await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    /// Probe health and update the connection flag
    pub async fn check_health(&self) -> bool {
        let healthy = match self.health().await {
            Ok(report) => report.is_healthy(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        };
        self.set_connected(healthy);
        healthy
    }

    // ============ Classification & speech ============

    pub async fn classify(&self, text: &str) -> BackendResult<Outcome> {
        let response = self
            .request(Method::POST, "/api/classify")
            .json(&ClassifyRequest { text })
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let body: ClassifyResponse = response.json().await?;

        body.classification.ok_or_else(|| {
            BackendError::InvalidResponse("classify response has no classification".to_string())
        })
    }

    /// Synthesized audio bytes (WAV or MP3) for the given text
    pub async fn synthesize(&self, text: &str, voice: &str) -> BackendResult<Bytes> {
        let response = self
            .request(Method::POST, "/api/synthesize")
            .json(&SynthesizeRequest { text, voice })
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let audio = response.bytes().await?;

        if audio.len() < MIN_AUDIO_BYTES {
            return Err(BackendError::InvalidResponse(format!(
                "synthesized audio too short: {} bytes",
                audio.len()
            )));
        }
        Ok(audio)
    }

    // ============ Reference data ============

    fn reference_path(kind: ReferenceKind) -> String {
        format!("/api/references/{}", kind.path_segment())
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        kind: ReferenceKind,
        active_only: bool,
    ) -> BackendResult<Vec<T>> {
        let response = self
            .request(Method::GET, &Self::reference_path(kind))
            .query(&[("active_only", active_only)])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// A single reference item; `None` when the backend does not know the id
    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: ReferenceKind,
        id: &str,
    ) -> BackendResult<Option<T>> {
        let path = format!("{}/{}", Self::reference_path(kind), id);
        let response = self.request(Method::GET, &path).send().await?;
        match Self::expect_success(response).await {
            Ok(response) => {
                let envelope: ItemEnvelope<T> = response.json().await?;
                Ok(Some(envelope.into_inner()))
            }
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        kind: ReferenceKind,
        item: &B,
    ) -> BackendResult<T> {
        let response = self
            .request(Method::POST, &Self::reference_path(kind))
            .json(item)
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let envelope: ItemEnvelope<T> = response.json().await?;
        Ok(envelope.into_inner())
    }

    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        kind: ReferenceKind,
        id: &str,
        item: &B,
    ) -> BackendResult<T> {
        let path = format!("{}/{}", Self::reference_path(kind), id);
        let response = self.request(Method::PUT, &path).json(item).send().await?;
        let response = Self::expect_success(response).await?;
        let envelope: ItemEnvelope<T> = response.json().await?;
        Ok(envelope.into_inner())
    }

    /// Delete an item; `false` when it did not exist
    pub async fn delete(&self, kind: ReferenceKind, id: &str) -> BackendResult<bool> {
        let path = format!("{}/{}", Self::reference_path(kind), id);
        let response = self.request(Method::DELETE, &path).send().await?;
        match Self::expect_success(response).await {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Ask the backend to reload its classifier; returns its category count
    pub async fn reload(&self) -> BackendResult<Option<usize>> {
        let response = self
            .request(Method::POST, "/api/references/reload")
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let body: ReloadResponse = response.json().await?;
        Ok(body.classifiers_count)
    }

    pub async fn list_categories(&self) -> BackendResult<Vec<CategoryRecord>> {
        self.list(ReferenceKind::Classifiers, true).await
    }

    pub async fn list_executors(&self) -> BackendResult<Vec<Executor>> {
        self.list(ReferenceKind::Executors, false).await
    }

    pub async fn list_scripts(&self) -> BackendResult<Vec<ConversationScript>> {
        self.list(ReferenceKind::Algorithms, false).await
    }

    pub async fn default_script(&self) -> BackendResult<Option<ConversationScript>> {
        self.get(ReferenceKind::Algorithms, "default").await
    }
}
