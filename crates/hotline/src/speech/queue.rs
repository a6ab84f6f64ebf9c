//! Sequential speech output queue
//!
//! Each call session owns one `SpeechQueue`. Requests are spoken strictly in
//! enqueue order with at most one in flight; a request's completion callback
//! fires before the next request starts. Remote synthesis is tried first when
//! asked for and available, and any failure falls back to the local voice for
//! that request only.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    decode_audio, AudioSink, ConsoleVoice, LocalVoice, RemoteChannel, SpeechError, SpeechRequest,
    SpeechResult, TimedSink, Utterance,
};
use crate::config::SpeechConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub enum QueueState {
    /// Nothing queued or playing
    Idle,
    /// A request is in flight
    Draining,
}

/// Output devices a queue speaks through
#[derive(Clone)]
pub struct SpeechOutputs {
    pub remote: Option<RemoteChannel>,
    pub voice: Arc<dyn LocalVoice>,
    pub sink: Arc<dyn AudioSink>,
}

impl SpeechOutputs {
    pub fn local(voice: Arc<dyn LocalVoice>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            remote: None,
            voice,
            sink,
        }
    }

    pub fn with_remote(mut self, remote: RemoteChannel) -> Self {
        self.remote = Some(remote);
        self
    }
}

impl Default for SpeechOutputs {
    fn default() -> Self {
        Self::local(Arc::new(ConsoleVoice::new()), Arc::new(TimedSink::new()))
    }
}

pub struct SpeechQueue {
    session_id: String,
    use_remote: bool,
    sender: mpsc::UnboundedSender<SpeechRequest>,
    token: CancellationToken,
    state: Arc<watch::Sender<QueueState>>,
    pending: Arc<AtomicUsize>,
    speaking: Arc<AtomicBool>,
    speaker_enabled: Arc<AtomicBool>,
    outputs: SpeechOutputs,
}

impl SpeechQueue {
    /// Create the queue and spawn its worker; must be called inside a tokio runtime
    pub fn new(session_id: impl Into<String>, config: SpeechConfig, outputs: SpeechOutputs) -> Self {
        let session_id = session_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let (state, _) = watch::channel(QueueState::Idle);
        let state = Arc::new(state);
        let pending = Arc::new(AtomicUsize::new(0));
        let speaking = Arc::new(AtomicBool::new(false));
        let speaker_enabled = Arc::new(AtomicBool::new(config.speaker_enabled));
        let use_remote = config.use_remote_synthesis;

        let worker = Worker {
            config,
            outputs: outputs.clone(),
            speaking: speaking.clone(),
            speaker_enabled: speaker_enabled.clone(),
        };
        let span = tracing::info_span!("speech_queue", session = %session_id);
        tokio::spawn(
            worker
                .run(receiver, token.clone(), state.clone(), pending.clone())
                .instrument(span),
        );

        Self {
            session_id,
            use_remote,
            sender,
            token,
            state,
            pending,
            speaking,
            speaker_enabled,
            outputs,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queue `text`; `on_done` fires once it has been spoken
    pub fn enqueue(
        &self,
        text: impl Into<String>,
        use_remote: bool,
        on_done: impl FnOnce() + Send + 'static,
    ) -> SpeechResult<Uuid> {
        self.submit(SpeechRequest::new(text, use_remote).with_completion(on_done))
    }

    /// Queue a prepared request without waiting for it
    pub fn submit(&self, request: SpeechRequest) -> SpeechResult<Uuid> {
        if self.token.is_cancelled() {
            debug!(
                "Discarding speech request {} for stopped session {}",
                request.id, self.session_id
            );
            return Err(SpeechError::Cancelled);
        }

        let id = request.id;
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(request).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SpeechError::Cancelled);
        }
        debug!("Queued speech request {}", id);
        Ok(id)
    }

    /// Queue `text` with the configured remote preference and wait until it has been spoken
    pub async fn speak(&self, text: impl Into<String>) -> SpeechResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.enqueue(text, self.use_remote, move || {
            let _ = done_tx.send(());
        })?;
        done_rx.await.map_err(|_| SpeechError::Cancelled)
    }

    /// Stop the current utterance and discard everything queued.
    ///
    /// Discarded requests never fire their callbacks and the queue accepts no
    /// further requests.
    pub fn stop_all(&self) {
        if self.token.is_cancelled() {
            return;
        }
        info!("Stopping speech for session {}", self.session_id);
        self.token.cancel();
        self.outputs.sink.stop();
        self.outputs.voice.cancel();
        self.speaking.store(false, Ordering::SeqCst);
        self.pending.store(0, Ordering::SeqCst);
        self.state.send_replace(QueueState::Idle);
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn state(&self) -> QueueState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Requests queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Mute or unmute output; muting silences the current utterance
    pub fn set_speaker(&self, enabled: bool) {
        self.speaker_enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.outputs.sink.stop();
            self.outputs.voice.cancel();
        }
    }

    pub fn speaker_enabled(&self) -> bool {
        self.speaker_enabled.load(Ordering::SeqCst)
    }

    /// Toggle remote synthesis; no effect without a remote channel
    pub fn set_remote_enabled(&self, enabled: bool) {
        if let Some(remote) = &self.outputs.remote {
            remote.set_enabled(enabled);
        }
    }

    pub fn remote_available(&self) -> bool {
        self.outputs
            .remote
            .as_ref()
            .is_some_and(|remote| remote.is_available())
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

struct Worker {
    config: SpeechConfig,
    outputs: SpeechOutputs,
    speaking: Arc<AtomicBool>,
    speaker_enabled: Arc<AtomicBool>,
}

impl Worker {
    async fn run(
        self,
        mut receiver: mpsc::UnboundedReceiver<SpeechRequest>,
        token: CancellationToken,
        state: Arc<watch::Sender<QueueState>>,
        pending: Arc<AtomicUsize>,
    ) {
        loop {
            let request = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                request = receiver.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            state.send_replace(QueueState::Draining);
            self.speaking.store(true, Ordering::SeqCst);

            let interrupted = tokio::select! {
                biased;
                _ = token.cancelled() => true,
                _ = self.speak(request.id, &request.text, request.use_remote) => false,
            };
            self.speaking.store(false, Ordering::SeqCst);
            if interrupted {
                debug!("Speech request {} interrupted", request.id);
                break;
            }

            request.complete();
            let before = pending
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
                .unwrap_or_else(|n| n);
            if before <= 1 {
                state.send_replace(QueueState::Idle);
            }
        }

        // Remaining requests drop here with their callbacks unfired
        receiver.close();
        state.send_replace(QueueState::Idle);
        debug!("Speech queue worker stopped");
    }

    async fn speak(&self, id: Uuid, text: &str, use_remote: bool) {
        if !self.speaker_enabled.load(Ordering::SeqCst) {
            tokio::time::sleep(self.config.unavailable_voice_delay()).await;
            return;
        }

        if use_remote {
            if let Some(remote) = self.outputs.remote.as_ref().filter(|r| r.is_available()) {
                match self.speak_remote(remote, text).await {
                    Ok(()) => return,
                    Err(e) => warn!(
                        "Remote synthesis failed for request {}, using local voice: {}",
                        id, e
                    ),
                }
            }
        }

        self.speak_local(text).await;
    }

    /// Errors before playback starts are returned so the caller can fall back
    async fn speak_remote(&self, remote: &RemoteChannel, text: &str) -> SpeechResult<()> {
        let limit = self.config.remote_timeout();
        let audio = tokio::time::timeout(limit, remote.synthesize(text))
            .await
            .map_err(|_| SpeechError::Timeout(limit))??;
        // The speaker may have been muted while synthesis was in flight
        if !self.speaker_enabled.load(Ordering::SeqCst) {
            debug!("Speaker muted, dropping synthesized audio");
            return Ok(());
        }
        let clip = decode_audio(audio)?;

        if let Err(e) = self.outputs.sink.play(&clip).await {
            warn!("Audio playback failed: {}", e);
        }
        Ok(())
    }

    async fn speak_local(&self, text: &str) {
        if !self.outputs.voice.is_available() {
            debug!("No local voice available, holding before completion");
            tokio::time::sleep(self.config.unavailable_voice_delay()).await;
            return;
        }

        let utterance = Utterance::new(text, &self.config);
        if let Err(e) = self.outputs.voice.speak(&utterance).await {
            warn!("Local voice failed: {}", e);
        }
    }
}
