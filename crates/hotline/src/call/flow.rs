//! Call state machine
//!
//! One call at a time runs through
//! `Idle → Greeting → Listening → Classifying → Responding → Closing → Idle`.
//! Every call gets its own [`SpeechQueue`]; ending the call stops it.

use std::{sync::Arc, time::Duration};

use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    CallLedger, CallPhase, CallRecord, CallStats, CallStatus, CallTimings, ConversationTurn,
    CLOSING_ESCALATED, CLOSING_RESOLVED, ESCALATION_RESPONSE, ESCALATION_THRESHOLD, GREETING,
    SAMPLE_QUERIES,
};
use crate::{
    backend::{ConversationScript, StepKind},
    classifier::{ClassificationService, Outcome},
    config::SpeechConfig,
    speech::{SpeechError, SpeechOutputs, SpeechQueue},
    HotlineError, Result,
};

/// Source of what the caller says
pub trait CallerInput: Send + Sync {
    fn utterance(&self) -> String;
}

/// Picks one of the sample requests at random
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleCaller;

impl CallerInput for SampleCaller {
    fn utterance(&self) -> String {
        SAMPLE_QUERIES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(SAMPLE_QUERIES[0])
            .to_string()
    }
}

/// Always says the same thing
#[derive(Debug, Clone)]
pub struct FixedCaller(pub String);

impl CallerInput for FixedCaller {
    fn utterance(&self) -> String {
        self.0.clone()
    }
}

/// Outcome of one completed call
#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    pub session_id: String,
    pub turns: Vec<ConversationTurn>,
    pub outcome: Outcome,
    pub record: CallRecord,
}

struct ActiveCall {
    queue: Arc<SpeechQueue>,
    token: CancellationToken,
}

pub struct CallFlow {
    classifier: Arc<ClassificationService>,
    speech_config: SpeechConfig,
    outputs: SpeechOutputs,
    timings: CallTimings,
    ledger: RwLock<CallLedger>,
    phase: watch::Sender<CallPhase>,
    active: Mutex<Option<ActiveCall>>,
}

impl CallFlow {
    pub fn new(
        classifier: Arc<ClassificationService>,
        speech_config: SpeechConfig,
        outputs: SpeechOutputs,
        timings: CallTimings,
    ) -> Self {
        let (phase, _) = watch::channel(CallPhase::Idle);
        Self {
            classifier,
            speech_config,
            outputs,
            timings,
            ledger: RwLock::new(CallLedger::new()),
            phase,
            active: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> CallPhase {
        *self.phase.borrow()
    }

    /// Phase changes, starting from the current phase
    pub fn subscribe(&self) -> watch::Receiver<CallPhase> {
        self.phase.subscribe()
    }

    pub async fn stats(&self) -> CallStats {
        self.ledger.read().await.stats().clone()
    }

    /// Recent calls, newest first
    pub async fn history(&self) -> Vec<CallRecord> {
        self.ledger.read().await.history().cloned().collect()
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Run one call to completion.
    ///
    /// Returns [`HotlineError::CallEnded`] when [`end_call`](Self::end_call)
    /// interrupts it.
    pub async fn run_call(&self, caller: &dyn CallerInput) -> Result<CallReport> {
        let session_id = format!("call-{}", Uuid::new_v4());
        let queue = Arc::new(SpeechQueue::new(
            session_id.clone(),
            self.speech_config.clone(),
            self.outputs.clone(),
        ));
        let token = CancellationToken::new();

        {
            let mut active = self.active.lock().await;
            if active.is_some() {
                return Err(HotlineError::Call("a call is already in progress".to_string()));
            }
            *active = Some(ActiveCall {
                queue: queue.clone(),
                token: token.clone(),
            });
        }

        info!("Incoming call {}", session_id);
        let result = self.converse(&session_id, &queue, &token, caller).await;

        // A hung-up call must not clear a call that started after it.
        let still_current = {
            let mut active = self.active.lock().await;
            let current = active
                .as_ref()
                .is_some_and(|call| Arc::ptr_eq(&call.queue, &queue));
            if current {
                active.take();
            }
            current
        };
        queue.stop_all();
        if still_current {
            self.set_phase(CallPhase::Idle);
        }

        match &result {
            Ok(report) => info!(
                "Call {} finished: {:?} ({})",
                session_id, report.record.status, report.record.category
            ),
            Err(e) => warn!("Call {} ended early: {}", session_id, e),
        }
        result
    }

    /// Hang up: silence speech, abandon the remaining steps and return to idle
    pub async fn end_call(&self) -> bool {
        let Some(call) = self.active.lock().await.take() else {
            return false;
        };
        info!("Ending call {}", call.queue.session_id());
        call.token.cancel();
        call.queue.stop_all();
        self.set_phase(CallPhase::Idle);
        true
    }

    async fn converse(
        &self,
        session_id: &str,
        queue: &SpeechQueue,
        token: &CancellationToken,
        caller: &dyn CallerInput,
    ) -> Result<CallReport> {
        let mut turns = Vec::new();
        let script = self.load_script().await;

        self.pause(self.timings.pickup(), token).await?;
        self.set_phase(CallPhase::Greeting);
        let greeting = script
            .as_ref()
            .and_then(|s| s.step(StepKind::Greeting))
            .map(|step| step.text.clone())
            .unwrap_or_else(|| GREETING.to_string());
        turns.push(ConversationTurn::agent(&greeting, None));
        speak(queue, greeting).await?;

        self.pause(self.timings.after_greeting(), token).await?;
        self.set_phase(CallPhase::Listening);
        let query = caller.utterance();
        debug!("Caller said: '{}'", query);
        speak(queue, query.clone()).await?;
        turns.push(ConversationTurn::caller(&query));

        self.pause(self.timings.classify(), token).await?;
        self.set_phase(CallPhase::Classifying);
        let outcome = self.classifier.classify(&query).await;
        if token.is_cancelled() {
            return Err(HotlineError::CallEnded);
        }
        info!(
            "Classified as '{}' ({:?}, confidence {:.2})",
            outcome.subtype, outcome.urgency, outcome.confidence
        );

        self.pause(self.timings.respond(), token).await?;
        self.set_phase(CallPhase::Responding);
        let status = if outcome.confidence > ESCALATION_THRESHOLD {
            CallStatus::Resolved
        } else {
            CallStatus::Escalated
        };
        let response = match status {
            CallStatus::Resolved => script
                .as_ref()
                .and_then(|s| s.step(StepKind::Response))
                .map(|step| step.render(&outcome.response))
                .unwrap_or_else(|| outcome.response.clone()),
            CallStatus::Escalated => ESCALATION_RESPONSE.to_string(),
        };
        turns.push(ConversationTurn::agent(&response, Some(outcome.confidence)));
        speak(queue, response).await?;

        let record = CallRecord::new(&query, Some(&outcome), status);
        self.ledger.write().await.record(record.clone());

        self.pause(self.timings.closing(), token).await?;
        self.set_phase(CallPhase::Closing);
        let closing = match status {
            CallStatus::Resolved => CLOSING_RESOLVED.to_string(),
            CallStatus::Escalated => script
                .as_ref()
                .and_then(|s| s.step(StepKind::Transfer))
                .map(|step| step.text.clone())
                .unwrap_or_else(|| CLOSING_ESCALATED.to_string()),
        };
        turns.push(ConversationTurn::agent(&closing, None));
        speak(queue, closing).await?;

        Ok(CallReport {
            session_id: session_id.to_string(),
            turns,
            outcome,
            record,
        })
    }

    /// The backend's default script, when the backend is reachable
    async fn load_script(&self) -> Option<ConversationScript> {
        let backend = self.classifier.backend().filter(|b| b.is_connected())?;
        match backend.default_script().await {
            Ok(script) => script.filter(|s| s.is_active),
            Err(e) => {
                warn!("Could not load the default conversation script: {}", e);
                None
            }
        }
    }

    async fn pause(&self, duration: Duration, token: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(HotlineError::CallEnded),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    fn set_phase(&self, phase: CallPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!("Call phase {} -> {}", previous, phase);
        }
    }
}

async fn speak(queue: &SpeechQueue, text: String) -> Result<()> {
    queue.speak(text).await.map_err(|e| match e {
        SpeechError::Cancelled => HotlineError::CallEnded,
        other => HotlineError::Speech(other),
    })
}
