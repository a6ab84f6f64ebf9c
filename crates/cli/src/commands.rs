//! CLI subcommand handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use hotline::{
    call::{CallerInput, FixedCaller, SampleCaller},
    speech::{RemoteChannel, SpeechOutputs, TimedSink},
    BackendClient, CallFlow, CatalogStore, ClassificationService, HealthMonitor, HotlineConfig,
    HotlineError, SpeechQueue,
};
use tokio::sync::oneshot;
use tracing::info;

use crate::{output, voice::TerminalVoice};

/// Backend client after one health probe; `None` when the CLI runs offline
async fn connect(config: &HotlineConfig, offline: bool) -> Result<Option<Arc<BackendClient>>> {
    if offline {
        return Ok(None);
    }

    let backend = Arc::new(
        BackendClient::new(&config.backend).context("Failed to create backend client")?,
    );
    if backend.check_health().await {
        info!("Connected to backend at {}", backend.base_url());
    } else {
        output::print_warning(&format!(
            "Backend at {} is not reachable, working locally",
            backend.base_url()
        ));
    }
    Ok(Some(backend))
}

fn speech_outputs(config: &HotlineConfig, backend: Option<&Arc<BackendClient>>) -> SpeechOutputs {
    let outputs = SpeechOutputs::local(Arc::new(TerminalVoice::new()), Arc::new(TimedSink::new()));
    match backend {
        Some(backend) if config.speech.use_remote_synthesis => outputs.with_remote(
            RemoteChannel::new(backend.clone(), config.speech.voice.clone()),
        ),
        _ => outputs,
    }
}

pub async fn classify(config: &HotlineConfig, text: &str, local: bool, json: bool) -> Result<()> {
    let backend = connect(config, local).await?;
    let service = ClassificationService::new(backend, Arc::new(CatalogStore::default()));

    let outcome = service.classify(text).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::print_header("Classification");
        output::print_outcome(&outcome);
    }
    Ok(())
}

pub async fn catalog(config: &HotlineConfig) -> Result<()> {
    let store = CatalogStore::default();
    let backend = connect(config, false).await?.filter(|b| b.is_connected());

    if let Some(backend) = &backend {
        match store.reload_from(backend).await {
            Ok(count) => info!("Loaded {} categories from backend", count),
            Err(e) => output::print_warning(&format!("Could not load backend catalog: {}", e)),
        }
    }

    output::print_header("Category catalog");
    output::print_catalog(store.snapshot().await.records());

    let Some(backend) = backend else {
        return Ok(());
    };

    output::print_header("Executors");
    match backend.list_executors().await {
        Ok(executors) => output::print_executors(&executors),
        Err(e) => output::print_warning(&format!("Could not load executors: {}", e)),
    }

    output::print_header("Conversation scripts");
    match backend.list_scripts().await {
        Ok(scripts) => output::print_scripts(&scripts),
        Err(e) => output::print_warning(&format!("Could not load scripts: {}", e)),
    }
    Ok(())
}

pub async fn speak(config: &HotlineConfig, texts: &[String], no_remote: bool) -> Result<()> {
    let mut config = config.clone();
    if no_remote {
        config.speech.use_remote_synthesis = false;
    }

    let backend = connect(&config, no_remote).await?;
    let queue = SpeechQueue::new(
        "cli",
        config.speech.clone(),
        speech_outputs(&config, backend.as_ref()),
    );

    output::print_header("Speaking");
    let mut pending = Vec::with_capacity(texts.len());
    for (index, text) in texts.iter().enumerate() {
        let (done_tx, done_rx) = oneshot::channel();
        queue.enqueue(text.as_str(), config.speech.use_remote_synthesis, move || {
            let _ = done_tx.send(index);
        })?;
        pending.push(done_rx);
    }

    for done in pending {
        let index = done.await.context("Speech queue stopped early")?;
        info!("Finished utterance {}", index + 1);
    }
    output::print_success(&format!("Spoke {} utterance(s)", texts.len()));
    Ok(())
}

pub async fn simulate(config: &HotlineConfig, query: Option<String>, offline: bool) -> Result<()> {
    let backend = connect(config, offline).await?;
    let _monitor = backend
        .as_ref()
        .map(|b| HealthMonitor::spawn(b.clone(), config.backend.health_interval()));
    let outputs = speech_outputs(config, backend.as_ref());
    let service = Arc::new(ClassificationService::new(
        backend,
        Arc::new(CatalogStore::default()),
    ));
    let flow = Arc::new(CallFlow::new(
        service,
        config.speech.clone(),
        outputs,
        config.call.clone(),
    ));

    let mut phases = flow.subscribe();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            output::print_phase(phase);
        }
    });

    let hang_up = {
        let flow = flow.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flow.end_call().await;
            }
        })
    };

    let caller: Box<dyn CallerInput> = match query {
        Some(query) => Box::new(FixedCaller(query)),
        None => Box::new(SampleCaller),
    };

    output::print_header("Incoming call");
    let result = flow.run_call(caller.as_ref()).await;
    hang_up.abort();

    let report = match result {
        Ok(report) => report,
        Err(HotlineError::CallEnded) => {
            output::print_warning("Call ended by operator");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    output::print_header("Transcript");
    output::print_transcript(&report);

    output::print_header("Result");
    output::print_outcome(&report.outcome);
    println!();
    output::print_record(&report.record);
    output::print_stats(&flow.stats().await);
    Ok(())
}

pub fn show_config(config: &HotlineConfig) -> Result<()> {
    output::print_header("Configuration");
    output::print_info(&format!(
        "File: {}",
        crate::config::config_path().display()
    ));
    let mut shown = config.clone();
    if shown.backend.password.is_some() {
        shown.backend.password = Some("********".to_string());
    }
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
