use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::{
    config::SpeechConfig,
    speech::{
        playback::tests::silent_wav, AudioClip, AudioSink, LocalVoice, QueueState, RemoteChannel,
        RemoteSynthesizer, SpeechError, SpeechOutputs, SpeechQueue, SpeechResult, UnavailableVoice,
        Utterance,
    },
};

/// Records output events and how many outputs were active at once
#[derive(Default)]
struct Probe {
    events: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Probe {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn enter(&self, event: String) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.push(event);
    }

    fn exit(&self, event: String) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

struct RecordingVoice {
    probe: Arc<Probe>,
    duration: Duration,
    cancelled: Notify,
}

#[async_trait]
impl LocalVoice for RecordingVoice {
    fn is_available(&self) -> bool {
        true
    }

    async fn speak(&self, utterance: &Utterance) -> SpeechResult<()> {
        self.probe.enter(format!("voice:start:{}", utterance.text));
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => {}
            _ = self.cancelled.notified() => {}
        }
        self.probe.exit(format!("voice:end:{}", utterance.text));
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}

struct RecordingSink {
    probe: Arc<Probe>,
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, clip: &AudioClip) -> SpeechResult<()> {
        self.probe.enter("sink:start".to_string());
        tokio::time::sleep(clip.play_time()).await;
        self.probe.exit("sink:end".to_string());
        Ok(())
    }

    fn stop(&self) {}
}

enum SynthMode {
    Succeed,
    Fail,
    FailFor(&'static str),
    Slow(Duration),
    Hang,
}

struct ScriptedSynth {
    probe: Arc<Probe>,
    mode: SynthMode,
}

#[async_trait]
impl RemoteSynthesizer for ScriptedSynth {
    async fn synthesize(&self, text: &str, _voice: &str) -> SpeechResult<Bytes> {
        self.probe.push(format!("synth:{}", text));
        let fail = match self.mode {
            SynthMode::Succeed => false,
            SynthMode::Fail => true,
            SynthMode::FailFor(failing) => failing == text,
            SynthMode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                false
            }
            SynthMode::Hang => std::future::pending::<bool>().await,
        };
        if fail {
            Err(SpeechError::Synthesis("backend returned 500".to_string()))
        } else {
            Ok(silent_wav(8_000, 200))
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn voice(probe: &Arc<Probe>) -> Arc<RecordingVoice> {
    Arc::new(RecordingVoice {
        probe: probe.clone(),
        duration: Duration::from_millis(100),
        cancelled: Notify::new(),
    })
}

fn local_queue(probe: &Arc<Probe>) -> SpeechQueue {
    let outputs = SpeechOutputs::local(voice(probe), Arc::new(RecordingSink { probe: probe.clone() }));
    SpeechQueue::new("test-session", SpeechConfig::default(), outputs)
}

fn remote_queue(probe: &Arc<Probe>, mode: SynthMode) -> SpeechQueue {
    let synth = Arc::new(ScriptedSynth {
        probe: probe.clone(),
        mode,
    });
    let outputs = SpeechOutputs::local(voice(probe), Arc::new(RecordingSink { probe: probe.clone() }))
        .with_remote(RemoteChannel::new(synth, "default"));
    SpeechQueue::new("test-session", SpeechConfig::default(), outputs)
}

fn done(probe: &Arc<Probe>, label: &str) -> impl FnOnce() + Send + 'static {
    let probe = probe.clone();
    let label = label.to_string();
    move || probe.push(format!("done:{}", label))
}

async fn drain(queue: &SpeechQueue) {
    for _ in 0..10_000 {
        if queue.pending() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("speech queue did not drain");
}

#[tokio::test(start_paused = true)]
async fn test_callbacks_fire_before_next_item_starts() {
    let probe = Arc::new(Probe::default());
    let queue = local_queue(&probe);

    for label in ["A", "B", "C"] {
        queue.enqueue(label, false, done(&probe, label)).unwrap();
    }
    drain(&queue).await;

    assert_eq!(
        probe.events(),
        vec![
            "voice:start:A",
            "voice:end:A",
            "done:A",
            "voice:start:B",
            "voice:end:B",
            "done:B",
            "voice:start:C",
            "voice:end:C",
            "done:C",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_outputs_never_overlap() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::FailFor("2"));

    for label in ["1", "2", "3", "4", "5"] {
        queue.enqueue(label, label != "4", done(&probe, label)).unwrap();
    }
    drain(&queue).await;

    assert_eq!(probe.max_active(), 1);
    let done_order: Vec<String> = probe
        .events()
        .into_iter()
        .filter(|e| e.starts_with("done:"))
        .collect();
    assert_eq!(done_order, vec!["done:1", "done:2", "done:3", "done:4", "done:5"]);
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_falls_back_for_that_item_only() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::FailFor("B"));

    for label in ["A", "B", "C"] {
        queue.enqueue(label, true, done(&probe, label)).unwrap();
    }
    drain(&queue).await;

    assert_eq!(
        probe.events(),
        vec![
            "synth:A",
            "sink:start",
            "sink:end",
            "done:A",
            "synth:B",
            "voice:start:B",
            "voice:end:B",
            "done:B",
            "synth:C",
            "sink:start",
            "sink:end",
            "done:C",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_backend_speaks_greeting_then_question_locally() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::Fail);

    queue.enqueue("Вітаю", true, done(&probe, "Вітаю")).unwrap();
    queue
        .enqueue("Як справи?", true, done(&probe, "Як справи?"))
        .unwrap();
    drain(&queue).await;

    assert_eq!(
        probe.events(),
        vec![
            "synth:Вітаю",
            "voice:start:Вітаю",
            "voice:end:Вітаю",
            "done:Вітаю",
            "synth:Як справи?",
            "voice:start:Як справи?",
            "voice:end:Як справи?",
            "done:Як справи?",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hanging_backend_times_out_to_local_voice() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::Hang);

    let start = tokio::time::Instant::now();
    queue.speak("Вітаю").await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(8_000));
    assert!(start.elapsed() < Duration::from_millis(9_000));
    assert_eq!(
        probe.events(),
        vec!["synth:Вітаю", "voice:start:Вітаю", "voice:end:Вітаю"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_callback_does_not_stall_queue() {
    let probe = Arc::new(Probe::default());
    let queue = local_queue(&probe);

    queue
        .enqueue("first", false, || panic!("callback failure"))
        .unwrap();
    queue.enqueue("second", false, done(&probe, "second")).unwrap();
    drain(&queue).await;

    let events = probe.events();
    assert!(events.contains(&"voice:end:second".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("done:second"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_all_discards_queue_and_callbacks() {
    let probe = Arc::new(Probe::default());
    let queue = local_queue(&probe);

    for label in ["A", "B", "C"] {
        queue.enqueue(label, false, done(&probe, label)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(queue.is_speaking());

    queue.stop_all();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let events = probe.events();
    assert_eq!(events.first().map(String::as_str), Some("voice:start:A"));
    assert!(events.iter().all(|e| !e.starts_with("done:")));
    assert!(!events.contains(&"voice:start:B".to_string()));
    assert_eq!(queue.state(), QueueState::Idle);
    assert!(!queue.is_speaking());

    let rejected = queue.enqueue("late", false, done(&probe, "late"));
    assert!(matches!(rejected, Err(SpeechError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_speak_reports_cancellation() {
    let probe = Arc::new(Probe::default());
    let queue = Arc::new(local_queue(&probe));

    queue.enqueue("A", false, done(&probe, "A")).unwrap();
    let waiting = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.speak("B").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.stop_all();

    let result = waiting.await.unwrap();
    assert!(matches!(result, Err(SpeechError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_voice_completes_after_delay() {
    let probe = Arc::new(Probe::default());
    let outputs = SpeechOutputs::local(
        Arc::new(UnavailableVoice),
        Arc::new(RecordingSink { probe: probe.clone() }),
    );
    let queue = SpeechQueue::new("test-session", SpeechConfig::default(), outputs);

    let start = tokio::time::Instant::now();
    queue.speak("Вітаю").await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    assert!(probe.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_muted_speaker_skips_output() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::Succeed);
    queue.set_speaker(false);

    queue.enqueue("Вітаю", true, done(&probe, "Вітаю")).unwrap();
    drain(&queue).await;

    assert_eq!(probe.events(), vec!["done:Вітаю"]);
}

#[tokio::test(start_paused = true)]
async fn test_muting_during_synthesis_drops_audio() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::Slow(Duration::from_millis(500)));

    queue.enqueue("Вітаю", true, done(&probe, "Вітаю")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(queue.is_speaking());
    queue.set_speaker(false);
    drain(&queue).await;

    assert_eq!(probe.events(), vec!["synth:Вітаю", "done:Вітаю"]);
    assert_eq!(probe.max_active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_toggle_and_per_item_preference() {
    let probe = Arc::new(Probe::default());
    let queue = remote_queue(&probe, SynthMode::Succeed);
    assert!(queue.remote_available());

    queue.enqueue("local", false, done(&probe, "local")).unwrap();
    drain(&queue).await;
    queue.set_remote_enabled(false);
    queue.enqueue("disabled", true, done(&probe, "disabled")).unwrap();
    drain(&queue).await;

    let events = probe.events();
    assert!(events.iter().all(|e| !e.starts_with("synth:")));
    assert!(events.contains(&"voice:start:local".to_string()));
    assert!(events.contains(&"voice:start:disabled".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_state_follows_draining() {
    let probe = Arc::new(Probe::default());
    let queue = local_queue(&probe);
    assert_eq!(queue.state(), QueueState::Idle);

    queue.enqueue("A", false, done(&probe, "A")).unwrap();
    queue.enqueue("B", false, done(&probe, "B")).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(queue.state(), QueueState::Draining);
    assert_eq!(queue.pending(), 2);

    drain(&queue).await;
    assert_eq!(queue.state(), QueueState::Idle);
    assert!(!queue.is_speaking());
}
