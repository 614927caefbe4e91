// Shared test harness: scripted external services and a session builder.
// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use session_intel::audio::{AudioChunk, ChannelCapture};
use session_intel::prompts::CoachingPrompt;
use session_intel::risk::{
    EscalationPolicy, KeywordRiskClassifier, Notifier, RiskEscalationChannel, RiskEvent,
};
use session_intel::session::{SessionConfig, SessionController, SessionDeps};
use session_intel::summary::{OutlineSummarize, Summarize};
use session_intel::transcript::TranscriptSegment;
use session_intel::transcription::{SpeechToText, SttContext, SttError, Transcription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn chunk(session_id: &str, sequence: u64, text: &str) -> AudioChunk {
    AudioChunk {
        session_id: session_id.to_string(),
        sequence,
        captured_at: Utc::now(),
        payload: text.as_bytes().to_vec(),
    }
}

/// Per-sequence transcription behavior.
#[derive(Debug, Clone, Copy)]
pub enum SttBehavior {
    /// Return the chunk payload as text immediately
    Immediate,
    /// Return the payload after sleeping
    Delayed(Duration),
    /// Fail permanently on every attempt
    Permanent,
    /// Fail with a transient error for the first N attempts, then succeed
    TransientThenOk(u32),
}

/// Speech-to-text stub scripted per sequence number.
pub struct ScriptedStt {
    default: SttBehavior,
    behaviors: HashMap<u64, SttBehavior>,
    attempts: Mutex<HashMap<u64, u32>>,
}

impl ScriptedStt {
    pub fn new() -> Self {
        Self {
            default: SttBehavior::Immediate,
            behaviors: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Stub where every call fails permanently
    pub fn always_failing() -> Self {
        Self {
            default: SttBehavior::Permanent,
            behaviors: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with(mut self, sequence: u64, behavior: SttBehavior) -> Self {
        self.behaviors.insert(sequence, behavior);
        self
    }

    pub fn attempts_for(&self, sequence: u64) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&sequence)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(
        &self,
        chunk: &AudioChunk,
        _context: &SttContext,
    ) -> Result<Transcription, SttError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(chunk.sequence).or_insert(0);
            *counter += 1;
            *counter
        };

        let behavior = self
            .behaviors
            .get(&chunk.sequence)
            .copied()
            .unwrap_or(self.default);

        let text = || {
            String::from_utf8(chunk.payload.clone())
                .map_err(|e| SttError::Permanent(format!("not utf-8: {e}")))
        };

        match behavior {
            SttBehavior::Immediate => Ok(Transcription {
                text: text()?,
                speaker_hint: None,
                confidence: Some(0.95),
            }),
            SttBehavior::Delayed(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Transcription {
                    text: text()?,
                    speaker_hint: None,
                    confidence: Some(0.95),
                })
            }
            SttBehavior::Permanent => Err(SttError::Permanent("scripted failure".into())),
            SttBehavior::TransientThenOk(failures) => {
                if attempt <= failures {
                    Err(SttError::Transient(format!("scripted flake, attempt {attempt}")))
                } else {
                    Ok(Transcription {
                        text: text()?,
                        speaker_hint: None,
                        confidence: Some(0.95),
                    })
                }
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Notifier that records acknowledged deliveries, with optional latency and
/// scripted initial failures.
pub struct RecordingNotifier {
    latency: Duration,
    fail_first: AtomicU32,
    delivered: Mutex<Vec<RiskEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            fail_first: AtomicU32::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first `n` notify calls before starting to acknowledge
    pub fn failing_first(n: u32) -> Self {
        let notifier = Self::new();
        notifier.fail_first.store(n, Ordering::SeqCst);
        notifier
    }

    pub fn delivered(&self) -> Vec<RiskEvent> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &RiskEvent) -> anyhow::Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("scripted notifier outage");
        }
        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Summarization backend that always fails.
pub struct FailingSummarize;

#[async_trait]
impl Summarize for FailingSummarize {
    async fn summarize(
        &self,
        _transcript: &[TranscriptSegment],
        _prompts: &[CoachingPrompt],
    ) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("summarization service down")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Session tuning tightened for tests.
pub fn fast_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.worker.stt_timeout = Duration::from_secs(2);
    config.worker.retry_backoff = Duration::from_millis(10);
    config.worker.reorder_max_wait = Duration::from_millis(500);
    config.summary_timeout = Duration::from_secs(2);
    config.stop_grace = Duration::from_secs(5);
    config
}

pub fn fast_escalation_policy() -> EscalationPolicy {
    EscalationPolicy {
        primary_attempts: 2,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        notify_timeout: Duration::from_secs(1),
    }
}

/// A started session wired to scripted services, fed through a channel
/// capture device.
pub struct TestSession {
    pub controller: Arc<SessionController>,
    pub feed: mpsc::Sender<AudioChunk>,
    pub escalation: Arc<RiskEscalationChannel>,
    pub primary: Arc<RecordingNotifier>,
    pub secondary: Arc<RecordingNotifier>,
}

impl TestSession {
    pub async fn feed_text(&self, sequence: u64, text: &str) {
        self.feed
            .send(chunk(self.controller.id(), sequence, text))
            .await
            .expect("capture feed closed");
    }
}

pub struct TestSessionBuilder {
    stt: Arc<dyn SpeechToText>,
    summarize: Arc<dyn Summarize>,
    primary: Arc<RecordingNotifier>,
    secondary: Arc<RecordingNotifier>,
    config: SessionConfig,
}

impl TestSessionBuilder {
    pub fn new() -> Self {
        Self {
            stt: Arc::new(ScriptedStt::new()),
            summarize: Arc::new(OutlineSummarize::new()),
            primary: Arc::new(RecordingNotifier::new()),
            secondary: Arc::new(RecordingNotifier::new()),
            config: fast_config(),
        }
    }

    pub fn stt(mut self, stt: Arc<dyn SpeechToText>) -> Self {
        self.stt = stt;
        self
    }

    pub fn summarize(mut self, summarize: Arc<dyn Summarize>) -> Self {
        self.summarize = summarize;
        self
    }

    pub fn primary_notifier(mut self, notifier: Arc<RecordingNotifier>) -> Self {
        self.primary = notifier;
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn start(self, session_id: &str) -> TestSession {
        let capture = Arc::new(ChannelCapture::new(64));
        let feed = capture.sender();
        let escalation = Arc::new(RiskEscalationChannel::new(
            Arc::clone(&self.primary) as Arc<dyn Notifier>,
            Arc::clone(&self.secondary) as Arc<dyn Notifier>,
            fast_escalation_policy(),
        ));

        let deps = SessionDeps {
            capture,
            stt: self.stt,
            risk: Arc::new(KeywordRiskClassifier::new()),
            summarize: self.summarize,
            escalation: Arc::clone(&escalation),
        };

        let controller = Arc::new(SessionController::new(
            session_id.to_string(),
            self.config,
            deps,
        ));
        controller.start().await.expect("session start failed");

        TestSession {
            controller,
            feed,
            escalation,
            primary: self.primary,
            secondary: self.secondary,
        }
    }
}

/// Poll until the condition holds or the deadline passes.
pub async fn wait_for<F, Fut>(deadline: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let until = tokio::time::Instant::now() + deadline;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= until {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
