use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A safety-critical signal routed outside the normal prompt flow.
#[derive(Debug, Clone, Serialize)]
pub struct RiskEvent {
    pub session_id: String,
    /// Transcript sequence the signal originated from
    pub source_sequence: u64,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl RiskEvent {
    fn dedup_key(&self) -> (String, u64, Severity) {
        (self.session_id.clone(), self.source_sequence, self.severity)
    }
}

/// Human-notification sink (push/SMS/email). `notify` returning Ok means the
/// delivery was acknowledged.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &RiskEvent) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}

/// Notifier that logs the event and acknowledges immediately.
///
/// Default secondary channel: when the real notification integration is down
/// the signal still lands in the operational log instead of being dropped.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &RiskEvent) -> anyhow::Result<()> {
        error!(
            session_id = %event.session_id,
            sequence = event.source_sequence,
            severity = %event.severity,
            "RISK ESCALATION"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Retry behavior for escalation delivery.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    /// Attempts against the primary notifier before the secondary joins in
    pub primary_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Per-attempt deadline for a notifier call
    pub notify_timeout: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            primary_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(5),
        }
    }
}

/// Out-of-band, at-least-once delivery path for high/critical risk signals.
///
/// Deliberately decoupled from per-session prompt serialization and the audio
/// backlog: a classified signal goes straight onto this channel's own queue
/// and each event is delivered by its own task, so a wedged notifier or a
/// lagging transcription queue can never delay a newer critical signal.
/// Events are deduplicated on (session, source sequence, severity) and
/// retried until acknowledged, falling back to the secondary notifier.
pub struct RiskEscalationChannel {
    tx: mpsc::UnboundedSender<RiskEvent>,
    pending: Arc<AtomicUsize>,
    delivered: Arc<RwLock<Vec<RiskEvent>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl RiskEscalationChannel {
    pub fn new(
        primary: Arc<dyn Notifier>,
        secondary: Arc<dyn Notifier>,
        policy: EscalationPolicy,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(RwLock::new(Vec::new()));

        let dispatcher = tokio::spawn(dispatch(
            rx,
            primary,
            secondary,
            policy,
            Arc::clone(&pending),
            Arc::clone(&delivered),
        ));

        Self {
            tx,
            pending,
            delivered,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Hand a risk event to the channel. Never blocks the caller.
    pub fn submit(&self, event: RiskEvent) -> anyhow::Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(event).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            anyhow::anyhow!("escalation channel closed: {e}")
        })
    }

    /// Number of events not yet acknowledged
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait up to `deadline` for all submitted events to be acknowledged.
    ///
    /// Returns false on timeout; deliveries keep retrying in the background
    /// either way.
    pub async fn drain(&self, deadline: Duration) -> bool {
        let poll = Duration::from_millis(10);
        let until = tokio::time::Instant::now() + deadline;
        while self.pending() > 0 {
            if tokio::time::Instant::now() >= until {
                warn!(pending = self.pending(), "escalation drain timed out");
                return false;
            }
            tokio::time::sleep(poll).await;
        }
        true
    }

    /// Snapshot of acknowledged deliveries
    pub async fn delivered(&self) -> Vec<RiskEvent> {
        self.delivered.read().await.clone()
    }

    /// Stop accepting new events and wait for the dispatcher to exit.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.dispatcher.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<RiskEvent>,
    primary: Arc<dyn Notifier>,
    secondary: Arc<dyn Notifier>,
    policy: EscalationPolicy,
    pending: Arc<AtomicUsize>,
    delivered: Arc<RwLock<Vec<RiskEvent>>>,
) {
    let mut seen: HashSet<(String, u64, Severity)> = HashSet::new();

    while let Some(event) = rx.recv().await {
        if !seen.insert(event.dedup_key()) {
            // Reprocessed segment or duplicate classification
            pending.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        let primary = Arc::clone(&primary);
        let secondary = Arc::clone(&secondary);
        let policy = policy.clone();
        let pending = Arc::clone(&pending);
        let delivered = Arc::clone(&delivered);

        // One task per event: delivery of one signal must never wait behind
        // retries of another.
        tokio::spawn(async move {
            deliver(event, &primary, &secondary, &policy, &delivered).await;
            pending.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

async fn deliver(
    mut event: RiskEvent,
    primary: &Arc<dyn Notifier>,
    secondary: &Arc<dyn Notifier>,
    policy: &EscalationPolicy,
    delivered: &Arc<RwLock<Vec<RiskEvent>>>,
) {
    let mut attempt: u32 = 0;
    loop {
        // Primary gets the first attempts; afterwards alternate between
        // secondary and primary until someone acknowledges.
        let notifier = if attempt < policy.primary_attempts {
            primary
        } else if (attempt - policy.primary_attempts) % 2 == 0 {
            secondary
        } else {
            primary
        };

        match tokio::time::timeout(policy.notify_timeout, notifier.notify(&event)).await {
            Ok(Ok(())) => {
                event.delivered_at = Some(Utc::now());
                info!(
                    session_id = %event.session_id,
                    sequence = event.source_sequence,
                    severity = %event.severity,
                    channel = notifier.name(),
                    attempt,
                    "risk event delivered"
                );
                delivered.write().await.push(event);
                return;
            }
            Ok(Err(e)) => {
                warn!(
                    channel = notifier.name(),
                    attempt,
                    "risk escalation delivery failed: {e}"
                );
            }
            Err(_) => {
                warn!(
                    channel = notifier.name(),
                    attempt, "risk escalation delivery timed out"
                );
            }
        }

        if attempt == policy.primary_attempts {
            warn!(
                session_id = %event.session_id,
                sequence = event.source_sequence,
                "primary escalation channel exhausted, involving secondary"
            );
        }

        let backoff = policy
            .initial_backoff
            .saturating_mul(1u32 << attempt.min(6))
            .min(policy.max_backoff);
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}
