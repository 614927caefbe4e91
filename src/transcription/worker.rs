use super::reorder::{ReadySlot, ReorderBuffer, SlotOutcome};
use super::stt::{SpeechToText, SttContext, SttError, Transcription};
use crate::audio::{AudioChunk, AudioChunkReceiver};
use crate::transcript::Speaker;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Tuning for the transcription stage.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent calls to the speech-to-text service
    pub concurrency: usize,
    /// Per-call deadline
    pub stt_timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub retries: u32,
    /// Base backoff between retries, doubled per attempt
    pub retry_backoff: Duration,
    /// How long a head-of-line gap may block the log before being degraded
    pub reorder_max_wait: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            stt_timeout: Duration::from_secs(15),
            retries: 2,
            retry_backoff: Duration::from_millis(200),
            reorder_max_wait: Duration::from_secs(30),
        }
    }
}

/// Ordered transcription output, ready for analysis.
#[derive(Debug, Clone)]
pub struct OrderedTranscript {
    pub sequence: u64,
    pub text: String,
    pub speaker: Speaker,
    pub confidence: Option<f32>,
    /// True when the slot was inserted without usable text (permanent STT
    /// failure or reorder timeout)
    pub degraded: bool,
}

/// Consume chunks, transcribe them with bounded concurrency, and emit
/// strictly sequence-ordered transcripts.
///
/// Runs until the chunk intake closes and all in-flight calls have resolved,
/// then force-finalizes the reorder buffer so every submitted sequence is
/// accounted for.
pub async fn run(
    config: WorkerConfig,
    stt: Arc<dyn SpeechToText>,
    mut chunks: AudioChunkReceiver,
    out: mpsc::Sender<OrderedTranscript>,
) {
    let mut buffer = ReorderBuffer::new(config.reorder_max_wait);
    let mut inflight: JoinSet<(u64, Result<Transcription, String>)> = JoinSet::new();
    let mut recent: VecDeque<String> = VecDeque::new();
    let mut intake_done = false;
    // Tick granularity only affects how promptly an expired gap is degraded
    let mut tick = tokio::time::interval(config.reorder_max_wait.min(Duration::from_millis(250)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(concurrency = config.concurrency, engine = stt.name(), "transcription worker started");

    loop {
        if intake_done && inflight.is_empty() {
            break;
        }

        tokio::select! {
            maybe_chunk = chunks.recv(), if !intake_done && inflight.len() < config.concurrency => {
                match maybe_chunk {
                    Some(chunk) => {
                        let context = SttContext {
                            recent_lines: recent.iter().cloned().collect(),
                        };
                        let stt = Arc::clone(&stt);
                        let cfg = config.clone();
                        inflight.spawn(async move {
                            transcribe_with_retry(stt, chunk, context, cfg).await
                        });
                    }
                    None => {
                        debug!("chunk intake closed, draining in-flight transcriptions");
                        intake_done = true;
                    }
                }
            }

            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                match joined {
                    Ok((sequence, result)) => {
                        let outcome = match result {
                            Ok(t) => SlotOutcome::Transcribed(t),
                            Err(reason) => {
                                warn!(sequence, "chunk failed transcription permanently: {reason}");
                                SlotOutcome::Failed(reason)
                            }
                        };
                        let released = buffer.insert(sequence, outcome, Instant::now());
                        if released.is_empty() && buffer.has_pending() {
                            debug!(sequence, waiting_on = buffer.next_sequence(), "holding out-of-order completion");
                        }
                        emit(released, &out, &mut recent).await;
                    }
                    Err(e) => {
                        // A panicked transcription task loses its sequence
                        // number; the reorder max-wait will degrade the slot.
                        warn!("transcription task panicked: {e}");
                    }
                }
            }

            _ = tick.tick() => {
                emit(buffer.flush_expired(Instant::now()), &out, &mut recent).await;
            }
        }
    }

    // Intake closed and every call resolved; fill whatever gaps remain.
    emit(buffer.flush_all(Instant::now()), &out, &mut recent).await;

    info!("transcription worker finished");
}

async fn emit(
    released: Vec<ReadySlot>,
    out: &mpsc::Sender<OrderedTranscript>,
    recent: &mut VecDeque<String>,
) {
    for slot in released {
        let ordered = match slot {
            ReadySlot::Transcribed {
                sequence,
                transcription,
            } => {
                if !transcription.text.is_empty() {
                    recent.push_back(transcription.text.clone());
                    if recent.len() > 5 {
                        recent.pop_front();
                    }
                }
                OrderedTranscript {
                    sequence,
                    text: transcription.text,
                    speaker: transcription.speaker_hint.unwrap_or_default(),
                    confidence: transcription.confidence,
                    degraded: false,
                }
            }
            ReadySlot::Degraded { sequence, reason } => {
                warn!(sequence, "inserting degraded transcript slot: {reason}");
                OrderedTranscript {
                    sequence,
                    text: String::new(),
                    speaker: Speaker::Client,
                    confidence: None,
                    degraded: true,
                }
            }
        };

        if out.send(ordered).await.is_err() {
            warn!("analysis stage closed, discarding ordered transcript");
            return;
        }
    }
}

async fn transcribe_with_retry(
    stt: Arc<dyn SpeechToText>,
    chunk: AudioChunk,
    context: SttContext,
    config: WorkerConfig,
) -> (u64, Result<Transcription, String>) {
    let sequence = chunk.sequence;
    let mut last_error = String::new();

    for attempt in 0..=config.retries {
        match tokio::time::timeout(config.stt_timeout, stt.transcribe(&chunk, &context)).await {
            Ok(Ok(transcription)) => {
                debug!(sequence, attempt, "chunk transcribed");
                return (sequence, Ok(transcription));
            }
            Ok(Err(SttError::Permanent(reason))) => {
                return (sequence, Err(reason));
            }
            Ok(Err(SttError::Transient(reason))) => {
                warn!(sequence, attempt, "transient transcription failure: {reason}");
                last_error = reason;
            }
            Err(_) => {
                warn!(sequence, attempt, "transcription call timed out");
                last_error = format!("timed out after {:?}", config.stt_timeout);
            }
        }

        if attempt < config.retries {
            let backoff = config.retry_backoff.saturating_mul(1u32 << attempt.min(6));
            tokio::time::sleep(backoff).await;
        }
    }

    (
        sequence,
        Err(format!("retries exhausted: {last_error}")),
    )
}
