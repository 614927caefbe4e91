use super::config::SessionConfig;
use super::stats::{SessionState, SessionStats};
use crate::analysis::{AnalysisEngine, SegmentAnalysis};
use crate::audio::{AudioChunk, AudioChunkQueue, CaptureDevice};
use crate::error::SessionError;
use crate::events::{self, SessionEvent};
use crate::prompts::{self, CoachingPrompt, PromptInput, PromptLog};
use crate::risk::{RiskAssessment, RiskContext, RiskEscalationChannel, RiskEvent};
use crate::summary::{SessionSummarizer, SessionSummary, Summarize};
use crate::transcript::{TranscriptLog, TranscriptSegment};
use crate::transcription::{self, OrderedTranscript, SpeechToText};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// External integrations a session runs against.
#[derive(Clone)]
pub struct SessionDeps {
    pub capture: Arc<dyn CaptureDevice>,
    pub stt: Arc<dyn SpeechToText>,
    pub risk: Arc<dyn crate::risk::RiskClassifier>,
    pub summarize: Arc<dyn Summarize>,
    /// Shared across sessions; deliveries outlive the session that raised
    /// them
    pub escalation: Arc<RiskEscalationChannel>,
}

struct PipelineTasks {
    forwarder: JoinHandle<()>,
    worker: JoinHandle<()>,
    analysis: JoinHandle<()>,
    prompt: JoinHandle<()>,
}

struct RecordingClock {
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Owns one session end to end: the state machine, the pipeline tasks, and
/// the per-session logs.
///
/// State transitions are serialized by the state lock; stop is additionally
/// serialized by its own mutex so concurrent stops produce exactly one
/// summary.
pub struct SessionController {
    id: String,
    coach_id: Option<String>,
    client_id: Option<String>,
    config: SessionConfig,
    deps: SessionDeps,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    transcript: Arc<TranscriptLog>,
    prompts: Arc<PromptLog>,
    summary: RwLock<Option<SessionSummary>>,
    clock: RwLock<Option<RecordingClock>>,
    /// Frozen at stop so the closed session reports a stable duration
    final_elapsed_ms: RwLock<Option<u64>>,
    chunks_received: Arc<AtomicU64>,
    intake: RwLock<Option<Arc<AudioChunkQueue>>>,
    tasks: Mutex<Option<PipelineTasks>>,
    stop_gate: Mutex<()>,
}

impl SessionController {
    pub fn new(id: String, config: SessionConfig, deps: SessionDeps) -> Self {
        let events = events::channel(config.event_capacity);
        Self {
            id,
            coach_id: None,
            client_id: None,
            config,
            deps,
            state: RwLock::new(SessionState::Idle),
            events,
            transcript: Arc::new(TranscriptLog::new()),
            prompts: Arc::new(PromptLog::new()),
            summary: RwLock::new(None),
            clock: RwLock::new(None),
            final_elapsed_ms: RwLock::new(None),
            chunks_received: Arc::new(AtomicU64::new(0)),
            intake: RwLock::new(None),
            tasks: Mutex::new(None),
            stop_gate: Mutex::new(()),
        }
    }

    /// Attach the participants this session is for.
    pub fn with_participants(
        mut self,
        coach_id: Option<String>,
        client_id: Option<String>,
    ) -> Self {
        self.coach_id = coach_id;
        self.client_id = client_id;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Subscribe to the session's UI event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Acquire the capture device and bring the pipeline up.
    ///
    /// On capture failure the session stays Idle and holds no resources.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if *state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                session_id: self.id.clone(),
                expected: SessionState::Idle.as_str(),
                actual: state.as_str(),
            });
        }

        let mut device_rx = self.deps.capture.acquire(&self.id).await?;

        let (queue, chunk_rx) = AudioChunkQueue::new(
            self.config.queue_capacity,
            self.config.queue_watermark,
            self.events.clone(),
        );
        let queue = Arc::new(queue);
        *self.intake.write().await = Some(Arc::clone(&queue));

        // Capture forwarder: device stream into the bounded queue. The queue
        // applies backpressure; the forwarder never drops a chunk.
        let forwarder = {
            let session_id = self.id.clone();
            let chunks_received = Arc::clone(&self.chunks_received);
            tokio::spawn(async move {
                while let Some(chunk) = device_rx.recv().await {
                    chunks_received.fetch_add(1, Ordering::SeqCst);
                    if queue.push(chunk).await.is_err() {
                        break;
                    }
                }
                debug!(%session_id, "capture stream ended");
            })
        };

        let (ordered_tx, ordered_rx) = mpsc::channel::<OrderedTranscript>(self.config.queue_capacity);
        let worker = tokio::spawn(transcription::worker::run(
            self.config.worker.clone(),
            Arc::clone(&self.deps.stt),
            chunk_rx,
            ordered_tx,
        ));

        let (prompt_tx, prompt_rx) = mpsc::channel::<PromptInput>(self.config.queue_capacity);
        let analysis = tokio::spawn(analysis_stage(
            self.id.clone(),
            AnalysisEngine::keyword(Arc::clone(&self.deps.risk)),
            ordered_rx,
            Arc::clone(&self.transcript),
            prompt_tx,
            Arc::clone(&self.deps.escalation),
            self.events.clone(),
        ));

        let prompt = tokio::spawn(prompts::engine::run(
            self.id.clone(),
            self.config.prompts.clone(),
            prompt_rx,
            Arc::clone(&self.prompts),
            self.events.clone(),
        ));

        *self.tasks.lock().await = Some(PipelineTasks {
            forwarder,
            worker,
            analysis,
            prompt,
        });
        *self.clock.write().await = Some(RecordingClock {
            started_at: Utc::now(),
            started: Instant::now(),
        });
        *state = SessionState::Recording;

        info!(session_id = %self.id, device = self.deps.capture.name(), "session recording");
        Ok(())
    }

    /// Push a chunk into the pipeline directly, bypassing the capture
    /// device. Serves ingest-style deployments where audio arrives over the
    /// API; client retries may resend a sequence, which the reorder stage
    /// deduplicates.
    pub async fn ingest(&self, chunk: AudioChunk) -> Result<(), SessionError> {
        let state = *self.state.read().await;
        if state != SessionState::Recording {
            return Err(SessionError::ChunkRejected {
                session_id: self.id.clone(),
                sequence: chunk.sequence,
                state: state.as_str(),
            });
        }

        let queue = {
            let intake = self.intake.read().await;
            intake.as_ref().map(Arc::clone)
        };
        let sequence = chunk.sequence;
        match queue {
            Some(queue) => {
                self.chunks_received.fetch_add(1, Ordering::SeqCst);
                queue.push(chunk).await.map_err(|_| SessionError::ChunkRejected {
                    session_id: self.id.clone(),
                    sequence,
                    state: "stopping",
                })
            }
            None => Err(SessionError::ChunkRejected {
                session_id: self.id.clone(),
                sequence,
                state: state.as_str(),
            }),
        }
    }

    /// Stop intake, drain the pipeline, and produce the post-session
    /// summary.
    ///
    /// Idempotent: concurrent and repeated calls all resolve to the same
    /// single summary. Escalation deliveries are not cut off by stop; they
    /// retry in the background until acknowledged.
    pub async fn stop(&self) -> Result<SessionSummary, SessionError> {
        let _gate = self.stop_gate.lock().await;

        {
            let mut state = self.state.write().await;
            match *state {
                SessionState::Recording => *state = SessionState::Stopping,
                SessionState::Closed => {
                    let summary = self.summary.read().await.clone();
                    if let Some(summary) = summary {
                        return Ok(summary);
                    }
                    return Err(SessionError::InvalidState {
                        session_id: self.id.clone(),
                        expected: SessionState::Recording.as_str(),
                        actual: state.as_str(),
                    });
                }
                other => {
                    return Err(SessionError::InvalidState {
                        session_id: self.id.clone(),
                        expected: SessionState::Recording.as_str(),
                        actual: other.as_str(),
                    });
                }
            }
        }

        info!(session_id = %self.id, "stopping session");

        if let Some(clock) = self.clock.read().await.as_ref() {
            *self.final_elapsed_ms.write().await =
                Some(clock.started.elapsed().as_millis() as u64);
        }

        // Close intake: abort the forwarder and drop our queue handle so the
        // transcription worker sees the channel end once it has drained.
        let tasks = self.tasks.lock().await.take();
        self.intake.write().await.take();

        let mut drain_timed_out = false;
        if let Some(tasks) = tasks {
            tasks.forwarder.abort();
            let _ = tasks.forwarder.await;

            for (name, mut handle) in [
                ("transcription", tasks.worker),
                ("analysis", tasks.analysis),
                ("prompts", tasks.prompt),
            ] {
                match tokio::time::timeout(self.config.stop_grace, &mut handle).await {
                    Ok(_) => {}
                    Err(_) => {
                        warn!(session_id = %self.id, stage = name, "drain grace expired, aborting stage");
                        handle.abort();
                        drain_timed_out = true;
                    }
                }
            }
        }

        self.deps.capture.release(&self.id).await;

        // Give in-flight escalations a chance to be acknowledged before the
        // summary reports on them. Timing out here is not fatal; delivery
        // tasks keep retrying.
        self.deps.escalation.drain(self.config.stop_grace).await;

        *self.state.write().await = SessionState::Summarizing;

        let transcript = self.transcript.snapshot().await;
        let prompts = self.prompts.snapshot().await;
        let transcript_degraded =
            drain_timed_out || transcript.iter().any(|s| s.degraded);

        let summarizer = SessionSummarizer::new(
            Arc::clone(&self.deps.summarize),
            self.config.summary_timeout,
        );
        let summary = summarizer
            .generate(&self.id, &transcript, &prompts, transcript_degraded)
            .await;

        *self.summary.write().await = Some(summary.clone());
        *self.state.write().await = SessionState::Closed;
        let _ = self.events.send(SessionEvent::SummaryReady {
            degraded: summary.degraded,
        });

        info!(session_id = %self.id, degraded = summary.degraded, "session closed");
        Ok(summary)
    }

    pub async fn transcript(&self) -> Vec<TranscriptSegment> {
        self.transcript.snapshot().await
    }

    /// Prompts in rendering order, priority-first.
    pub async fn prompts(&self) -> Vec<CoachingPrompt> {
        self.prompts.render().await
    }

    pub async fn summary(&self) -> Option<SessionSummary> {
        self.summary.read().await.clone()
    }

    pub async fn stats(&self) -> SessionStats {
        let state = *self.state.read().await;
        let (started_at, live_elapsed) = match self.clock.read().await.as_ref() {
            Some(clock) => (
                Some(clock.started_at),
                Some(clock.started.elapsed().as_millis() as u64),
            ),
            None => (None, None),
        };
        let elapsed_ms = match *self.final_elapsed_ms.read().await {
            Some(frozen) => Some(frozen),
            None => live_elapsed,
        };
        let pipeline_degraded = {
            let intake = self.intake.read().await;
            intake.as_ref().map(|q| q.is_degraded()).unwrap_or(false)
        };

        SessionStats {
            session_id: self.id.clone(),
            coach_id: self.coach_id.clone(),
            client_id: self.client_id.clone(),
            state,
            started_at,
            elapsed_ms,
            chunks_received: self.chunks_received.load(Ordering::SeqCst),
            segments: self.transcript.len().await,
            degraded_segments: self.transcript.degraded_count().await,
            prompts: self.prompts.len().await,
            escalations_pending: self.deps.escalation.pending(),
            escalations_delivered: self.deps.escalation.delivered().await.len(),
            pipeline_degraded,
        }
    }
}

/// Segment assembly stage: annotates ordered transcripts, appends them to
/// the log, and fans out to prompts and escalation.
///
/// This is the only writer of the transcript log, so sequence order holds by
/// construction. Risk classification runs on every segment regardless of
/// speaker; the prompt actor filters to client speech itself.
async fn analysis_stage(
    session_id: String,
    engine: AnalysisEngine,
    mut ordered: mpsc::Receiver<OrderedTranscript>,
    transcript: Arc<TranscriptLog>,
    prompt_tx: mpsc::Sender<PromptInput>,
    escalation: Arc<RiskEscalationChannel>,
    events: broadcast::Sender<SessionEvent>,
) {
    let mut recent: VecDeque<String> = VecDeque::new();

    while let Some(item) = ordered.recv().await {
        let (analysis, analyzed) = if item.degraded || item.text.is_empty() {
            (empty_analysis(), true)
        } else {
            let context = RiskContext {
                recent: recent.iter().cloned().collect(),
            };
            match engine.analyze(&item.text, &context) {
                Ok(analysis) => (analysis, true),
                Err(err) => {
                    warn!(sequence = item.sequence, "analysis failed, flagging segment for review: {err}");
                    (empty_analysis(), false)
                }
            }
        };

        if !item.text.is_empty() {
            recent.push_back(item.text.clone());
            if recent.len() > 5 {
                recent.pop_front();
            }
        }

        let segment = TranscriptSegment {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            sequence: item.sequence,
            speaker: item.speaker,
            text: item.text,
            timestamp: Utc::now(),
            emotions: analysis.emotions.clone(),
            triggers: analysis.triggers.clone(),
            risk_severity: analysis.risk.severity,
            degraded: item.degraded,
            analyzed,
        };
        let degraded = segment.degraded;
        let sequence = segment.sequence;

        if let Err(err) = transcript.append(segment).await {
            error!(%session_id, "dropping segment, transcript append failed: {err}");
            continue;
        }
        let _ = events.send(SessionEvent::SegmentAppended { sequence, degraded });

        if analysis.risk.severity.requires_escalation() {
            let _ = events.send(SessionEvent::RiskEscalated {
                sequence,
                severity: analysis.risk.severity,
            });
            if let Err(err) = escalation.submit(RiskEvent {
                session_id: session_id.clone(),
                source_sequence: sequence,
                severity: analysis.risk.severity,
                detected_at: Utc::now(),
                delivered_at: None,
            }) {
                error!(%session_id, sequence, "failed to submit risk escalation: {err}");
            }
        }

        let input = PromptInput {
            sequence,
            speaker: item.speaker,
            analysis,
        };
        if prompt_tx.send(input).await.is_err() {
            warn!(%session_id, "prompt actor gone, continuing transcript assembly");
        }
    }

    debug!(%session_id, "analysis stage finished");
}

fn empty_analysis() -> SegmentAnalysis {
    SegmentAnalysis {
        emotions: Vec::new(),
        triggers: Vec::new(),
        risk: RiskAssessment::none(),
    }
}
