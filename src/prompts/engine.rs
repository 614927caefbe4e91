use super::rules::{self, RuleState};
use super::{CoachingPrompt, PromptKind, PromptLog};
use crate::analysis::SegmentAnalysis;
use crate::events::SessionEvent;
use crate::transcript::Speaker;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

/// Tuning for the prompt actor.
#[derive(Debug, Clone)]
pub struct PromptEngineConfig {
    /// Suppress a repeated (kind, title) if it appeared within this many
    /// recent prompts
    pub dedup_count: usize,
    /// ... or within this much wall-clock time, whichever covers more
    pub dedup_age: Duration,
}

impl Default for PromptEngineConfig {
    fn default() -> Self {
        Self {
            dedup_count: 10,
            dedup_age: Duration::minutes(2),
        }
    }
}

/// One analyzed segment handed to the prompt actor.
#[derive(Debug)]
pub struct PromptInput {
    pub sequence: u64,
    pub speaker: Speaker,
    pub analysis: SegmentAnalysis,
}

/// Suppresses repeats of the same (kind, title) pair.
///
/// The window is the union of the last `max_count` issued prompts and the
/// last `max_age` of wall-clock time, so a quiet session still dedups by
/// recency and a busy one still dedups by count.
pub struct DedupWindow {
    max_count: usize,
    max_age: Duration,
    issued: VecDeque<(PromptKind, String, DateTime<Utc>)>,
}

impl DedupWindow {
    pub fn new(max_count: usize, max_age: Duration) -> Self {
        Self {
            max_count,
            max_age,
            issued: VecDeque::new(),
        }
    }

    /// True if an identical prompt is still inside the window.
    pub fn is_duplicate(&self, kind: PromptKind, title: &str, now: DateTime<Utc>) -> bool {
        let total = self.issued.len();
        self.issued.iter().enumerate().any(|(i, (k, t, at))| {
            let within_count = total - i <= self.max_count;
            let within_age = now - *at < self.max_age;
            *k == kind && t == title && (within_count || within_age)
        })
    }

    pub fn record(&mut self, kind: PromptKind, title: String, at: DateTime<Utc>) {
        self.issued.push_back((kind, title, at));
        // Entries outside both halves of the window can never match again
        while let Some((_, _, front_at)) = self.issued.front() {
            let beyond_count = self.issued.len() > self.max_count;
            let beyond_age = at - *front_at >= self.max_age;
            if beyond_count && beyond_age {
                self.issued.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Single-writer prompt actor for one session.
///
/// All prompt generation for the session flows through this loop, so the
/// dedup window and trigger counts never race. Only client speech is
/// evaluated; the coach's own words must not generate guidance about the
/// coach.
pub async fn run(
    session_id: String,
    config: PromptEngineConfig,
    mut inputs: mpsc::Receiver<PromptInput>,
    log: Arc<PromptLog>,
    events: broadcast::Sender<SessionEvent>,
) {
    let mut state = RuleState::new();
    let mut dedup = DedupWindow::new(config.dedup_count, config.dedup_age);

    while let Some(input) = inputs.recv().await {
        if input.speaker != Speaker::Client {
            continue;
        }

        let drafts = rules::evaluate(
            &input.analysis.emotions,
            &input.analysis.triggers,
            &input.analysis.risk,
            &mut state,
        );

        for draft in drafts {
            let now = Utc::now();
            if dedup.is_duplicate(draft.kind, &draft.title, now) {
                debug!(title = %draft.title, "suppressed duplicate prompt");
                continue;
            }
            dedup.record(draft.kind, draft.title.clone(), now);

            let prompt = CoachingPrompt {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.clone(),
                kind: draft.kind,
                priority: draft.priority,
                title: draft.title,
                content: draft.content,
                technique: draft.technique,
                created_at: now,
                source_sequence: input.sequence,
            };

            info!(
                prompt_id = %prompt.id,
                kind = ?prompt.kind,
                priority = ?prompt.priority,
                title = %prompt.title,
                "prompt issued"
            );

            let event = SessionEvent::PromptIssued {
                id: prompt.id.clone(),
                kind: prompt.kind,
                priority: prompt.priority,
                title: prompt.title.clone(),
            };
            log.push(prompt).await;
            let _ = events.send(event);
        }
    }

    debug!(%session_id, "prompt actor stopped");
}
