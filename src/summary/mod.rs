use crate::prompts::{CoachingPrompt, PromptKind};
use crate::transcript::TranscriptSegment;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Post-session summary delivered to the coach after stop.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    /// Narrative bullet points, most significant first
    pub insights: Vec<String>,
    pub generated_at: DateTime<Utc>,
    /// True when the summary was built from incomplete input or by the
    /// extractive fallback
    pub degraded: bool,
}

/// Summarization backend.
///
/// The pipeline treats this as an external service: it may be slow or fail
/// outright, and the session must still close with a usable summary.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(
        &self,
        transcript: &[TranscriptSegment],
        prompts: &[CoachingPrompt],
    ) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

/// Wraps a summarization backend with a deadline and an extractive
/// fallback, so session close never blocks on a wedged backend.
pub struct SessionSummarizer {
    backend: Arc<dyn Summarize>,
    timeout: Duration,
}

impl SessionSummarizer {
    pub fn new(backend: Arc<dyn Summarize>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Always returns a summary. `transcript_degraded` marks input that is
    /// already known to be incomplete; backend failure or timeout marks the
    /// output degraded as well.
    pub async fn generate(
        &self,
        session_id: &str,
        transcript: &[TranscriptSegment],
        prompts: &[CoachingPrompt],
        transcript_degraded: bool,
    ) -> SessionSummary {
        let (insights, fallback) =
            match tokio::time::timeout(self.timeout, self.backend.summarize(transcript, prompts))
                .await
            {
                Ok(Ok(insights)) => (insights, false),
                Ok(Err(err)) => {
                    warn!(
                        backend = self.backend.name(),
                        error = %err,
                        "summarization backend failed, using extractive fallback"
                    );
                    (extract_insights(transcript, prompts), true)
                }
                Err(_) => {
                    warn!(
                        backend = self.backend.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "summarization backend timed out, using extractive fallback"
                    );
                    (extract_insights(transcript, prompts), true)
                }
            };

        let degraded = fallback || transcript_degraded;
        info!(%session_id, insight_count = insights.len(), degraded, "summary generated");

        SessionSummary {
            session_id: session_id.to_string(),
            insights,
            generated_at: Utc::now(),
            degraded,
        }
    }
}

/// Deterministic fallback built from what the pipeline already computed.
///
/// Keeps the highest-priority prompts and brackets them with the opening
/// and closing client statements.
fn extract_insights(transcript: &[TranscriptSegment], prompts: &[CoachingPrompt]) -> Vec<String> {
    let mut insights = Vec::new();

    let spoken: Vec<&TranscriptSegment> = transcript.iter().filter(|s| !s.text.is_empty()).collect();
    if let Some(first) = spoken.first() {
        insights.push(format!("Session opened with: \"{}\"", first.text));
    }

    let mut ranked: Vec<&CoachingPrompt> = prompts.iter().collect();
    ranked.sort_by(|a, b| b.priority.cmp(&a.priority));
    for prompt in ranked.iter().take(3) {
        insights.push(format!("Flagged during session: {}", prompt.title));
    }

    if spoken.len() > 1 {
        if let Some(last) = spoken.last() {
            insights.push(format!("Session closed with: \"{}\"", last.text));
        }
    }

    if insights.is_empty() {
        insights.push("No usable transcript was captured for this session.".to_string());
    }
    insights
}

/// Built-in extractive summarizer for deployments without an external
/// summarization service. Tallies emotions and topics across the session
/// and reports the dominant ones.
#[derive(Debug, Default)]
pub struct OutlineSummarize;

impl OutlineSummarize {
    pub fn new() -> Self {
        Self
    }

    fn tally<'a>(items: impl Iterator<Item = &'a String>) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for item in items {
            *counts.entry(item.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, usize)> =
            counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

#[async_trait]
impl Summarize for OutlineSummarize {
    async fn summarize(
        &self,
        transcript: &[TranscriptSegment],
        prompts: &[CoachingPrompt],
    ) -> Result<Vec<String>> {
        let mut insights = Vec::new();

        let emotions = Self::tally(transcript.iter().flat_map(|s| s.emotions.iter()));
        if let Some((emotion, count)) = emotions.first() {
            insights.push(format!(
                "Dominant emotional tone: {emotion} (surfaced in {count} segments)"
            ));
        }

        let topics = Self::tally(transcript.iter().flat_map(|s| s.triggers.iter()));
        for (topic, count) in topics.iter().take(2) {
            insights.push(format!("Recurring topic: {topic} ({count} mentions)"));
        }

        let warnings = prompts
            .iter()
            .filter(|p| p.kind == PromptKind::Warning)
            .count();
        if warnings > 0 {
            insights.push(format!(
                "{warnings} warning prompt(s) were raised; review them before the next session"
            ));
        }

        let spoken = transcript.iter().filter(|s| !s.text.is_empty()).count();
        insights.push(format!(
            "Transcript covered {spoken} spoken segments across the session"
        ));

        Ok(insights)
    }

    fn name(&self) -> &str {
        "outline"
    }
}
