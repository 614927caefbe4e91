use crate::error::SessionError;
use crate::risk::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Who an utterance is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    #[default]
    Client,
    Coach,
}

/// One ordered unit of speech-to-text output, annotated by analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: String,
    pub session_id: String,
    /// Matches the sequence of the audio chunk it was transcribed from
    pub sequence: u64,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub emotions: Vec<String>,
    pub triggers: Vec<String>,
    pub risk_severity: Severity,
    /// True when transcription failed (empty text inserted to preserve
    /// ordering) or the slot timed out in the reorder buffer
    pub degraded: bool,
    /// False when analysis failed and the segment needs manual review
    pub analyzed: bool,
}

/// Append-only, per-session transcript log.
///
/// The reorder buffer upstream guarantees contiguous sequence order; this
/// log enforces it, so a violation here means a bug in the reorder path and
/// is surfaced loudly instead of corrupting the record.
pub struct TranscriptLog {
    segments: RwLock<Vec<TranscriptSegment>>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self {
            segments: RwLock::new(Vec::new()),
        }
    }

    pub async fn append(&self, segment: TranscriptSegment) -> Result<(), SessionError> {
        let mut segments = self.segments.write().await;
        let expected = segments.len() as u64;
        if segment.sequence != expected {
            return Err(SessionError::OrderViolation {
                expected,
                got: segment.sequence,
            });
        }
        segments.push(segment);
        Ok(())
    }

    pub async fn snapshot(&self) -> Vec<TranscriptSegment> {
        self.segments.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.segments.read().await.len()
    }

    /// Whether any segment was inserted degraded
    pub async fn has_degraded(&self) -> bool {
        self.segments.read().await.iter().any(|s| s.degraded)
    }

    pub async fn degraded_count(&self) -> usize {
        self.segments.read().await.iter().filter(|s| s.degraded).count()
    }
}

impl Default for TranscriptLog {
    fn default() -> Self {
        Self::new()
    }
}
