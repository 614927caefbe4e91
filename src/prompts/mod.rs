pub mod engine;
pub mod rules;

pub use engine::{DedupWindow, PromptEngineConfig, PromptInput};
pub use rules::MEDICAL_DISCLAIMER;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// What kind of guidance a prompt carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Suggestion,
    Warning,
    Insight,
}

/// Rendering priority. Ordering matters: the prompt log renders
/// priority-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// A piece of real-time guidance surfaced to the coach.
///
/// Content is a full script the coach can read word-for-word, not a terse
/// hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingPrompt {
    pub id: String,
    pub session_id: String,
    pub kind: PromptKind,
    pub priority: PromptPriority,
    pub title: String,
    pub content: String,
    /// Name of the coaching technique the script applies
    pub technique: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Transcript sequence that produced this prompt
    pub source_sequence: u64,
}

/// Per-session prompt log.
///
/// Stored in arrival order; `render` applies the ordering contract:
/// priority-first (critical > high > medium > low), newest first within a
/// tier. A critical prompt therefore never renders below a lower-priority
/// prompt that was generated later.
pub struct PromptLog {
    prompts: RwLock<Vec<CoachingPrompt>>,
}

impl PromptLog {
    pub fn new() -> Self {
        Self {
            prompts: RwLock::new(Vec::new()),
        }
    }

    pub async fn push(&self, prompt: CoachingPrompt) {
        self.prompts.write().await.push(prompt);
    }

    /// Prompts in arrival order
    pub async fn snapshot(&self) -> Vec<CoachingPrompt> {
        self.prompts.read().await.clone()
    }

    /// Prompts in rendering order
    pub async fn render(&self) -> Vec<CoachingPrompt> {
        let mut prompts = self.snapshot().await;
        prompts.reverse(); // newest first
        prompts.sort_by(|a, b| b.priority.cmp(&a.priority)); // stable: keeps recency within tier
        prompts
    }

    pub async fn len(&self) -> usize {
        self.prompts.read().await.len()
    }
}

impl Default for PromptLog {
    fn default() -> Self {
        Self::new()
    }
}
