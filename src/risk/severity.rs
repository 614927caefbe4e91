use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk severity tier shared by the live-session pipeline and the async
/// chat product. Ordering matters: comparisons like `severity >= High`
/// drive the escalation path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Severities that must be routed through the escalation channel
    pub fn requires_escalation(self) -> bool {
        self >= Severity::High
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
