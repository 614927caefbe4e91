use super::{PromptKind, PromptPriority};
use crate::risk::{self, RiskCategory, Severity};
use std::collections::HashMap;

/// Scope-boundary script a coach must deliver verbatim when the
/// conversation drifts toward medical territory.
pub const MEDICAL_DISCLAIMER: &str =
    "I'm a coach, not a doctor. For medical concerns, please consult with a healthcare professional.";

/// How many times a topic must recur before surfacing a pattern insight.
pub const TRIGGER_INSIGHT_THRESHOLD: u32 = 3;

/// A prompt before it is stamped with an id, session, and timestamp.
#[derive(Debug, Clone)]
pub struct PromptDraft {
    pub kind: PromptKind,
    pub priority: PromptPriority,
    pub title: String,
    pub content: String,
    pub technique: Option<String>,
}

/// Per-session state the rule table accumulates across segments.
#[derive(Debug, Default)]
pub struct RuleState {
    trigger_counts: HashMap<String, u32>,
}

impl RuleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_count(&self, trigger: &str) -> u32 {
        self.trigger_counts.get(trigger).copied().unwrap_or(0)
    }
}

/// Applies the rule table to one analyzed segment.
///
/// Emotion and topic rules produce suggestions and insights; risk rules
/// produce warnings. Safety rules run last so a warning is never lost to
/// an earlier rule bailing out.
pub fn evaluate(
    emotions: &[String],
    triggers: &[String],
    risk: &crate::risk::RiskAssessment,
    state: &mut RuleState,
) -> Vec<PromptDraft> {
    let mut drafts = Vec::new();

    for emotion in emotions {
        match emotion.as_str() {
            "anxiety" => drafts.push(PromptDraft {
                kind: PromptKind::Suggestion,
                priority: PromptPriority::Medium,
                title: "Anxiety detected".to_string(),
                content: "Consider a grounding exercise. Ask: 'Can you describe what \
                          you're feeling in your body right now? Let's take a slow \
                          breath together.'"
                    .to_string(),
                technique: Some("Grounding".to_string()),
            }),
            "sadness" => drafts.push(PromptDraft {
                kind: PromptKind::Suggestion,
                priority: PromptPriority::Medium,
                title: "Sadness detected".to_string(),
                content: "Validate before problem-solving. Say: 'It sounds like you're \
                          carrying something really heavy right now. That must be hard.'"
                    .to_string(),
                technique: Some("Validation".to_string()),
            }),
            _ => {}
        }
    }

    for trigger in triggers {
        let count = state
            .trigger_counts
            .entry(trigger.clone())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        if *count == TRIGGER_INSIGHT_THRESHOLD {
            drafts.push(PromptDraft {
                kind: PromptKind::Insight,
                priority: PromptPriority::Low,
                title: format!("Recurring topic: {trigger}"),
                content: format!(
                    "The client has brought up {trigger} {count} times this session. \
                     Consider exploring what keeps pulling them back to it."
                ),
                technique: Some("Pattern reflection".to_string()),
            });
        }
    }

    if risk.categories.contains(&RiskCategory::OutOfScopeAdvice) {
        drafts.push(PromptDraft {
            kind: PromptKind::Warning,
            priority: severity_priority(risk.severity),
            title: "Out-of-scope territory".to_string(),
            content: format!(
                "The conversation is moving into medical territory. Set the boundary: \
                 '{MEDICAL_DISCLAIMER}'"
            ),
            technique: Some("Scope boundary".to_string()),
        });
    }

    if risk.categories.contains(&RiskCategory::SelfHarm) && risk.severity >= Severity::Moderate {
        drafts.push(PromptDraft {
            kind: PromptKind::Warning,
            priority: severity_priority(risk.severity),
            title: "Crisis indicators detected".to_string(),
            content: risk::recommended_response(risk.severity).to_string(),
            technique: Some("Crisis protocol".to_string()),
        });
    }

    drafts
}

fn severity_priority(severity: Severity) -> PromptPriority {
    match severity {
        Severity::Critical => PromptPriority::Critical,
        Severity::High => PromptPriority::High,
        Severity::Moderate => PromptPriority::Medium,
        Severity::Low | Severity::None => PromptPriority::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskAssessment;

    fn no_risk() -> RiskAssessment {
        RiskAssessment::none()
    }

    #[test]
    fn anxiety_yields_grounding_suggestion() {
        let mut state = RuleState::new();
        let drafts = evaluate(&["anxiety".to_string()], &[], &no_risk(), &mut state);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, PromptKind::Suggestion);
        assert_eq!(drafts[0].priority, PromptPriority::Medium);
        assert_eq!(drafts[0].technique.as_deref(), Some("Grounding"));
    }

    #[test]
    fn trigger_insight_fires_once_at_threshold() {
        let mut state = RuleState::new();
        let work = vec!["work".to_string()];
        assert!(evaluate(&[], &work, &no_risk(), &mut state).is_empty());
        assert!(evaluate(&[], &work, &no_risk(), &mut state).is_empty());

        let third = evaluate(&[], &work, &no_risk(), &mut state);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].kind, PromptKind::Insight);
        assert!(third[0].title.contains("work"));

        assert!(evaluate(&[], &work, &no_risk(), &mut state).is_empty());
    }

    #[test]
    fn out_of_scope_warning_carries_disclaimer() {
        let mut state = RuleState::new();
        let risk = RiskAssessment {
            severity: Severity::High,
            indicators: vec!["prescribe".to_string()],
            categories: vec![RiskCategory::OutOfScopeAdvice],
        };
        let drafts = evaluate(&[], &[], &risk, &mut state);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, PromptKind::Warning);
        assert_eq!(drafts[0].priority, PromptPriority::High);
        assert!(drafts[0].content.contains(MEDICAL_DISCLAIMER));
    }

    #[test]
    fn critical_self_harm_yields_critical_warning() {
        let mut state = RuleState::new();
        let risk = RiskAssessment {
            severity: Severity::Critical,
            indicators: vec!["want to die".to_string()],
            categories: vec![RiskCategory::SelfHarm],
        };
        let drafts = evaluate(&[], &[], &risk, &mut state);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].priority, PromptPriority::Critical);
        assert!(drafts[0].content.contains("988"));
    }
}
