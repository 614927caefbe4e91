use super::severity::Severity;
use serde::Serialize;

/// Conversation context handed to the classifier alongside the current text.
///
/// The keyword implementation scans it for protective factors; model-based
/// implementations can use it for full contextual scoring.
#[derive(Debug, Clone, Default)]
pub struct RiskContext {
    /// Most recent utterances or chat messages, oldest first
    pub recent: Vec<String>,
}

/// Broad category of the detected risk, used to pick the right guidance
/// script downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Self-harm or suicide indicators
    SelfHarm,
    /// Out-of-scope advice-giving territory (medical, diagnostic)
    OutOfScopeAdvice,
}

/// Result of classifying one piece of text.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub severity: Severity,
    /// The indicator phrases that matched
    pub indicators: Vec<String>,
    pub categories: Vec<RiskCategory>,
}

impl RiskAssessment {
    pub fn none() -> Self {
        Self {
            severity: Severity::None,
            indicators: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// Shared risk classification contract.
///
/// One implementation serves both the live-session pipeline and the async
/// chat product so thresholds stay consistent across surfaces. Must be pure
/// and stateless; implementations may be swapped (keyword rules today,
/// model-based later) without touching the pipeline.
pub trait RiskClassifier: Send + Sync {
    fn classify(&self, text: &str, context: &RiskContext) -> RiskAssessment;

    fn name(&self) -> &str;
}

// Indicator phrases derived from C-SSRS screening language. Matching is
// case-insensitive exact substring: this policy is safety-sensitive and must
// not be tightened or loosened without clinical sign-off.

const CRITICAL_INDICATORS: &[&str] = &[
    "going to kill myself",
    "want to die",
    "end my life",
    "suicide plan",
    "have a gun",
    "have pills",
    "tonight is the night",
    "goodbye forever",
    "won't be here tomorrow",
    "better off dead",
    "no reason to live",
];

const HIGH_INDICATORS: &[&str] = &[
    "kill myself",
    "end it all",
    "don't want to live",
    "wish i was dead",
    "thinking about suicide",
    "hurt myself",
    "self harm",
    "cut myself",
    "overdose",
    "everyone would be better without me",
];

const MODERATE_INDICATORS: &[&str] = &[
    "life isn't worth living",
    "nothing matters anymore",
    "hopeless",
    "no way out",
    "can't take it anymore",
    "give up",
    "worthless",
    "burden to everyone",
    "tired of living",
];

const LOW_INDICATORS: &[&str] = &[
    "don't care anymore",
    "what's the point",
    "nobody cares",
    "alone in this",
    "too much pain",
    "unbearable",
    "trapped",
];

/// Phrases that temper an otherwise elevated assessment. Substring matching
/// means "hope" also fires inside "hopeless", so that indicator self-tempers
/// one tier; frozen along with the rest of the policy.
const PROTECTIVE_FACTORS: &[&str] = &[
    "but i won't",
    "talking helps",
    "getting help",
    "therapy",
    "reasons to live",
    "hope",
];

/// Out-of-scope advice territory: coaches must not give medical or
/// diagnostic guidance, so this language triggers a compliance warning.
const OUT_OF_SCOPE_INDICATORS: &[&str] = &[
    "prescribe",
    "prescription",
    "medication",
    "diagnose",
    "diagnosis",
    "dosage",
];

/// Rule-based classifier using the indicator tables above.
#[derive(Debug, Default)]
pub struct KeywordRiskClassifier;

impl KeywordRiskClassifier {
    pub fn new() -> Self {
        Self
    }

    fn crisis_severity(text: &str, indicators: &mut Vec<String>) -> Severity {
        let tiers: [(&[&str], Severity); 4] = [
            (CRITICAL_INDICATORS, Severity::Critical),
            (HIGH_INDICATORS, Severity::High),
            (MODERATE_INDICATORS, Severity::Moderate),
            (LOW_INDICATORS, Severity::Low),
        ];

        // Highest tier with any match wins
        for (phrases, severity) in tiers {
            let matched: Vec<String> = phrases
                .iter()
                .filter(|p| text.contains(*p))
                .map(|p| p.to_string())
                .collect();
            if !matched.is_empty() {
                indicators.extend(matched);
                return severity;
            }
        }
        Severity::None
    }

    fn has_protective_factors(text: &str, context: &RiskContext) -> bool {
        if PROTECTIVE_FACTORS.iter().any(|f| text.contains(f)) {
            return true;
        }
        context
            .recent
            .iter()
            .any(|r| PROTECTIVE_FACTORS.iter().any(|f| r.to_lowercase().contains(f)))
    }
}

impl RiskClassifier for KeywordRiskClassifier {
    fn classify(&self, text: &str, context: &RiskContext) -> RiskAssessment {
        let lower = text.to_lowercase();
        let mut indicators = Vec::new();
        let mut categories = Vec::new();

        let mut crisis = Self::crisis_severity(&lower, &mut indicators);
        if crisis > Severity::None {
            categories.push(RiskCategory::SelfHarm);
        }

        // Protective factors temper High/Moderate one tier; Critical never
        // gets downgraded.
        if Self::has_protective_factors(&lower, context) {
            crisis = match crisis {
                Severity::High => Severity::Moderate,
                Severity::Moderate => Severity::Low,
                other => other,
            };
        }

        let mut severity = crisis;

        let scope_matches: Vec<String> = OUT_OF_SCOPE_INDICATORS
            .iter()
            .filter(|p| lower.contains(*p))
            .map(|p| p.to_string())
            .collect();
        if !scope_matches.is_empty() {
            indicators.extend(scope_matches);
            categories.push(RiskCategory::OutOfScopeAdvice);
            severity = severity.max(Severity::High);
        }

        RiskAssessment {
            severity,
            indicators,
            categories,
        }
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Recommended coach-facing script for a given severity.
///
/// Scripts reference the 988 Suicide & Crisis Lifeline and the Crisis Text
/// Line; they are read word-for-word by the coach, not paraphrased.
pub fn recommended_response(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => {
            "I'm very concerned about your safety right now. Please call 988 \
             (Suicide & Crisis Lifeline) immediately, or text HELLO to 741741 \
             (Crisis Text Line). If you're in immediate danger, please call 911. \
             You don't have to face this alone - help is available 24/7."
        }
        Severity::High => {
            "I hear that you're going through an incredibly difficult time. Your \
             safety is the top priority. Please reach out to the 988 Suicide & \
             Crisis Lifeline (call or text 988) or the Crisis Text Line (text \
             HELLO to 741741). Would you be willing to connect with them now?"
        }
        Severity::Moderate => {
            "It sounds like you're carrying a heavy burden right now. Support is \
             available: the 988 Suicide & Crisis Lifeline (call or text 988) is \
             free, confidential, and open 24/7. Would it help to talk about \
             what's making things feel so difficult?"
        }
        Severity::Low => {
            "I can hear that things are challenging right now. Remember that you \
             don't have to face this alone. If you ever need immediate support, \
             the 988 Suicide & Crisis Lifeline is available 24/7."
        }
        Severity::None => "",
    }
}
