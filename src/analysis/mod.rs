pub mod classifier;
pub mod emotion;
pub mod topic;

pub use classifier::{AnalysisError, ClassificationResult, Classifier};
pub use emotion::KeywordEmotionClassifier;
pub use topic::KeywordTopicClassifier;

use crate::risk::{RiskAssessment, RiskClassifier, RiskContext};
use std::sync::Arc;
use tracing::debug;

/// Combined analysis of one transcript segment.
#[derive(Debug, Clone)]
pub struct SegmentAnalysis {
    pub emotions: Vec<String>,
    pub triggers: Vec<String>,
    pub risk: RiskAssessment,
}

/// Runs the three independent classifiers over a segment.
///
/// All classifiers are stateless, so segments may be analyzed in parallel.
/// Emotion and trigger labels feed prompt generation only; the risk result
/// feeds both prompts and the escalation path through the shared
/// classification contract.
pub struct AnalysisEngine {
    emotion: Box<dyn Classifier>,
    topic: Box<dyn Classifier>,
    risk: Arc<dyn RiskClassifier>,
}

impl AnalysisEngine {
    pub fn new(
        emotion: Box<dyn Classifier>,
        topic: Box<dyn Classifier>,
        risk: Arc<dyn RiskClassifier>,
    ) -> Self {
        Self { emotion, topic, risk }
    }

    /// Keyword classifiers across the board, sharing the given risk service.
    pub fn keyword(risk: Arc<dyn RiskClassifier>) -> Self {
        Self::new(
            Box::new(KeywordEmotionClassifier::new()),
            Box::new(KeywordTopicClassifier::new()),
            risk,
        )
    }

    pub fn analyze(
        &self,
        text: &str,
        context: &RiskContext,
    ) -> Result<SegmentAnalysis, AnalysisError> {
        let emotions = self.emotion.classify(text)?.labels;
        let triggers = self.topic.classify(text)?.labels;
        let risk = self.risk.classify(text, context);

        debug!(
            ?emotions,
            ?triggers,
            severity = %risk.severity,
            "segment analyzed"
        );

        Ok(SegmentAnalysis {
            emotions,
            triggers,
            risk,
        })
    }
}
