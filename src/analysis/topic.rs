use super::classifier::{AnalysisError, ClassificationResult, Classifier};
use super::emotion::contains_word;

/// Recurring-topic label with its cue words.
const TOPIC_CUES: &[(&str, &[&str])] = &[
    ("work", &["work", "job", "boss", "colleague"]),
    ("family", &["family", "parent", "sibling", "child"]),
    ("relationships", &["relationship", "partner", "spouse", "dating"]),
    ("finances", &["money", "financial", "debt", "bills"]),
];

/// Keyword-based topic/trigger classifier.
#[derive(Debug, Default)]
pub struct KeywordTopicClassifier;

impl KeywordTopicClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for KeywordTopicClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult, AnalysisError> {
        let lower = text.to_lowercase();
        let labels = TOPIC_CUES
            .iter()
            .filter(|(_, cues)| cues.iter().any(|c| contains_word(&lower, c)))
            .map(|(label, _)| label.to_string())
            .collect();
        Ok(ClassificationResult { labels })
    }

    fn name(&self) -> &str {
        "topic-keyword"
    }
}
