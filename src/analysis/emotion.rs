use super::classifier::{AnalysisError, ClassificationResult, Classifier};

/// Emotion label with the cue words that imply it.
const EMOTION_CUES: &[(&str, &[&str])] = &[
    ("anxiety", &["anxious", "worried", "nervous", "scared"]),
    ("sadness", &["sad", "depressed", "down", "hopeless"]),
    ("anger", &["angry", "frustrated", "mad", "annoyed"]),
    ("joy", &["happy", "excited", "great", "wonderful"]),
];

/// Keyword-based emotion classifier.
#[derive(Debug, Default)]
pub struct KeywordEmotionClassifier;

impl KeywordEmotionClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for KeywordEmotionClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult, AnalysisError> {
        let lower = text.to_lowercase();
        let labels = EMOTION_CUES
            .iter()
            .filter(|(_, cues)| cues.iter().any(|c| contains_word(&lower, c)))
            .map(|(label, _)| label.to_string())
            .collect();
        Ok(ClassificationResult { labels })
    }

    fn name(&self) -> &str {
        "emotion-keyword"
    }
}

/// Word-boundary match so "sad" does not fire on "saddle".
pub(super) fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .any(|w| w == word)
}
