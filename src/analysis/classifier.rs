use thiserror::Error;

/// Labels produced by one classifier for one piece of text.
#[derive(Debug, Clone, Default)]
pub struct ClassificationResult {
    pub labels: Vec<String>,
}

#[derive(Debug, Error)]
#[error("classifier {classifier} failed: {reason}")]
pub struct AnalysisError {
    pub classifier: String,
    pub reason: String,
}

/// Stateless text classifier.
///
/// Implementations must be pure so segments can be analyzed in parallel.
/// The keyword implementations here are placeholders for model-based
/// classifiers; swapping one in must not require touching the pipeline.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<ClassificationResult, AnalysisError>;

    fn name(&self) -> &str;
}
