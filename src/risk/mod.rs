pub mod escalation;
pub mod service;
pub mod severity;

pub use escalation::{EscalationPolicy, LogNotifier, Notifier, RiskEscalationChannel, RiskEvent};
pub use service::{
    recommended_response, KeywordRiskClassifier, RiskAssessment, RiskCategory, RiskClassifier,
    RiskContext,
};
pub use severity::Severity;
