//! Normalizes the external classifier's free-text label into an [`Intent`]

use std::sync::Arc;
use std::time::Duration;

use super::types::Intent;
use crate::llm::IntentClassifier;

/// Best-effort heuristic: the first substring found in the lower-cased label
/// decides the intent. Order matters, "accept" is checked before "reject".
pub const INTENT_TABLE: &[(&str, Intent)] = &[
    ("accept", Intent::Acceptance),
    ("reject", Intent::Rejection),
    ("decline", Intent::Rejection),
    ("negotiat", Intent::Negotiation),
];

/// Map a raw classifier label onto an [`Intent`]
pub fn intent_from_label(label: &str) -> Intent {
    let label = label.to_lowercase();
    INTENT_TABLE
        .iter()
        .find(|(needle, _)| label.contains(needle))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Unclear)
}

/// Wraps the classifier so that a failed or slow call never aborts a turn
#[derive(Clone)]
pub struct IntentAdapter {
    classifier: Arc<dyn IntentClassifier>,
    timeout: Duration,
}

impl IntentAdapter {
    pub fn new(classifier: Arc<dyn IntentClassifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    /// Classify `latest` given the seller's previous message, if any.
    /// Errors and timeouts yield [`Intent::Unclear`].
    pub async fn classify(&self, latest: &str, counterpart: Option<&str>) -> Intent {
        match tokio::time::timeout(self.timeout, self.classifier.classify(latest, counterpart))
            .await
        {
            Ok(Ok(label)) => {
                let intent = intent_from_label(&label);
                tracing::debug!(label = %label, ?intent, "classified buyer message");
                intent
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "intent classification failed, treating as unclear");
                Intent::Unclear
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "intent classification timed out, treating as unclear"
                );
                Intent::Unclear
            }
        }
    }
}
