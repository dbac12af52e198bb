//! External language-model collaborators
//!
//! The negotiation core treats both services as untrusted: generated text is
//! only ever a suggestion, and every price in it is re-validated before it
//! can change session state.

pub mod openai;

use crate::error::Result;
use crate::negotiation::Turn;
use async_trait::async_trait;

pub use openai::{OpenAiClient, OpenAiConfig};

/// Drafts the seller's next message from the full transcript
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, transcript: &[Turn]) -> Result<String>;
}

/// Labels a buyer message with a free-text stance such as "accept"
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str, context: Option<&str>) -> Result<String>;
}
