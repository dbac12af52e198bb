//! OpenAI-compatible chat-completions client
//!
//! One client serves as both the text generator and the intent classifier.
//! Any server speaking the `/chat/completions` dialect works, so the base URL
//! is configurable.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{IntentClassifier, TextGenerator};
use crate::error::{DealbotError, Result};
use crate::negotiation::{Role, Turn};

const CLASSIFIER_INSTRUCTION: &str = "You label the buyer's latest message in a price negotiation. \
Reply with exactly one word: accept if the buyer agrees to the seller's price, \
reject if the buyer walks away or declines, negotiate if the buyer asks for a \
different price or haggles, unclear otherwise.";

/// Connection settings for the chat-completions endpoint
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

/// Chat-completions client
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

/// Why a completion call failed, before it is tagged as generation or classification
enum CompletionFailure {
    Timeout,
    Other(String),
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DealbotError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
    ) -> std::result::Result<String, CompletionFailure> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionFailure::Timeout
                } else {
                    CompletionFailure::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionFailure::Other(format!(
                "status {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionFailure::Other(format!("malformed response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CompletionFailure::Other("empty completion".to_string()))
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, transcript: &[Turn]) -> Result<String> {
        let messages = transcript.iter().map(ChatMessage::from).collect();

        self.complete(messages).await.map_err(|failure| match failure {
            CompletionFailure::Timeout => DealbotError::GenerationTimeout {
                timeout_secs: self.config.timeout.as_secs(),
            },
            CompletionFailure::Other(reason) => DealbotError::Generation(reason),
        })
    }
}

#[async_trait]
impl IntentClassifier for OpenAiClient {
    async fn classify(&self, message: &str, context: Option<&str>) -> Result<String> {
        let mut prompt = String::new();
        if let Some(seller) = context {
            prompt.push_str(&format!("Seller said: {}\n", seller));
        }
        prompt.push_str(&format!("Buyer said: {}", message));

        let messages = vec![
            ChatMessage::new("system", CLASSIFIER_INSTRUCTION),
            ChatMessage::new("user", prompt),
        ];

        self.complete(messages).await.map_err(|failure| match failure {
            CompletionFailure::Timeout => {
                DealbotError::Classification("request timed out".to_string())
            }
            CompletionFailure::Other(reason) => DealbotError::Classification(reason),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            Role::System => "system",
            Role::Buyer => "user",
            Role::Seller => "assistant",
        };
        Self::new(role, turn.content.clone())
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
