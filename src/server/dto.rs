//! Request and response bodies for the negotiation endpoints

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::negotiation::{Outcome, SessionStatus};
use crate::types::SessionId;

/// Body of `POST /negotiate/start`; a missing `session_id` gets a fresh one
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

/// Body of `POST /negotiate/advance`
#[derive(Debug, Clone, Deserialize)]
pub struct AdvanceRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

/// Body of the single-session `/initialize` and `/chatbot` routes
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMessage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub response: String,
    /// `null` once the buyer declines
    pub last_negotiated_price: Option<f64>,
    pub show_buttons: bool,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

impl TurnResponse {
    pub fn new(session_id: &SessionId, outcome: Outcome) -> Self {
        Self {
            session_id: session_id.0.clone(),
            last_negotiated_price: outcome.last_negotiated_price().and_then(|price| price.to_f64()),
            show_buttons: outcome.show_buttons(),
            status: outcome.status,
            discount_code: outcome.offer_discount_code.map(|code| code.0),
            response: outcome.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
