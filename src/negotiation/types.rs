//! Negotiation types and state machine

use crate::types::{Currency, DiscountCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The single product being sold, fixed for the process lifetime
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub list_price: Decimal,
    pub min_price: Decimal,
    pub currency: Currency,
}

impl Product {
    /// Render an amount the way the seller quotes it, e.g. `£1440.00`
    pub fn format_price(&self, amount: Decimal) -> String {
        format!("{}{:.2}", self.currency.symbol(), amount.round_dp(2))
    }

    /// True when `amount` lies within `[min_price, list_price]`
    pub fn in_band(&self, amount: Decimal) -> bool {
        amount >= self.min_price && amount <= self.list_price
    }
}

/// Percentage band the opening discount is drawn from
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountBand {
    pub min_percent: Decimal,
    pub max_percent: Decimal,
}

/// Rules governing one negotiation
#[derive(Clone, Debug)]
pub struct NegotiationPolicy {
    pub max_attempts: u32,
    /// Fraction of the standing offer within which a buyer offer counts as agreement
    pub acceptance_tolerance: Decimal,
    pub opening_band: DiscountBand,
    /// Message that forces acceptance, e.g. the "Deal!" button
    pub accept_token: String,
    /// Message that forces rejection, e.g. the "No Deal!" button
    pub reject_token: String,
    pub discount_code_length: usize,
    /// Upper bound on any single generator or classifier call
    pub collaborator_timeout: Duration,
}

/// Author of a transcript turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Buyer,
    Seller,
}

/// One entry of the conversation transcript
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn buyer(content: impl Into<String>) -> Self {
        Self {
            role: Role::Buyer,
            content: content.into(),
        }
    }

    pub fn seller(content: impl Into<String>) -> Self {
        Self {
            role: Role::Seller,
            content: content.into(),
        }
    }
}

/// Buyer stance as read from a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Acceptance,
    Rejection,
    Negotiation,
    Unclear,
}

/// Session lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Open,
    ClosedAccepted,
    ClosedRejected,
    ClosedMaxAttempts,
}

impl SessionStatus {
    /// Check if negotiation is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Check if negotiation is still accepting turns
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Open)
    }
}

/// Result of one turn, handed back to the caller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Outcome {
    pub message: String,
    pub status: SessionStatus,
    /// Agreed or last-standing price once the session has closed with one
    pub final_price: Option<Decimal>,
    pub offer_discount_code: Option<DiscountCode>,
    /// Seller's standing offer when this outcome was produced
    pub current_offer: Decimal,
}

impl Outcome {
    /// Whether the front-end should show the deal / no-deal buttons
    pub fn show_buttons(&self) -> bool {
        self.status.is_terminal()
    }

    /// The price most worth showing: the final one if closed, else the standing
    /// offer. A declined negotiation has none.
    pub fn last_negotiated_price(&self) -> Option<Decimal> {
        match self.status {
            SessionStatus::ClosedRejected => None,
            _ => Some(self.final_price.unwrap_or(self.current_offer)),
        }
    }
}
