//! Dealbot: a price-negotiating sales assistant
//!
//! A seller persona opens a few percent below list price and haggles with a
//! buyer over a bounded number of turns. An external language model drafts
//! the seller's replies and labels the buyer's stance, but every price it
//! proposes is checked against the product's floor and the session's
//! history before it becomes an offer.
//!
//! - [`negotiation`]: price extraction, intent mapping and the session state machine
//! - [`llm`]: collaborator traits and an OpenAI-compatible client
//! - [`server`]: HTTP endpoints over the session registry
//! - [`cli`]: `serve`, `chat` and `config` commands

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod negotiation;
pub mod server;
pub mod types;

pub use config::Config;
pub use error::{DealbotError, Result};
pub use negotiation::{
    NegotiationSession, Outcome, SessionContext, SessionRegistry, SessionStatus,
};
pub use types::{Currency, DiscountCode, RequestId, SessionId};
