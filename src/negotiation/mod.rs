//! Negotiation module: price extraction, intent mapping and the session state machine

pub mod discount;
pub mod intent;
pub mod price;
pub mod prompt;
pub mod registry;
pub mod session;
pub mod types;

pub use discount::DiscountGenerator;
pub use intent::{intent_from_label, IntentAdapter};
pub use price::PriceExtractor;
pub use registry::SessionRegistry;
pub use session::{
    NegotiationSession, SessionContext, SessionSnapshot, APOLOGY_MESSAGE, DECLINE_MESSAGE,
};
pub use types::{
    DiscountBand, Intent, NegotiationPolicy, Outcome, Product, Role, SessionStatus, Turn,
};
