//! Negotiation session state machine

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use super::discount::DiscountGenerator;
use super::intent::IntentAdapter;
use super::price::PriceExtractor;
use super::prompt::system_instruction;
use super::types::{Intent, NegotiationPolicy, Outcome, Product, Role, SessionStatus, Turn};
use crate::error::DealbotError;
use crate::llm::{IntentClassifier, TextGenerator};
use crate::types::{DiscountCode, RequestId, SessionId};

/// Reply sent when the text generator fails; the turn can be retried
pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong!";

/// Reply sent when the buyer walks away
pub const DECLINE_MESSAGE: &str = "No problem, maybe next time. Thanks for stopping by!";

/// Everything a session needs that outlives any one negotiation
#[derive(Clone)]
pub struct SessionContext {
    product: Arc<Product>,
    policy: Arc<NegotiationPolicy>,
    generator: Arc<dyn TextGenerator>,
    intents: IntentAdapter,
    prices: PriceExtractor,
    discounts: DiscountGenerator,
}

impl SessionContext {
    pub fn new(
        product: Product,
        policy: NegotiationPolicy,
        generator: Arc<dyn TextGenerator>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        let intents = IntentAdapter::new(classifier, policy.collaborator_timeout);
        let discounts = DiscountGenerator::new(policy.opening_band);

        Self {
            product: Arc::new(product),
            policy: Arc::new(policy),
            generator,
            intents,
            prices: PriceExtractor::new(),
            discounts,
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn policy(&self) -> &NegotiationPolicy {
        &self.policy
    }
}

/// Buyer turn appended but not yet answered
#[derive(Clone, Debug)]
struct PendingTurn {
    request_id: Option<RequestId>,
    message: String,
}

impl PendingTurn {
    fn is_retry_of(&self, message: &str, request_id: Option<&RequestId>) -> bool {
        match (&self.request_id, request_id) {
            (Some(pending), Some(incoming)) => pending == incoming,
            (None, None) => self.message == message,
            _ => false,
        }
    }
}

/// Serializable view of a session
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub current_offer: Decimal,
    pub last_buyer_offer: Option<Decimal>,
    pub transcript: Vec<Turn>,
}

/// A negotiation with one buyer over the configured product
pub struct NegotiationSession {
    id: SessionId,
    ctx: SessionContext,
    transcript: Vec<Turn>,
    attempts: u32,
    current_offer: Decimal,
    last_buyer_offer: Option<Decimal>,
    status: SessionStatus,
    pending: Option<PendingTurn>,
}

impl NegotiationSession {
    /// Create a fresh open session with a newly drawn opening offer
    pub fn new(id: SessionId, ctx: SessionContext) -> Self {
        let current_offer = ctx.discounts.initial_offer(&ctx.product);

        Self {
            id,
            ctx,
            transcript: Vec::new(),
            attempts: 0,
            current_offer,
            last_buyer_offer: None,
            status: SessionStatus::Open,
            pending: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn current_offer(&self) -> Decimal {
        self.current_offer
    }

    pub fn last_buyer_offer(&self) -> Option<Decimal> {
        self.last_buyer_offer
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            status: self.status,
            attempts: self.attempts,
            max_attempts: self.ctx.policy.max_attempts,
            current_offer: self.current_offer,
            last_buyer_offer: self.last_buyer_offer,
            transcript: self.transcript.clone(),
        }
    }

    /// Return to a freshly initialized open session with a new opening offer
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.attempts = 0;
        self.current_offer = self.ctx.discounts.initial_offer(&self.ctx.product);
        self.last_buyer_offer = None;
        self.status = SessionStatus::Open;
        self.pending = None;
    }

    /// Begin a new negotiation with the buyer's opening message.
    ///
    /// The seller's opening reply does not count as a counter-offer.
    pub async fn start(&mut self, opening_message: &str) -> Outcome {
        self.reset();
        self.prime();

        tracing::info!(
            session_id = %self.id,
            current_offer = %self.current_offer,
            "negotiation started"
        );

        self.run_turn(opening_message, None).await
    }

    /// Apply one buyer message. A closed session answers without changing.
    pub async fn advance(&mut self, buyer_message: &str, request_id: Option<&RequestId>) -> Outcome {
        if self.status.is_terminal() {
            tracing::debug!(session_id = %self.id, status = ?self.status, "turn on closed session");
            return self.closed_outcome();
        }

        if self.transcript.is_empty() {
            self.prime();
        }

        self.run_turn(buyer_message, request_id).await
    }

    fn prime(&mut self) {
        let instruction = system_instruction(&self.ctx.product, &self.ctx.policy, self.current_offer);
        self.transcript.push(Turn::system(instruction));
    }

    async fn run_turn(&mut self, message: &str, request_id: Option<&RequestId>) -> Outcome {
        let counterpart = self.last_seller_message().map(str::to_string);
        self.append_buyer_turn(message, request_id);

        let (intent, buyer_offer) = match self.sentinel(message) {
            Some(intent) => (intent, None),
            None => {
                let buyer_offer = self.ctx.prices.extract(message);
                let intent = self.ctx.intents.classify(message, counterpart.as_deref()).await;
                (intent, buyer_offer)
            }
        };

        // A mention above the standing offer never becomes the floor for later counters
        if let Some(offer) = buyer_offer.filter(|offer| *offer < self.current_offer) {
            self.last_buyer_offer = Some(offer);
        }

        tracing::debug!(
            session_id = %self.id,
            attempts = self.attempts,
            current_offer = %self.current_offer,
            ?intent,
            buyer_offer = ?buyer_offer,
            "buyer turn"
        );

        match intent {
            Intent::Acceptance => return self.close_accepted(self.current_offer),
            Intent::Rejection => return self.close_rejected(),
            Intent::Negotiation | Intent::Unclear => {}
        }

        if let Some(offer) = buyer_offer {
            if self.within_tolerance(offer) && self.ctx.product.in_band(offer) {
                return self.close_accepted(offer);
            }
        }

        if self.attempts >= self.ctx.policy.max_attempts {
            return self.close_max_attempts();
        }

        self.counter_offer(buyer_offer).await
    }

    fn sentinel(&self, message: &str) -> Option<Intent> {
        let message = message.trim();
        if message.eq_ignore_ascii_case(self.ctx.policy.accept_token.trim()) {
            Some(Intent::Acceptance)
        } else if message.eq_ignore_ascii_case(self.ctx.policy.reject_token.trim()) {
            Some(Intent::Rejection)
        } else {
            None
        }
    }

    fn within_tolerance(&self, offer: Decimal) -> bool {
        (offer - self.current_offer).abs() <= self.ctx.policy.acceptance_tolerance * self.current_offer
    }

    fn last_seller_message(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|turn| turn.role == Role::Seller)
            .map(|turn| turn.content.as_str())
    }

    fn append_buyer_turn(&mut self, message: &str, request_id: Option<&RequestId>) {
        if let Some(pending) = &self.pending {
            if pending.is_retry_of(message, request_id) {
                tracing::debug!(session_id = %self.id, "retried turn, buyer message already recorded");
                return;
            }
        }

        self.transcript.push(Turn::buyer(message));
        self.pending = Some(PendingTurn {
            request_id: request_id.cloned(),
            message: message.to_string(),
        });
    }

    async fn counter_offer(&mut self, buyer_offer: Option<Decimal>) -> Outcome {
        let timeout = self.ctx.policy.collaborator_timeout;
        let generated = tokio::time::timeout(timeout, self.ctx.generator.generate(&self.transcript))
            .await
            .unwrap_or(Err(DealbotError::GenerationTimeout {
                timeout_secs: timeout.as_secs(),
            }));

        let reply = match generated {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    session_id = %self.id,
                    attempts = self.attempts,
                    error = %e,
                    "text generation failed, turn left open for retry"
                );
                return self.outcome(APOLOGY_MESSAGE.to_string(), None, None);
            }
        };

        let floor = [self.last_buyer_offer, buyer_offer]
            .into_iter()
            .flatten()
            .fold(self.ctx.product.min_price, Decimal::max);

        let message = match self.ctx.prices.extract(&reply) {
            Some(price) if price >= floor && price <= self.current_offer => {
                self.current_offer = price;
                reply
            }
            Some(price) => {
                tracing::warn!(
                    session_id = %self.id,
                    proposed = %price,
                    floor = %floor,
                    current_offer = %self.current_offer,
                    "generated price outside allowed range, holding standing offer"
                );
                format!(
                    "The best I can do right now is {}.",
                    self.ctx.product.format_price(self.current_offer)
                )
            }
            None => reply,
        };

        let answered_before = self.transcript.iter().any(|turn| turn.role == Role::Seller);
        self.transcript.push(Turn::seller(message.clone()));
        self.pending = None;
        if answered_before {
            self.attempts += 1;
        }

        tracing::debug!(
            session_id = %self.id,
            attempts = self.attempts,
            current_offer = %self.current_offer,
            "seller counter-offer"
        );

        self.outcome(message, None, None)
    }

    fn close_accepted(&mut self, price: Decimal) -> Outcome {
        self.current_offer = price;
        self.status = SessionStatus::ClosedAccepted;
        let code = DiscountCode::random(self.ctx.policy.discount_code_length);

        tracing::info!(
            session_id = %self.id,
            attempts = self.attempts,
            status = ?self.status,
            final_price = %price,
            "negotiation closed with a deal"
        );

        let message = format!(
            "Great, it's a deal at {}! Use discount code {} at checkout.",
            self.ctx.product.format_price(price),
            code
        );
        let outcome = self.outcome(message, Some(price), Some(code));
        self.reset();
        outcome
    }

    fn close_rejected(&mut self) -> Outcome {
        self.status = SessionStatus::ClosedRejected;

        tracing::info!(
            session_id = %self.id,
            attempts = self.attempts,
            status = ?self.status,
            "negotiation declined by buyer"
        );

        let outcome = self.outcome(DECLINE_MESSAGE.to_string(), None, None);
        self.reset();
        outcome
    }

    fn close_max_attempts(&mut self) -> Outcome {
        self.status = SessionStatus::ClosedMaxAttempts;
        self.pending = None;

        tracing::info!(
            session_id = %self.id,
            attempts = self.attempts,
            status = ?self.status,
            final_price = %self.current_offer,
            "negotiation closed after max attempts"
        );

        let message = self.final_price_message();
        self.transcript.push(Turn::seller(message.clone()));
        self.outcome(message, Some(self.current_offer), None)
    }

    fn closed_outcome(&self) -> Outcome {
        match self.status {
            SessionStatus::ClosedMaxAttempts => {
                self.outcome(self.final_price_message(), Some(self.current_offer), None)
            }
            _ => self.outcome("This negotiation has ended.".to_string(), None, None),
        }
    }

    fn final_price_message(&self) -> String {
        format!(
            "I'm afraid I can't go any lower. My final price is {}.",
            self.ctx.product.format_price(self.current_offer)
        )
    }

    fn outcome(
        &self,
        message: String,
        final_price: Option<Decimal>,
        offer_discount_code: Option<DiscountCode>,
    ) -> Outcome {
        Outcome {
            message,
            status: self.status,
            final_price,
            offer_discount_code,
            current_offer: self.current_offer,
        }
    }
}
