//! Session registry manages all active negotiation sessions

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::session::{NegotiationSession, SessionContext, SessionSnapshot};
use super::types::{Outcome, SessionStatus};
use crate::error::{DealbotError, Result};
use crate::types::{RequestId, SessionId};

type SessionHandle = Arc<Mutex<NegotiationSession>>;

/// Maps session IDs to sessions.
///
/// The map lock is only held for lookups and inserts. Each session has its own
/// lock, so turns on one session are serialized while different sessions run
/// in parallel.
pub struct SessionRegistry {
    ctx: SessionContext,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Start (or restart) the negotiation under `id`
    pub async fn start(&self, id: SessionId, opening_message: &str) -> Outcome {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(id.clone())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(NegotiationSession::new(id.clone(), self.ctx.clone())))
                })
                .clone()
        };

        let outcome = handle.lock().await.start(opening_message).await;
        self.settle(&id, &handle, &outcome).await;
        outcome
    }

    /// Apply a buyer message to an existing session
    pub async fn advance(
        &self,
        id: &SessionId,
        buyer_message: &str,
        request_id: Option<&RequestId>,
    ) -> Result<Outcome> {
        let handle = self.handle(id).await?;

        let outcome = handle.lock().await.advance(buyer_message, request_id).await;
        self.settle(id, &handle, &outcome).await;
        Ok(outcome)
    }

    /// Reset a session to a fresh open negotiation
    pub async fn reset(&self, id: &SessionId) -> Result<()> {
        let handle = self.handle(id).await?;
        handle.lock().await.reset();
        tracing::info!(session_id = %id, "session reset");
        Ok(())
    }

    /// Drop a session, returning whether it existed
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    pub async fn snapshot(&self, id: &SessionId) -> Result<SessionSnapshot> {
        let handle = self.handle(id).await?;
        let snapshot = handle.lock().await.snapshot();
        Ok(snapshot)
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    async fn handle(&self, id: &SessionId) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DealbotError::SessionNotFound(id.0.clone()))
    }

    /// Deals and declines end the session; a max-attempts close stays
    /// so its final price can be surfaced again.
    async fn settle(&self, id: &SessionId, handle: &SessionHandle, outcome: &Outcome) {
        if !matches!(
            outcome.status,
            SessionStatus::ClosedAccepted | SessionStatus::ClosedRejected
        ) {
            return;
        }

        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            sessions.remove(id);
            tracing::debug!(session_id = %id, status = ?outcome.status, "session removed");
        }
    }
}
