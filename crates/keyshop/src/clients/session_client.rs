//! # Session Client
//!
//! Typed checkout steps over a `ResourceClient<Session>`.
use crate::catalog::Plan;
use crate::model::{BuyerId, CheckoutDraft, Days, ProductId, Session, SessionStart, SessionStep};
use crate::session_actor::{Quote, SessionAction, SessionActionResult, SessionError};
use async_trait::async_trait;
use keyshop_actor::{ActorClient, FrameworkError, ResourceClient};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct SessionClient {
    inner: ResourceClient<Session>,
    ttl: Duration,
}

impl SessionClient {
    /// `ttl` is applied to every session this client starts.
    pub fn new(inner: ResourceClient<Session>, ttl: Duration) -> Self {
        Self { inner, ttl }
    }
}

#[async_trait]
impl ActorClient<Session> for SessionClient {
    type Error = SessionError;

    fn inner(&self) -> &ResourceClient<Session> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> SessionError {
        match e {
            FrameworkError::NotFound(_) | FrameworkError::Expired(_) => SessionError::NoSession,
            other => other
                .into_entity_error::<SessionError>()
                .unwrap_or_else(|e| SessionError::ActorCommunicationError(e.to_string())),
        }
    }
}

fn unexpected(result: SessionActionResult) -> SessionError {
    SessionError::ActorCommunicationError(format!("unexpected reply {result:?}"))
}

impl SessionClient {
    /// Starts checkout for `buyer`, discarding any session already running.
    #[instrument(skip(self))]
    pub async fn start(&self, buyer: BuyerId, buyer_name: &str) -> Result<(), SessionError> {
        debug!("Sending request");
        self.inner
            .open(SessionStart {
                buyer,
                buyer_name: buyer_name.to_string(),
                ttl: self.ttl,
            })
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }

    /// Returns the plans on offer for the product.
    #[instrument(skip(self))]
    pub async fn pick_product(
        &self,
        buyer: BuyerId,
        product: ProductId,
    ) -> Result<Vec<Plan>, SessionError> {
        match self
            .inner
            .perform_action(buyer, SessionAction::PickProduct(product))
            .await
            .map_err(Self::map_error)?
        {
            SessionActionResult::PickProduct(plans) => Ok(plans),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn pick_duration(&self, buyer: BuyerId, duration: Days) -> Result<Quote, SessionError> {
        match self
            .inner
            .perform_action(buyer, SessionAction::PickDuration(duration))
            .await
            .map_err(Self::map_error)?
        {
            SessionActionResult::PickDuration(quote) => Ok(quote),
            other => Err(unexpected(other)),
        }
    }

    /// Ends the session and hands back what `create_order` needs.
    #[instrument(skip(self, proof))]
    pub async fn submit_proof(
        &self,
        buyer: BuyerId,
        proof: String,
    ) -> Result<CheckoutDraft, SessionError> {
        match self
            .inner
            .perform_action(buyer, SessionAction::SubmitProof(proof))
            .await
            .map_err(Self::map_error)?
        {
            SessionActionResult::SubmitProof(draft) => Ok(draft),
            other => Err(unexpected(other)),
        }
    }

    /// Where the buyer's session stands, if one is live.
    pub async fn step(&self, buyer: BuyerId) -> Result<Option<SessionStep>, SessionError> {
        Ok(self.get(buyer).await?.map(|session| session.step))
    }

    pub async fn cancel(&self, buyer: BuyerId) -> Result<bool, SessionError> {
        self.close(buyer).await
    }
}
