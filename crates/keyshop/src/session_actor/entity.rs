//! [`ActorEntity`] implementation for [`Session`].
//!
//! Every accepted step pushes the deadline out by a full ttl. A rejected
//! step leaves both the step and the deadline alone.

use super::actions::{Quote, SessionAction, SessionActionResult};
use super::error::SessionError;
use crate::catalog::{plan_price, plans, Catalog};
use crate::model::{BuyerId, CheckoutDraft, Days, ProductId, Session, SessionStart, SessionStep};
use crate::store::FulfillmentStore;
use async_trait::async_trait;
use keyshop_actor::ActorEntity;
use std::sync::Arc;
use tokio::time::Instant;

/// Dependencies the session actor runs with.
#[derive(Clone)]
pub struct SessionContext {
    pub catalog: Catalog,
    pub store: Arc<dyn FulfillmentStore>,
}

#[async_trait]
impl ActorEntity for Session {
    type Id = BuyerId;
    type Create = SessionStart;
    type Action = SessionAction;
    type ActionResult = SessionActionResult;
    type Context = SessionContext;
    type Error = SessionError;

    fn key(params: &SessionStart) -> BuyerId {
        params.buyer
    }

    fn from_create_params(params: SessionStart) -> Result<Self, SessionError> {
        let buyer_name = params.buyer_name.trim().to_string();
        if buyer_name.is_empty() {
            return Err(SessionError::InvalidStart("buyer name is empty".to_string()));
        }
        if params.ttl.is_zero() {
            return Err(SessionError::InvalidStart("ttl must be positive".to_string()));
        }
        Ok(Session {
            buyer: params.buyer,
            buyer_name,
            step: SessionStep::AwaitingProduct,
            expires_at: Instant::now() + params.ttl,
            ttl: params.ttl,
        })
    }

    async fn handle_action(
        &mut self,
        action: SessionAction,
        ctx: &SessionContext,
    ) -> Result<SessionActionResult, SessionError> {
        let result = match action {
            SessionAction::PickProduct(product) => self.pick_product(product, ctx).await?,
            SessionAction::PickDuration(duration) => self.pick_duration(duration, ctx).await?,
            SessionAction::SubmitProof(proof) => self.submit_proof(proof)?,
        };
        if !self.is_finished() {
            self.touch();
        }
        Ok(result)
    }

    fn is_finished(&self) -> bool {
        self.step == SessionStep::Done
    }

    fn expires_at(&self) -> Option<Instant> {
        Some(self.expires_at)
    }
}

impl Session {
    fn wrong_step(&self) -> SessionError {
        SessionError::WrongStep {
            step: self.step.name(),
        }
    }

    async fn pick_product(
        &mut self,
        product: ProductId,
        ctx: &SessionContext,
    ) -> Result<SessionActionResult, SessionError> {
        if !matches!(
            self.step,
            SessionStep::AwaitingProduct | SessionStep::AwaitingDuration { .. }
        ) {
            return Err(self.wrong_step());
        }
        if !ctx.catalog.is_listed(&product).await {
            return Err(SessionError::UnknownProduct(product));
        }
        self.step = SessionStep::AwaitingDuration { product };
        Ok(SessionActionResult::PickProduct(plans().collect()))
    }

    async fn pick_duration(
        &mut self,
        duration: Days,
        ctx: &SessionContext,
    ) -> Result<SessionActionResult, SessionError> {
        let SessionStep::AwaitingDuration { product } = &self.step else {
            return Err(self.wrong_step());
        };
        let amount = plan_price(duration).ok_or(SessionError::UnknownPlan(duration))?;
        // Awaited inside the actor loop: every buyer's session waits on this read.
        let available = ctx
            .store
            .count_available(product, duration)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        if available == 0 {
            return Err(SessionError::OutOfStock {
                product: product.clone(),
                duration,
            });
        }

        self.step = SessionStep::AwaitingProof {
            product: product.clone(),
            duration,
            amount,
        };
        Ok(SessionActionResult::PickDuration(Quote { amount, available }))
    }

    fn submit_proof(&mut self, proof: String) -> Result<SessionActionResult, SessionError> {
        let SessionStep::AwaitingProof {
            product,
            duration,
            amount,
        } = &self.step
        else {
            return Err(self.wrong_step());
        };
        let proof = proof.trim();
        if proof.is_empty() {
            return Err(SessionError::EmptyProof);
        }

        let draft = CheckoutDraft {
            buyer: self.buyer,
            buyer_name: self.buyer_name.clone(),
            product: product.clone(),
            duration: *duration,
            amount: *amount,
            proof: proof.to_string(),
        };
        self.step = SessionStep::Done;
        Ok(SessionActionResult::SubmitProof(draft))
    }
}
