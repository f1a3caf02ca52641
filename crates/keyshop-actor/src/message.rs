//! # Generic Messages
//!
//! Requests a [`ResourceClient`](crate::ResourceClient) sends to its
//! [`ResourceActor`](crate::ResourceActor).

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// One-shot reply channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    /// Open (or replace) the entity under `T::key(&params)`.
    Open {
        params: T::Create,
        respond_to: Response<T::Id>,
    },
    /// Snapshot of a live entity; `None` if absent or expired.
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    /// Drop the entity. Replies `true` if something was removed.
    Close {
        id: T::Id,
        respond_to: Response<bool>,
    },
}
