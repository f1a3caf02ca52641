//! # ActorClient Trait
//!
//! Shared surface for typed client wrappers: implement [`inner`](ActorClient::inner)
//! and [`map_error`](ActorClient::map_error) and `get`/`close` come for free.

use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The wrapper's own error type.
    type Error: Send + Sync;

    fn inner(&self) -> &ResourceClient<T>;

    fn map_error(e: FrameworkError) -> Self::Error;

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Drops the entity. `Ok(false)` means there was nothing to drop.
    #[tracing::instrument(skip(self))]
    async fn close(&self, id: T::Id) -> Result<bool, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().close(id).await.map_err(Self::map_error)
    }
}
