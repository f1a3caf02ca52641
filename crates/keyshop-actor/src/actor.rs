//! # Keyed Actor Server
//!
//! [`ResourceActor`] owns a map of live entities and processes requests for
//! them one at a time. Besides requests it wakes up on a sweep timer and
//! evicts every entity whose deadline has passed, so abandoned entities do
//! not accumulate.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Server half of a keyed actor.
///
/// ```rust
/// use keyshop_actor::{ActorEntity, ResourceActor};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)]
/// struct Counter { key: u64, hits: u32 }
/// #[derive(Debug)] struct Open(u64);
/// #[derive(Debug)] struct Hit;
/// #[derive(Debug, thiserror::Error)] #[error("counter error")] struct CounterError;
///
/// #[async_trait]
/// impl ActorEntity for Counter {
///     type Id = u64; type Create = Open; type Action = Hit; type ActionResult = u32;
///     type Context = (); type Error = CounterError;
///     fn key(params: &Open) -> u64 { params.0 }
///     fn from_create_params(params: Open) -> Result<Self, CounterError> {
///         Ok(Self { key: params.0, hits: 0 })
///     }
///     async fn handle_action(&mut self, _: Hit, _: &()) -> Result<u32, CounterError> {
///         self.hits += 1;
///         Ok(self.hits)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = ResourceActor::<Counter>::new(10);
///     tokio::spawn(actor.run(()));
///
///     let key = client.open(Open(7)).await.unwrap();
///     assert_eq!(client.perform_action(key, Hit).await.unwrap(), 1);
/// }
/// ```
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    sweep_interval: Duration,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates the actor and a client bound to it. `buffer_size` bounds the
    /// request queue; senders wait while it is full.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        };
        (actor, ResourceClient::new(sender))
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Runs until every client has been dropped.
    ///
    /// `context` is handed to every entity hook, which lets the caller wire
    /// dependencies after the client has already been given out.
    pub async fn run(mut self, context: T::Context) {
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = self.receiver.recv() => {
                    let Some(msg) = msg else { break };
                    self.handle(msg, &context, entity_type).await;
                }
                _ = sweep.tick() => {
                    self.evict_expired(entity_type);
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }

    async fn handle(&mut self, msg: ResourceRequest<T>, context: &T::Context, entity_type: &str) {
        match msg {
            ResourceRequest::Open { params, respond_to } => {
                debug!(entity_type, ?params, "Open");
                let id = T::key(&params);
                let mut item = match T::from_create_params(params) {
                    Ok(item) => item,
                    Err(e) => {
                        warn!(entity_type, %id, error = %e, "Open failed");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        return;
                    }
                };
                if let Err(e) = item.on_create(context).await {
                    warn!(entity_type, %id, error = %e, "on_create failed");
                    let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                    return;
                }
                let replaced = self.store.insert(id.clone(), item).is_some();
                info!(entity_type, %id, replaced, size = self.store.len(), "Opened");
                let _ = respond_to.send(Ok(id));
            }
            ResourceRequest::Get { id, respond_to } => {
                self.drop_if_expired(&id, entity_type);
                let item = self.store.get(&id).cloned();
                debug!(entity_type, %id, found = item.is_some(), "Get");
                let _ = respond_to.send(Ok(item));
            }
            ResourceRequest::Action {
                id,
                action,
                respond_to,
            } => {
                debug!(entity_type, %id, ?action, "Action");
                if self.drop_if_expired(&id, entity_type) {
                    let _ = respond_to.send(Err(FrameworkError::Expired(id.to_string())));
                    return;
                }
                let Some(item) = self.store.get_mut(&id) else {
                    warn!(entity_type, %id, "Not found");
                    let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                    return;
                };
                let result = item
                    .handle_action(action, context)
                    .await
                    .map_err(|e| FrameworkError::EntityError(Box::new(e)));
                let finished = item.is_finished();
                match &result {
                    Ok(_) => info!(entity_type, %id, finished, "Action ok"),
                    Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
                }
                if finished {
                    self.store.remove(&id);
                }
                let _ = respond_to.send(result);
            }
            ResourceRequest::Close { id, respond_to } => {
                let removed = self.store.remove(&id).is_some();
                info!(entity_type, %id, removed, size = self.store.len(), "Closed");
                let _ = respond_to.send(Ok(removed));
            }
        }
    }

    /// Removes `id` if its deadline has passed. Returns `true` if it did.
    fn drop_if_expired(&mut self, id: &T::Id, entity_type: &str) -> bool {
        let now = Instant::now();
        let expired = self.store.get(id).is_some_and(|item| item.is_expired(now));
        if expired {
            self.store.remove(id);
            info!(entity_type, %id, "Expired");
        }
        expired
    }

    fn evict_expired(&mut self, entity_type: &str) {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, item| !item.is_expired(now));
        let evicted = before - self.store.len();
        if evicted > 0 {
            info!(entity_type, evicted, size = self.store.len(), "Swept expired entries");
        }
    }
}
