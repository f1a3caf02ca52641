//! Single-task delivery queue in front of a [`Notifier`].
//!
//! [`DispatchHandle::send`] never waits: if the queue is full or the
//! dispatcher is gone, the notice is dropped with a warning.

use super::{Notice, Notifier};
use crate::model::Recipient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Envelope {
    recipient: Recipient,
    notice: Notice,
}

pub struct NotificationDispatcher {
    receiver: mpsc::Receiver<Envelope>,
    notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
pub struct DispatchHandle {
    sender: mpsc::Sender<Envelope>,
}

impl NotificationDispatcher {
    pub fn new(buffer_size: usize, notifier: Arc<dyn Notifier>) -> (Self, DispatchHandle) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { receiver, notifier }, DispatchHandle { sender })
    }

    /// Delivers queued notices in order until every handle is dropped.
    pub async fn run(mut self) {
        info!("Notification dispatcher started");
        let mut delivered = 0u64;
        let mut failed = 0u64;

        while let Some(Envelope { recipient, notice }) = self.receiver.recv().await {
            debug!(%recipient, ?notice, "Delivering");
            match self.notifier.notify(recipient, &notice).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(%recipient, error = %e, "Notification not delivered");
                }
            }
        }

        info!(delivered, failed, "Notification dispatcher stopped");
    }
}

impl DispatchHandle {
    pub fn send(&self, recipient: Recipient, notice: Notice) {
        match self.sender.try_send(Envelope { recipient, notice }) {
            Ok(()) => {}
            Err(TrySendError::Full(envelope)) => {
                warn!(recipient = %envelope.recipient, "Notification queue full, dropping notice");
            }
            Err(TrySendError::Closed(envelope)) => {
                warn!(recipient = %envelope.recipient, "Notification dispatcher closed, dropping notice");
            }
        }
    }
}
