//! Typed publish/subscribe fan-out for inbound channel messages.
//!
//! Callbacks for a kind run synchronously in registration order. A
//! callback that returns an error or panics is logged and skipped; the
//! remaining callbacks still receive the message.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::messages::{ChannelMessage, MessageKind};

/// A subscriber callback.
pub type Callback = Arc<dyn Fn(&ChannelMessage) -> anyhow::Result<()> + Send + Sync>;

/// Subscriber lists keyed by message kind.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<MessageKind, Vec<(u64, Callback)>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `callback` for messages of `kind`.
    pub fn subscribe<F>(self: &Arc<Self>, kind: MessageKind, callback: F) -> Subscription
    where
        F: Fn(&ChannelMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));

        tracing::debug!(kind = %kind, subscription_id = id, "Subscriber registered");
        Subscription {
            registry: Arc::downgrade(self),
            kind,
            id,
        }
    }

    /// Deliver `message` to every subscriber of its kind.
    ///
    /// Returns the number of callbacks that completed successfully.
    pub fn dispatch(&self, message: &ChannelMessage) -> usize {
        let kind = message.kind();
        // Snapshot the list so callbacks can subscribe or unsubscribe
        // without deadlocking.
        let callbacks: Vec<(u64, Callback)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(kind = %kind, subscription_id = id, error = %e, "Subscriber failed");
                }
                Err(_) => {
                    tracing::error!(kind = %kind, subscription_id = id, "Subscriber panicked");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    fn remove(&self, kind: MessageKind, id: u64) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        before != list.len()
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
///
/// Dropping the handle keeps the callback registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[must_use = "call unsubscribe() when the subscriber goes away"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    kind: MessageKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Remove the callback. Returns whether it was still registered.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.kind, self.id),
            None => false,
        }
    }
}
