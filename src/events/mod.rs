//! Event broadcast channel
//!
//! Single-writer, multi-reader fan-out: every live subscription observes
//! every published event exactly once, in publish order, at its own pace.
//! The channel holds only `Weak` references to subscription state; the
//! handle returned by `subscribe` is the sole strong owner, so dropping a
//! handle makes its entry eligible for cleanup. Pruning is lazy: dead
//! entries are removed as a side effect of the next `publish`, never
//! eagerly.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, Weak},
};

use tokio::sync::Notify;

#[derive(Debug)]
struct SubscriptionState<E> {
    queue: Mutex<VecDeque<E>>,
    notify: Notify,
}

/// Fan-out publish/subscribe channel.
#[derive(Debug)]
pub struct EventChannel<E> {
    subscribers: Mutex<Vec<Weak<SubscriptionState<E>>>>,
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Create a subscription with an empty queue. The returned handle owns
    /// the subscription; the channel keeps only a weak reference.
    pub fn subscribe(&self) -> EventSubscription<E> {
        let state = Arc::new(SubscriptionState {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        });
        self.subscribers
            .lock()
            .expect("subscriber set lock poisoned")
            .push(Arc::downgrade(&state));
        EventSubscription { state }
    }

    /// Number of entries in the subscriber set, dead or alive. Pruning only
    /// happens during `publish`, so this is observable in tests.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber set lock poisoned")
            .len()
    }
}

impl<E: Clone> EventChannel<E> {
    /// Append `event` to every live subscription's queue and wake waiting
    /// consumers. Entries whose handle has been dropped are pruned here.
    pub fn publish(&self, event: E) {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("subscriber set lock poisoned");
        subscribers.retain(|weak| match weak.upgrade() {
            Some(state) => {
                state
                    .queue
                    .lock()
                    .expect("subscription queue lock poisoned")
                    .push_back(event.clone());
                state.notify.notify_one();
                true
            }
            None => false,
        });
    }
}

/// Consumer handle for one subscription. Sole strong owner of the
/// subscription state; dropping it lets the channel prune the entry on a
/// later publish.
#[derive(Debug)]
pub struct EventSubscription<E> {
    state: Arc<SubscriptionState<E>>,
}

impl<E> EventSubscription<E> {
    /// Next queued event, in publish order; suspends until one is published
    /// if the queue is empty.
    pub async fn recv(&mut self) -> E {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.state.notify.notified().await;
        }
    }

    /// Pop the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        self.state
            .queue
            .lock()
            .expect("subscription queue lock poisoned")
            .pop_front()
    }
}
