//! Local event dispatch
//!
//! UI-facing events (chat sent, trade confirmed, socket modified, ...) are
//! delivered to explicitly registered observers. Delivery is synchronous and
//! in registration order; nothing is persisted or queued.

use std::fmt;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send + Sync>;

/// Ordered list of callbacks for one event type
pub struct Observers<E> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: 1,
            callbacks: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was never registered or already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() < before
    }

    pub fn notify(&mut self, event: &E) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}
