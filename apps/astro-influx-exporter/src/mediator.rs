//! In-process stand-in for the host's per-device mediators.
//!
//! Handlers run synchronously on the publishing thread. A `Subscription` is
//! the only way to stay registered: dropping it removes the handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Handler<M> = Arc<dyn Fn(&M) + Send + Sync>;

struct Registry<M> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler<M>)>>,
}

impl<M> Registry<M> {
    fn handlers(&self) -> MutexGuard<'_, Vec<(u64, Handler<M>)>> {
        match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub struct Mediator<M> {
    registry: Arc<Registry<M>>,
}

impl<M> Clone for Mediator<M> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<M> Default for Mediator<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Mediator<M> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers().len()
    }
}

impl<M: 'static> Mediator<M> {
    pub fn subscribe(&self, handler: impl Fn(&M) + Send + Sync + 'static) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.handlers().push((id, Arc::new(handler)));

        let registry: Weak<Registry<M>> = Arc::downgrade(&self.registry);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.handlers().retain(|(existing, _)| *existing != id);
                }
            })),
        }
    }

    /// Delivers `message` to every current subscriber; returns how many ran.
    pub fn publish(&self, message: &M) -> usize {
        // Handlers are cloned out so one may unsubscribe while running.
        let handlers: Vec<Handler<M>> = self
            .registry
            .handlers()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }
}

/// Registration guard. Unsubscribes exactly once, on `unsubscribe` or drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
