//! Single-slot subscription bridge
//!
//! Adapts the controller's push model to one UI consumer. This is a
//! replace-on-register slot, not a pub/sub bus: fan-out, if ever
//! needed, belongs in a wrapper at the boundary.

use std::sync::Arc;

use crate::controller::SessionUpdate;

/// Handler invoked for every emitted update.
pub type UpdateHandler = dyn Fn(SessionUpdate) + Send + Sync;

/// Holds at most one registered subscriber.
#[derive(Default, Clone)]
pub struct ObserverSlot {
    handler: Option<Arc<UpdateHandler>>,
}

impl ObserverSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one
    pub fn set(&mut self, handler: Arc<UpdateHandler>) {
        self.handler = Some(handler);
    }

    /// Deregister the current handler; later emissions are dropped
    pub fn clear(&mut self) {
        self.handler = None;
    }

    /// Current handler, if any
    pub fn get(&self) -> Option<Arc<UpdateHandler>> {
        self.handler.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> Arc<UpdateHandler> {
        Arc::new(move |_update| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_set_replaces_previous_handler() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut slot = ObserverSlot::new();
        slot.set(counting_handler(first.clone()));
        slot.set(counting_handler(second.clone()));

        if let Some(handler) = slot.get() {
            handler(SessionUpdate::default());
        }

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cleared_slot_drops_emissions() {
        let counter = Arc::new(AtomicUsize::new(0));

        let mut slot = ObserverSlot::new();
        slot.set(counting_handler(counter.clone()));
        slot.clear();

        assert!(slot.get().is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
