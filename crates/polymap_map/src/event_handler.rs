//! Typed publish/subscribe for change feeds.
//!
//! An [`EventHandler`] holds an ordered list of listeners and broadcasts a
//! value to all of them synchronously. Dispatch works over a snapshot of the
//! list taken when [`EventHandler::invoke`] starts:
//!
//! - a listener added during dispatch is not called for that dispatch
//! - a listener removed during dispatch is still called if it was in the snapshot
//!
//! A listener that panics is logged and skipped; the remaining listeners still
//! receive the value. This relies on unwinding, so the crate must not be built
//! with `panic = "abort"` if that isolation matters.
//!
//! # Examples
//!
//! ```ignore
//! use polymap_map::EventHandler;
//!
//! let changes = EventHandler::<u32>::new();
//! let subscription = changes.add(|value| println!("got {value}"));
//! changes.invoke(&7);
//! subscription.unsubscribe();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    listeners: Vec<(ListenerId, Listener<T>)>,
    next_id: u64,
}

impl<T> Registry<T> {
    fn remove(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|(existing, _)| *existing == id) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }
}

/// A broadcast point for values of type `T`.
pub struct EventHandler<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T> EventHandler<T> {
    /// Create a handler with no listeners.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a listener. The returned [`Subscription`] can remove it again;
    /// dropping the subscription leaves the listener registered.
    pub fn add<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, Rc::new(listener)));

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.registry.borrow_mut().remove(id)
    }

    /// Call every listener registered at this moment, in registration order.
    pub fn invoke(&self, value: &T) {
        let snapshot: Vec<(ListenerId, Listener<T>)> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                log::error!("Listener {:?} panicked; continuing delivery", id);
            }
        }
    }

    /// Drop all listeners.
    pub fn clear(&self) {
        self.registry.borrow_mut().listeners.clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for EventHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle returned by [`EventHandler::add`].
pub struct Subscription<T> {
    id: ListenerId,
    registry: Weak<RefCell<Registry<T>>>,
}

impl<T> Subscription<T> {
    /// The listener this subscription refers to.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Returns false if it was already removed or the
    /// handler no longer exists.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(self.id),
            None => false,
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
