use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T: ?Sized> {
    next: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

/// Fan-out of agent notifications to registered callbacks.
pub struct Listeners<T: ?Sized> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: ?Sized + 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next: 0,
                callbacks: BTreeMap::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut r = self.registry.lock();
            let id = r.next;
            r.next += 1;
            r.callbacks.insert(id, Arc::new(f));
            id
        };
        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(r) = registry.upgrade() {
                r.lock().callbacks.remove(&id);
            }
        })
    }

    /// Invoke every callback. Callbacks may (un)subscribe while running.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self.registry.lock().callbacks.values().cloned().collect();
        for f in callbacks {
            f(value)
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered callback. Unsubscribes when dropped.
#[must_use]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.cancel.take() {
            f()
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.cancel.take() {
            f()
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
