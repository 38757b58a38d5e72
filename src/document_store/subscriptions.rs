use super::{KeyPath, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback = Rc<RefCell<Box<dyn FnMut(Option<&Value>)>>>;

struct Listener {
    id: u64,
    path: KeyPath,
    callback: Callback,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Book keeping of the live subscriptions of one store.
///
/// Stores register callbacks here and call `notify` after every successful write.
/// The registry never holds its own borrow while a callback runs, so callbacks may read,
/// write or cancel subscriptions. A callback that triggers a write notifying itself is not
/// re-entered, the nested notification is skipped for it.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Rc<RefCell<Listeners>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, path: &KeyPath, callback: F) -> Subscription
    where
        F: FnMut(Option<&Value>) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            path: path.clone(),
            callback: Rc::new(RefCell::new(Box::new(callback))),
        });

        Subscription {
            id,
            listeners: Rc::downgrade(&self.inner),
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Invokes every callback whose path overlaps one of the `written` paths with the
    /// value `read` returns for the callback's path. Each callback is invoked at most once.
    pub fn notify<R>(&self, written: &[KeyPath], read: R)
    where
        R: Fn(&KeyPath) -> Result<Option<Value>>,
    {
        let affected: Vec<(KeyPath, Callback)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| written.iter().any(|path| path.overlaps(&listener.path)))
            .map(|listener| (listener.path.clone(), Rc::clone(&listener.callback)))
            .collect();

        for (path, callback) in affected {
            let value = match read(&path) {
                Ok(value) => value,
                Err(error) => {
                    tracing::warn!(%path, %error, "skipping change notification");
                    continue;
                }
            };
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (&mut *callback)(value.as_ref());
            }
        }
    }
}

/// Handle of a live subscription. The subscription ends when the handle is cancelled
/// or dropped.
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl Subscription {
    pub fn cancel(self) {
        // Dropping does the work.
    }

    pub fn is_active(&self) -> bool {
        self.listeners.upgrade().map_or(false, |listeners| {
            listeners
                .borrow()
                .listeners
                .iter()
                .any(|listener| listener.id == self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .listeners
                .retain(|listener| listener.id != self.id);
        }
    }
}
