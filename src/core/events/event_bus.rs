// In-process publish/subscribe with synchronous fan-out.
//
// Subscribers are invoked once per event, in subscription order, on the
// publishing task. There is no queueing and no replay: a late subscriber
// only sees events published after it subscribed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registered<E> {
    id: u64,
    callback: Callback<E>,
}

struct Registry<E> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Registered<E>>>,
}

/// An ordered observer registry for one event type.
pub struct EventBus<E> {
    registry: Arc<Registry<E>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a callback. The returned handle is the only way to
    /// unsubscribe; dropping it leaves the subscription active.
    pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription<E> {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_subscribers().push(Registered {
            id,
            callback: Arc::new(callback),
        });
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Dispatch an event to every current subscriber, in subscription
    /// order. Callbacks run synchronously on the calling task.
    pub fn emit(&self, event: &E) {
        // Snapshot first so a callback can subscribe/unsubscribe without
        // deadlocking on the registry lock.
        let callbacks: Vec<Callback<E>> = self
            .lock_subscribers()
            .iter()
            .map(|registered| Arc::clone(&registered.callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    #[allow(dead_code)]
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Registered<E>>> {
        self.registry
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Handle returned at subscribe time; consuming it removes the subscriber.
pub struct Subscription<E> {
    id: u64,
    registry: Weak<Registry<E>>,
}

impl<E> Subscription<E> {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|registered| registered.id != self.id);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn every_subscriber_is_called_once_per_event() {
        let bus: EventBus<u32> = EventBus::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_clone = Arc::clone(&first);
        let _a = bus.subscribe(move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
        });
        let second_clone = Arc::clone(&second);
        let _b = bus.subscribe(move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&1);
        bus.emit(&2);

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_follows_subscription_order() {
        let bus: EventBus<()> = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let _sub = bus.subscribe(move |_| {
                order.lock().unwrap().push(label);
            });
        }

        bus.emit(&());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribed_handle_stops_receiving() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let subscription = bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&1);
        subscription.unsubscribe();
        bus.emit(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn late_subscriber_sees_no_replay() {
        let bus: EventBus<u32> = EventBus::new();
        bus.emit(&1);

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let _sub = bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.load(Ordering::SeqCst), 0);
        bus.emit(&2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
