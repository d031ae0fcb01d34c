//! Topic-based fan-out of domain events.
//!
//! Producers call [`TopicBroadcaster::notify`]; every live subscriber of the
//! event's topic has its callback invoked on its own thread, independently
//! of the caller and of other subscribers. There is no queue and no
//! delivery guarantee for subscriptions created or closed concurrently with
//! a notify: the recipient set is whatever is registered at the instant the
//! internal lock is held.
//!
//! Callbacks run outside the broadcaster's lock, so a callback may call
//! back into the store or the broadcaster without deadlocking `notify`.
//! A callback must not synchronously subscribe or close *while handling a
//! notification it is itself part of* unless that reentrancy has been
//! verified safe for the surrounding code.
//!
//! Broadcasters are explicitly constructed and passed down as dependencies
//! so tests can run against isolated instances. Handles are cheap clones
//! sharing one registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Integer key grouping all subscribers interested in one event kind.
pub type TopicId = i64;

/// Unique id of a single subscription within one broadcaster.
pub type SubscriptionId = i64;

/// A broadcastable event. Every event value names the topic it belongs to;
/// the broadcaster dispatches purely on that integer.
pub trait Event: Clone + Send + 'static {
    /// The topic this event is published under.
    fn topic(&self) -> TopicId;
}

type Callback<E> = Arc<dyn Fn(E) + Send + Sync + 'static>;

struct Registry<E> {
    next_id: AtomicI64,
    topics: Mutex<HashMap<TopicId, HashMap<SubscriptionId, Callback<E>>>>,
}

/// Fans out events to subscribers of specific topics.
pub struct TopicBroadcaster<E: Event> {
    registry: Arc<Registry<E>>,
}

impl<E: Event> Clone for TopicBroadcaster<E> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry) }
    }
}

impl<E: Event> Default for TopicBroadcaster<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> TopicBroadcaster<E> {
    /// Create a broadcaster with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicI64::new(0),
                topics: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register `callback` under `topic`.
    ///
    /// The returned [`Subscription`] owns the registration and releases it
    /// when closed or dropped. Safe to call concurrently with
    /// [`Self::notify`] and other subscribe/close calls.
    pub fn subscribe<F>(&self, topic: TopicId, callback: F) -> Subscription<E>
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.registry
            .topics
            .lock()
            .entry(topic)
            .or_default()
            .insert(id, Arc::new(callback));
        Subscription { registry: Arc::clone(&self.registry), topic, id, released: false }
    }

    /// Dispatch `event` to every current subscriber of its topic,
    /// returning the number of subscribers dispatched to.
    ///
    /// Fire-and-forget: each callback runs on its own thread and `notify`
    /// returns as soon as dispatch has been scheduled. No ordering between
    /// subscriber invocations is guaranteed. A slow callback does not block
    /// other subscribers, but it does hold a thread until it returns.
    pub fn notify(&self, event: E) -> usize {
        let callbacks: Vec<Callback<E>> = {
            let topics = self.registry.topics.lock();
            topics
                .get(&event.topic())
                .map(|subs| subs.values().map(Arc::clone).collect())
                .unwrap_or_default()
        };

        let dispatched = callbacks.len();
        for callback in callbacks {
            let event = event.clone();
            std::thread::spawn(move || callback(event));
        }
        dispatched
    }

    /// Number of live subscriptions for `topic`.
    pub fn subscriber_count(&self, topic: TopicId) -> usize {
        self.registry.topics.lock().get(&topic).map_or(0, HashMap::len)
    }
}

/// Handle owning one registration in a [`TopicBroadcaster`].
///
/// The registration is released exactly once, either by [`Subscription::close`]
/// or on drop, so tying the handle's lifetime to the owning operation (an
/// SSE response stream, for instance) guarantees release on every exit path.
/// A callback already dispatched before the release may still run afterwards.
pub struct Subscription<E: Event> {
    registry: Arc<Registry<E>>,
    topic: TopicId,
    id: SubscriptionId,
    released: bool,
}

impl<E: Event> Subscription<E> {
    /// Release the registration now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut topics = self.registry.topics.lock();
        if let Some(subs) = topics.get_mut(&self.topic) {
            subs.remove(&self.id);
            // Prune empty topics so idle topics cost no memory.
            if subs.is_empty() {
                topics.remove(&self.topic);
            }
        }
    }
}

impl<E: Event> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Ping(TopicId);

    impl Event for Ping {
        fn topic(&self) -> TopicId {
            self.0
        }
    }

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);
    const QUIET: Duration = Duration::from_millis(100);

    #[test]
    fn test_fan_out_reaches_every_subscriber_once() {
        let b = TopicBroadcaster::<Ping>::new();
        let (tx, rx) = mpsc::channel();

        let subs: Vec<_> = (0..8)
            .map(|i| {
                let tx = tx.clone();
                b.subscribe(1, move |_| tx.send(i).unwrap())
            })
            .collect();

        assert_eq!(b.notify(Ping(1)), 8);

        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(rx.recv_timeout(RECV_TIMEOUT).unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        // No subscriber hears the event twice.
        assert!(rx.recv_timeout(QUIET).is_err());
        drop(subs);
    }

    #[test]
    fn test_notify_without_subscribers_is_zero() {
        let b = TopicBroadcaster::<Ping>::new();
        assert_eq!(b.notify(Ping(1)), 0);
    }

    #[test]
    fn test_topics_are_independent() {
        let b = TopicBroadcaster::<Ping>::new();
        let (tx, rx) = mpsc::channel();
        let _sub = b.subscribe(1, move |e: Ping| tx.send(e.0).unwrap());

        assert_eq!(b.notify(Ping(2)), 0);
        assert!(rx.recv_timeout(QUIET).is_err());

        assert_eq!(b.notify(Ping(1)), 1);
        assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), 1);
    }

    #[test]
    fn test_close_stops_delivery() {
        let b = TopicBroadcaster::<Ping>::new();
        let (tx, rx) = mpsc::channel();
        let sub = b.subscribe(1, move |_| tx.send(()).unwrap());

        assert_eq!(b.notify(Ping(1)), 1);
        rx.recv_timeout(RECV_TIMEOUT).unwrap();

        sub.close();
        assert_eq!(b.notify(Ping(1)), 0);
        assert!(rx.recv_timeout(QUIET).is_err());
    }

    #[test]
    fn test_drop_releases_subscription() {
        let b = TopicBroadcaster::<Ping>::new();
        {
            let _sub = b.subscribe(1, |_| {});
            assert_eq!(b.subscriber_count(1), 1);
        }
        assert_eq!(b.subscriber_count(1), 0);
        assert_eq!(b.notify(Ping(1)), 0);
    }

    #[test]
    fn test_empty_topic_is_pruned() {
        let b = TopicBroadcaster::<Ping>::new();
        let a = b.subscribe(1, |_| {});
        let c = b.subscribe(1, |_| {});
        a.close();
        assert_eq!(b.subscriber_count(1), 1);
        c.close();
        assert_eq!(b.subscriber_count(1), 0);
        assert!(b.registry.topics.lock().is_empty());
    }

    #[test]
    fn test_callback_may_reenter_broadcaster() {
        // A callback calling notify() on the same broadcaster must not
        // deadlock, since dispatch happens outside the registry lock.
        let b = TopicBroadcaster::<Ping>::new();
        let (tx, rx) = mpsc::channel();

        let inner = b.clone();
        let _relay = b.subscribe(1, move |_| {
            inner.notify(Ping(2));
        });
        let _sink = b.subscribe(2, move |_| tx.send(()).unwrap());

        assert_eq!(b.notify(Ping(1)), 1);
        rx.recv_timeout(RECV_TIMEOUT).unwrap();
    }

    #[test]
    fn test_clone_shares_registry() {
        let b = TopicBroadcaster::<Ping>::new();
        let other = b.clone();
        let (tx, rx) = mpsc::channel();
        let _sub = other.subscribe(1, move |_| tx.send(()).unwrap());

        assert_eq!(b.notify(Ping(1)), 1);
        rx.recv_timeout(RECV_TIMEOUT).unwrap();
    }
}
