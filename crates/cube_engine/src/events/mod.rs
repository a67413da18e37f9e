//! Message bus for decoupled component communication
//!
//! Key principles:
//! - Topic-keyed registration (only interested subscribers are notified)
//! - Key-value arguments (see [`Params`]), one mutable payload per dispatch
//! - Synchronous, ordered delivery: subscribers run in registration order
//! - Re-entrant: a subscriber may signal again; nested dispatch completes
//!   depth-first before the outer dispatch moves to its next subscriber
//! - Tracked subscriptions hold only a weak reference to their target and go
//!   inert once the target is dropped
//!
//! The bus is single-threaded and works through `&self` so subscribers can
//! publish while a dispatch is in progress.

pub mod params;

pub use params::Params;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;

/// Marker for types usable as message topics
///
/// Topics are process-wide constants, typically a fieldless enum.
pub trait Topic: Copy + Ord + Debug + 'static {}

impl<T: Copy + Ord + Debug + 'static> Topic for T {}

/// Outcome of handing a payload to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// The callback ran
    Delivered,
    /// The tracked target has been dropped; the subscription is dead
    Expired,
    /// The subscriber is already running further up the dispatch stack
    Busy,
}

type Callback<T, P> = Box<dyn FnMut(&MessageBus<T, P>, &mut P) -> Delivery>;

struct Subscriber<T: Topic, P: 'static> {
    live: Rc<Cell<bool>>,
    callback: RefCell<Callback<T, P>>,
}

/// Handle to one subscription
///
/// Dropping a `Connection` leaves the subscription in place; call
/// [`Connection::disconnect`] or keep it in a [`ConnectionHolder`] to tie the
/// subscription to an owner's lifetime.
#[derive(Debug, Clone)]
pub struct Connection {
    live: Rc<Cell<bool>>,
}

impl Connection {
    /// Stop delivering messages to this subscription
    pub fn disconnect(&self) {
        self.live.set(false);
    }

    /// Whether the subscription will still receive messages
    pub fn is_connected(&self) -> bool {
        self.live.get()
    }
}

/// Group of connections released together when the holder is dropped
///
/// Used by long-lived components that are not managed entities.
#[derive(Debug, Default)]
pub struct ConnectionHolder {
    connections: Vec<Connection>,
}

impl ConnectionHolder {
    /// Create an empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a connection
    pub fn add(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Disconnect every held connection now
    pub fn disconnect_all(&mut self) {
        for connection in self.connections.drain(..) {
            connection.disconnect();
        }
    }

    /// Number of held connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the holder is empty
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Drop for ConnectionHolder {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

/// Topic-keyed publish/subscribe bus
///
/// `T` is the topic type, `P` the payload passed to subscribers.
pub struct MessageBus<T: Topic, P: 'static> {
    topics: RefCell<BTreeMap<T, Vec<Rc<Subscriber<T, P>>>>>,
}

impl<T: Topic, P: 'static> MessageBus<T, P> {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self {
            topics: RefCell::new(BTreeMap::new()),
        }
    }

    /// Subscribe a method of a shared target
    ///
    /// Only a weak reference to `target` is kept. Once every strong reference
    /// is gone the subscription is skipped and purged; the handler is never
    /// invoked on a dropped target.
    pub fn subscribe<S, F>(&self, topic: T, target: &Rc<RefCell<S>>, mut handler: F) -> Connection
    where
        S: 'static,
        F: FnMut(&mut S, &Self, &mut P) + 'static,
    {
        let target = Rc::downgrade(target);
        self.register(
            topic,
            Box::new(move |bus, params| {
                let Some(target) = target.upgrade() else {
                    return Delivery::Expired;
                };
                let Ok(mut target) = target.try_borrow_mut() else {
                    return Delivery::Busy;
                };
                handler(&mut target, bus, params);
                Delivery::Delivered
            }),
        )
    }

    /// Subscribe a free callback
    ///
    /// The callback lives until its [`Connection`] is disconnected or the bus
    /// is dropped.
    pub fn subscribe_fn<F>(&self, topic: T, mut callback: F) -> Connection
    where
        F: FnMut(&Self, &mut P) + 'static,
    {
        self.register(
            topic,
            Box::new(move |bus, params| {
                callback(bus, params);
                Delivery::Delivered
            }),
        )
    }

    fn register(&self, topic: T, callback: Callback<T, P>) -> Connection {
        let live = Rc::new(Cell::new(true));
        let subscriber = Rc::new(Subscriber {
            live: Rc::clone(&live),
            callback: RefCell::new(callback),
        });
        self.topics
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push(subscriber);
        Connection { live }
    }

    /// Deliver `params` to every live subscriber of `topic`, in registration
    /// order
    ///
    /// Subscribers registered during this dispatch are not invoked by it.
    /// Signaling a topic without subscribers does nothing.
    pub fn signal(&self, topic: T, params: &mut P) {
        let snapshot = {
            let mut topics = self.topics.borrow_mut();
            let Some(subscribers) = topics.get_mut(&topic) else {
                return;
            };
            subscribers.retain(|s| s.live.get());
            subscribers.clone()
        };

        for subscriber in snapshot {
            // Disconnected by an earlier subscriber of this same dispatch
            if !subscriber.live.get() {
                continue;
            }
            let Ok(mut callback) = subscriber.callback.try_borrow_mut() else {
                log::warn!("{topic:?}: subscriber already dispatching, skipped");
                continue;
            };
            match callback(self, params) {
                Delivery::Delivered => {}
                Delivery::Expired => subscriber.live.set(false),
                Delivery::Busy => {
                    log::warn!("{topic:?}: subscriber target already borrowed, skipped");
                }
            }
        }
    }

    /// Signal with an owned payload and hand it back afterwards
    pub fn signal_with(&self, topic: T, mut params: P) -> P {
        self.signal(topic, &mut params);
        params
    }

    /// Number of live subscriptions for `topic`
    ///
    /// Tracked subscriptions whose target has been dropped count until the
    /// next dispatch of the topic purges them.
    pub fn subscriber_count(&self, topic: T) -> usize {
        self.topics
            .borrow()
            .get(&topic)
            .map_or(0, |subscribers| subscribers.iter().filter(|s| s.live.get()).count())
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.topics.borrow_mut().clear();
    }
}

impl<T: Topic, P: Default + 'static> MessageBus<T, P> {
    /// Signal with an empty payload
    pub fn notify(&self, topic: T) {
        self.signal(topic, &mut P::default());
    }
}

impl<T: Topic, P: 'static> Default for MessageBus<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum TestTopic {
        Ping,
        Pong,
    }

    type TestBus = MessageBus<TestTopic, Vec<&'static str>>;

    struct Recorder {
        name: &'static str,
        received: usize,
    }

    impl Recorder {
        fn shared(name: &'static str) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self { name, received: 0 }))
        }

        fn on_ping(&mut self, _bus: &TestBus, log: &mut Vec<&'static str>) {
            self.received += 1;
            log.push(self.name);
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let bus = TestBus::new();
        let a = Recorder::shared("a");
        let b = Recorder::shared("b");
        bus.subscribe(TestTopic::Ping, &a, Recorder::on_ping);
        bus.subscribe(TestTopic::Ping, &b, Recorder::on_ping);

        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert_eq!(log, vec!["a", "b"]);
    }

    #[test]
    fn test_signal_without_subscribers_is_noop() {
        let bus = TestBus::new();
        let log = bus.signal_with(TestTopic::Pong, vec!["x"]);
        assert_eq!(log, vec!["x"]);
    }

    #[test]
    fn test_subscribers_share_one_payload() {
        let bus = TestBus::new();
        bus.subscribe_fn(TestTopic::Ping, |_, log| log.push("write"));
        bus.subscribe_fn(TestTopic::Ping, |_, log| {
            assert_eq!(log.last(), Some(&"write"));
            log.push("read");
        });
        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert_eq!(log, vec!["write", "read"]);
    }

    #[test]
    fn test_dropped_target_is_never_invoked() {
        let bus = TestBus::new();
        let a = Recorder::shared("a");
        bus.subscribe(TestTopic::Ping, &a, Recorder::on_ping);
        drop(a);

        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert!(log.is_empty());
        // Expired subscription is purged by the next dispatch
        bus.notify(TestTopic::Ping);
        assert_eq!(bus.subscriber_count(TestTopic::Ping), 0);
    }

    #[test]
    fn test_nested_dispatch_is_depth_first() {
        let bus = TestBus::new();
        bus.subscribe_fn(TestTopic::Ping, |bus, log| {
            log.push("ping-1");
            bus.signal(TestTopic::Pong, log);
        });
        bus.subscribe_fn(TestTopic::Ping, |_, log| log.push("ping-2"));
        bus.subscribe_fn(TestTopic::Pong, |_, log| log.push("pong"));

        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert_eq!(log, vec!["ping-1", "pong", "ping-2"]);
    }

    #[test]
    fn test_self_unsubscribe_during_dispatch() {
        let bus = TestBus::new();
        let connection: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&connection);
        let registered = bus.subscribe_fn(TestTopic::Ping, move |_, log| {
            log.push("once");
            if let Some(connection) = handle.borrow().as_ref() {
                connection.disconnect();
            }
        });
        *connection.borrow_mut() = Some(registered);

        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        let log = bus.signal_with(TestTopic::Ping, log);
        assert_eq!(log, vec!["once"]);
    }

    #[test]
    fn test_subscription_added_during_dispatch_waits() {
        let bus = TestBus::new();
        bus.subscribe_fn(TestTopic::Ping, |bus, log| {
            log.push("outer");
            bus.subscribe_fn(TestTopic::Ping, |_, log| log.push("late"));
        });

        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert_eq!(log, vec!["outer"]);
        assert_eq!(bus.subscriber_count(TestTopic::Ping), 2);
    }

    #[test]
    fn test_reentrant_same_subscriber_is_skipped() {
        let bus = TestBus::new();
        bus.subscribe_fn(TestTopic::Ping, |bus, log| {
            log.push("ping");
            if log.len() < 3 {
                bus.signal(TestTopic::Ping, log);
            }
        });
        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert_eq!(log, vec!["ping"]);
    }

    #[test]
    fn test_connection_holder_releases_on_drop() {
        let bus = TestBus::new();
        let mut holder = ConnectionHolder::new();
        holder.add(bus.subscribe_fn(TestTopic::Ping, |_, log| log.push("held")));
        holder.add(bus.subscribe_fn(TestTopic::Pong, |_, log| log.push("held")));
        assert_eq!(holder.len(), 2);
        drop(holder);

        let log = bus.signal_with(TestTopic::Ping, Vec::new());
        assert!(log.is_empty());
        assert_eq!(bus.subscriber_count(TestTopic::Pong), 0);
    }

    #[test]
    fn test_connection_reports_disconnect() {
        let bus = TestBus::new();
        let a = Recorder::shared("a");
        let direct = bus.subscribe(TestTopic::Ping, &a, Recorder::on_ping);
        let held = bus.subscribe_fn(TestTopic::Pong, |_, log| log.push("held"));
        let observer = held.clone();
        assert!(direct.is_connected());
        assert!(observer.is_connected());

        direct.disconnect();
        assert!(!direct.is_connected());
        bus.notify(TestTopic::Ping);
        assert_eq!(a.borrow().received, 0);

        let mut holder = ConnectionHolder::new();
        holder.add(held);
        assert!(observer.is_connected());
        drop(holder);
        assert!(!observer.is_connected());
    }

    #[test]
    fn test_tracked_target_receives_every_signal() {
        let bus = TestBus::new();
        let a = Recorder::shared("a");
        let connection = bus.subscribe(TestTopic::Ping, &a, Recorder::on_ping);
        bus.notify(TestTopic::Ping);
        bus.notify(TestTopic::Ping);
        connection.disconnect();
        bus.notify(TestTopic::Ping);
        assert_eq!(a.borrow().received, 2);
    }
}
