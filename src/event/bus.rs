//! Typed publish/subscribe bus
//!
//! Handlers are registered per event kind. Each registration wraps the user
//! handler in a dispatch wrapper that logs the event before invoking it, and
//! records the wrapper under a [`HandlerToken`] so it can be removed again
//! without disturbing any other handler on the same kind.
//!
//! Dispatch iterates a snapshot of the subscriber list taken before the first
//! handler runs. Handlers may therefore register, remove, or emit on the same
//! bus without corrupting the delivery in progress.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// An event that can travel over an [`EventBus`]
pub trait BusEvent: fmt::Debug {
    /// Discriminant handlers subscribe to
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The kind of this event
    fn kind(&self) -> Self::Kind;

    /// Whether the event carries data beyond its kind
    ///
    /// Kind-only events are logged without their payload.
    fn has_payload(&self) -> bool {
        true
    }
}

/// Shared user handler
///
/// Registering the same `Handler` twice creates two independent records.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifies one registration on a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerToken(u64);

impl fmt::Display for HandlerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Result of a single `emit`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned normally
    pub delivered: usize,
    /// Handlers that panicked
    pub failed: usize,
}

impl DispatchReport {
    /// Total handlers invoked
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

struct Subscriber<E> {
    token: HandlerToken,
    once: bool,
    /// The handler as supplied by the caller, compared by identity in `off_handler`
    user: Handler<E>,
    /// Logging wrapper around `user`; this is what dispatch invokes
    wrapper: Handler<E>,
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            once: self.once,
            user: Arc::clone(&self.user),
            wrapper: Arc::clone(&self.wrapper),
        }
    }
}

struct Table<E: BusEvent> {
    subscribers: HashMap<E::Kind, Vec<Subscriber<E>>>,
    /// token -> kind it was registered for
    records: HashMap<HandlerToken, E::Kind>,
}

impl<E: BusEvent> Table<E> {
    fn remove_token(&mut self, kind: E::Kind, token: HandlerToken) -> bool {
        let Some(list) = self.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.token != token);
        let removed = list.len() != before;
        if list.is_empty() {
            self.subscribers.remove(&kind);
        }
        if removed {
            self.records.remove(&token);
        }
        removed
    }
}

/// Typed event dispatcher with token-keyed removal
pub struct EventBus<E: BusEvent> {
    /// Label included in dispatch log lines (e.g. "publisher")
    label: Arc<str>,
    next_token: AtomicU64,
    table: Mutex<Table<E>>,
}

impl<E: BusEvent + 'static> EventBus<E> {
    /// Create an empty bus
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
            next_token: AtomicU64::new(1),
            table: Mutex::new(Table {
                subscribers: HashMap::new(),
                records: HashMap::new(),
            }),
        }
    }

    /// Label used in log lines
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Register `handler` for every event of `kind`
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> HandlerToken
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(handler), false)
    }

    /// Register `handler` for the next event of `kind` only
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> HandlerToken
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(handler), true)
    }

    /// Register a shared handler so it can later be removed by reference
    pub fn on_handler(&self, kind: E::Kind, handler: Handler<E>) -> HandlerToken {
        self.register(kind, handler, false)
    }

    /// One-shot variant of [`on_handler`](Self::on_handler)
    pub fn once_handler(&self, kind: E::Kind, handler: Handler<E>) -> HandlerToken {
        self.register(kind, handler, true)
    }

    fn register(&self, kind: E::Kind, user: Handler<E>, once: bool) -> HandlerToken {
        let token = HandlerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let wrapper = self.wrap(kind, Arc::clone(&user));

        let mut table = self.table.lock();
        table.subscribers.entry(kind).or_default().push(Subscriber {
            token,
            once,
            user,
            wrapper,
        });
        table.records.insert(token, kind);

        tracing::trace!(bus = %self.label, kind = ?kind, token = %token, once, "Handler registered");
        token
    }

    fn wrap(&self, kind: E::Kind, user: Handler<E>) -> Handler<E> {
        let label = Arc::clone(&self.label);
        Arc::new(move |event: &E| {
            if event.has_payload() {
                tracing::debug!(bus = %label, kind = ?kind, ?event, "Event triggered");
            } else {
                tracing::debug!(bus = %label, kind = ?kind, "Event triggered");
            }
            user(event);
        })
    }

    /// Remove handlers from `kind`
    ///
    /// With `None` every handler for `kind` is removed. With a token only that
    /// registration is removed, and only if it was made for `kind`. Unknown
    /// tokens are ignored. Returns the number of registrations removed.
    pub fn off(&self, kind: E::Kind, token: Option<HandlerToken>) -> usize {
        let mut table = self.table.lock();
        match token {
            None => {
                let removed = table.subscribers.remove(&kind).unwrap_or_default();
                for sub in &removed {
                    table.records.remove(&sub.token);
                }
                removed.len()
            }
            Some(token) => {
                if table.records.get(&token) != Some(&kind) {
                    return 0;
                }
                usize::from(table.remove_token(kind, token))
            }
        }
    }

    /// Remove the most recent registration of `handler` for `kind`
    ///
    /// Handlers are compared by identity. Returns whether a record was removed.
    pub fn off_handler(&self, kind: E::Kind, handler: &Handler<E>) -> bool {
        let target = Arc::as_ptr(handler) as *const ();
        let mut table = self.table.lock();

        let token = table.subscribers.get(&kind).and_then(|list| {
            list.iter()
                .rev()
                .find(|s| Arc::as_ptr(&s.user) as *const () == target)
                .map(|s| s.token)
        });

        match token {
            Some(token) => table.remove_token(kind, token),
            None => false,
        }
    }

    /// Remove every handler for every kind
    pub fn off_all(&self) {
        let mut table = self.table.lock();
        table.subscribers.clear();
        table.records.clear();
    }

    /// Number of handlers registered for `kind`
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.table
            .lock()
            .subscribers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Check whether `token` is still registered
    pub fn is_registered(&self, token: HandlerToken) -> bool {
        self.table.lock().records.contains_key(&token)
    }

    /// Deliver `event` to every handler registered for its kind
    ///
    /// One-shot handlers are unregistered before they run, so a nested emit
    /// from inside a handler cannot invoke them a second time. A panicking
    /// handler is logged and counted; the remaining handlers still run.
    pub fn emit(&self, event: &E) -> DispatchReport {
        let kind = event.kind();
        let snapshot: Vec<Subscriber<E>> = {
            let mut table = self.table.lock();
            let Some(list) = table.subscribers.get_mut(&kind) else {
                tracing::trace!(bus = %self.label, kind = ?kind, "No handlers for event");
                return DispatchReport::default();
            };

            let snapshot = list.clone();
            list.retain(|s| !s.once);
            if list.is_empty() {
                table.subscribers.remove(&kind);
            }
            for sub in snapshot.iter().filter(|s| s.once) {
                table.records.remove(&sub.token);
            }
            snapshot
        };

        let mut report = DispatchReport::default();
        for sub in snapshot {
            let wrapper = sub.wrapper;
            match panic::catch_unwind(AssertUnwindSafe(|| wrapper(event))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.failed += 1;
                    tracing::error!(
                        bus = %self.label,
                        kind = ?kind,
                        token = %sub.token,
                        panic = panic_message(payload.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        report
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock();
        f.debug_struct("EventBus")
            .field("label", &self.label)
            .field("records", &table.records.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Foo,
        Bar,
    }

    #[derive(Debug)]
    struct Ping(Kind);

    impl BusEvent for Ping {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.0
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Ping) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &Ping| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_on_and_off_by_token() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();

        let token = bus.on(Kind::Foo, handler);
        bus.emit(&Ping(Kind::Foo));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert_eq!(bus.off(Kind::Foo, Some(token)), 1);
        let report = bus.emit(&Ping(Kind::Foo));

        assert_eq!(report.invoked(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.is_registered(token));
    }

    #[test]
    fn test_off_by_handler_reference() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();
        let handler: Handler<Ping> = Arc::new(handler);

        bus.on_handler(Kind::Foo, Arc::clone(&handler));
        assert!(bus.off_handler(Kind::Foo, &handler));
        bus.emit(&Ping(Kind::Foo));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        // Nothing left to remove
        assert!(!bus.off_handler(Kind::Foo, &handler));
    }

    #[test]
    fn test_same_handler_registered_twice() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();
        let handler: Handler<Ping> = Arc::new(handler);

        bus.on_handler(Kind::Foo, Arc::clone(&handler));
        bus.on_handler(Kind::Foo, Arc::clone(&handler));
        assert_eq!(bus.listener_count(Kind::Foo), 2);

        bus.emit(&Ping(Kind::Foo));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // Removal by reference drops exactly one record
        assert!(bus.off_handler(Kind::Foo, &handler));
        assert_eq!(bus.listener_count(Kind::Foo), 1);
    }

    #[test]
    fn test_same_handler_on_two_kinds() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();
        let handler: Handler<Ping> = Arc::new(handler);

        bus.on_handler(Kind::Foo, Arc::clone(&handler));
        bus.on_handler(Kind::Bar, Arc::clone(&handler));

        // Removing from Bar leaves the Foo registration alone
        assert!(bus.off_handler(Kind::Bar, &handler));
        bus.emit(&Ping(Kind::Foo));
        bus.emit(&Ping(Kind::Bar));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_token_for_wrong_kind_is_noop() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();

        let token = bus.on(Kind::Foo, handler);
        assert_eq!(bus.off(Kind::Bar, Some(token)), 0);

        bus.emit(&Ping(Kind::Foo));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_without_handler_removes_all() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (foo_count, foo_a) = counter();
        let (_, foo_b) = counter();
        let (bar_count, bar) = counter();

        bus.on(Kind::Foo, foo_a);
        bus.once(Kind::Foo, foo_b);
        bus.on(Kind::Bar, bar);

        assert_eq!(bus.off(Kind::Foo, None), 2);
        let report = bus.emit(&Ping(Kind::Foo));
        bus.emit(&Ping(Kind::Bar));

        assert_eq!(report.invoked(), 0);
        assert_eq!(foo_count.load(Ordering::SeqCst), 0);
        assert_eq!(bar_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();

        let token = bus.once(Kind::Foo, handler);
        for _ in 0..5 {
            bus.emit(&Ping(Kind::Foo));
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.is_registered(token));
        assert_eq!(bus.listener_count(Kind::Foo), 0);
    }

    #[test]
    fn test_once_with_reentrant_emit() {
        let bus = Arc::new(EventBus::<Ping>::new("test"));
        let count = Arc::new(AtomicUsize::new(0));

        let inner_bus = Arc::clone(&bus);
        let c = Arc::clone(&count);
        bus.once(Kind::Foo, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            inner_bus.emit(&Ping(Kind::Foo));
        });

        bus.emit(&Ping(Kind::Foo));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_removing_itself_during_emit() {
        let bus = Arc::new(EventBus::<Ping>::new("test"));
        let (count, handler) = counter();

        let inner_bus = Arc::clone(&bus);
        bus.on(Kind::Foo, move |_| {
            inner_bus.off(Kind::Foo, None);
        });
        bus.on(Kind::Foo, handler);

        // The snapshot still delivers to the second handler
        let report = bus.emit(&Ping(Kind::Foo));
        assert_eq!(report.delivered, 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bus.emit(&Ping(Kind::Foo));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_delivery() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();

        bus.on(Kind::Foo, |_| panic!("handler failure"));
        bus.on(Kind::Foo, handler);

        let report = bus.emit(&Ping(Kind::Foo));

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_all() {
        let bus: EventBus<Ping> = EventBus::new("test");
        let (count, handler) = counter();
        let (_, other) = counter();

        bus.on(Kind::Foo, handler);
        bus.on(Kind::Bar, other);
        bus.off_all();

        bus.emit(&Ping(Kind::Foo));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(Kind::Bar), 0);
    }
}
