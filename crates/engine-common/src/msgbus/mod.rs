//! A synchronous, in-process publish/subscribe dispatcher (§4.I).
//!
//! No cross-thread delivery, no persistence — this is purely the in-core substrate
//! described by §5's single-threaded cooperative model, not a networked message bus.

use std::collections::HashMap;

use log::warn;
use ustr::Ustr;

/// A subscriber's glob-style pattern (`*` matches any run of characters, `?` matches
/// exactly one) matched against published topics.
#[must_use]
pub fn is_matching(topic: &str, pattern: &str) -> bool {
    fn matches(topic: &[u8], pattern: &[u8]) -> bool {
        match (topic.first(), pattern.first()) {
            (_, Some(b'*')) => {
                matches(topic, &pattern[1..]) || (!topic.is_empty() && matches(&topic[1..], pattern))
            }
            (Some(_), Some(b'?')) => matches(&topic[1..], &pattern[1..]),
            (Some(t), Some(p)) if t == p => matches(&topic[1..], &pattern[1..]),
            (None, None) => true,
            _ => false,
        }
    }
    matches(topic.as_bytes(), pattern.as_bytes())
}

type Handler<M> = Box<dyn FnMut(&M)>;

/// A topic-pattern subscription with its registration order preserved for fan-out.
struct Subscription<M> {
    pattern: Ustr,
    handler: Handler<M>,
}

/// Topic-based pub/sub plus point-to-point endpoints, generic over one message type.
///
/// The backtest core only ever needs one concrete message envelope (`OrderEventAny`
/// plus a small number of data/command variants); callers compose a `MessageBus<M>`
/// per envelope type they need rather than this crate owning a single god-enum.
pub struct MessageBus<M> {
    subscriptions: Vec<Subscription<M>>,
    endpoints: HashMap<Ustr, Handler<M>>,
}

impl<M> Default for MessageBus<M> {
    fn default() -> Self {
        Self { subscriptions: Vec::new(), endpoints: HashMap::new() }
    }
}

impl<M> MessageBus<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, pattern: &str, handler: impl FnMut(&M) + 'static) {
        self.subscriptions.push(Subscription { pattern: Ustr::from(pattern), handler: Box::new(handler) });
    }

    pub fn unsubscribe(&mut self, pattern: &str) {
        let pattern = Ustr::from(pattern);
        self.subscriptions.retain(|s| s.pattern != pattern);
    }

    /// Invokes every subscriber whose pattern matches `topic`, in registration order.
    pub fn publish(&mut self, topic: &str, message: &M) {
        for sub in &mut self.subscriptions {
            if is_matching(topic, sub.pattern.as_str()) {
                (sub.handler)(message);
            }
        }
    }

    pub fn register(&mut self, endpoint: &str, handler: impl FnMut(&M) + 'static) {
        self.endpoints.insert(Ustr::from(endpoint), Box::new(handler));
    }

    pub fn deregister(&mut self, endpoint: &str) {
        self.endpoints.remove(&Ustr::from(endpoint));
    }

    /// Delivers `message` to exactly the handler registered at `endpoint`; a no-op
    /// (with a warning) if nothing is registered there.
    pub fn send(&mut self, endpoint: &str, message: &M) {
        let key = Ustr::from(endpoint);
        if let Some(handler) = self.endpoints.get_mut(&key) {
            handler(message);
        } else {
            warn!("no endpoint registered for '{endpoint}'");
        }
    }

    #[must_use]
    pub fn subscriptions_count(&self, pattern: &str) -> usize {
        let pattern = Ustr::from(pattern);
        self.subscriptions.iter().filter(|s| s.pattern == pattern).count()
    }
}

impl<M> std::fmt::Debug for MessageBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("endpoints", &self.endpoints.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn test_wildcard_matching() {
        assert!(is_matching("orders.filled.EURUSD", "orders.filled.*"));
        assert!(is_matching("orders.filled.EURUSD", "orders.*.EURUSD"));
        assert!(!is_matching("orders.filled.EURUSD", "positions.*"));
    }

    #[test]
    fn test_publish_delivers_in_registration_order() {
        let mut bus: MessageBus<i32> = MessageBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_a = Rc::clone(&seen);
        bus.subscribe("events.*", move |m| seen_a.borrow_mut().push(("a", *m)));
        let seen_b = Rc::clone(&seen);
        bus.subscribe("events.*", move |m| seen_b.borrow_mut().push(("b", *m)));

        bus.publish("events.order_filled", &42);
        assert_eq!(*seen.borrow(), vec![("a", 42), ("b", 42)]);
    }

    #[test]
    fn test_send_to_unregistered_endpoint_is_noop() {
        let mut bus: MessageBus<i32> = MessageBus::new();
        bus.send("nowhere", &1); // should not panic
    }
}
