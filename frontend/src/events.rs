//! Typed event bus.
//!
//! The interop contract between independently-mounted surfaces: named
//! topics carrying typed payloads, delivered synchronously within the
//! current tick. Topic names are part of the wire format and must not
//! change. The bus lives on the single UI thread, so callbacks may hold
//! non-`Send` state (component handles, DOM references).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use shared::ChartRecord;

/// Bus topics. [`Topic::name`] yields the exact contract string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// One saved-chart-like record was persisted; payload in the event.
    ChartsAppend,
    /// Source of truth changed; subscribers re-read their stores.
    ChartsRefresh,
    /// A session was established.
    AuthLoggedIn,
    /// Something needs the user to authenticate; show a login prompt.
    AuthOpenLogin,
}

impl Topic {
    pub fn name(self) -> &'static str {
        match self {
            Topic::ChartsAppend => "charts:append",
            Topic::ChartsRefresh => "charts:refresh",
            Topic::AuthLoggedIn => "auth:logged_in",
            Topic::AuthOpenLogin => "auth:open-login",
        }
    }
}

/// A published event with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    ChartsAppend(ChartRecord),
    ChartsRefresh,
    AuthLoggedIn,
    AuthOpenLogin,
}

impl AppEvent {
    pub fn topic(&self) -> Topic {
        match self {
            AppEvent::ChartsAppend(_) => Topic::ChartsAppend,
            AppEvent::ChartsRefresh => Topic::ChartsRefresh,
            AppEvent::AuthLoggedIn => Topic::AuthLoggedIn,
            AppEvent::AuthOpenLogin => Topic::AuthOpenLogin,
        }
    }
}

type Callback = Rc<dyn Fn(&AppEvent)>;

struct Subscriber {
    id: u64,
    topic: Topic,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Same-tab publish/subscribe. Cloning yields another handle onto the
/// same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one topic. The subscription stays active
    /// until [`Subscription::cancel`] is called.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&AppEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.subscribers.push(Subscriber {
            id,
            topic,
            callback: Rc::new(callback),
        });
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every subscriber of its topic, in subscription
    /// order. Callbacks run outside the registry borrow, so a subscriber
    /// may publish or subscribe re-entrantly; a subscriber cancelled
    /// during delivery can still receive the in-flight event.
    pub fn publish(&self, event: AppEvent) {
        let callbacks: Vec<Callback> = {
            let registry = self.registry.borrow();
            registry
                .subscribers
                .iter()
                .filter(|s| s.topic == event.topic())
                .map(|s| Rc::clone(&s.callback))
                .collect()
        };
        for callback in callbacks {
            callback(&event);
        }
    }
}

/// Handle for undoing a [`EventBus::subscribe`]. Dropping the handle
/// without calling [`Subscription::cancel`] leaves the subscription
/// active for the life of the bus.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn cancel(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .subscribers
                .retain(|s| s.id != self.id);
        }
    }
}
