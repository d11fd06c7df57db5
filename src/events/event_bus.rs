//! Per-entity, synchronous event bus.
//!
//! Every stateful entity (named value, element, segment, board) owns one
//! [`EventBus`] for its own event type. Handlers run synchronously, in
//! registration order, on the thread that performed the mutation.
//!
//! # Re-entrancy
//!
//! Dispatch happens only after the mutating call has committed its state
//! change. Handlers receive a shared reference to the payload and cannot
//! reach back into the emitting entity; code that wants to react to an event
//! by calling `accept`/`release` (or `add_record`/`remove_record`) must queue
//! that work and apply it after the current call returns.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::base_event::BaseEvent;

// ---------------------------------------------------------------------------
// Handler types
// ---------------------------------------------------------------------------

/// A synchronous event handler.
pub type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// Ticket returned by [`EventBus::on`] and [`EventBus::on_all`]; pass it to
/// [`EventBus::off`] to unsubscribe. Tickets are unique process-wide, so one
/// from another bus never removes a handler here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId {
    ticket: u64,
    name: String,
}

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

impl HandlerId {
    fn issue(name: impl Into<String>) -> Self {
        Self {
            ticket: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    /// Label given at subscription time, for logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Internal handler entry
// ---------------------------------------------------------------------------

struct HandlerEntry<E> {
    id: HandlerId,
    /// `None` subscribes to every event kind.
    event_type: Option<&'static str>,
    handler: Handler<E>,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Callback list for events of type `E`.
pub struct EventBus<E: BaseEvent> {
    handlers: Vec<HandlerEntry<E>>,
}

impl<E: BaseEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BaseEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&HandlerId> = self.handlers.iter().map(|h| &h.id).collect();
        f.debug_struct("EventBus").field("handlers", &ids).finish()
    }
}

impl<E: BaseEvent> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a handler for one event kind.
    ///
    /// Returns the [`HandlerId`] that can later be passed to [`off`](Self::off).
    pub fn on(
        &mut self,
        event_type: &'static str,
        name: impl Into<String>,
        handler: impl FnMut(&E) + Send + 'static,
    ) -> HandlerId {
        self.register(Some(event_type), name, Box::new(handler))
    }

    /// Register a handler for every event kind.
    pub fn on_all(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&E) + Send + 'static,
    ) -> HandlerId {
        self.register(None, name, Box::new(handler))
    }

    fn register(
        &mut self,
        event_type: Option<&'static str>,
        name: impl Into<String>,
        handler: Handler<E>,
    ) -> HandlerId {
        let id = HandlerId::issue(name);
        self.handlers.push(HandlerEntry {
            id: id.clone(),
            event_type,
            handler,
        });
        id
    }

    /// Unregister a handler by its [`HandlerId`].
    ///
    /// Returns `true` if a handler was removed.
    pub fn off(&mut self, handler_id: &HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|e| e.id != *handler_id);
        self.handlers.len() != before
    }

    /// Drop every registered handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    // -----------------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------------

    /// Dispatch `event` to every matching handler in registration order.
    ///
    /// A panicking handler is logged and skipped; the remaining handlers
    /// still run.
    pub fn emit(&mut self, event: &E) {
        let event_type = event.event_type();
        for entry in self.handlers.iter_mut() {
            if entry.event_type.is_some_and(|t| t != event_type) {
                continue;
            }
            let handler = &mut entry.handler;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(event);
            }));
            if let Err(e) = result {
                log::error!("[EventBus] Handler {:?} panicked: {:?}", entry.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    enum Ping {
        Loud(u32),
        Quiet,
    }

    impl BaseEvent for Ping {
        fn event_type(&self) -> &'static str {
            match self {
                Ping::Loud(_) => "loud",
                Ping::Quiet => "quiet",
            }
        }
    }

    #[test]
    fn test_on_filters_by_event_type() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus: EventBus<Ping> = EventBus::new();
        let sink = seen.clone();
        bus.on("loud", "loud-only", move |e| {
            if let Ping::Loud(n) = e {
                sink.lock().unwrap().push(*n);
            }
        });

        bus.emit(&Ping::Quiet);
        bus.emit(&Ping::Loud(3));
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_on_all_and_off() {
        let count = Arc::new(Mutex::new(0));
        let mut bus: EventBus<Ping> = EventBus::new();
        let c = count.clone();
        let id = bus.on_all("counter", move |_| *c.lock().unwrap() += 1);

        bus.emit(&Ping::Quiet);
        bus.emit(&Ping::Loud(1));
        assert!(bus.off(&id));
        assert!(!bus.off(&id));
        bus.emit(&Ping::Quiet);

        assert_eq!(*count.lock().unwrap(), 2);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let count = Arc::new(Mutex::new(0));
        let mut bus: EventBus<Ping> = EventBus::new();
        bus.on_all("boom", |_| panic!("handler failure"));
        let c = count.clone();
        bus.on_all("after", move |_| *c.lock().unwrap() += 1);

        bus.emit(&Ping::Quiet);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_tickets_from_another_bus_do_not_unsubscribe() {
        let mut first: EventBus<Ping> = EventBus::new();
        let mut second: EventBus<Ping> = EventBus::new();
        let a = first.on_all("same-name", |_| {});
        let b = second.on_all("same-name", |_| {});
        assert_ne!(a, b);
        assert_eq!(a.name(), "same-name");

        assert!(!second.off(&a));
        assert_eq!(second.len(), 1);
        assert!(first.off(&a));
    }
}
