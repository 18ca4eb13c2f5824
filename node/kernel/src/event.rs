//! Kernel event dispatch.
//!
//! This is the sole extension point for upper layers to observe connection,
//! routing, and transport activity without the core depending on them. Each
//! event kind holds at most one handler; installing over an existing handler
//! replaces it, and an event with no handler is dropped silently.

use picomesh_registry::{ConnId, Role};
use picomesh_wire::{DevAddr, Message};
use tracing::trace;

/// The fixed enumeration of kernel event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// This node opened a connection to a peer
    OutboundConnection,
    /// A peer opened a connection to this node
    InboundConnection,
    /// A live connection went away
    Disconnection,
    /// A control message addressed to this node arrived
    MessageReceived,
    /// The transport's scan timeout expired
    ScanComplete,
}

impl EventKind {
    /// Number of event kinds
    pub const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            EventKind::OutboundConnection => 0,
            EventKind::InboundConnection => 1,
            EventKind::Disconnection => 2,
            EventKind::MessageReceived => 3,
            EventKind::ScanComplete => 4,
        }
    }
}

/// Event payloads handed to installed callbacks
#[derive(Debug, Clone)]
pub enum Event {
    /// This node opened a connection
    OutboundConnection {
        /// The connected peer
        peer: DevAddr,
        /// Transport handle for the new link
        conn_id: ConnId,
    },
    /// A peer opened a connection to this node
    InboundConnection {
        /// The connecting peer
        peer: DevAddr,
        /// Transport handle for the new link
        conn_id: ConnId,
    },
    /// A live connection went away
    Disconnection {
        /// The departed peer
        peer: DevAddr,
        /// Handle of the dropped link
        conn_id: ConnId,
        /// Role this node had on the link
        role: Role,
    },
    /// A control message addressed to this node arrived
    MessageReceived {
        /// Neighbor the bytes came in from (not necessarily the originator)
        from: DevAddr,
        /// The decoded message
        message: Message,
    },
    /// The transport's scan timeout expired
    ScanComplete,
}

impl Event {
    /// The kind used to select a handler for this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::OutboundConnection { .. } => EventKind::OutboundConnection,
            Event::InboundConnection { .. } => EventKind::InboundConnection,
            Event::Disconnection { .. } => EventKind::Disconnection,
            Event::MessageReceived { .. } => EventKind::MessageReceived,
            Event::ScanComplete => EventKind::ScanComplete,
        }
    }
}

/// Callback invoked synchronously when its event kind is raised
pub type EventHandler = Box<dyn FnMut(&Event)>;

/// At most one handler per event kind
#[derive(Default)]
pub struct EventDispatcher {
    handlers: [Option<EventHandler>; EventKind::COUNT],
}

impl EventDispatcher {
    /// Create a dispatcher with no handlers installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler, replacing any existing one for the kind
    pub fn install(&mut self, kind: EventKind, handler: EventHandler) {
        trace!("installing callback for {:?}", kind);
        self.handlers[kind.index()] = Some(handler);
    }

    /// Remove the handler for a kind; a no-op when none is installed
    pub fn uninstall(&mut self, kind: EventKind) {
        trace!("uninstalling callback for {:?}", kind);
        self.handlers[kind.index()] = None;
    }

    /// Whether a handler is installed for the kind
    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers[kind.index()].is_some()
    }

    /// Invoke the handler for the event's kind, or drop the event silently
    pub fn dispatch(&mut self, event: &Event) {
        match &mut self.handlers[event.kind().index()] {
            Some(handler) => handler(event),
            None => trace!("no handler for {:?}, event dropped", event.kind()),
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let installed: Vec<usize> = self
            .handlers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.as_ref().map(|_| i))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("installed", &installed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_invokes_installed_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut dispatcher = EventDispatcher::new();
        dispatcher.install(
            EventKind::ScanComplete,
            Box::new(move |event| sink.borrow_mut().push(event.kind())),
        );

        dispatcher.dispatch(&Event::ScanComplete);
        dispatcher.dispatch(&Event::ScanComplete);
        assert_eq!(
            *seen.borrow(),
            vec![EventKind::ScanComplete, EventKind::ScanComplete]
        );
    }

    #[test]
    fn test_unhandled_event_is_dropped() {
        let mut dispatcher = EventDispatcher::new();
        // Nothing installed; must not panic
        dispatcher.dispatch(&Event::ScanComplete);
        assert!(!dispatcher.has_handler(EventKind::ScanComplete));
    }

    #[test]
    fn test_install_replaces_and_uninstall_clears() {
        let hits = Rc::new(RefCell::new((0u32, 0u32)));

        let first = Rc::clone(&hits);
        let mut dispatcher = EventDispatcher::new();
        dispatcher.install(
            EventKind::ScanComplete,
            Box::new(move |_| first.borrow_mut().0 += 1),
        );

        let second = Rc::clone(&hits);
        dispatcher.install(
            EventKind::ScanComplete,
            Box::new(move |_| second.borrow_mut().1 += 1),
        );

        dispatcher.dispatch(&Event::ScanComplete);
        assert_eq!(*hits.borrow(), (0, 1));

        dispatcher.uninstall(EventKind::ScanComplete);
        dispatcher.dispatch(&Event::ScanComplete);
        assert_eq!(*hits.borrow(), (0, 1));

        // Uninstalling again is a no-op
        dispatcher.uninstall(EventKind::ScanComplete);
    }
}
