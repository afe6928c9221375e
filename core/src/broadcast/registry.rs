use crate::diagnostics::log::LogManager;
use crate::prelude::RelayResult;
use crate::wire::PositionEstimate;
use serde::Serialize;

/// Transport-assigned identity of a display connection.
pub type ConnectionId = u64;

/// A display client as the registry sees it.
///
/// Implementations must not block in `deliver`; the transport is expected to
/// queue the estimate and return.
pub trait DisplayConnection {
    fn id(&self) -> ConnectionId;
    fn is_connected(&self) -> bool;
    fn deliver(&self, estimate: &PositionEstimate) -> RelayResult<()>;
}

/// Outcome counts for one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Ordered set of registered display connections.
///
/// Only connections announcing `role` are kept. Entries leave solely through
/// [`ClientRegistry::deregister`]; a failed or skipped delivery never removes
/// one.
pub struct ClientRegistry<C> {
    clients: Vec<C>,
    role: String,
    logger: LogManager,
}

impl<C: DisplayConnection> ClientRegistry<C> {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            clients: Vec::new(),
            role: role.into(),
            logger: LogManager::new("registry"),
        }
    }

    /// Adds `connection` when `role` matches. Returns whether it was added.
    pub fn register(&mut self, connection: C, role: &str) -> bool {
        if role != self.role {
            self.logger.detail(&format!(
                "ignoring connection {} with role {:?}",
                connection.id(),
                role
            ));
            return false;
        }
        let id = connection.id();
        if self.contains(id) {
            self.logger
                .warn(&format!("connection {} already registered", id));
            return false;
        }
        self.clients.push(connection);
        self.logger.record(&format!(
            "display client {} registered ({} total)",
            id,
            self.clients.len()
        ));
        true
    }

    /// Removes the connection with `id`; unknown ids are a no-op.
    pub fn deregister(&mut self, id: ConnectionId) -> bool {
        match self.clients.iter().position(|client| client.id() == id) {
            Some(index) => {
                self.clients.remove(index);
                self.logger.record(&format!(
                    "display client {} removed ({} remaining)",
                    id,
                    self.clients.len()
                ));
                true
            }
            None => false,
        }
    }

    /// Delivers `estimate` to every connected client in registration order.
    pub fn publish(&self, estimate: &PositionEstimate) -> PublishSummary {
        let mut summary = PublishSummary::default();
        for client in &self.clients {
            if !client.is_connected() {
                summary.skipped += 1;
                continue;
            }
            match client.deliver(estimate) {
                Ok(()) => summary.delivered += 1,
                Err(err) => {
                    summary.failed += 1;
                    self.logger
                        .detail(&format!("client {} missed estimate: {}", client.id(), err));
                }
            }
        }
        summary
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients.iter().any(|client| client.id() == id)
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.clients.iter().map(|client| client.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::RelayError;
    use crate::wire::{Anchor, AnchorPair};
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const ROLE: &str = "react_native";

    #[derive(Clone)]
    struct RecordingClient {
        id: ConnectionId,
        connected: Rc<Cell<bool>>,
        failing: bool,
        received: Rc<RefCell<Vec<PositionEstimate>>>,
    }

    impl RecordingClient {
        fn new(id: ConnectionId) -> Self {
            Self {
                id,
                connected: Rc::new(Cell::new(true)),
                failing: false,
                received: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl DisplayConnection for RecordingClient {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn is_connected(&self) -> bool {
            self.connected.get()
        }

        fn deliver(&self, estimate: &PositionEstimate) -> RelayResult<()> {
            if self.failing {
                return Err(RelayError::Delivery("socket gone".into()));
            }
            self.received.borrow_mut().push(estimate.clone());
            Ok(())
        }
    }

    fn estimate() -> PositionEstimate {
        PositionEstimate {
            x: 2.5,
            y: 1.0,
            obstacle_distance: json!(30),
            anchors: AnchorPair::new(Anchor::new(0.0, 0.0), Anchor::new(5.0, 0.0)).unwrap(),
        }
    }

    #[test]
    fn only_matching_role_registers() {
        let mut registry = ClientRegistry::new(ROLE);
        assert!(!registry.register(RecordingClient::new(1), "object_detect"));
        assert!(registry.register(RecordingClient::new(2), ROLE));
        assert_eq!(registry.ids(), vec![2]);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut registry = ClientRegistry::new(ROLE);
        assert!(registry.register(RecordingClient::new(7), ROLE));
        assert!(!registry.register(RecordingClient::new(7), ROLE));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_unknown_is_noop() {
        let mut registry = ClientRegistry::new(ROLE);
        registry.register(RecordingClient::new(1), ROLE);
        assert!(!registry.deregister(99));
        assert!(registry.deregister(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn publish_skips_disconnected_without_removing() {
        let mut registry = ClientRegistry::new(ROLE);
        let clients: Vec<RecordingClient> = (1..=3).map(RecordingClient::new).collect();
        for client in &clients {
            registry.register(client.clone(), ROLE);
        }
        clients[1].connected.set(false);

        let sent = estimate();
        let summary = registry.publish(&sent);

        assert_eq!(
            summary,
            PublishSummary {
                delivered: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(*clients[0].received.borrow(), vec![sent.clone()]);
        assert!(clients[1].received.borrow().is_empty());
        assert_eq!(*clients[2].received.borrow(), vec![sent]);
        assert_eq!(registry.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn failed_delivery_does_not_stop_fan_out() {
        let mut registry = ClientRegistry::new(ROLE);
        let mut broken = RecordingClient::new(1);
        broken.failing = true;
        let healthy = RecordingClient::new(2);
        registry.register(broken, ROLE);
        registry.register(healthy.clone(), ROLE);

        let summary = registry.publish(&estimate());
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.delivered, 1);
        assert_eq!(healthy.received.borrow().len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn delivery_follows_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));

        struct OrderedClient {
            id: ConnectionId,
            order: Rc<RefCell<Vec<ConnectionId>>>,
        }

        impl DisplayConnection for OrderedClient {
            fn id(&self) -> ConnectionId {
                self.id
            }
            fn is_connected(&self) -> bool {
                true
            }
            fn deliver(&self, _: &PositionEstimate) -> RelayResult<()> {
                self.order.borrow_mut().push(self.id);
                Ok(())
            }
        }

        let mut registry = ClientRegistry::new(ROLE);
        for id in [5, 3, 9] {
            registry.register(
                OrderedClient {
                    id,
                    order: order.clone(),
                },
                ROLE,
            );
        }
        registry.publish(&estimate());
        assert_eq!(*order.borrow(), vec![5, 3, 9]);
    }
}
