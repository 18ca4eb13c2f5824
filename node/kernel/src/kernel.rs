//! The per-node kernel facade.

use std::time::Duration;

use picomesh_registry::{ConnId, ConnectionRegistry, RegistryError, Resolved, Role};
use picomesh_routing::{RoutingTable, UpdatePolicy};
use picomesh_wire::{
    DevAddr, DiscoveryRequest, DiscoveryResponse, Message, Ping, RouteEntry, RouteFlags,
    RouteUpdate, DEFAULT_MAX_HOPS, DISCOVERY_ENTRIES_MAX, UPDATE_ENTRIES_MAX,
};
use tracing::{debug, info, warn};

use crate::event::{Event, EventDispatcher, EventHandler, EventKind};
use crate::radio::RadioState;
use crate::transport::Transport;
use crate::KernelError;

/// Tunables fixed at kernel construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Bound on client-role connections
    pub client_capacity: usize,
    /// Bound on server-role connections
    pub server_capacity: usize,
    /// Flood bound applied when relaying
    pub max_hops: u8,
    /// Routing table upsert policy
    pub update_policy: UpdatePolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            client_capacity: picomesh_registry::DEFAULT_CLIENT_CAPACITY,
            server_capacity: picomesh_registry::DEFAULT_SERVER_CAPACITY,
            max_hops: DEFAULT_MAX_HOPS,
            update_policy: UpdatePolicy::default(),
        }
    }
}

/// One node's core state: routing table, connection registry, radio mode,
/// event handlers, and the transport they all drive.
///
/// Created once at node startup and owned by the node's driver; all mutation
/// happens through these methods on the node's control-flow thread.
pub struct MeshKernel<T: Transport> {
    transport: T,
    own_addr: DevAddr,
    routes: RoutingTable,
    registry: ConnectionRegistry,
    radio: RadioState,
    events: EventDispatcher,
    seq: u8,
    max_hops: u8,
}

impl<T: Transport> MeshKernel<T> {
    /// Create a kernel with default tunables
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, KernelConfig::default())
    }

    /// Create a kernel with explicit tunables
    pub fn with_config(transport: T, config: KernelConfig) -> Self {
        let own_addr = transport.own_addr();
        info!("kernel starting for node {}", own_addr);
        Self {
            transport,
            own_addr,
            routes: RoutingTable::with_policy(config.update_policy),
            registry: ConnectionRegistry::new(config.client_capacity, config.server_capacity),
            radio: RadioState::new(),
            events: EventDispatcher::new(),
            seq: 0,
            max_hops: config.max_hops,
        }
    }

    /// This node's device address
    pub fn own_addr(&self) -> DevAddr {
        self.own_addr
    }

    /// The node's routing table
    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Mutable access to the routing table
    pub fn routes_mut(&mut self) -> &mut RoutingTable {
        &mut self.routes
    }

    /// Live client-role connections
    pub fn outgoing_count(&self) -> usize {
        self.registry.outgoing_count()
    }

    /// Live server-role connections
    pub fn incoming_count(&self) -> usize {
        self.registry.incoming_count()
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Install a callback for an event kind, replacing any existing one
    pub fn install_callback(&mut self, kind: EventKind, handler: EventHandler) {
        self.events.install(kind, handler);
    }

    /// Remove the callback for an event kind
    pub fn uninstall_callback(&mut self, kind: EventKind) {
        self.events.uninstall(kind);
    }

    /// Next per-node message sequence number (wrapping)
    pub fn next_seq(&mut self) -> u8 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }

    // --- Connection management -------------------------------------------

    /// Open a client-role connection toward a peer and register it
    pub fn connect_to(&mut self, addr: DevAddr) -> Result<ConnId, KernelError> {
        let conn_id = self.transport.connect(addr)?;
        if let Err(err) = self.registry.record_outgoing(addr, conn_id) {
            self.transport.disconnect(conn_id);
            return Err(err.into());
        }
        self.routes
            .insert(RouteEntry::new(addr, addr, 1, RouteFlags::REACHABLE));
        self.events.dispatch(&Event::OutboundConnection {
            peer: addr,
            conn_id,
        });
        Ok(conn_id)
    }

    /// A peer opened a server-role connection toward this node
    pub fn on_inbound_connection(
        &mut self,
        addr: DevAddr,
        conn_id: ConnId,
    ) -> Result<(), KernelError> {
        self.registry.record_incoming(addr, conn_id)?;
        self.routes
            .insert(RouteEntry::new(addr, addr, 1, RouteFlags::REACHABLE));
        self.events.dispatch(&Event::InboundConnection {
            peer: addr,
            conn_id,
        });
        Ok(())
    }

    /// A connection went away; drop its slot and its direct route
    pub fn on_disconnect(&mut self, conn_id: ConnId) -> Result<(), KernelError> {
        let (peer, role) = self.registry.remove_by_conn_id(conn_id)?;
        // Multi-hop entries through the departed peer are corrected by
        // later updates, not guessed at here.
        let had_direct = self.routes.get(peer).map(|e| e.is_direct()).unwrap_or(false);
        if had_direct {
            let _ = self.routes.remove(peer);
        }
        self.events.dispatch(&Event::Disconnection {
            peer,
            conn_id,
            role,
        });
        Ok(())
    }

    // --- Send path --------------------------------------------------------

    /// Send raw bytes to a live peer, as a write or a notification depending
    /// on which role this node holds on the link
    pub fn send_payload(&mut self, addr: DevAddr, bytes: &[u8]) -> Result<(), KernelError> {
        let resolved = self.registry.resolve(addr)?;
        debug!(
            "send_payload to {}: {} bytes as {:?} on conn {}",
            addr,
            bytes.len(),
            resolved.role,
            resolved.conn_id
        );
        self.send_resolved(resolved, bytes)
    }

    /// Serialize a message and send it toward its destination.
    ///
    /// A broadcast destination fans out to every live peer. Otherwise the
    /// destination is tried as a direct peer first, then through the routing
    /// table's next hop.
    pub fn send_message(&mut self, message: &Message) -> Result<(), KernelError> {
        let bytes = message.serialize()?;
        let dest = message.header().dest;

        if dest.is_broadcast() {
            for (addr, resolved) in self.registry.peers() {
                if let Err(err) = self.send_resolved(resolved, &bytes) {
                    warn!("broadcast to {} failed: {}", addr, err);
                }
            }
            return Ok(());
        }

        let resolved = match self.registry.resolve(dest) {
            Ok(resolved) => resolved,
            Err(_) => {
                let next_hop = self.routes.get(dest)?.next_hop;
                self.registry.resolve(next_hop)?
            }
        };
        self.send_resolved(resolved, &bytes)
    }

    fn send_resolved(&mut self, resolved: Resolved, bytes: &[u8]) -> Result<(), KernelError> {
        match resolved.role {
            Role::Client => self.transport.write(resolved.conn_id, bytes)?,
            Role::Server => self.transport.notify(resolved.conn_id, bytes)?,
        }
        Ok(())
    }

    /// Ask every neighbor for its routing table
    pub fn broadcast_discovery(&mut self) -> Result<(), KernelError> {
        let seq = self.next_seq();
        let mut message =
            Message::DiscoveryRequest(DiscoveryRequest::new(self.own_addr, self.own_addr, seq));
        message.set_broadcast();
        self.send_message(&message)
    }

    /// Push this node's routing table to every neighbor as a route update
    pub fn broadcast_update(&mut self) -> Result<(), KernelError> {
        let all = self.routes.export();
        let count = all.len().min(UPDATE_ENTRIES_MAX);
        let seq = self.next_seq();
        let mut message = Message::Update(RouteUpdate::new(
            self.own_addr,
            self.own_addr,
            seq,
            &all[..count],
        )?);
        message.set_broadcast();
        self.send_message(&message)
    }

    /// Probe a peer's liveness
    pub fn ping(&mut self, addr: DevAddr) -> Result<(), KernelError> {
        let seq = self.next_seq();
        let message = Message::Ping(Ping::new(addr, self.own_addr, seq, false));
        self.send_message(&message)
    }

    // --- Inbound pipeline -------------------------------------------------

    /// Bytes arrived on a live connection.
    ///
    /// Messages for this node (or broadcast) are absorbed and raised as a
    /// [`EventKind::MessageReceived`] event; messages for other nodes are
    /// relayed through the routing table, respecting the flood bound.
    pub fn on_data(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), KernelError> {
        let (from, _) = self
            .registry
            .peer_of(conn_id)
            .ok_or(RegistryError::NotFound(conn_id))?;
        let message = Message::decode(bytes)?;
        let header = *message.header();
        debug!(
            "received {:?} from {} (src {}, dest {}, hops {})",
            header.msg_type, from, header.src, header.dest, header.hops
        );

        if header.dest != self.own_addr && !header.is_broadcast() {
            return self.relay(message);
        }

        self.absorb(from, &message)?;
        self.events.dispatch(&Event::MessageReceived { from, message });
        Ok(())
    }

    /// The transport's scan timeout expired
    pub fn on_scan_complete(&mut self) {
        self.radio.scan_complete();
        self.events.dispatch(&Event::ScanComplete);
    }

    /// Protocol-level reactions to an absorbed message
    fn absorb(&mut self, from: DevAddr, message: &Message) -> Result<(), KernelError> {
        match message {
            Message::DiscoveryRequest(req) => {
                let all = self.routes.export();
                let count = all.len().min(DISCOVERY_ENTRIES_MAX);
                let seq = self.next_seq();
                let reply =
                    DiscoveryResponse::new(req.header.src, self.own_addr, seq, &all[..count])?;
                self.send_message(&Message::DiscoveryResponse(reply))?;
            }
            Message::DiscoveryResponse(m) => self.merge_entries(from, &m.entries),
            Message::Update(m) => self.merge_entries(from, &m.entries),
            // The sync digest is opaque at this layer; reconciliation policy
            // lives above the kernel.
            Message::Sync(_) => {}
            Message::Ping(p) if !p.pong => {
                let seq = self.next_seq();
                let pong = Ping::new(p.header.src, self.own_addr, seq, true);
                self.send_message(&Message::Ping(pong))?;
            }
            Message::Ping(_) => {}
        }
        Ok(())
    }

    /// Distance-vector absorption: routes advertised by a neighbor become
    /// routes through that neighbor, one hop further out.
    fn merge_entries(&mut self, from: DevAddr, entries: &[RouteEntry]) {
        for entry in entries {
            if entry.target == self.own_addr {
                continue;
            }
            let learned = RouteEntry::new(
                entry.target,
                from,
                entry.hop_count.saturating_add(1),
                entry.flags,
            );
            self.routes.insert(learned);
        }
    }

    /// Forward a message addressed to another node
    fn relay(&mut self, mut message: Message) -> Result<(), KernelError> {
        match message.header_mut().bump_hops(self.max_hops) {
            Ok(()) => self.send_message(&message),
            Err(err) => {
                warn!(
                    "dropping message from {} for {}: {}",
                    message.header().src,
                    message.header().dest,
                    err
                );
                Ok(())
            }
        }
    }

    // --- Radio mode -------------------------------------------------------

    /// Start scanning for peers; reverts to idle when the transport signals
    /// timeout expiry via [`MeshKernel::on_scan_complete`]
    pub fn scan_environment(&mut self, timeout: Duration) -> Result<(), KernelError> {
        self.radio.start_scanning()?;
        info!("scanning environment for {:?}", timeout);
        self.transport.scan(timeout);
        Ok(())
    }

    /// Stop an ongoing scan before its timeout
    pub fn stop_scan(&mut self) -> Result<(), KernelError> {
        self.radio.stop_scanning()?;
        self.transport.stop_scan();
        Ok(())
    }

    /// Start advertising this node
    pub fn start_advertising(&mut self) -> Result<(), KernelError> {
        self.radio.start_advertising()?;
        info!("advertising started");
        self.transport.advertise();
        Ok(())
    }

    /// Stop advertising
    pub fn stop_advertising(&mut self) -> Result<(), KernelError> {
        self.radio.stop_advertising()?;
        self.transport.stop_advertise();
        Ok(())
    }

    /// Whether the radio is scanning
    pub fn is_scanning(&self) -> bool {
        self.radio.is_scanning()
    }

    /// Whether the radio is advertising
    pub fn is_advertising(&self) -> bool {
        self.radio.is_advertising()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    /// Scripted transport that records every primitive call
    struct MockTransport {
        own: DevAddr,
        next_conn: ConnId,
        fail_connect: bool,
        writes: Vec<(ConnId, Vec<u8>)>,
        notifies: Vec<(ConnId, Vec<u8>)>,
        disconnects: Vec<ConnId>,
        scans: usize,
        stop_scans: usize,
        advertises: usize,
        stop_advertises: usize,
    }

    impl MockTransport {
        fn new(last: u8) -> Self {
            Self {
                own: addr(last),
                next_conn: 1,
                fail_connect: false,
                writes: Vec::new(),
                notifies: Vec::new(),
                disconnects: Vec::new(),
                scans: 0,
                stop_scans: 0,
                advertises: 0,
                stop_advertises: 0,
            }
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.writes
                .iter()
                .chain(self.notifies.iter())
                .map(|(_, bytes)| bytes.clone())
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn connect(&mut self, addr: DevAddr) -> Result<ConnId, TransportError> {
            if self.fail_connect {
                return Err(TransportError::ConnectFailed(addr));
            }
            let conn_id = self.next_conn;
            self.next_conn += 1;
            Ok(conn_id)
        }

        fn disconnect(&mut self, conn_id: ConnId) {
            self.disconnects.push(conn_id);
        }

        fn write(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), TransportError> {
            self.writes.push((conn_id, bytes.to_vec()));
            Ok(())
        }

        fn notify(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), TransportError> {
            self.notifies.push((conn_id, bytes.to_vec()));
            Ok(())
        }

        fn scan(&mut self, _timeout: Duration) {
            self.scans += 1;
        }

        fn stop_scan(&mut self) {
            self.stop_scans += 1;
        }

        fn advertise(&mut self) {
            self.advertises += 1;
        }

        fn stop_advertise(&mut self) {
            self.stop_advertises += 1;
        }

        fn own_addr(&self) -> DevAddr {
            self.own
        }
    }

    fn addr(last: u8) -> DevAddr {
        DevAddr::new([0x01, 0x02, 0x03, 0x04, 0x05, last])
    }

    fn kernel(last: u8) -> MeshKernel<MockTransport> {
        MeshKernel::new(MockTransport::new(last))
    }

    #[test]
    fn test_connect_records_peer_and_direct_route() {
        let mut node = kernel(1);
        let conn_id = node.connect_to(addr(2)).unwrap();

        assert_eq!(node.outgoing_count(), 1);
        let route = *node.routes().get(addr(2)).unwrap();
        assert!(route.is_direct());
        assert_eq!(route.hop_count, 1);
        assert!(route.flags.contains(RouteFlags::REACHABLE));

        // Reconnecting the same peer rolls the new connection back
        assert!(matches!(
            node.connect_to(addr(2)),
            Err(KernelError::Registry(RegistryError::DuplicateAddress(_)))
        ));
        assert_eq!(node.transport().disconnects.len(), 1);
        assert_ne!(node.transport().disconnects[0], conn_id);
    }

    #[test]
    fn test_send_payload_write_vs_notify() {
        let mut node = kernel(1);
        node.connect_to(addr(2)).unwrap();
        node.on_inbound_connection(addr(3), 30).unwrap();

        node.send_payload(addr(2), b"to-client-peer").unwrap();
        node.send_payload(addr(3), b"to-server-peer").unwrap();

        assert_eq!(node.transport().writes.len(), 1);
        assert_eq!(node.transport().writes[0].1, b"to-client-peer");
        assert_eq!(node.transport().notifies.len(), 1);
        assert_eq!(node.transport().notifies[0].0, 30);

        assert!(matches!(
            node.send_payload(addr(9), b"nope"),
            Err(KernelError::Registry(RegistryError::UnknownAddress(_)))
        ));
    }

    #[test]
    fn test_disconnect_then_resolve_fails() {
        let mut node = kernel(1);
        let conn_id = node.connect_to(addr(2)).unwrap();
        node.send_payload(addr(2), b"x").unwrap();

        node.on_disconnect(conn_id).unwrap();
        assert_eq!(node.outgoing_count(), 0);
        assert!(!node.routes().contains(addr(2)));
        assert!(matches!(
            node.send_payload(addr(2), b"x"),
            Err(KernelError::Registry(RegistryError::UnknownAddress(_)))
        ));
    }

    #[test]
    fn test_discovery_response_merges_routes() {
        let mut node = kernel(1);
        node.connect_to(addr(2)).unwrap();

        // Peer 2 advertises a route to node 4, two hops away from it
        let advertised = RouteEntry::new(addr(4), addr(3), 2, RouteFlags::REACHABLE);
        let response =
            DiscoveryResponse::new(addr(1), addr(2), 0, std::slice::from_ref(&advertised))
                .unwrap();
        let bytes = Message::DiscoveryResponse(response).serialize().unwrap();

        let conn_id = node.registry.resolve(addr(2)).unwrap().conn_id;
        node.on_data(conn_id, &bytes).unwrap();

        let learned = *node.routes().get(addr(4)).unwrap();
        assert_eq!(learned.next_hop, addr(2));
        assert_eq!(learned.hop_count, 3);
    }

    #[test]
    fn test_merge_skips_routes_to_self() {
        let mut node = kernel(1);
        node.connect_to(addr(2)).unwrap();

        let about_me = RouteEntry::new(addr(1), addr(2), 1, RouteFlags::REACHABLE);
        let update = RouteUpdate::new(addr(1), addr(2), 0, &[about_me]).unwrap();
        let bytes = Message::Update(update).serialize().unwrap();

        let conn_id = node.registry.resolve(addr(2)).unwrap().conn_id;
        node.on_data(conn_id, &bytes).unwrap();

        // Only the direct route to peer 2 exists; nothing learned about self
        assert_eq!(node.routes().len(), 1);
        assert!(node.routes().contains(addr(2)));
    }

    #[test]
    fn test_discovery_request_answered_with_table() {
        let mut node = kernel(1);
        node.on_inbound_connection(addr(2), 20).unwrap();

        let request = DiscoveryRequest::new(addr(1), addr(2), 5);
        let bytes = Message::DiscoveryRequest(request).serialize().unwrap();
        node.on_data(20, &bytes).unwrap();

        // Reply went back over the server-role link as a notification
        assert_eq!(node.transport().notifies.len(), 1);
        let reply = Message::decode(&node.transport().notifies[0].1).unwrap();
        match reply {
            Message::DiscoveryResponse(m) => {
                assert_eq!(m.header.dest, addr(2));
                assert_eq!(m.header.src, addr(1));
                // The direct route to the requester itself
                assert_eq!(m.entries.len(), 1);
                assert_eq!(m.entries[0].target, addr(2));
            }
            other => panic!("expected discovery response, got {:?}", other),
        }
    }

    #[test]
    fn test_ping_is_answered_with_pong() {
        let mut node = kernel(1);
        node.connect_to(addr(2)).unwrap();
        let conn_id = node.registry.resolve(addr(2)).unwrap().conn_id;

        let probe = Message::Ping(Ping::new(addr(1), addr(2), 9, false));
        node.on_data(conn_id, &probe.serialize().unwrap()).unwrap();

        assert_eq!(node.transport().writes.len(), 1);
        match Message::decode(&node.transport().writes[0].1).unwrap() {
            Message::Ping(p) => {
                assert!(p.pong);
                assert_eq!(p.header.dest, addr(2));
            }
            other => panic!("expected ping, got {:?}", other),
        }

        // A pong must not be answered again
        let pong = Message::Ping(Ping::new(addr(1), addr(2), 10, true));
        node.on_data(conn_id, &pong.serialize().unwrap()).unwrap();
        assert_eq!(node.transport().writes.len(), 1);
    }

    #[test]
    fn test_relay_forwards_with_bumped_hops() {
        let mut node = kernel(1);
        node.connect_to(addr(2)).unwrap();
        node.on_inbound_connection(addr(3), 30).unwrap();

        // Route to 5 goes through peer 2
        node.routes_mut()
            .insert(RouteEntry::new(addr(5), addr(2), 2, RouteFlags::REACHABLE));

        // Node 3 sends something for node 5
        let mut probe = Ping::new(addr(5), addr(3), 0, false);
        probe.header.hops = 1;
        node.on_data(30, &Message::Ping(probe).serialize().unwrap())
            .unwrap();

        assert_eq!(node.transport().writes.len(), 1);
        let forwarded = Message::decode(&node.transport().writes[0].1).unwrap();
        assert_eq!(forwarded.header().hops, 2);
        assert_eq!(forwarded.header().dest, addr(5));
    }

    #[test]
    fn test_relay_drops_at_hop_limit() {
        let mut node = MeshKernel::with_config(
            MockTransport::new(1),
            KernelConfig {
                max_hops: 2,
                ..KernelConfig::default()
            },
        );
        node.connect_to(addr(2)).unwrap();
        node.on_inbound_connection(addr(3), 30).unwrap();
        node.routes_mut()
            .insert(RouteEntry::new(addr(5), addr(2), 2, RouteFlags::REACHABLE));

        let mut probe = Ping::new(addr(5), addr(3), 0, false);
        probe.header.hops = 2;
        node.on_data(30, &Message::Ping(probe).serialize().unwrap())
            .unwrap();

        // Dropped, not forwarded and not an error
        assert!(node.transport().writes.is_empty());
    }

    #[test]
    fn test_broadcast_fans_out_to_all_peers() {
        let mut node = kernel(1);
        node.connect_to(addr(2)).unwrap();
        node.connect_to(addr(3)).unwrap();
        node.on_inbound_connection(addr(4), 40).unwrap();

        node.broadcast_discovery().unwrap();
        assert_eq!(node.transport().writes.len(), 2);
        assert_eq!(node.transport().notifies.len(), 1);
        for bytes in node.transport().sent() {
            let msg = Message::decode(&bytes).unwrap();
            assert!(msg.header().is_broadcast());
        }
    }

    #[test]
    fn test_events_raised_for_lifecycle() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<EventKind>>> = Rc::new(RefCell::new(Vec::new()));
        let mut node = kernel(1);
        for kind in [
            EventKind::OutboundConnection,
            EventKind::InboundConnection,
            EventKind::Disconnection,
            EventKind::MessageReceived,
            EventKind::ScanComplete,
        ] {
            let sink = Rc::clone(&seen);
            node.install_callback(kind, Box::new(move |event| sink.borrow_mut().push(event.kind())));
        }

        let conn_id = node.connect_to(addr(2)).unwrap();
        node.on_inbound_connection(addr(3), 30).unwrap();
        let ping = Message::Ping(Ping::new(addr(1), addr(2), 0, true));
        node.on_data(conn_id, &ping.serialize().unwrap()).unwrap();
        node.on_disconnect(conn_id).unwrap();
        node.on_scan_complete();

        assert_eq!(
            *seen.borrow(),
            vec![
                EventKind::OutboundConnection,
                EventKind::InboundConnection,
                EventKind::MessageReceived,
                EventKind::Disconnection,
                EventKind::ScanComplete,
            ]
        );
    }

    #[test]
    fn test_radio_guards_and_transport_calls() {
        let mut node = kernel(1);
        node.scan_environment(Duration::from_secs(5)).unwrap();
        assert!(node.is_scanning());
        assert_eq!(node.transport().scans, 1);

        // Advertising while scanning is refused before touching the radio
        assert!(matches!(
            node.start_advertising(),
            Err(KernelError::InvalidState { .. })
        ));
        assert_eq!(node.transport().advertises, 0);

        node.stop_scan().unwrap();
        assert_eq!(node.transport().stop_scans, 1);

        node.start_advertising().unwrap();
        assert!(node.is_advertising());
        node.stop_advertising().unwrap();
        assert_eq!(node.transport().stop_advertises, 1);
    }

    #[test]
    fn test_scan_timeout_reverts_radio() {
        let mut node = kernel(1);
        node.scan_environment(Duration::from_secs(1)).unwrap();
        node.on_scan_complete();
        assert!(!node.is_scanning());
        // Radio is free for advertising again
        node.start_advertising().unwrap();
    }

    #[test]
    fn test_two_kernel_discovery_exchange() {
        // Node A connects to node B; A asks for B's table and learns B's
        // neighborhood shifted one hop outward.
        let mut a = kernel(0xA);
        let mut b = kernel(0xB);

        let a_to_b = a.connect_to(addr(0xB)).unwrap();
        b.on_inbound_connection(addr(0xA), 77).unwrap();
        // B already knows a direct neighbor C
        b.routes_mut()
            .insert(RouteEntry::new(addr(0xC), addr(0xC), 1, RouteFlags::REACHABLE));

        a.broadcast_discovery().unwrap();
        let request = a.transport_mut().writes.pop().unwrap().1;
        b.on_data(77, &request).unwrap();

        let reply = b.transport_mut().notifies.pop().unwrap().1;
        a.on_data(a_to_b, &reply).unwrap();

        // A now routes to C through B, two hops out
        let to_c = *a.routes().get(addr(0xC)).unwrap();
        assert_eq!(to_c.next_hop, addr(0xB));
        assert_eq!(to_c.hop_count, 2);
        // And still has its direct route to B
        assert!(a.routes().get(addr(0xB)).unwrap().is_direct());
    }
}
