//! In-memory loopback transport for running several kernels in one process.
//!
//! The hub plays the role of the radio environment: it pairs connection ids
//! across a link and queues the callbacks (inbound connection, data) that a
//! real transport would deliver asynchronously. The main loop drains the
//! queue and feeds each callback into the owning kernel, which keeps the
//! whole simulation on one thread like the real runtime would.

use picomesh_kernel::{Transport, TransportError};
use picomesh_registry::ConnId;
use picomesh_wire::DevAddr;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// One simulated point-to-point link
#[derive(Debug, Clone, Copy)]
struct SimLink {
    client: DevAddr,
    client_conn: ConnId,
    server: DevAddr,
    server_conn: ConnId,
}

/// A callback the hub owes to some kernel
#[derive(Debug)]
pub enum SimEvent {
    /// A peer opened a connection toward `node`
    Inbound {
        /// Kernel that must accept the connection
        node: DevAddr,
        /// The connecting peer
        peer: DevAddr,
        /// Connection id on the receiving side
        conn_id: ConnId,
    },
    /// Bytes arrived for `node`
    Data {
        /// Kernel that must consume the bytes
        node: DevAddr,
        /// Connection the bytes arrived on
        conn_id: ConnId,
        /// The raw payload
        bytes: Vec<u8>,
    },
}

/// Shared state of the simulated radio environment
#[derive(Debug, Default)]
pub struct SimHub {
    links: Vec<SimLink>,
    next_conn: ConnId,
    pending: VecDeque<SimEvent>,
}

impl SimHub {
    /// Create an empty hub behind a shared handle
    pub fn new() -> Rc<RefCell<SimHub>> {
        Rc::new(RefCell::new(SimHub {
            links: Vec::new(),
            next_conn: 1,
            pending: VecDeque::new(),
        }))
    }

    /// Take the next owed callback, if any
    pub fn pop_event(hub: &Rc<RefCell<SimHub>>) -> Option<SimEvent> {
        hub.borrow_mut().pending.pop_front()
    }

    fn alloc_conn(&mut self) -> ConnId {
        let conn = self.next_conn;
        self.next_conn += 1;
        conn
    }

    /// The far side of a connection, seen from `node`
    fn far_side(&self, node: DevAddr, conn_id: ConnId) -> Option<(DevAddr, ConnId)> {
        for link in &self.links {
            if link.client == node && link.client_conn == conn_id {
                return Some((link.server, link.server_conn));
            }
            if link.server == node && link.server_conn == conn_id {
                return Some((link.client, link.client_conn));
            }
        }
        None
    }
}

/// The transport handed to each simulated kernel
pub struct SimTransport {
    addr: DevAddr,
    hub: Rc<RefCell<SimHub>>,
}

impl SimTransport {
    /// Create a transport for a node joining the hub
    pub fn new(addr: DevAddr, hub: Rc<RefCell<SimHub>>) -> Self {
        Self { addr, hub }
    }

    fn deliver(&self, conn_id: ConnId, bytes: &[u8]) -> Option<()> {
        let mut hub = self.hub.borrow_mut();
        let (peer, peer_conn) = hub.far_side(self.addr, conn_id)?;
        hub.pending.push_back(SimEvent::Data {
            node: peer,
            conn_id: peer_conn,
            bytes: bytes.to_vec(),
        });
        Some(())
    }
}

impl Transport for SimTransport {
    fn connect(&mut self, addr: DevAddr) -> Result<ConnId, TransportError> {
        let mut hub = self.hub.borrow_mut();
        let client_conn = hub.alloc_conn();
        let server_conn = hub.alloc_conn();
        hub.links.push(SimLink {
            client: self.addr,
            client_conn,
            server: addr,
            server_conn,
        });
        hub.pending.push_back(SimEvent::Inbound {
            node: addr,
            peer: self.addr,
            conn_id: server_conn,
        });
        debug!("sim link {} -> {} established", self.addr, addr);
        Ok(client_conn)
    }

    fn disconnect(&mut self, conn_id: ConnId) {
        let mut hub = self.hub.borrow_mut();
        let own = self.addr;
        hub.links.retain(|link| {
            !(link.client == own && link.client_conn == conn_id
                || link.server == own && link.server_conn == conn_id)
        });
    }

    fn write(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), TransportError> {
        self.deliver(conn_id, bytes)
            .ok_or(TransportError::WriteFailed(conn_id))
    }

    fn notify(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), TransportError> {
        self.deliver(conn_id, bytes)
            .ok_or(TransportError::NotifyFailed(conn_id))
    }

    fn scan(&mut self, timeout: Duration) {
        debug!("{} scanning for {:?}", self.addr, timeout);
    }

    fn stop_scan(&mut self) {
        debug!("{} scan stopped", self.addr);
    }

    fn advertise(&mut self) {
        debug!("{} advertising", self.addr);
    }

    fn stop_advertise(&mut self) {
        debug!("{} advertising stopped", self.addr);
    }

    fn own_addr(&self) -> DevAddr {
        self.addr
    }
}
