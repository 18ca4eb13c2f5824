//! Bounded peer-address to connection-id tables for both link roles.
//!
//! A node reaches each peer through exactly one of two asymmetric link roles:
//! as client over a connection it opened, or as server over a connection the
//! peer opened. The registry answers "how do I reach this address" for the
//! send path and keeps the two role tables within their radio-imposed
//! capacity bounds.

#![warn(missing_docs)]
#![warn(clippy::all)]

use picomesh_wire::DevAddr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Opaque transport connection handle
pub type ConnId = u16;

/// Default bound on connections this node opens (client role)
pub const DEFAULT_CLIENT_CAPACITY: usize = 3;

/// Default bound on connections peers open toward this node (server role)
pub const DEFAULT_SERVER_CAPACITY: usize = 4;

/// Connection registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The role table is full
    #[error("{0:?} connection table full")]
    CapacityExceeded(Role),

    /// The address is already live in one of the tables
    #[error("address {0} already registered")]
    DuplicateAddress(DevAddr),

    /// No slot holds this connection id
    #[error("connection id {0} not registered")]
    NotFound(ConnId),

    /// The address is live in neither table
    #[error("no connection for address {0}")]
    UnknownAddress(DevAddr),
}

/// Which side of the link this node is on for a given peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// This node opened the connection; sends are writes
    Client,
    /// The peer opened the connection; sends are notifications
    Server,
}

/// A resolved peer: the transport handle and the role to use toward it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Transport connection handle
    pub conn_id: ConnId,
    /// Link role toward the peer
    pub role: Role,
}

/// One live peer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConnSlot {
    addr: DevAddr,
    conn_id: ConnId,
}

/// Two bounded address-to-connection tables, one per link role.
///
/// Tables are small fixed-capacity vectors scanned linearly; an address is
/// live in at most one of the two at any time.
#[derive(Debug)]
pub struct ConnectionRegistry {
    outgoing: Vec<ConnSlot>,
    incoming: Vec<ConnSlot>,
    client_capacity: usize,
    server_capacity: usize,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_CAPACITY, DEFAULT_SERVER_CAPACITY)
    }
}

impl ConnectionRegistry {
    /// Create a registry with explicit role-table capacities
    pub fn new(client_capacity: usize, server_capacity: usize) -> Self {
        Self {
            outgoing: Vec::with_capacity(client_capacity),
            incoming: Vec::with_capacity(server_capacity),
            client_capacity,
            server_capacity,
        }
    }

    /// Record a connection this node opened toward `addr`
    pub fn record_outgoing(&mut self, addr: DevAddr, conn_id: ConnId) -> Result<(), RegistryError> {
        self.check_new_addr(addr)?;
        if self.outgoing.len() >= self.client_capacity {
            return Err(RegistryError::CapacityExceeded(Role::Client));
        }
        debug!("recording outgoing connection {} to {}", conn_id, addr);
        self.outgoing.push(ConnSlot { addr, conn_id });
        Ok(())
    }

    /// Record a connection a peer opened toward this node
    pub fn record_incoming(&mut self, addr: DevAddr, conn_id: ConnId) -> Result<(), RegistryError> {
        self.check_new_addr(addr)?;
        if self.incoming.len() >= self.server_capacity {
            return Err(RegistryError::CapacityExceeded(Role::Server));
        }
        debug!("recording incoming connection {} from {}", conn_id, addr);
        self.incoming.push(ConnSlot { addr, conn_id });
        Ok(())
    }

    /// Drop the slot holding `conn_id` from whichever table has it
    pub fn remove_by_conn_id(&mut self, conn_id: ConnId) -> Result<(DevAddr, Role), RegistryError> {
        if let Some(pos) = self.outgoing.iter().position(|s| s.conn_id == conn_id) {
            let slot = self.outgoing.remove(pos);
            debug!("removed outgoing connection {} to {}", conn_id, slot.addr);
            return Ok((slot.addr, Role::Client));
        }
        if let Some(pos) = self.incoming.iter().position(|s| s.conn_id == conn_id) {
            let slot = self.incoming.remove(pos);
            debug!("removed incoming connection {} from {}", conn_id, slot.addr);
            return Ok((slot.addr, Role::Server));
        }
        Err(RegistryError::NotFound(conn_id))
    }

    /// Find the connection and role to use toward `addr`
    pub fn resolve(&self, addr: DevAddr) -> Result<Resolved, RegistryError> {
        if let Some(slot) = self.outgoing.iter().find(|s| s.addr == addr) {
            return Ok(Resolved {
                conn_id: slot.conn_id,
                role: Role::Client,
            });
        }
        if let Some(slot) = self.incoming.iter().find(|s| s.addr == addr) {
            return Ok(Resolved {
                conn_id: slot.conn_id,
                role: Role::Server,
            });
        }
        Err(RegistryError::UnknownAddress(addr))
    }

    /// The peer bound to `conn_id`, if any
    pub fn peer_of(&self, conn_id: ConnId) -> Option<(DevAddr, Role)> {
        self.outgoing
            .iter()
            .find(|s| s.conn_id == conn_id)
            .map(|s| (s.addr, Role::Client))
            .or_else(|| {
                self.incoming
                    .iter()
                    .find(|s| s.conn_id == conn_id)
                    .map(|s| (s.addr, Role::Server))
            })
    }

    /// All live peers with their connection and role, outgoing table first
    pub fn peers(&self) -> Vec<(DevAddr, Resolved)> {
        self.outgoing
            .iter()
            .map(|s| {
                (
                    s.addr,
                    Resolved {
                        conn_id: s.conn_id,
                        role: Role::Client,
                    },
                )
            })
            .chain(self.incoming.iter().map(|s| {
                (
                    s.addr,
                    Resolved {
                        conn_id: s.conn_id,
                        role: Role::Server,
                    },
                )
            }))
            .collect()
    }

    /// Live connections this node opened
    pub fn outgoing_count(&self) -> usize {
        self.outgoing.len()
    }

    /// Live connections peers opened toward this node
    pub fn incoming_count(&self) -> usize {
        self.incoming.len()
    }

    fn check_new_addr(&self, addr: DevAddr) -> Result<(), RegistryError> {
        let mut live = self.outgoing.iter().chain(self.incoming.iter());
        if live.any(|s| s.addr == addr) {
            return Err(RegistryError::DuplicateAddress(addr));
        }
        Ok(())
    }
}
