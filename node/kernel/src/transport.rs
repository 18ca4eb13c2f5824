//! The transport seam the kernel consumes.
//!
//! The physical radio stack (connection management, advertising and scanning
//! timers, MTU handling) lives outside the core. The kernel only needs the
//! handful of primitives below; the asymmetry between `write` and `notify`
//! exists because sending to a peer is physically a write when this node is
//! the link's client and a notification when it is the server.

use picomesh_registry::ConnId;
use picomesh_wire::DevAddr;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failures, surfaced to the caller without retries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not open a connection toward the peer
    #[error("connect to {0} failed")]
    ConnectFailed(DevAddr),

    /// Client-role write failed
    #[error("write on connection {0} failed")]
    WriteFailed(ConnId),

    /// Server-role notify failed
    #[error("notify on connection {0} failed")]
    NotifyFailed(ConnId),
}

/// Point-to-point radio transport consumed by the kernel.
///
/// Implementations are expected to deliver their asynchronous callbacks
/// (connection opened/closed, bytes received, scan timeout) back into the
/// kernel's `on_*` methods on the node's control-flow thread.
pub trait Transport {
    /// Open a client-role connection toward a peer
    fn connect(&mut self, addr: DevAddr) -> Result<ConnId, TransportError>;

    /// Tear down a connection
    fn disconnect(&mut self, conn_id: ConnId);

    /// Send bytes over a connection this node opened (client role)
    fn write(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Send bytes over a connection a peer opened (server role)
    fn notify(&mut self, conn_id: ConnId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Start scanning for peers; the transport owns the timeout and signals
    /// its expiry as a scan-complete callback
    fn scan(&mut self, timeout: Duration);

    /// Stop an ongoing scan before its timeout
    fn stop_scan(&mut self);

    /// Start advertising this node
    fn advertise(&mut self);

    /// Stop advertising
    fn stop_advertise(&mut self);

    /// This node's own device address
    fn own_addr(&self) -> DevAddr;
}
