//! Kernel error type.

use crate::radio::RadioMode;
use crate::transport::TransportError;
use picomesh_registry::RegistryError;
use picomesh_routing::RoutingError;
use picomesh_wire::WireError;
use thiserror::Error;

/// Errors surfaced by kernel operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Codec-level framing violation
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Routing table miss
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Connection registry violation
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Transport primitive failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Illegal scan/advertise transition
    #[error("invalid radio transition: {current} -> {requested}")]
    InvalidState {
        /// Mode the radio is in
        current: RadioMode,
        /// Mode the caller asked for
        requested: RadioMode,
    },
}
