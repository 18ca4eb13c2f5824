//! Node core: transport seam, radio mode, event dispatch, and the message
//! pipeline for picomesh.
//!
//! The kernel ties the routing table, the connection registry, and the radio
//! mode state machine together behind one owned object per node. The physical
//! radio is consumed through the [`Transport`] trait; the surrounding runtime
//! marshals radio callbacks onto the node's control-flow thread and feeds them
//! into the kernel's `on_*` methods. Upper layers observe the node through
//! installed event callbacks and drive it through the send/scan/advertise
//! operations.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod kernel;
pub mod radio;
pub mod transport;

pub use error::KernelError;
pub use event::{Event, EventDispatcher, EventHandler, EventKind};
pub use kernel::{KernelConfig, MeshKernel};
pub use radio::{RadioMode, RadioState};
pub use transport::{Transport, TransportError};
