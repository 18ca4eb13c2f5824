//! Device addressing, message framing, and encoding/decoding for picomesh.
//!
//! This crate implements the network-layer protocol spoken between mesh nodes
//! over point-to-point radio links: the 6-byte device address, the routing
//! entry wire layout, the fixed 16-byte message header, and the five control
//! message kinds (discovery request/response, route update, route sync, ping).
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | Header (16B)         | dest(6) src(6) type(1)     |
//! |                      | hops(1) seq(1) psize(1)    |
//! +----------------------+----------------------------+
//! | u8 entry_count (opt) | indexed variants only      |
//! +----------------------+----------------------------+
//! | body                 | variant-specific, 0..225B  |
//! +----------------------+----------------------------+
//! ```
//!
//! The body shape is determined solely by the header's type id, so the framing
//! is stable across nodes of differing builds.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod addr;
pub mod entry;
pub mod error;
pub mod header;
pub mod message;

// Re-export main types
pub use addr::{DevAddr, DEV_ADDR_LEN};
pub use entry::{RouteEntry, RouteFlags, ROUTE_ENTRY_SIZE};
pub use error::WireError;
pub use header::{MessageHeader, MessageType, DEFAULT_MAX_HOPS, HEADER_SIZE};
pub use message::{
    DiscoveryRequest, DiscoveryResponse, Message, Ping, RouteSync, RouteUpdate,
    DISCOVERY_ENTRIES_MAX, SYNC_BYTES_MAX, UPDATE_ENTRIES_MAX,
};
