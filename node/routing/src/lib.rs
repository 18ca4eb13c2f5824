//! Distance-vector routing table and table encoding for picomesh.
//!
//! One table exists per node, created at startup and mutated for the node's
//! lifetime through its public operations. The table stores, per destination,
//! the neighbor to forward through and the hop count, rather than full paths.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod table;

pub use table::{encode_entries, EncodedTable, RoutingError, RoutingTable, UpdatePolicy};
