//! Routing table implementation.

use bytes::BytesMut;
use picomesh_wire::{DevAddr, RouteEntry, ROUTE_ENTRY_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Routing table errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No entry for this target
    #[error("no route for target {0}")]
    NotFound(DevAddr),
}

/// What to do when an update arrives for an already-known target.
///
/// The mesh protocol's native behavior is last-write-wins: whatever update
/// arrives most recently replaces the stored route. `PreferFewerHops` refuses
/// replacements that would strictly worsen the hop count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdatePolicy {
    /// Incoming entries always replace stored ones
    #[default]
    AlwaysOverwrite,
    /// Keep the stored entry when the incoming hop count is strictly worse
    PreferFewerHops,
}

/// In-memory distance-vector routing table, keyed by target address
#[derive(Debug, Default)]
pub struct RoutingTable {
    /// Routes by target; BTreeMap gives a deterministic export order
    routes: BTreeMap<DevAddr, RouteEntry>,
    policy: UpdatePolicy,
}

impl RoutingTable {
    /// Create an empty table with the last-write-wins policy
    pub fn new() -> Self {
        Self::with_policy(UpdatePolicy::AlwaysOverwrite)
    }

    /// Create an empty table with an explicit update policy
    pub fn with_policy(policy: UpdatePolicy) -> Self {
        Self {
            routes: BTreeMap::new(),
            policy,
        }
    }

    /// Upsert a route by its target and return the stored entry.
    ///
    /// Under `AlwaysOverwrite` the incoming entry always wins; under
    /// `PreferFewerHops` a strictly worse hop count leaves the stored entry
    /// in place (and returns it).
    pub fn insert(&mut self, entry: RouteEntry) -> RouteEntry {
        if self.policy == UpdatePolicy::PreferFewerHops {
            if let Some(existing) = self.routes.get(&entry.target) {
                if entry.hop_count > existing.hop_count {
                    debug!(
                        "keeping route {} over worse update ({} hops)",
                        existing, entry.hop_count
                    );
                    return *existing;
                }
            }
        }
        debug!("storing route {}", entry);
        self.routes.insert(entry.target, entry);
        entry
    }

    /// Remove the route for a target
    pub fn remove(&mut self, target: DevAddr) -> Result<RouteEntry, RoutingError> {
        let removed = self
            .routes
            .remove(&target)
            .ok_or(RoutingError::NotFound(target))?;
        debug!("removed route {}", removed);
        Ok(removed)
    }

    /// Whether a route for this target exists
    pub fn contains(&self, target: DevAddr) -> bool {
        self.routes.contains_key(&target)
    }

    /// Look up the route for a target
    pub fn get(&self, target: DevAddr) -> Result<&RouteEntry, RoutingError> {
        self.routes.get(&target).ok_or(RoutingError::NotFound(target))
    }

    /// Number of stored routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// How many stored routes forward through the given neighbor
    pub fn direct_clients(&self, next_hop: DevAddr) -> usize {
        self.routes
            .values()
            .filter(|entry| entry.next_hop == next_hop)
            .count()
    }

    /// All stored routes in table iteration order
    pub fn export(&self) -> Vec<RouteEntry> {
        self.routes.values().copied().collect()
    }
}

/// Outcome of encoding entries into a bounded buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedTable {
    /// Bytes written into the destination
    pub written: usize,
    /// Entries that fit
    pub entries_encoded: usize,
    /// Whether entries were dropped for lack of space
    pub truncated: bool,
}

/// Serialize a run of routing entries into a caller-supplied buffer.
///
/// Encoding stops at the first entry that would not fit; the outcome reports
/// truncation instead of writing past the buffer.
pub fn encode_entries(entries: &[RouteEntry], dest: &mut [u8]) -> EncodedTable {
    let fit = dest.len() / ROUTE_ENTRY_SIZE;
    let encoded = entries.len().min(fit);

    let mut buf = BytesMut::with_capacity(encoded * ROUTE_ENTRY_SIZE);
    for entry in &entries[..encoded] {
        entry.encode(&mut buf);
    }
    dest[..buf.len()].copy_from_slice(&buf);

    EncodedTable {
        written: buf.len(),
        entries_encoded: encoded,
        truncated: encoded < entries.len(),
    }
}
