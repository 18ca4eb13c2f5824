//! Routing entry wire layout.
//!
//! A routing entry is the unit of distance-vector state exchanged between
//! nodes: which target is reachable, through which neighbor, and at what hop
//! count. Entries travel inside discovery responses and route updates and
//! always occupy a fixed 14 bytes on the wire.

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::addr::{DevAddr, DEV_ADDR_LEN};
use crate::WireError;

/// Serialized size of one routing entry
pub const ROUTE_ENTRY_SIZE: usize = 2 * DEV_ADDR_LEN + 2;

bitflags! {
    /// Per-route reachability flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RouteFlags: u8 {
        /// Target is currently reachable
        const REACHABLE = 0x01;
        /// Target offers an internet gateway
        const INTERNET = 0x02;
    }
}

/// One distance-vector route: a target, the neighbor to go through, and cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Destination node
    pub target: DevAddr,
    /// Neighbor to forward through
    pub next_hop: DevAddr,
    /// Hops to the target through `next_hop`
    pub hop_count: u8,
    /// Reachability flags
    pub flags: RouteFlags,
}

impl RouteEntry {
    /// Create a new routing entry
    pub fn new(target: DevAddr, next_hop: DevAddr, hop_count: u8, flags: RouteFlags) -> Self {
        Self {
            target,
            next_hop,
            hop_count,
            flags,
        }
    }

    /// Whether the target is a direct neighbor (reached in one hop)
    pub fn is_direct(&self) -> bool {
        self.next_hop == self.target
    }

    /// Append the entry to a buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        self.target.encode(buf);
        self.next_hop.encode(buf);
        buf.put_u8(self.hop_count);
        buf.put_u8(self.flags.bits());
    }

    /// Read an entry from the front of a buffer
    pub fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        if buf.remaining() < ROUTE_ENTRY_SIZE {
            return Err(WireError::TruncatedPayload {
                declared: ROUTE_ENTRY_SIZE,
                remaining: buf.remaining(),
            });
        }
        let target = DevAddr::decode(buf)?;
        let next_hop = DevAddr::decode(buf)?;
        let hop_count = buf.get_u8();
        // Unknown flag bits from newer builds are dropped, not rejected
        let flags = RouteFlags::from_bits_truncate(buf.get_u8());
        Ok(Self {
            target,
            next_hop,
            hop_count,
            flags,
        })
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {} ({} hops, flags {:#04x})",
            self.target,
            self.next_hop,
            self.hop_count,
            self.flags.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> DevAddr {
        DevAddr::new([0x10, 0x20, 0x30, 0x40, 0x50, last])
    }

    #[test]
    fn test_entry_size() {
        let entry = RouteEntry::new(addr(1), addr(2), 3, RouteFlags::REACHABLE);
        let mut buf = BytesMut::new();
        entry.encode(&mut buf);
        assert_eq!(buf.len(), ROUTE_ENTRY_SIZE);
    }

    #[test]
    fn test_encode_decode() {
        let entry = RouteEntry::new(
            addr(1),
            addr(2),
            4,
            RouteFlags::REACHABLE | RouteFlags::INTERNET,
        );
        let mut buf = BytesMut::new();
        entry.encode(&mut buf);

        let mut bytes = buf.freeze();
        let decoded = RouteEntry::decode(&mut bytes).unwrap();
        assert_eq!(entry, decoded);
        assert!(!bytes.has_remaining());
    }

    #[test]
    fn test_direct_neighbor() {
        assert!(RouteEntry::new(addr(1), addr(1), 1, RouteFlags::REACHABLE).is_direct());
        assert!(!RouteEntry::new(addr(1), addr(2), 2, RouteFlags::REACHABLE).is_direct());
    }

    #[test]
    fn test_decode_short_buffer() {
        let mut bytes = Bytes::from_static(&[0u8; 5]);
        assert!(matches!(
            RouteEntry::decode(&mut bytes),
            Err(WireError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn test_unknown_flag_bits_dropped() {
        let entry = RouteEntry::new(addr(1), addr(1), 1, RouteFlags::REACHABLE);
        let mut buf = BytesMut::new();
        entry.encode(&mut buf);
        // Set a flag bit no build understands yet
        let last = buf.len() - 1;
        buf[last] |= 0x80;

        let mut bytes = buf.freeze();
        let decoded = RouteEntry::decode(&mut bytes).unwrap();
        assert_eq!(decoded.flags, RouteFlags::REACHABLE);
    }
}
