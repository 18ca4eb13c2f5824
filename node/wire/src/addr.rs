//! Fixed-width device addresses.
//!
//! Every mesh node is identified by a 6-byte radio address. Addresses are
//! plain value types, compared byte-wise and copied freely; the all-ones
//! value is reserved to mean "every node".

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::WireError;

/// Device address length in bytes
pub const DEV_ADDR_LEN: usize = 6;

/// A 6-byte device address identifying one mesh node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DevAddr([u8; DEV_ADDR_LEN]);

impl DevAddr {
    /// Reserved address meaning "all nodes"
    pub const BROADCAST: DevAddr = DevAddr([0xFF; DEV_ADDR_LEN]);

    /// Create an address from raw octets
    pub const fn new(octets: [u8; DEV_ADDR_LEN]) -> Self {
        Self(octets)
    }

    /// Create an address from a byte slice, failing on a length mismatch
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        let octets: [u8; DEV_ADDR_LEN] =
            bytes
                .try_into()
                .map_err(|_| WireError::MalformedAddress {
                    expected: DEV_ADDR_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(octets))
    }

    /// Raw octets of the address
    pub const fn octets(&self) -> [u8; DEV_ADDR_LEN] {
        self.0
    }

    /// Address as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this is the reserved broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Append the address to a buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.0);
    }

    /// Read an address from the front of a buffer
    pub fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        if buf.remaining() < DEV_ADDR_LEN {
            return Err(WireError::MalformedAddress {
                expected: DEV_ADDR_LEN,
                got: buf.remaining(),
            });
        }
        let mut octets = [0u8; DEV_ADDR_LEN];
        buf.copy_to_slice(&mut octets);
        Ok(Self(octets))
    }
}

impl From<[u8; DEV_ADDR_LEN]> for DevAddr {
    fn from(octets: [u8; DEV_ADDR_LEN]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevAddr({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_bytewise() {
        let a = DevAddr::new([1, 2, 3, 4, 5, 6]);
        let b = DevAddr::from_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
        let c = DevAddr::new([1, 2, 3, 4, 5, 7]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_broadcast_sentinel() {
        assert!(DevAddr::BROADCAST.is_broadcast());
        assert!(!DevAddr::new([1, 2, 3, 4, 5, 6]).is_broadcast());
        assert_eq!(DevAddr::BROADCAST.octets(), [0xFF; 6]);
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(matches!(
            DevAddr::from_slice(&[1, 2, 3]),
            Err(WireError::MalformedAddress {
                expected: 6,
                got: 3
            })
        ));
    }

    #[test]
    fn test_encode_decode() {
        let addr = DevAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mut buf = BytesMut::new();
        addr.encode(&mut buf);
        assert_eq!(buf.len(), DEV_ADDR_LEN);

        let mut bytes = buf.freeze();
        assert_eq!(DevAddr::decode(&mut bytes).unwrap(), addr);
    }

    #[test]
    fn test_display() {
        let addr = DevAddr::new([0x01, 0x23, 0x45, 0x67, 0x89, 0xAB]);
        assert_eq!(addr.to_string(), "01:23:45:67:89:ab");
    }
}
