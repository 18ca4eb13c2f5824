//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Device address of the wrong length
    #[error("malformed address: expected {expected} bytes, got {got}")]
    MalformedAddress {
        /// Required address length
        expected: usize,
        /// Length actually supplied
        got: usize,
    },

    /// Byte sequence shorter than the fixed header
    #[error("malformed header: need {need} bytes, got {got}")]
    MalformedHeader {
        /// Fixed header size
        need: usize,
        /// Bytes actually available
        got: usize,
    },

    /// No message variant registered for this type id
    #[error("unknown message type {0:#04x}")]
    UnknownType(u8),

    /// Declared payload exceeds the remaining bytes
    #[error("truncated payload: declared {declared} bytes, {remaining} remain")]
    TruncatedPayload {
        /// Bytes the body claims to carry
        declared: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// More entries than the variant's fixed capacity
    #[error("payload too large: {len} entries exceeds maximum of {max}")]
    PayloadTooLarge {
        /// Entries supplied
        len: usize,
        /// Variant capacity
        max: usize,
    },

    /// Relay would exceed the flood bound
    #[error("hop limit {0} exceeded")]
    HopLimitExceeded(u8),
}
