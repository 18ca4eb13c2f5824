//! Fixed message header processing.
//!
//! Every control message starts with the same 16-byte header carrying the
//! destination and source addresses, the variant type id, the hop counter
//! bumped at every relay, a per-source sequence number, and the body size.
//! Routing a message never requires parsing past this header.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::addr::DevAddr;
use crate::WireError;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Default flood bound: a message is dropped rather than relayed beyond this
pub const DEFAULT_MAX_HOPS: u8 = 8;

/// Message types as defined by the mesh control protocol
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Ask a neighbor for its routing table
    DiscoveryRequest = 0x00,
    /// Routing table excerpt answering a discovery request
    DiscoveryResponse = 0x01,
    /// Incremental distance-vector update
    Update = 0x02,
    /// Compact routing-view digest for reconciliation
    Sync = 0x03,
    /// Liveness probe between adjacent nodes
    Ping = 0x04,
}

impl TryFrom<u8> for MessageType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::DiscoveryRequest),
            0x01 => Ok(MessageType::DiscoveryResponse),
            0x02 => Ok(MessageType::Update),
            0x03 => Ok(MessageType::Sync),
            0x04 => Ok(MessageType::Ping),
            _ => Err(WireError::UnknownType(value)),
        }
    }
}

/// Fixed message header (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Destination node, or [`DevAddr::BROADCAST`]
    pub dest: DevAddr,
    /// Originating node
    pub src: DevAddr,
    /// Variant selector
    pub msg_type: MessageType,
    /// Relay count, incremented at every forward
    pub hops: u8,
    /// Disambiguates retransmissions for the same (src, type)
    pub seq: u8,
    /// Body size in bytes
    pub payload_size: u8,
}

impl MessageHeader {
    /// Create a new header with no hops taken and an empty body
    pub fn new(msg_type: MessageType, dest: DevAddr, src: DevAddr, seq: u8) -> Self {
        Self {
            dest,
            src,
            msg_type,
            hops: 0,
            seq,
            payload_size: 0,
        }
    }

    /// Redirect the message to every node
    pub fn set_broadcast(&mut self) {
        self.dest = DevAddr::BROADCAST;
    }

    /// Whether the message is addressed to every node
    pub fn is_broadcast(&self) -> bool {
        self.dest.is_broadcast()
    }

    /// Increment the hop counter for a relay, refusing at the flood bound
    pub fn bump_hops(&mut self, max_hops: u8) -> Result<(), WireError> {
        if self.hops >= max_hops {
            return Err(WireError::HopLimitExceeded(self.hops));
        }
        self.hops += 1;
        Ok(())
    }

    /// Encode the header to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        self.dest.encode(buf);
        self.src.encode(buf);
        buf.put_u8(self.msg_type as u8);
        buf.put_u8(self.hops);
        buf.put_u8(self.seq);
        buf.put_u8(self.payload_size);
    }

    /// Decode a header from bytes
    pub fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::MalformedHeader {
                need: HEADER_SIZE,
                got: buf.len(),
            });
        }

        let dest = DevAddr::decode(buf)?;
        let src = DevAddr::decode(buf)?;
        let msg_type = MessageType::try_from(buf.get_u8())?;
        let hops = buf.get_u8();
        let seq = buf.get_u8();
        let payload_size = buf.get_u8();

        Ok(Self {
            dest,
            src,
            msg_type,
            hops,
            seq,
            payload_size,
        })
    }
}
