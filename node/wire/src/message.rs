//! The five control message kinds and their codec.
//!
//! Messages are transient values: built for one send or produced by one
//! decode, never persisted. The set of kinds is closed, so decoding is a
//! single dispatch on the header's type id into a per-variant decoder; the
//! header is read exactly once.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::addr::DevAddr;
use crate::entry::{RouteEntry, ROUTE_ENTRY_SIZE};
use crate::header::{MessageHeader, MessageType, HEADER_SIZE};
use crate::WireError;

/// Maximum routing entries in one discovery response
pub const DISCOVERY_ENTRIES_MAX: usize = 16;

/// Maximum routing entries in one route update
pub const UPDATE_ENTRIES_MAX: usize = 13;

/// Maximum digest bytes in one route sync
pub const SYNC_BYTES_MAX: usize = 15;

/// Routing table request, empty body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Message header
    pub header: MessageHeader,
}

impl DiscoveryRequest {
    /// Build a discovery request
    pub fn new(dest: DevAddr, src: DevAddr, seq: u8) -> Self {
        Self {
            header: MessageHeader::new(MessageType::DiscoveryRequest, dest, src, seq),
        }
    }
}

/// Routing table excerpt answering a discovery request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    /// Message header
    pub header: MessageHeader,
    /// Advertised routes, at most [`DISCOVERY_ENTRIES_MAX`]
    pub entries: SmallVec<[RouteEntry; DISCOVERY_ENTRIES_MAX]>,
}

impl DiscoveryResponse {
    /// Build a discovery response, refusing more entries than fit
    pub fn new(
        dest: DevAddr,
        src: DevAddr,
        seq: u8,
        entries: &[RouteEntry],
    ) -> Result<Self, WireError> {
        if entries.len() > DISCOVERY_ENTRIES_MAX {
            return Err(WireError::PayloadTooLarge {
                len: entries.len(),
                max: DISCOVERY_ENTRIES_MAX,
            });
        }
        let mut header = MessageHeader::new(MessageType::DiscoveryResponse, dest, src, seq);
        header.payload_size = indexed_body_size(entries.len()) as u8;
        Ok(Self {
            header,
            entries: SmallVec::from_slice(entries),
        })
    }
}

/// Incremental distance-vector update pushed to neighbors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteUpdate {
    /// Message header
    pub header: MessageHeader,
    /// Changed routes, at most [`UPDATE_ENTRIES_MAX`]
    pub entries: SmallVec<[RouteEntry; UPDATE_ENTRIES_MAX]>,
}

impl RouteUpdate {
    /// Build a route update, refusing more entries than fit
    pub fn new(
        dest: DevAddr,
        src: DevAddr,
        seq: u8,
        entries: &[RouteEntry],
    ) -> Result<Self, WireError> {
        if entries.len() > UPDATE_ENTRIES_MAX {
            return Err(WireError::PayloadTooLarge {
                len: entries.len(),
                max: UPDATE_ENTRIES_MAX,
            });
        }
        let mut header = MessageHeader::new(MessageType::Update, dest, src, seq);
        header.payload_size = indexed_body_size(entries.len()) as u8;
        Ok(Self {
            header,
            entries: SmallVec::from_slice(entries),
        })
    }
}

/// Compact routing-view digest for reconciliation.
///
/// The digest is carried as opaque bytes; its interpretation is left to the
/// reconciliation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSync {
    /// Message header
    pub header: MessageHeader,
    /// Opaque digest, at most [`SYNC_BYTES_MAX`] bytes
    pub digest: SmallVec<[u8; SYNC_BYTES_MAX]>,
}

impl RouteSync {
    /// Build a route sync, refusing more digest bytes than fit
    pub fn new(dest: DevAddr, src: DevAddr, seq: u8, digest: &[u8]) -> Result<Self, WireError> {
        if digest.len() > SYNC_BYTES_MAX {
            return Err(WireError::PayloadTooLarge {
                len: digest.len(),
                max: SYNC_BYTES_MAX,
            });
        }
        let mut header = MessageHeader::new(MessageType::Sync, dest, src, seq);
        header.payload_size = (1 + digest.len()) as u8;
        Ok(Self {
            header,
            digest: SmallVec::from_slice(digest),
        })
    }
}

/// Liveness probe between adjacent nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    /// Message header
    pub header: MessageHeader,
    /// True when this message answers an earlier probe
    pub pong: bool,
}

impl Ping {
    /// Build a ping (or a pong reply when `pong` is set)
    pub fn new(dest: DevAddr, src: DevAddr, seq: u8, pong: bool) -> Self {
        let mut header = MessageHeader::new(MessageType::Ping, dest, src, seq);
        header.payload_size = 1;
        Self { header, pong }
    }
}

/// One control message of any kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Routing table request
    DiscoveryRequest(DiscoveryRequest),
    /// Routing table excerpt
    DiscoveryResponse(DiscoveryResponse),
    /// Incremental route update
    Update(RouteUpdate),
    /// Routing-view digest
    Sync(RouteSync),
    /// Liveness probe
    Ping(Ping),
}

impl Message {
    /// The message header
    pub fn header(&self) -> &MessageHeader {
        match self {
            Message::DiscoveryRequest(m) => &m.header,
            Message::DiscoveryResponse(m) => &m.header,
            Message::Update(m) => &m.header,
            Message::Sync(m) => &m.header,
            Message::Ping(m) => &m.header,
        }
    }

    /// Mutable access to the message header
    pub fn header_mut(&mut self) -> &mut MessageHeader {
        match self {
            Message::DiscoveryRequest(m) => &mut m.header,
            Message::DiscoveryResponse(m) => &mut m.header,
            Message::Update(m) => &mut m.header,
            Message::Sync(m) => &mut m.header,
            Message::Ping(m) => &mut m.header,
        }
    }

    /// The variant's type id
    pub fn msg_type(&self) -> MessageType {
        self.header().msg_type
    }

    /// Redirect the message to every node
    pub fn set_broadcast(&mut self) {
        self.header_mut().set_broadcast();
    }

    /// Serialize the message: header first, then the variant body
    pub fn serialize(&self) -> Result<Bytes, WireError> {
        let body = self.serialize_body()?;

        let mut header = *self.header();
        header.payload_size = body.len() as u8;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
        header.encode(&mut buf);
        buf.put_slice(&body);
        Ok(buf.freeze())
    }

    fn serialize_body(&self) -> Result<BytesMut, WireError> {
        let mut body = BytesMut::new();
        match self {
            Message::DiscoveryRequest(_) => {}
            Message::DiscoveryResponse(m) => {
                encode_entries(&m.entries, DISCOVERY_ENTRIES_MAX, &mut body)?;
            }
            Message::Update(m) => {
                encode_entries(&m.entries, UPDATE_ENTRIES_MAX, &mut body)?;
            }
            Message::Sync(m) => {
                if m.digest.len() > SYNC_BYTES_MAX {
                    return Err(WireError::PayloadTooLarge {
                        len: m.digest.len(),
                        max: SYNC_BYTES_MAX,
                    });
                }
                body.put_u8(m.digest.len() as u8);
                body.put_slice(&m.digest);
            }
            Message::Ping(m) => {
                body.put_u8(m.pong as u8);
            }
        }
        Ok(body)
    }

    /// Decode one message: read the header once, then dispatch on its type id
    pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let header = MessageHeader::decode(&mut buf)?;

        match header.msg_type {
            MessageType::DiscoveryRequest => Ok(Message::DiscoveryRequest(DiscoveryRequest {
                header,
            })),
            MessageType::DiscoveryResponse => decode_discovery_response(header, &mut buf),
            MessageType::Update => decode_update(header, &mut buf),
            MessageType::Sync => decode_sync(header, &mut buf),
            MessageType::Ping => decode_ping(header, &mut buf),
        }
    }
}

/// Body size of an indexed variant carrying `entries` routing entries
fn indexed_body_size(entries: usize) -> usize {
    1 + entries * ROUTE_ENTRY_SIZE
}

fn encode_entries(
    entries: &[RouteEntry],
    max: usize,
    body: &mut BytesMut,
) -> Result<(), WireError> {
    if entries.len() > max {
        return Err(WireError::PayloadTooLarge {
            len: entries.len(),
            max,
        });
    }
    body.put_u8(entries.len() as u8);
    for entry in entries {
        entry.encode(body);
    }
    Ok(())
}

/// Read the one-byte entry count of an indexed body and validate it against
/// the variant cap and the bytes actually present.
fn decode_entry_count(buf: &mut Bytes, max: usize, unit: usize) -> Result<usize, WireError> {
    if !buf.has_remaining() {
        return Err(WireError::TruncatedPayload {
            declared: 1,
            remaining: 0,
        });
    }
    let count = buf.get_u8() as usize;
    if count > max {
        return Err(WireError::PayloadTooLarge { len: count, max });
    }
    if buf.remaining() < count * unit {
        return Err(WireError::TruncatedPayload {
            declared: count * unit,
            remaining: buf.remaining(),
        });
    }
    Ok(count)
}

fn decode_discovery_response(
    header: MessageHeader,
    buf: &mut Bytes,
) -> Result<Message, WireError> {
    let count = decode_entry_count(buf, DISCOVERY_ENTRIES_MAX, ROUTE_ENTRY_SIZE)?;
    let mut entries = SmallVec::new();
    for _ in 0..count {
        entries.push(RouteEntry::decode(buf)?);
    }
    Ok(Message::DiscoveryResponse(DiscoveryResponse {
        header,
        entries,
    }))
}

fn decode_update(header: MessageHeader, buf: &mut Bytes) -> Result<Message, WireError> {
    let count = decode_entry_count(buf, UPDATE_ENTRIES_MAX, ROUTE_ENTRY_SIZE)?;
    let mut entries = SmallVec::new();
    for _ in 0..count {
        entries.push(RouteEntry::decode(buf)?);
    }
    Ok(Message::Update(RouteUpdate { header, entries }))
}

fn decode_sync(header: MessageHeader, buf: &mut Bytes) -> Result<Message, WireError> {
    let count = decode_entry_count(buf, SYNC_BYTES_MAX, 1)?;
    let mut digest = SmallVec::new();
    for _ in 0..count {
        digest.push(buf.get_u8());
    }
    Ok(Message::Sync(RouteSync { header, digest }))
}

fn decode_ping(header: MessageHeader, buf: &mut Bytes) -> Result<Message, WireError> {
    if !buf.has_remaining() {
        return Err(WireError::TruncatedPayload {
            declared: 1,
            remaining: 0,
        });
    }
    let pong = buf.get_u8() != 0;
    Ok(Message::Ping(Ping { header, pong }))
}
