//! Packet types and structures for the ring protocol.
//!
//! This module provides the core packet types used throughout the protocol:
//! - `PacketKind`: the kind byte of a frame
//! - `PacketHeader`: the raw three-byte header as read from a ring
//! - `Packet`: an owned frame with kind, stream id and payload

use std::convert::TryFrom;

use ringmux_core::{
    constants::{HEADER_SIZE, MAX_PAYLOAD},
    error::{DecodingErrorKind, ErrorKind, Result},
};

/// Result byte of a ConnectResponse accepting the connection.
pub const CONNECT_ACCEPTED: u8 = 0;
/// Result byte of a ConnectResponse rejecting an unknown service.
pub const CONNECT_UNKNOWN_SERVICE: u8 = 1;

/// Helper trait to convert enums to u8 values for wire format.
pub trait EnumConverter {
    /// The enum type this converter works with.
    type Enum;

    /// Converts the enum to a u8 for serialization.
    fn to_u8(&self) -> u8;
}

/// Id to identify a certain packet kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Open a stream to a named service; the payload is the service name
    Connect = 1,
    /// Answer to a Connect; one result byte
    ConnectResponse = 2,
    /// Stream data
    Data = 3,
    /// End of stream in the sender's direction
    Eos = 4,
    /// Abrupt termination of the stream
    Reset = 5,
}

impl EnumConverter for PacketKind {
    type Enum = PacketKind;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = ErrorKind;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PacketKind::Connect),
            2 => Ok(PacketKind::ConnectResponse),
            3 => Ok(PacketKind::Data),
            4 => Ok(PacketKind::Eos),
            5 => Ok(PacketKind::Reset),
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::PacketKind)),
        }
    }
}

/// Raw packet header. The kind is kept as a byte so frames of unknown kind can still be skipped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    /// Number of payload bytes following the header
    pub length: u8,
    /// Raw kind byte
    pub kind: u8,
    /// Stream the packet belongs to
    pub stream_id: u8,
}

impl PacketHeader {
    /// Decodes the kind byte.
    pub fn packet_kind(&self) -> Result<PacketKind> {
        PacketKind::try_from(self.kind)
    }

    /// Returns the size of the whole frame, header included.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }
}

/// An owned packet: kind, stream id and payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    stream_id: u8,
    payload: Vec<u8>,
}

impl Packet {
    /// Creates a packet, rejecting payloads that would not fit in an empty ring.
    pub fn new(kind: PacketKind, stream_id: u8, payload: Vec<u8>) -> Result<Packet> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ErrorKind::PayloadTooLarge(payload.len()));
        }
        Ok(Packet { kind, stream_id, payload })
    }

    /// Creates a Connect packet naming the service to reach.
    pub fn connect(stream_id: u8, service: &[u8]) -> Result<Packet> {
        Packet::new(PacketKind::Connect, stream_id, service.to_vec())
    }

    /// Creates a ConnectResponse carrying a single result byte.
    pub fn connect_response(stream_id: u8, result: u8) -> Packet {
        Packet { kind: PacketKind::ConnectResponse, stream_id, payload: vec![result] }
    }

    /// Creates a Data packet.
    pub fn data(stream_id: u8, payload: &[u8]) -> Result<Packet> {
        Packet::new(PacketKind::Data, stream_id, payload.to_vec())
    }

    /// Creates an Eos packet.
    pub fn eos(stream_id: u8) -> Packet {
        Packet { kind: PacketKind::Eos, stream_id, payload: Vec::new() }
    }

    /// Creates a Reset packet.
    pub fn reset(stream_id: u8) -> Packet {
        Packet { kind: PacketKind::Reset, stream_id, payload: Vec::new() }
    }

    /// Returns the packet kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Returns the stream id.
    pub fn stream_id(&self) -> u8 {
        self.stream_id
    }

    /// Returns a slice of the packet payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the header this packet is framed with.
    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            length: self.payload.len() as u8,
            kind: self.kind.to_u8(),
            stream_id: self.stream_id,
        }
    }

    /// Returns the size of the whole frame, header included.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}
