//! Packet decoding.

use std::io::{self, Cursor, Read};

use byteorder::ReadBytesExt;

use ringmux_core::error::{DecodingErrorKind, ErrorKind, Result};

use crate::packet::{Packet, PacketHeader};

/// Deserializes packets from frames.
pub struct PacketDecoder;

impl PacketDecoder {
    /// Decodes a header from a cursor. The kind byte is not validated.
    pub fn decode_header(cursor: &mut Cursor<&[u8]>) -> Result<PacketHeader> {
        let length = cursor.read_u8().map_err(truncated)?;
        let kind = cursor.read_u8().map_err(truncated)?;
        let stream_id = cursor.read_u8().map_err(truncated)?;
        Ok(PacketHeader { length, kind, stream_id })
    }

    /// Decodes a whole frame.
    pub fn decode(data: &[u8]) -> Result<Packet> {
        let mut cursor = Cursor::new(data);
        let header = Self::decode_header(&mut cursor)?;
        let kind = header.packet_kind()?;

        let mut payload = vec![0u8; header.length as usize];
        cursor.read_exact(&mut payload).map_err(truncated)?;

        Packet::new(kind, header.stream_id, payload)
    }
}

fn truncated(err: io::Error) -> ErrorKind {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ErrorKind::DecodingError(DecodingErrorKind::Truncated)
    } else {
        ErrorKind::IOError(err)
    }
}
