//! Packet encoding.

use std::io::{self, Write};

use byteorder::WriteBytesExt;

use ringmux_core::{
    constants::MAX_PAYLOAD,
    error::{ErrorKind, Result},
};

use crate::packet::{EnumConverter, Packet, PacketKind};

/// Serializes packets into frames.
pub struct PacketEncoder;

impl PacketEncoder {
    /// Appends a frame built from its parts to the buffer.
    pub fn encode_frame_into(
        buffer: &mut Vec<u8>,
        kind: PacketKind,
        stream_id: u8,
        payload: &[u8],
    ) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ErrorKind::PayloadTooLarge(payload.len()));
        }
        Self::write_frame(buffer, kind, stream_id, payload)?;
        Ok(())
    }

    /// Appends the frame of a packet to the buffer.
    pub fn encode_into(buffer: &mut Vec<u8>, packet: &Packet) -> Result<()> {
        Self::encode_frame_into(buffer, packet.kind(), packet.stream_id(), packet.payload())
    }

    /// Encodes a packet into a new buffer.
    pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(packet.frame_len());
        Self::encode_into(&mut buffer, packet)?;
        Ok(buffer)
    }

    fn write_frame(
        buffer: &mut Vec<u8>,
        kind: PacketKind,
        stream_id: u8,
        payload: &[u8],
    ) -> io::Result<()> {
        buffer.write_u8(payload.len() as u8)?;
        buffer.write_u8(kind.to_u8())?;
        buffer.write_u8(stream_id)?;
        buffer.write_all(payload)
    }
}
