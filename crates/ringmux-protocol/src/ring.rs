//! Shared ring channels.
//!
//! The shared area holds one 256-byte ring per direction. Each ring has a tail written only
//! by its producer and a head written only by its consumer; occupancy is `(tail - head) mod 256`
//! on the 8-bit indices, so wraparound never needs an explicit branch. The memory is an array
//! of atomics so both sides can live in one address space without locks: the producer
//! publishes bytes with a `Release` store of the tail, the consumer frees them with a
//! `Release` store of the head.
//!
//! Direction exclusivity is carried by the handle types. Each side of the area may claim its
//! endpoints once: a [`Producer`] for the ring it writes and a [`Consumer`] for the ring it reads.

use std::{
    fmt,
    io::Cursor,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
};

use ringmux_core::{
    constants::{HEADER_SIZE, MAX_OCCUPANCY, MAX_PAYLOAD, RING_SIZE},
    error::{DecodingErrorKind, ErrorKind, Result},
};

use crate::{
    codec::{PacketDecoder, PacketEncoder},
    packet::{Packet, PacketHeader, PacketKind},
};

/// Transmission direction of a ring, named from the host's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Written by the host, read by the peer.
    ToPeer,
    /// Written by the peer, read by the host.
    FromPeer,
}

struct Ring {
    buffer: [AtomicU8; RING_SIZE],
    head: AtomicU8,
    tail: AtomicU8,
}

impl Ring {
    fn new() -> Self {
        Self {
            buffer: std::array::from_fn(|_| AtomicU8::new(0)),
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
        }
    }

    #[inline]
    fn load(&self, index: u8) -> u8 {
        self.buffer[index as usize].load(Ordering::Relaxed)
    }

    #[inline]
    fn store(&self, index: u8, value: u8) {
        self.buffer[index as usize].store(value, Ordering::Relaxed)
    }
}

/// The shared memory area: one ring per direction.
pub struct ComArea {
    to_peer: Ring,
    from_peer: Ring,
    host_claimed: AtomicBool,
    peer_claimed: AtomicBool,
}

impl fmt::Debug for ComArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComArea")
            .field("to_peer_head", &self.to_peer.head.load(Ordering::Relaxed))
            .field("to_peer_tail", &self.to_peer.tail.load(Ordering::Relaxed))
            .field("from_peer_head", &self.from_peer.head.load(Ordering::Relaxed))
            .field("from_peer_tail", &self.from_peer.tail.load(Ordering::Relaxed))
            .finish()
    }
}

impl ComArea {
    /// Creates a zeroed area with both rings empty.
    pub fn new() -> Arc<ComArea> {
        Arc::new(ComArea {
            to_peer: Ring::new(),
            from_peer: Ring::new(),
            host_claimed: AtomicBool::new(false),
            peer_claimed: AtomicBool::new(false),
        })
    }

    /// Claims the host side: a producer for `ToPeer` and a consumer for `FromPeer`.
    pub fn host_endpoints(self: &Arc<Self>) -> Result<(Producer, Consumer)> {
        if self.host_claimed.swap(true, Ordering::AcqRel) {
            return Err(ErrorKind::EndpointClaimed);
        }
        Ok((Producer::new(self.clone(), Direction::ToPeer), Consumer::new(self.clone(), Direction::FromPeer)))
    }

    /// Claims the peer side: a producer for `FromPeer` and a consumer for `ToPeer`.
    pub fn peer_endpoints(self: &Arc<Self>) -> Result<(Producer, Consumer)> {
        if self.peer_claimed.swap(true, Ordering::AcqRel) {
            return Err(ErrorKind::EndpointClaimed);
        }
        Ok((Producer::new(self.clone(), Direction::FromPeer), Consumer::new(self.clone(), Direction::ToPeer)))
    }

    fn ring(&self, direction: Direction) -> &Ring {
        match direction {
            Direction::ToPeer => &self.to_peer,
            Direction::FromPeer => &self.from_peer,
        }
    }
}

/// Writing end of a ring. Sole writer of the tail.
pub struct Producer {
    area: Arc<ComArea>,
    direction: Direction,
    scratch: Vec<u8>,
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("direction", &self.direction)
            .field("tail", &self.tail())
            .field("occupied", &self.occupied())
            .finish()
    }
}

impl Producer {
    fn new(area: Arc<ComArea>, direction: Direction) -> Self {
        Self { area, direction, scratch: Vec::with_capacity(HEADER_SIZE + MAX_PAYLOAD) }
    }

    /// Returns the direction of the ring this producer writes.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the current tail index.
    pub fn tail(&self) -> u8 {
        self.area.ring(self.direction).tail.load(Ordering::Relaxed)
    }

    /// Returns the number of bytes written but not yet consumed.
    pub fn occupied(&self) -> usize {
        let ring = self.area.ring(self.direction);
        let head = ring.head.load(Ordering::Acquire);
        ring.tail.load(Ordering::Relaxed).wrapping_sub(head) as usize
    }

    /// Returns the number of bytes that can still be written.
    pub fn available(&self) -> usize {
        MAX_OCCUPANCY - self.occupied()
    }

    /// Returns true if a packet with `payload_len` payload bytes fits right now.
    pub fn room_for(&self, payload_len: usize) -> bool {
        self.occupied() + HEADER_SIZE + payload_len <= MAX_OCCUPANCY
    }

    /// Frames and appends a packet, then publishes it by advancing the tail.
    ///
    /// Fails without touching the ring if the payload is too large or there is no room.
    pub fn append(&mut self, kind: PacketKind, stream_id: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ErrorKind::PayloadTooLarge(payload.len()));
        }
        if !self.room_for(payload.len()) {
            return Err(ErrorKind::RingFull {
                required: HEADER_SIZE + payload.len(),
                available: self.available(),
            });
        }

        self.scratch.clear();
        PacketEncoder::encode_frame_into(&mut self.scratch, kind, stream_id, payload)?;

        let ring = self.area.ring(self.direction);
        let mut index = ring.tail.load(Ordering::Relaxed);
        for &byte in &self.scratch {
            ring.store(index, byte);
            index = index.wrapping_add(1);
        }
        ring.tail.store(index, Ordering::Release);
        Ok(())
    }

    /// Appends an owned packet.
    pub fn append_packet(&mut self, packet: &Packet) -> Result<()> {
        self.append(packet.kind(), packet.stream_id(), packet.payload())
    }
}

/// Reading end of a ring. Sole writer of the head.
pub struct Consumer {
    area: Arc<ComArea>,
    direction: Direction,
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("direction", &self.direction)
            .field("head", &self.head())
            .field("occupied", &self.occupied())
            .finish()
    }
}

impl Consumer {
    fn new(area: Arc<ComArea>, direction: Direction) -> Self {
        Self { area, direction }
    }

    /// Returns the direction of the ring this consumer reads.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the current head index.
    pub fn head(&self) -> u8 {
        self.area.ring(self.direction).head.load(Ordering::Relaxed)
    }

    /// Returns the number of bytes waiting to be consumed.
    pub fn occupied(&self) -> usize {
        let ring = self.area.ring(self.direction);
        let tail = ring.tail.load(Ordering::Acquire);
        tail.wrapping_sub(ring.head.load(Ordering::Relaxed)) as usize
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.occupied() == 0
    }

    /// Reads the header at the head without consuming it.
    pub fn peek_header(&self) -> Option<PacketHeader> {
        if self.occupied() < HEADER_SIZE {
            return None;
        }
        let bytes = self.copy_out(HEADER_SIZE);
        PacketDecoder::decode_header(&mut Cursor::new(&bytes[..])).ok()
    }

    /// Copies the whole frame described by `header` without consuming it.
    pub fn peek_frame(&self, header: &PacketHeader) -> Result<Vec<u8>> {
        if self.occupied() < header.frame_len() {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::Truncated));
        }
        Ok(self.copy_out(header.frame_len()))
    }

    /// Releases `len` bytes back to the producer.
    pub fn consume(&mut self, len: usize) {
        debug_assert!(len <= self.occupied(), "consume past the tail");
        let ring = self.area.ring(self.direction);
        let head = ring.head.load(Ordering::Relaxed);
        ring.head.store(head.wrapping_add(len as u8), Ordering::Release);
    }

    /// Releases everything currently waiting.
    pub fn discard_all(&mut self) {
        let occupied = self.occupied();
        self.consume(occupied);
    }

    /// Decodes and consumes the next packet.
    ///
    /// A frame that fails to decode is still consumed so the ring keeps moving.
    pub fn next_packet(&mut self) -> Option<Result<Packet>> {
        let header = self.peek_header()?;
        let frame = match self.peek_frame(&header) {
            Ok(frame) => frame,
            Err(err) => return Some(Err(err)),
        };
        self.consume(header.frame_len());
        Some(PacketDecoder::decode(&frame))
    }

    fn copy_out(&self, len: usize) -> Vec<u8> {
        let ring = self.area.ring(self.direction);
        let mut index = ring.head.load(Ordering::Relaxed);
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(ring.load(index));
            index = index.wrapping_add(1);
        }
        out
    }
}
