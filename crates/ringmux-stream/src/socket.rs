//! Per-stream socket state.
//!
//! A socket remembers at most one outstanding request of each kind: a connect, a read, and a
//! write or end of stream (both travel as outbound packets, so they share the write slot).
//! Data that arrives while no read is outstanding is held in a FIFO of chunks, one chunk per
//! Data packet, so reads see exactly the boundaries the peer sent.

use std::collections::VecDeque;

use bitflags::bitflags;
use tracing::debug;

use crate::request::{OwnerId, Request};

bitflags! {
    /// Lifecycle flags of a socket.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SocketFlags: u8 {
        /// No further requests are accepted; the socket waits only for deletion.
        const CLOSED = 1 << 0;
        /// A Reset still has to be transmitted before the socket can be deleted.
        const SHOULD_SEND_RESET = 1 << 1;
        /// The peer ended its direction.
        const RECEIVED_EOS_FROM_PEER = 1 << 2;
        /// A read completed with end of stream.
        const DELIVERED_EOS_TO_CALLER = 1 << 3;
        /// The caller asked to end its direction.
        const RECEIVED_EOS_FROM_CALLER = 1 << 4;
        /// The Eos packet reached the outbound ring.
        const SENT_EOS_TO_PEER = 1 << 5;
    }
}

/// One buffered inbound payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedChunk {
    data: Vec<u8>,
}

impl QueuedChunk {
    /// Wraps a payload.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the number of payload bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the chunk and returns its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// State of one logical stream.
#[derive(Debug)]
pub struct Socket {
    stream_id: u8,
    owner: OwnerId,
    local_id: u8,
    /// Lifecycle flags
    pub flags: SocketFlags,
    /// Connect waiting to be sent or answered
    pub pending_connect: Option<Request>,
    /// Read waiting for data or end of stream
    pub pending_read: Option<Request>,
    /// Write or end of stream waiting for room in the outbound ring
    pub pending_write: Option<Request>,
    receive_queue: VecDeque<QueuedChunk>,
    queued_bytes: usize,
}

impl Socket {
    /// Creates an open socket with no outstanding requests.
    pub fn new(stream_id: u8, owner: OwnerId, local_id: u8) -> Self {
        Self {
            stream_id,
            owner,
            local_id,
            flags: SocketFlags::empty(),
            pending_connect: None,
            pending_read: None,
            pending_write: None,
            receive_queue: VecDeque::new(),
            queued_bytes: 0,
        }
    }

    /// Returns the stream id carried in packets for this socket.
    pub fn stream_id(&self) -> u8 {
        self.stream_id
    }

    /// Returns the owning caller.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Returns the owner-local socket id.
    pub fn local_id(&self) -> u8 {
        self.local_id
    }

    /// Returns true once the socket stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.flags.contains(SocketFlags::CLOSED)
    }

    /// Returns true once end of stream went both ways: delivered to the caller and sent to the peer.
    pub fn eos_exchanged(&self) -> bool {
        self.flags
            .contains(SocketFlags::DELIVERED_EOS_TO_CALLER | SocketFlags::SENT_EOS_TO_PEER)
    }

    /// Returns true if any request is parked on the socket.
    pub fn has_pending(&self) -> bool {
        self.pending_connect.is_some() || self.pending_read.is_some() || self.pending_write.is_some()
    }

    /// Appends an inbound chunk.
    pub fn push_chunk(&mut self, data: Vec<u8>) {
        self.queued_bytes += data.len();
        self.receive_queue.push_back(QueuedChunk::new(data));
    }

    /// Returns the length of the oldest buffered chunk.
    pub fn front_chunk_len(&self) -> Option<usize> {
        self.receive_queue.front().map(QueuedChunk::len)
    }

    /// Removes the oldest buffered chunk.
    pub fn pop_chunk(&mut self) -> Option<QueuedChunk> {
        let chunk = self.receive_queue.pop_front()?;
        self.queued_bytes -= chunk.len();
        Some(chunk)
    }

    /// Returns the number of buffered chunks.
    pub fn queued_chunks(&self) -> usize {
        self.receive_queue.len()
    }

    /// Returns the number of buffered bytes.
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Fails every outstanding request exactly once, drops buffered data and marks the socket closed.
    ///
    /// Returns the number of requests that were failed.
    pub fn abort(&mut self) -> usize {
        let mut failed = 0;
        for slot in [&mut self.pending_connect, &mut self.pending_read, &mut self.pending_write] {
            if let Some(request) = slot.take() {
                request.fail();
                failed += 1;
            }
        }

        if !self.receive_queue.is_empty() {
            debug!(
                stream_id = self.stream_id,
                chunks = self.receive_queue.len(),
                bytes = self.queued_bytes,
                "dropping buffered data of closed socket"
            );
        }
        self.receive_queue.clear();
        self.queued_bytes = 0;

        self.flags.insert(SocketFlags::CLOSED);
        failed
    }
}
