//! Resident sockets keyed by stream id and by `(owner, local_id)`.
//!
//! Host-initiated streams take odd ids starting at 1. Allocation resumes after the last id
//! handed out and skips ids that are still resident, closed-but-resident sockets included, so
//! a stale Reset still queued for an old socket can never name a new one.

use std::collections::HashMap;

use ringmux_core::{
    constants::{FIRST_STREAM_ID, STREAM_ID_SPACE, STREAM_ID_STEP},
    error::{ErrorKind, Result},
};
use tracing::debug;

use crate::{request::OwnerId, socket::Socket};

/// The live socket set.
#[derive(Debug)]
pub struct SocketTable {
    sockets: HashMap<u8, Socket>,
    by_owner: HashMap<(OwnerId, u8), u8>,
    next_stream_id: u8,
    max_sockets: usize,
}

impl SocketTable {
    /// Creates an empty table holding at most `max_sockets` sockets (clamped to the id space).
    pub fn new(max_sockets: usize) -> Self {
        Self {
            sockets: HashMap::new(),
            by_owner: HashMap::new(),
            next_stream_id: FIRST_STREAM_ID,
            max_sockets: max_sockets.min(STREAM_ID_SPACE),
        }
    }

    /// Creates a socket for `(owner, local_id)` and returns its stream id.
    ///
    /// The caller must have checked with [`find`](Self::find) that no socket exists for the pair.
    pub fn create(&mut self, owner: OwnerId, local_id: u8) -> Result<u8> {
        debug_assert!(!self.by_owner.contains_key(&(owner, local_id)));
        if self.sockets.len() >= self.max_sockets {
            return Err(ErrorKind::SocketTableFull);
        }
        let stream_id = self.allocate_stream_id().ok_or(ErrorKind::SocketTableFull)?;

        self.sockets.insert(stream_id, Socket::new(stream_id, owner, local_id));
        self.by_owner.insert((owner, local_id), stream_id);
        debug!(stream_id, owner = owner.0, local_id, "created socket");
        Ok(stream_id)
    }

    /// Looks up the stream id of the socket owned by `owner` under `local_id`.
    pub fn find(&self, owner: OwnerId, local_id: u8) -> Option<u8> {
        self.by_owner.get(&(owner, local_id)).copied()
    }

    /// Looks up a socket by stream id.
    pub fn find_by_stream_id(&self, stream_id: u8) -> Option<&Socket> {
        self.sockets.get(&stream_id)
    }

    /// Looks up a socket by stream id for modification.
    pub fn get_mut(&mut self, stream_id: u8) -> Option<&mut Socket> {
        self.sockets.get_mut(&stream_id)
    }

    /// Returns true if a socket with this stream id is resident.
    pub fn contains(&self, stream_id: u8) -> bool {
        self.sockets.contains_key(&stream_id)
    }

    /// Removes a socket, freeing its stream id and its `(owner, local_id)` pair.
    pub fn delete(&mut self, stream_id: u8) -> Option<Socket> {
        let socket = self.sockets.remove(&stream_id)?;
        self.by_owner.remove(&(socket.owner(), socket.local_id()));
        debug!(stream_id, "deleted socket");
        Some(socket)
    }

    /// Returns the number of resident sockets.
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Returns true if no socket is resident.
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Iterates over resident sockets in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Socket> {
        self.sockets.values()
    }

    fn allocate_stream_id(&mut self) -> Option<u8> {
        for _ in 0..STREAM_ID_SPACE {
            let candidate = self.next_stream_id;
            self.next_stream_id = self.next_stream_id.wrapping_add(STREAM_ID_STEP);
            if !self.sockets.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new(STREAM_ID_SPACE)
    }
}
