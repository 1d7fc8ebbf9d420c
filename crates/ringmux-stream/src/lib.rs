#![warn(missing_docs)]

//! ringmux-stream: socket state machines, the socket table and the send arbiter.

/// Application requests and their completions.
pub mod request;
/// Ordered queue of sockets waiting for room in the outbound ring.
pub mod send_arbiter;
/// Per-stream socket state.
pub mod socket;
/// Resident sockets keyed by stream id and by owner.
pub mod socket_table;

pub use request::{Command, Completion, OwnerId, Request, Status};
pub use send_arbiter::{QueuedSend, SendArbiter};
pub use socket::{QueuedChunk, Socket, SocketFlags};
pub use socket_table::SocketTable;
