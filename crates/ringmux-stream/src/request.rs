//! Application requests and their completions.
//!
//! A request travels from a caller to the worker and is answered exactly once. Completion
//! consumes the request, so a request parked in a socket slot can never be answered twice.

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::trace;

/// Opaque identity of the caller that owns a socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

/// What a request asks the worker to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Open a stream to the named service.
    Connect {
        /// Service name sent as the Connect payload
        service: Vec<u8>,
    },
    /// Receive one chunk of at most `capacity` bytes.
    Read {
        /// Largest chunk the caller accepts
        capacity: usize,
    },
    /// Send one chunk of data.
    Write {
        /// Bytes to send
        data: Vec<u8>,
    },
    /// Signal end of stream in the caller's direction.
    Eos,
    /// Abort the stream.
    Reset,
}

impl Command {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::Read { .. } => "read",
            Command::Write { .. } => "write",
            Command::Eos => "eos",
            Command::Reset => "reset",
        }
    }

    /// Returns the bytes this command puts on the wire: the service name or the write data.
    pub fn payload(&self) -> &[u8] {
        match self {
            Command::Connect { service } => service,
            Command::Write { data } => data,
            _ => &[],
        }
    }

    /// Returns the capacity of a read, zero for other commands.
    pub fn capacity(&self) -> usize {
        match self {
            Command::Read { capacity } => *capacity,
            _ => 0,
        }
    }

    /// Returns the status a request with this command fails with when its socket is reset.
    pub fn reset_status(&self) -> Status {
        match self {
            Command::Connect { .. } => Status::ConnectReset,
            Command::Read { .. } => Status::ReadReset,
            Command::Write { .. } => Status::WriteReset,
            Command::Eos => Status::EosReset,
            Command::Reset => Status::ResetOk,
        }
    }
}

/// Result code of a completed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation succeeded.
    Ok,
    /// A socket with this local id already exists for the owner.
    SocketInUse,
    /// The connect failed or the socket was reset before it was answered.
    ConnectReset,
    /// The peer has no service with the requested name.
    ConnectUnknownService,
    /// The read failed or the socket was reset.
    ReadReset,
    /// The peer closed its direction; no more data will arrive.
    ReadEos,
    /// The write failed or the socket was reset.
    WriteReset,
    /// The end of stream failed or the socket was reset.
    EosReset,
    /// The reset was carried out.
    ResetOk,
}

impl Status {
    /// Returns true for statuses that report a failure.
    pub fn is_failure(self) -> bool {
        !matches!(self, Status::Ok | Status::ReadEos | Status::ResetOk)
    }
}

/// The answer to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Result code
    pub status: Status,
    /// Bytes delivered by a successful read, empty otherwise
    pub data: Vec<u8>,
    /// Bytes read or written
    pub length: usize,
}

impl Completion {
    /// A completion carrying only a status.
    pub fn status(status: Status) -> Self {
        Self { status, data: Vec::new(), length: 0 }
    }

    /// A successful read delivering `data`.
    pub fn read(data: Vec<u8>) -> Self {
        Self { status: Status::Ok, length: data.len(), data }
    }

    /// A successful write of `length` bytes.
    pub fn written(length: usize) -> Self {
        Self { status: Status::Ok, data: Vec::new(), length }
    }
}

/// A request in flight from submission until its single completion.
#[derive(Debug)]
pub struct Request {
    owner: OwnerId,
    socket_id: u8,
    command: Command,
    reply: Sender<Completion>,
}

impl Request {
    /// Creates a request together with the receiver its completion will arrive on.
    pub fn new(owner: OwnerId, socket_id: u8, command: Command) -> (Request, Receiver<Completion>) {
        let (reply, completion) = bounded(1);
        (Self::with_reply(owner, socket_id, command, reply), completion)
    }

    /// Creates a request answered on an existing channel.
    pub fn with_reply(
        owner: OwnerId,
        socket_id: u8,
        command: Command,
        reply: Sender<Completion>,
    ) -> Request {
        Request { owner, socket_id, command, reply }
    }

    /// Returns the owner that submitted the request.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Returns the owner-local socket id the request targets.
    pub fn socket_id(&self) -> u8 {
        self.socket_id
    }

    /// Returns the command.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Answers the request, consuming it.
    pub fn complete(self, completion: Completion) {
        if self.reply.send(completion).is_err() {
            trace!(owner = self.owner.0, socket = self.socket_id, "requester went away before completion");
        }
    }

    /// Answers the request with a bare status.
    pub fn complete_status(self, status: Status) {
        self.complete(Completion::status(status))
    }

    /// Fails the request with the reset status matching its command.
    pub fn fail(self) {
        let status = self.command.reset_status();
        self.complete_status(status)
    }
}
