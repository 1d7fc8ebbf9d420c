//! Caller-side handles.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use ringmux_core::error::{ErrorKind, Result};
use ringmux_stream::{Command, Completion, OwnerId, Request};

/// A handle for submitting requests to a running driver.
///
/// Every client has its own owner identity, so local socket ids of different clients never
/// collide. Cloning a client shares its identity and therefore its sockets.
#[derive(Clone, Debug)]
pub struct Client {
    owner: OwnerId,
    requests: Sender<Request>,
}

impl Client {
    pub(crate) fn new(owner: OwnerId, requests: Sender<Request>) -> Self {
        Self { owner, requests }
    }

    /// Returns the owner identity of this client.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Submits a request without waiting for its completion.
    pub fn submit(&self, socket_id: u8, command: Command) -> Result<PendingRequest> {
        let (request, completion) = Request::new(self.owner, socket_id, command);
        self.requests.send(request).map_err(|_| ErrorKind::WorkerStopped)?;
        Ok(PendingRequest { completion })
    }

    /// Opens socket `socket_id` to the named service and waits for the peer's answer.
    pub fn connect(&self, socket_id: u8, service: &[u8]) -> Result<Completion> {
        self.submit(socket_id, Command::Connect { service: service.to_vec() })?.wait()
    }

    /// Waits for the next chunk of at most `capacity` bytes.
    pub fn read(&self, socket_id: u8, capacity: usize) -> Result<Completion> {
        self.submit(socket_id, Command::Read { capacity })?.wait()
    }

    /// Sends one chunk and waits until it is in the ring.
    pub fn write(&self, socket_id: u8, data: &[u8]) -> Result<Completion> {
        self.submit(socket_id, Command::Write { data: data.to_vec() })?.wait()
    }

    /// Ends the caller's direction of the stream.
    pub fn eos(&self, socket_id: u8) -> Result<Completion> {
        self.submit(socket_id, Command::Eos)?.wait()
    }

    /// Aborts the stream.
    pub fn reset(&self, socket_id: u8) -> Result<Completion> {
        self.submit(socket_id, Command::Reset)?.wait()
    }
}

/// A submitted request whose completion has not been collected yet.
#[derive(Debug)]
pub struct PendingRequest {
    completion: Receiver<Completion>,
}

impl PendingRequest {
    /// Blocks until the request completes.
    pub fn wait(self) -> Result<Completion> {
        self.completion.recv().map_err(|_| ErrorKind::WorkerStopped)
    }

    /// Blocks for at most `timeout`. Returns `None` if the request is still in flight.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<Completion>> {
        match self.completion.recv_timeout(timeout) {
            Ok(completion) => Ok(Some(completion)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ErrorKind::WorkerStopped),
        }
    }

    /// Returns the completion if it is already there.
    pub fn try_wait(&self) -> Result<Option<Completion>> {
        match self.completion.try_recv() {
            Ok(completion) => Ok(Some(completion)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ErrorKind::WorkerStopped),
        }
    }
}
