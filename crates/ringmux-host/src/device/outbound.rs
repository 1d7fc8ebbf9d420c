//! Draining the send arbiter into the outbound ring.

use ringmux_protocol::packet::PacketKind;
use ringmux_stream::{Command, Completion, Request, SocketFlags, Status};
use tracing::{error, trace};

use super::Device;

/// What a queued socket has to transmit when its turn comes.
enum QueuedWork {
    Connect(Vec<u8>),
    Write(Request),
    Reset,
    Nothing,
}

impl Device {
    /// Sends queued work in strict FIFO order while the head fits. Returns true if anything was sent.
    pub(crate) fn drain_outbound(&mut self) -> bool {
        let mut progressed = false;
        while let Some(head) = self.arbiter.front() {
            if !self.outbound.room_for(head.required_len) {
                trace!(stream_id = head.stream_id, required = head.required_len, "arbiter head does not fit");
                break;
            }
            self.arbiter.pop_front();
            self.serve(head.stream_id);
            progressed = true;
        }
        progressed
    }

    fn serve(&mut self, stream_id: u8) {
        let work = match self.sockets.get_mut(stream_id) {
            Some(socket) => {
                if let Some(connect) = socket.pending_connect.as_ref() {
                    QueuedWork::Connect(connect.command().payload().to_vec())
                } else if let Some(write) = socket.pending_write.take() {
                    QueuedWork::Write(write)
                } else if socket.flags.contains(SocketFlags::SHOULD_SEND_RESET) {
                    QueuedWork::Reset
                } else {
                    QueuedWork::Nothing
                }
            }
            None => {
                error!(stream_id, "queued stream has no socket");
                return;
            }
        };

        match work {
            QueuedWork::Connect(service) => self.transmit(PacketKind::Connect, stream_id, &service),
            QueuedWork::Write(request) => self.send_queued_write(stream_id, request),
            QueuedWork::Reset => {
                self.transmit(PacketKind::Reset, stream_id, &[]);
                self.sockets.delete(stream_id);
            }
            QueuedWork::Nothing => error!(stream_id, "queued socket has nothing to send"),
        }
    }

    fn send_queued_write(&mut self, stream_id: u8, request: Request) {
        match request.command() {
            Command::Write { data } => {
                let len = data.len();
                self.transmit(PacketKind::Data, stream_id, data);
                request.complete(Completion::written(len));
            }
            _ => {
                self.transmit(PacketKind::Eos, stream_id, &[]);
                request.complete_status(Status::Ok);
                self.mark_eos_sent(stream_id);
            }
        }
    }

    /// Records that end of stream reached the ring; closes the socket if both directions are done.
    pub(crate) fn mark_eos_sent(&mut self, stream_id: u8) {
        let done = match self.sockets.get_mut(stream_id) {
            Some(socket) => {
                socket.flags.insert(SocketFlags::SENT_EOS_TO_PEER);
                socket.flags.contains(SocketFlags::DELIVERED_EOS_TO_CALLER)
            }
            None => false,
        };
        if done {
            self.close_socket(stream_id, false);
        }
    }
}
