//! Application request handling.
//!
//! Every request is answered exactly once, either here or later by the inbound or outbound
//! path. Misuse, such as a second read while one is outstanding, fails the request and
//! resets the stream.

use ringmux_core::constants::MAX_PAYLOAD;
use ringmux_protocol::packet::PacketKind;
use ringmux_stream::{Command, Completion, Request, Socket, SocketFlags, Status};
use tracing::{debug, warn};

use super::Device;

impl Device {
    /// Handles one application request.
    pub fn handle_request(&mut self, request: Request) {
        let existing = self.sockets.find(request.owner(), request.socket_id());
        debug!(
            owner = request.owner().0,
            socket = request.socket_id(),
            stream_id = ?existing,
            command = request.command().name(),
            "handling request"
        );

        // Only connect cares about closed-but-resident sockets.
        let open = existing.filter(|&stream_id| {
            self.sockets.find_by_stream_id(stream_id).map_or(false, |socket| !socket.is_closed())
        });

        match request.command() {
            Command::Connect { .. } => self.handle_connect(request, existing),
            Command::Read { .. } => self.handle_read(request, open),
            Command::Write { .. } => self.handle_write(request, open),
            Command::Eos => self.handle_eos_request(request, open),
            Command::Reset => self.handle_reset(request, open),
        }
    }

    fn handle_connect(&mut self, request: Request, existing: Option<u8>) {
        if existing.is_some() {
            request.complete_status(Status::SocketInUse);
            return;
        }

        let service_len = request.command().payload().len();
        if service_len > MAX_PAYLOAD {
            warn!(len = service_len, "service name does not fit in a packet");
            request.complete_status(Status::ConnectReset);
            return;
        }

        let stream_id = match self.sockets.create(request.owner(), request.socket_id()) {
            Ok(stream_id) => stream_id,
            Err(err) => {
                warn!(%err, "cannot create socket");
                request.complete_status(Status::ConnectReset);
                return;
            }
        };

        if self.can_send_now(service_len) {
            self.transmit(PacketKind::Connect, stream_id, request.command().payload());
        } else {
            self.arbiter.enqueue(stream_id, service_len);
        }
        if let Some(socket) = self.sockets.get_mut(stream_id) {
            socket.pending_connect = Some(request);
        }
    }

    fn handle_read(&mut self, request: Request, open: Option<u8>) {
        let stream_id = match open {
            Some(stream_id) => stream_id,
            None => return request.complete_status(Status::ReadReset),
        };
        let socket = match self.sockets.get_mut(stream_id) {
            Some(socket) => socket,
            None => return request.complete_status(Status::ReadReset),
        };

        if socket.pending_connect.is_some() || socket.pending_read.is_some() {
            warn!(stream_id, "read while a connect or read is outstanding");
            request.fail();
            self.close_socket(stream_id, true);
            return;
        }

        match socket.front_chunk_len() {
            Some(len) if len > request.command().capacity() => {
                warn!(stream_id, len, capacity = request.command().capacity(), "buffered data does not fit the read");
                request.fail();
                self.close_socket(stream_id, true);
            }
            Some(_) => {
                if let Some(chunk) = socket.pop_chunk() {
                    request.complete(Completion::read(chunk.into_data()));
                }
            }
            None if socket.flags.contains(SocketFlags::RECEIVED_EOS_FROM_PEER) => {
                request.complete_status(Status::ReadEos);
                socket.flags.insert(SocketFlags::DELIVERED_EOS_TO_CALLER);
                if socket.flags.contains(SocketFlags::SENT_EOS_TO_PEER) {
                    self.close_socket(stream_id, false);
                }
            }
            None => socket.pending_read = Some(request),
        }
    }

    fn handle_write(&mut self, request: Request, open: Option<u8>) {
        let stream_id = match open {
            Some(stream_id) => stream_id,
            None => return request.complete_status(Status::WriteReset),
        };

        let len = request.command().payload().len();
        let misuse = match self.sockets.find_by_stream_id(stream_id) {
            Some(socket) => write_conflicts(socket) || len > MAX_PAYLOAD,
            None => return request.complete_status(Status::WriteReset),
        };
        if misuse {
            warn!(stream_id, len, "write while busy, after end of stream or too large");
            request.fail();
            self.close_socket(stream_id, true);
            return;
        }

        if self.can_send_now(len) {
            self.transmit(PacketKind::Data, stream_id, request.command().payload());
            request.complete(Completion::written(len));
        } else {
            self.park_write(stream_id, request, len);
        }
    }

    fn handle_eos_request(&mut self, request: Request, open: Option<u8>) {
        let stream_id = match open {
            Some(stream_id) => stream_id,
            None => return request.complete_status(Status::EosReset),
        };

        let misuse = match self.sockets.get_mut(stream_id) {
            Some(socket) => {
                let conflict = write_conflicts(socket);
                if !conflict {
                    socket.flags.insert(SocketFlags::RECEIVED_EOS_FROM_CALLER);
                }
                conflict
            }
            None => return request.complete_status(Status::EosReset),
        };
        if misuse {
            warn!(stream_id, "end of stream while busy or repeated");
            request.fail();
            self.close_socket(stream_id, true);
            return;
        }

        if self.can_send_now(0) {
            self.transmit(PacketKind::Eos, stream_id, &[]);
            request.complete_status(Status::Ok);
            self.mark_eos_sent(stream_id);
        } else {
            self.park_write(stream_id, request, 0);
        }
    }

    fn handle_reset(&mut self, request: Request, open: Option<u8>) {
        request.complete_status(Status::ResetOk);
        if let Some(stream_id) = open {
            self.close_socket(stream_id, true);
        }
    }

    fn park_write(&mut self, stream_id: u8, request: Request, len: usize) {
        if let Some(socket) = self.sockets.get_mut(stream_id) {
            socket.pending_write = Some(request);
            self.arbiter.enqueue(stream_id, len);
        }
    }
}

/// A write or end of stream is refused while a connect or another write is outstanding,
/// or once the caller already ended its direction.
fn write_conflicts(socket: &Socket) -> bool {
    socket.pending_connect.is_some()
        || socket.pending_write.is_some()
        || socket.flags.contains(SocketFlags::RECEIVED_EOS_FROM_CALLER)
}
