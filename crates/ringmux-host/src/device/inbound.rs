//! Dispatch of packets read from the inbound ring.

use ringmux_core::{
    constants::HEADER_SIZE,
    error::{DecodingErrorKind, ErrorKind},
};
use ringmux_protocol::packet::{PacketHeader, PacketKind, CONNECT_ACCEPTED};
use ringmux_stream::{Completion, Socket, SocketFlags, Status};
use tracing::{debug, error, warn};

use super::Device;

impl Device {
    /// Consumes every packet in the inbound ring. Returns true if anything was consumed.
    pub(crate) fn drain_inbound(&mut self) -> bool {
        let mut progressed = false;
        while !self.inbound.is_empty() {
            let frame = match self.inbound.peek_header() {
                Some(header) => self.inbound.peek_frame(&header).map(|frame| (header, frame)),
                None => Err(ErrorKind::DecodingError(DecodingErrorKind::Truncated)),
            };
            match frame {
                Ok((header, frame)) => {
                    self.inbound.consume(header.frame_len());
                    self.dispatch(header, &frame[HEADER_SIZE..]);
                }
                Err(err) => {
                    // The peer publishes whole frames, so a partial one means the ring is garbage.
                    error!(%err, occupied = self.inbound.occupied(), "discarding partial frame in inbound ring");
                    self.statistics.protocol_violations += 1;
                    self.inbound.discard_all();
                }
            }
            progressed = true;
        }
        progressed
    }

    fn dispatch(&mut self, header: PacketHeader, payload: &[u8]) {
        let stream_id = header.stream_id;
        self.statistics.packets_received += 1;
        self.statistics.bytes_received += payload.len() as u64;

        let closed = self.sockets.find_by_stream_id(stream_id).map(Socket::is_closed);
        match (header.packet_kind(), closed) {
            // A Reset ends even a closed socket's wait to send its own Reset.
            (Ok(PacketKind::Reset), Some(_)) => {
                debug!(stream_id, "received reset");
                self.close_socket(stream_id, false);
            }
            (_, None) | (_, Some(true)) => {
                debug!(stream_id, kind = header.kind, "discarding packet for unknown or closed stream");
                self.statistics.packets_discarded += 1;
            }
            (Ok(PacketKind::ConnectResponse), Some(false)) => {
                self.handle_connect_response(stream_id, payload)
            }
            (Ok(PacketKind::Data), Some(false)) => self.handle_data(stream_id, payload),
            (Ok(PacketKind::Eos), Some(false)) => self.handle_eos(stream_id),
            (Ok(PacketKind::Connect), Some(false)) => {
                error!(stream_id, "peer sent a connect on a host stream");
                self.statistics.protocol_violations += 1;
                self.statistics.packets_discarded += 1;
            }
            (Err(err), Some(false)) => {
                error!(stream_id, kind = header.kind, %err, "peer sent a packet of unknown kind");
                self.statistics.protocol_violations += 1;
                self.statistics.packets_discarded += 1;
            }
        }
    }

    fn handle_connect_response(&mut self, stream_id: u8, payload: &[u8]) {
        let socket = match self.sockets.get_mut(stream_id) {
            Some(socket) => socket,
            None => return,
        };
        match (socket.pending_connect.take(), payload) {
            (Some(connect), [CONNECT_ACCEPTED]) => {
                debug!(stream_id, "connect accepted");
                connect.complete_status(Status::Ok);
            }
            (Some(connect), [result]) => {
                debug!(stream_id, result, "connect rejected");
                connect.complete_status(Status::ConnectUnknownService);
                self.close_socket(stream_id, false);
            }
            (Some(connect), _) => {
                socket.pending_connect = Some(connect);
                error!(stream_id, len = payload.len(), "connect response must carry one byte");
                self.statistics.protocol_violations += 1;
            }
            (None, _) => {
                error!(stream_id, "connect response without a pending connect");
                self.statistics.protocol_violations += 1;
            }
        }
    }

    fn handle_data(&mut self, stream_id: u8, payload: &[u8]) {
        let limit = self.config.max_receive_queue_bytes;
        let socket = match self.sockets.get_mut(stream_id) {
            Some(socket) => socket,
            None => return,
        };

        match socket.pending_read.take() {
            Some(read) if payload.len() <= read.command().capacity() => {
                read.complete(Completion::read(payload.to_vec()));
            }
            Some(read) => {
                warn!(
                    stream_id,
                    len = payload.len(),
                    capacity = read.command().capacity(),
                    "data does not fit the outstanding read"
                );
                // Closing fails the read with a reset.
                socket.pending_read = Some(read);
                self.close_socket(stream_id, true);
            }
            None if limit != 0 && socket.queued_bytes() + payload.len() > limit => {
                warn!(stream_id, queued = socket.queued_bytes(), limit, "receive queue limit exceeded");
                self.close_socket(stream_id, true);
            }
            None => socket.push_chunk(payload.to_vec()),
        }
    }

    fn handle_eos(&mut self, stream_id: u8) {
        let socket = match self.sockets.get_mut(stream_id) {
            Some(socket) => socket,
            None => return,
        };
        debug!(stream_id, "peer ended its direction");
        socket.flags.insert(SocketFlags::RECEIVED_EOS_FROM_PEER);

        if let Some(read) = socket.pending_read.take() {
            read.complete_status(Status::ReadEos);
            socket.flags.insert(SocketFlags::DELIVERED_EOS_TO_CALLER);
            if socket.flags.contains(SocketFlags::SENT_EOS_TO_PEER) {
                self.close_socket(stream_id, false);
            }
        }
    }
}
