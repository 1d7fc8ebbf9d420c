//! The device context: ring endpoints, the live socket set and the send arbiter.
//!
//! A `Device` is owned by exactly one worker. Everything here runs without locks; the only
//! state shared with the peer is the pair of rings, and the device only ever writes the
//! outbound tail and the inbound head.
//!
//! # Module Organization
//!
//! - [`inbound`] - dispatch of packets read from the inbound ring
//! - [`outbound`] - draining the send arbiter into the outbound ring
//! - [`requests`] - handling of application requests

use std::sync::Arc;

use ringmux_core::{
    config::Config,
    error::Result,
    registers::{LocalEvents, PeerEvents},
};
use ringmux_protocol::{
    packet::PacketKind,
    ring::{ComArea, Consumer, Producer},
};
use ringmux_stream::{SendArbiter, SocketFlags, SocketTable};
use tracing::{debug, error};

use crate::statistics::DeviceStatistics;

pub mod inbound;
pub mod outbound;
pub mod requests;

/// Ring positions captured when the worker wakes, used to tell the peer what moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingMarks {
    /// Outbound tail at wake time
    pub outbound_tail: u8,
    /// Inbound head at wake time
    pub inbound_head: u8,
}

/// Protocol state of one host side.
#[derive(Debug)]
pub struct Device {
    config: Config,
    outbound: Producer,
    inbound: Consumer,
    sockets: SocketTable,
    arbiter: SendArbiter,
    statistics: DeviceStatistics,
}

impl Device {
    /// Creates a device over the host side of `area`.
    ///
    /// Fails with `EndpointClaimed` if the host endpoints were already taken.
    pub fn new(config: Config, area: &Arc<ComArea>) -> Result<Self> {
        let (outbound, inbound) = area.host_endpoints()?;
        let sockets = SocketTable::new(config.effective_max_sockets());
        Ok(Self {
            config,
            outbound,
            inbound,
            sockets,
            arbiter: SendArbiter::new(),
            statistics: DeviceStatistics::default(),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the live socket set.
    pub fn sockets(&self) -> &SocketTable {
        &self.sockets
    }

    /// Returns the send arbiter.
    pub fn arbiter(&self) -> &SendArbiter {
        &self.arbiter
    }

    /// Returns the traffic counters.
    pub fn statistics(&self) -> &DeviceStatistics {
        &self.statistics
    }

    /// Captures the pointers the device owns.
    pub fn marks(&self) -> RingMarks {
        RingMarks { outbound_tail: self.outbound.tail(), inbound_head: self.inbound.head() }
    }

    /// Returns which of the device's pointers moved since `marks` were taken.
    pub fn peer_events_since(&self, marks: RingMarks) -> PeerEvents {
        let mut events = PeerEvents::empty();
        if self.outbound.tail() != marks.outbound_tail {
            events |= PeerEvents::OUTBOUND_TAIL;
        }
        if self.inbound.head() != marks.inbound_head {
            events |= PeerEvents::INBOUND_HEAD;
        }
        events
    }

    /// Drains both rings until neither makes progress. Returns true if anything moved.
    pub fn poll(&mut self) -> bool {
        let mut progressed = false;
        loop {
            let received = self.drain_inbound();
            let sent = self.drain_outbound();
            if !received && !sent {
                return progressed;
            }
            progressed = true;
        }
    }

    /// Returns the peer events the worker must wait for before sleeping.
    ///
    /// Empty means the worker cannot sleep yet: either inbound data is waiting or the arbiter
    /// head fits in the outbound ring.
    pub fn wake_conditions(&self) -> LocalEvents {
        if !self.inbound.is_empty() {
            return LocalEvents::empty();
        }
        match self.arbiter.front() {
            None => LocalEvents::INBOUND_TAIL,
            Some(head) if !self.outbound.room_for(head.required_len) => {
                LocalEvents::INBOUND_TAIL | LocalEvents::OUTBOUND_HEAD
            }
            Some(_) => LocalEvents::empty(),
        }
    }

    /// Closes a socket, failing its outstanding requests.
    ///
    /// With `emit_reset` the peer is told with a Reset; if it cannot be sent right away the
    /// socket stays resident, closed, until the arbiter gets to it.
    pub fn close_socket(&mut self, stream_id: u8, emit_reset: bool) {
        let failed = match self.sockets.get_mut(stream_id) {
            Some(socket) => socket.abort(),
            None => return,
        };
        self.arbiter.remove(stream_id);
        debug!(stream_id, emit_reset, failed, "closing socket");

        if emit_reset {
            if self.can_send_now(0) {
                self.transmit(PacketKind::Reset, stream_id, &[]);
            } else {
                if let Some(socket) = self.sockets.get_mut(stream_id) {
                    socket.flags.insert(SocketFlags::SHOULD_SEND_RESET);
                }
                self.arbiter.enqueue(stream_id, 0);
                return;
            }
        }
        self.sockets.delete(stream_id);
    }

    /// True if a packet may bypass the arbiter: nothing is waiting and it fits.
    fn can_send_now(&self, payload_len: usize) -> bool {
        self.arbiter.is_empty() && self.outbound.room_for(payload_len)
    }

    /// Appends a packet whose room was already checked.
    fn transmit(&mut self, kind: PacketKind, stream_id: u8, payload: &[u8]) {
        match self.outbound.append(kind, stream_id, payload) {
            Ok(()) => {
                debug!(?kind, stream_id, len = payload.len(), "sent packet");
                self.statistics.packets_sent += 1;
                self.statistics.bytes_sent += payload.len() as u64;
                if kind == PacketKind::Reset {
                    self.statistics.resets_sent += 1;
                }
            }
            Err(err) => error!(%err, ?kind, stream_id, "could not append packet to the outbound ring"),
        }
    }
}
