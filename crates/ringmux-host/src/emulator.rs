//! Software register bank and peer endpoint.
//!
//! The emulated bank is level triggered: the host interrupt is raised whenever an enabled
//! local event is pending and delivery is not masked. The peer endpoint plays the
//! co-processor: it owns the peer side of the rings and sets local events when it moves its
//! pointers, the way the real peer does after touching the shared area.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use ringmux_core::{
    error::{ErrorKind, Result},
    registers::{LocalEvents, NotificationRegisters, PeerEvents, Register},
};
use ringmux_protocol::{
    packet::Packet,
    ring::{ComArea, Consumer, Producer},
};
use tracing::trace;

use crate::interrupt::{self, InterruptLine, Interrupts};

/// Raw register contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterBank {
    /// Pending local events
    pub events: u8,
    /// Local events that raise the host interrupt
    pub enable: u8,
    /// Events published to the peer
    pub peer_events: u8,
    /// True while interrupt delivery is masked
    pub masked: bool,
}

#[derive(Debug)]
struct Shared {
    bank: Mutex<RegisterBank>,
    line: InterruptLine,
    peer_wakeups: Sender<()>,
}

impl Shared {
    /// Must be called with the bank locked.
    fn raise_if_due(&self, bank: &RegisterBank) {
        if !bank.masked && bank.events & bank.enable != 0 {
            self.line.raise();
        }
    }
}

/// Wires an area to an emulated bank: the host registers, the worker's interrupts and the peer.
///
/// Claims the peer endpoints of `area`.
pub fn attach(area: &Arc<ComArea>) -> Result<(SoftRegisters, Interrupts, PeerEndpoint)> {
    let (producer, consumer) = area.peer_endpoints()?;
    let (line, interrupts) = interrupt::channel();
    let (peer_wakeups, wakeups) = bounded(1);
    let shared = Arc::new(Shared { bank: Mutex::new(RegisterBank::default()), line, peer_wakeups });

    let registers = SoftRegisters { shared: shared.clone() };
    let peer = PeerEndpoint { producer, consumer, shared, wakeups };
    Ok((registers, interrupts, peer))
}

/// Host view of the emulated register bank.
#[derive(Clone, Debug)]
pub struct SoftRegisters {
    shared: Arc<Shared>,
}

impl SoftRegisters {
    /// Returns a copy of the register contents.
    pub fn snapshot(&self) -> RegisterBank {
        *self.shared.bank.lock()
    }
}

impl NotificationRegisters for SoftRegisters {
    fn read(&mut self, register: Register) -> u8 {
        let mut bank = self.shared.bank.lock();
        match register {
            Register::LocalEvents => std::mem::take(&mut bank.events),
            Register::Enable => bank.enable,
            Register::PeerEvents => bank.peer_events,
        }
    }

    fn write(&mut self, register: Register, value: u8) {
        let mut bank = self.shared.bank.lock();
        match register {
            Register::LocalEvents => bank.events = value,
            Register::Enable => bank.enable = value,
            Register::PeerEvents => {
                bank.peer_events |= value;
                match self.shared.peer_wakeups.try_send(()) {
                    Ok(()) | Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Disconnected(())) => trace!("peer events written after the peer went away"),
                }
            }
        }
        self.shared.raise_if_due(&bank);
    }

    fn mask_interrupts(&mut self) {
        self.shared.bank.lock().masked = true;
    }

    fn unmask_interrupts(&mut self) {
        let mut bank = self.shared.bank.lock();
        bank.masked = false;
        self.shared.raise_if_due(&bank);
    }
}

/// The co-processor side of an emulated link.
#[derive(Debug)]
pub struct PeerEndpoint {
    producer: Producer,
    consumer: Consumer,
    shared: Arc<Shared>,
    wakeups: Receiver<()>,
}

impl PeerEndpoint {
    /// Appends a packet to the ring towards the host and signals it.
    ///
    /// Fails with `RingFull` if the host has not freed enough room.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        self.producer.append_packet(packet)?;
        trace!(kind = ?packet.kind(), stream_id = packet.stream_id(), "peer sent packet");
        self.set_local_events(LocalEvents::INBOUND_TAIL);
        Ok(())
    }

    /// Like [`send`](Self::send), waiting up to `timeout` for room.
    pub fn send_timeout(&mut self, packet: &Packet, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.send(packet) {
                Err(ErrorKind::RingFull { .. }) if self.wait_until(deadline) => continue,
                result => return result,
            }
        }
    }

    /// Takes the next packet the host sent, signalling the freed room.
    pub fn recv(&mut self) -> Option<Result<Packet>> {
        let packet = self.consumer.next_packet()?;
        self.set_local_events(LocalEvents::OUTBOUND_HEAD);
        Some(packet)
    }

    /// Like [`recv`](Self::recv), waiting up to `timeout` for a packet.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Packet>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(packet) = self.recv() {
                return packet.map(Some);
            }
            if !self.wait_until(deadline) {
                return Ok(None);
            }
        }
    }

    /// Blocks until the host publishes peer events or `timeout` passes. Returns true if woken.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Reads and clears the events the host published.
    pub fn take_peer_events(&self) -> PeerEvents {
        let mut bank = self.shared.bank.lock();
        PeerEvents::from_bits_truncate(std::mem::take(&mut bank.peer_events))
    }

    /// Returns the local events the host is currently waiting for.
    pub fn enabled_events(&self) -> LocalEvents {
        LocalEvents::from_bits_truncate(self.shared.bank.lock().enable)
    }

    /// Returns true if the ring towards the host is empty.
    pub fn outbox_is_empty(&self) -> bool {
        self.producer.occupied() == 0
    }

    /// Sets local events, raising the host interrupt if they are enabled.
    pub fn set_local_events(&self, events: LocalEvents) {
        let mut bank = self.shared.bank.lock();
        bank.events |= events.bits();
        self.shared.raise_if_due(&bank);
    }

    fn wait_until(&self, deadline: Instant) -> bool {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.wakeups.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}
