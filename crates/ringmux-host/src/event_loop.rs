//! The worker loop.
//!
//! The loop sleeps until a request or an interrupt arrives, then polls both rings until it
//! can arm a wake condition. Arming happens with interrupts masked: the local events are
//! acknowledged, the arm mask is computed from fresh ring state and written together with
//! the peer events. An event the peer raises after the acknowledgement stays pending and
//! fires as soon as the section ends, so no wake-up is lost between check and sleep.

use crossbeam_channel::{never, select, Receiver};
use ringmux_core::registers::{LocalEvents, NotificationRegisters, Register};
use ringmux_stream::Request;
use tracing::trace;

use crate::{
    device::{Device, RingMarks},
    interrupt::{CriticalSection, Interrupts},
};

/// What woke the worker.
#[derive(Debug)]
pub enum Wake {
    /// A caller submitted a request.
    Request(Request),
    /// The register bank raised the interrupt.
    Interrupt,
}

/// The single worker that owns a [`Device`].
#[derive(Debug)]
pub struct EventLoop<R: NotificationRegisters> {
    device: Device,
    registers: R,
    requests: Receiver<Request>,
    interrupts: Receiver<()>,
}

impl<R: NotificationRegisters> EventLoop<R> {
    /// Creates a loop over a device, its register bank and its two wake sources.
    pub fn new(device: Device, registers: R, requests: Receiver<Request>, interrupts: Interrupts) -> Self {
        Self { device, registers, requests, interrupts: interrupts.into_receiver() }
    }

    /// Returns the device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns the register bank.
    pub fn registers(&self) -> &R {
        &self.registers
    }

    /// Runs until every request sender is gone, then hands the device back.
    pub fn run(mut self) -> Device {
        while let Some(wake) = self.wait() {
            self.process(wake);
        }
        trace!("request channel closed, worker exiting");
        self.device
    }

    /// Blocks for the next wake source. Returns `None` once no request can arrive anymore.
    fn wait(&mut self) -> Option<Wake> {
        loop {
            let signal = select! {
                recv(self.requests) -> request => return request.ok().map(Wake::Request),
                recv(self.interrupts) -> signal => signal,
            };
            match signal {
                Ok(()) => return Some(Wake::Interrupt),
                Err(_) => {
                    trace!("interrupt line closed");
                    self.interrupts = never();
                }
            }
        }
    }

    /// Handles one wake: drains queued requests, then polls until a wake condition is armed.
    pub fn process(&mut self, wake: Wake) {
        let marks = self.device.marks();

        if let Wake::Request(first) = wake {
            trace!("woken by request");
            {
                let mut section = CriticalSection::enter(&mut self.registers);
                section.write(Register::Enable, 0);
            }
            self.device.handle_request(first);
            while let Ok(request) = self.requests.try_recv() {
                self.device.handle_request(request);
            }
        } else {
            trace!("woken by interrupt");
        }

        self.settle(marks);
    }

    fn settle(&mut self, marks: RingMarks) {
        loop {
            self.device.poll();
            let moved = self.device.peer_events_since(marks);

            let armed = {
                let mut section = CriticalSection::enter(&mut self.registers);
                section.read(Register::LocalEvents);

                let armed = self.device.wake_conditions();
                if !armed.is_empty() {
                    section.write(Register::Enable, armed.bits());
                    if !moved.is_empty() {
                        section.write(Register::PeerEvents, moved.bits());
                    }
                }
                armed
            };

            if armed != LocalEvents::empty() {
                trace!(?armed, ?moved, "armed wake conditions");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use ringmux_core::config::Config;
    use ringmux_protocol::{packet::PacketKind, ring::ComArea};
    use ringmux_stream::{Command, OwnerId};

    use crate::interrupt;

    #[derive(Debug, Default)]
    struct Recording {
        writes: Vec<(Register, u8)>,
        masked: bool,
        local_events_reads: usize,
    }

    impl NotificationRegisters for Recording {
        fn read(&mut self, register: Register) -> u8 {
            assert!(self.masked, "register read outside a critical section");
            if register == Register::LocalEvents {
                self.local_events_reads += 1;
            }
            0
        }

        fn write(&mut self, register: Register, value: u8) {
            assert!(self.masked, "register write outside a critical section");
            self.writes.push((register, value));
        }

        fn mask_interrupts(&mut self) {
            self.masked = true;
        }

        fn unmask_interrupts(&mut self) {
            self.masked = false;
        }
    }

    fn setup() -> (EventLoop<Recording>, crossbeam_channel::Sender<Request>, std::sync::Arc<ComArea>) {
        let area = ComArea::new();
        let device = Device::new(Config::default(), &area).unwrap();
        let (sender, receiver) = unbounded();
        let (_line, interrupts) = interrupt::channel();
        (EventLoop::new(device, Recording::default(), receiver, interrupts), sender, area)
    }

    #[test]
    fn test_idle_interrupt_arms_inbound_tail_only() {
        let (mut event_loop, _sender, _area) = setup();
        event_loop.process(Wake::Interrupt);

        let registers = event_loop.registers();
        assert_eq!(registers.writes, vec![(Register::Enable, LocalEvents::INBOUND_TAIL.bits())]);
        assert_eq!(registers.local_events_reads, 1);
        assert!(!registers.masked);
    }

    #[test]
    fn test_request_wake_disables_then_publishes_moved_tail() {
        let (mut event_loop, sender, _area) = setup();
        let (connect, _done) = Request::new(OwnerId(1), 0, Command::Connect { service: b"echo".to_vec() });
        let (second, _second_done) =
            Request::new(OwnerId(1), 1, Command::Connect { service: b"time".to_vec() });
        sender.send(second).unwrap();

        event_loop.process(Wake::Request(connect));

        // Both queued requests were handled in the same wake.
        assert_eq!(event_loop.device().sockets().len(), 2);
        assert_eq!(
            event_loop.registers().writes,
            vec![
                (Register::Enable, 0),
                (Register::Enable, LocalEvents::INBOUND_TAIL.bits()),
                (Register::PeerEvents, 1),
            ]
        );
    }

    #[test]
    fn test_drains_inbound_before_arming() {
        let (mut event_loop, _sender, area) = setup();
        let (mut peer_tx, _peer_rx) = area.peer_endpoints().unwrap();
        peer_tx.append(PacketKind::Reset, 9, &[]).unwrap();

        event_loop.process(Wake::Interrupt);

        // The packet was consumed before arming, and the moved head was published.
        assert_eq!(event_loop.device().statistics().packets_received, 1);
        assert_eq!(
            event_loop.registers().writes,
            vec![(Register::Enable, LocalEvents::INBOUND_TAIL.bits()), (Register::PeerEvents, 2)]
        );
    }

    #[test]
    fn test_full_ring_arms_both_events() {
        let (mut event_loop, sender, _area) = setup();
        let mut completions = Vec::new();
        let mut requests = Vec::new();
        for socket_id in 0..3u8 {
            let (connect, done) =
                Request::new(OwnerId(1), socket_id, Command::Connect { service: vec![b'x'; 100] });
            requests.push(connect);
            completions.push(done);
        }
        let mut requests = requests.into_iter();
        let first = requests.next().unwrap();
        for request in requests {
            sender.send(request).unwrap();
        }

        event_loop.process(Wake::Request(first));

        // Two connects fit, the third waits for the peer to free room.
        assert_eq!(event_loop.device().arbiter().len(), 1);
        let last = event_loop.registers().writes.iter().rev().find(|(register, _)| *register == Register::Enable);
        assert_eq!(
            last,
            Some(&(Register::Enable, (LocalEvents::INBOUND_TAIL | LocalEvents::OUTBOUND_HEAD).bits()))
        );
    }

    #[test]
    fn test_run_returns_device_when_senders_gone() {
        let (event_loop, sender, _area) = setup();
        drop(sender);
        let device = event_loop.run();
        assert!(device.sockets().is_empty());
    }
}
