//! Interrupt signalling and the register critical section.
//!
//! An interrupt carries no data. Raising it while one is already pending is a no-op, so an
//! interrupt handler can call [`InterruptLine::raise`] as often as it likes without blocking.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use ringmux_core::registers::{NotificationRegisters, Register};
use tracing::trace;

/// Creates a connected interrupt line and its receiving end.
pub fn channel() -> (InterruptLine, Interrupts) {
    let (sender, receiver) = bounded(1);
    (InterruptLine { sender }, Interrupts { receiver })
}

/// The raising side of the interrupt signal. Cheap to clone.
#[derive(Clone, Debug)]
pub struct InterruptLine {
    sender: Sender<()>,
}

impl InterruptLine {
    /// Raises the interrupt. Coalesces with a pending one and never blocks.
    pub fn raise(&self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => trace!("interrupt raised after the worker stopped"),
        }
    }
}

/// The worker's receiving end of the interrupt signal.
#[derive(Debug)]
pub struct Interrupts {
    receiver: Receiver<()>,
}

impl Interrupts {
    /// Returns true if an interrupt is pending.
    pub fn is_pending(&self) -> bool {
        !self.receiver.is_empty()
    }

    pub(crate) fn into_receiver(self) -> Receiver<()> {
        self.receiver
    }
}

/// Masks interrupt delivery for as long as it lives.
///
/// Register read-modify-write sequences happen inside one of these so the interrupt handler
/// never observes a half-updated bank.
pub struct CriticalSection<'a, R: NotificationRegisters + ?Sized> {
    registers: &'a mut R,
}

impl<'a, R: NotificationRegisters + ?Sized> CriticalSection<'a, R> {
    /// Masks interrupts and returns the guard.
    pub fn enter(registers: &'a mut R) -> Self {
        registers.mask_interrupts();
        Self { registers }
    }

    /// Reads a register.
    pub fn read(&mut self, register: Register) -> u8 {
        self.registers.read(register)
    }

    /// Writes a register.
    pub fn write(&mut self, register: Register, value: u8) {
        self.registers.write(register, value)
    }
}

impl<R: NotificationRegisters + ?Sized> Drop for CriticalSection<'_, R> {
    fn drop(&mut self) {
        self.registers.unmask_interrupts();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        log: Vec<&'static str>,
    }

    impl NotificationRegisters for Recording {
        fn read(&mut self, _register: Register) -> u8 {
            self.log.push("read");
            0
        }

        fn write(&mut self, _register: Register, _value: u8) {
            self.log.push("write");
        }

        fn mask_interrupts(&mut self) {
            self.log.push("mask");
        }

        fn unmask_interrupts(&mut self) {
            self.log.push("unmask");
        }
    }

    #[test]
    fn test_raises_coalesce() {
        let (line, interrupts) = channel();
        assert!(!interrupts.is_pending());
        line.raise();
        line.clone().raise();
        assert!(interrupts.is_pending());

        let receiver = interrupts.into_receiver();
        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_raise_after_receiver_dropped() {
        let (line, interrupts) = channel();
        drop(interrupts);
        line.raise();
    }

    #[test]
    fn test_critical_section_masks_around_access() {
        let mut registers = Recording::default();
        {
            let mut section = CriticalSection::enter(&mut registers);
            section.read(Register::LocalEvents);
            section.write(Register::Enable, 1);
        }
        assert_eq!(registers.log, vec!["mask", "read", "write", "unmask"]);
    }
}
