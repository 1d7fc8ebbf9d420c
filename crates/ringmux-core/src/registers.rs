//! Hardware notification register abstraction.

use bitflags::bitflags;

bitflags! {
    /// Pointer movements by the peer that can interrupt the host.
    ///
    /// Written by the peer into the local events register, and by the host into the
    /// enable register to choose which of them should raise its interrupt.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LocalEvents: u8 {
        /// The peer advanced the inbound tail (it sent more data).
        const INBOUND_TAIL = 1 << 0;
        /// The peer advanced the outbound head (it freed room).
        const OUTBOUND_HEAD = 1 << 1;
    }
}

bitflags! {
    /// Pointer movements by the host, published to the peer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PeerEvents: u8 {
        /// The host advanced the outbound tail (it sent more data).
        const OUTBOUND_TAIL = 1 << 0;
        /// The host advanced the inbound head (it freed room).
        const INBOUND_HEAD = 1 << 1;
    }
}

/// Registers of the shared notification bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    /// Events pending for the host. Reading acknowledges and clears them.
    LocalEvents,
    /// Events that should raise the host interrupt.
    Enable,
    /// Events the host publishes to the peer.
    PeerEvents,
}

/// Low-level access to the notification register bank.
///
/// This trait lets the event loop run against real hardware, an emulated bank or a test
/// double without coupling to a concrete implementation. Masking controls whether the
/// bank may deliver the host interrupt; callers keep masked windows short.
pub trait NotificationRegisters: Send {
    /// Reads a register. Reading `LocalEvents` clears it.
    fn read(&mut self, register: Register) -> u8;

    /// Writes a register.
    fn write(&mut self, register: Register, value: u8);

    /// Stops interrupt delivery until `unmask_interrupts` is called.
    fn mask_interrupts(&mut self);

    /// Resumes interrupt delivery, raising the interrupt if an enabled event is pending.
    fn unmask_interrupts(&mut self);
}

impl<T: NotificationRegisters + ?Sized> NotificationRegisters for Box<T> {
    fn read(&mut self, register: Register) -> u8 {
        (**self).read(register)
    }

    fn write(&mut self, register: Register, value: u8) {
        (**self).write(register, value)
    }

    fn mask_interrupts(&mut self) {
        (**self).mask_interrupts()
    }

    fn unmask_interrupts(&mut self) {
        (**self).unmask_interrupts()
    }
}
