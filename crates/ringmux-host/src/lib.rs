#![warn(missing_docs)]

//! ringmux-host: the device context, its worker loop and caller handles.

/// Caller-side handles for submitting requests.
pub mod client;
/// The device context and its protocol handlers.
pub mod device;
/// Worker thread startup and shutdown.
pub mod driver;
/// Software register bank and peer endpoint.
pub mod emulator;
/// The worker loop.
pub mod event_loop;
/// Interrupt signalling and the register critical section.
pub mod interrupt;
/// Device traffic statistics.
pub mod statistics;

pub use client::{Client, PendingRequest};
pub use device::{Device, RingMarks};
pub use driver::Driver;
pub use emulator::{PeerEndpoint, SoftRegisters};
pub use event_loop::{EventLoop, Wake};
pub use interrupt::{CriticalSection, InterruptLine, Interrupts};
pub use statistics::DeviceStatistics;
