#![warn(missing_docs)]

//! Ringmux: a small public API facade for the workspace.
//!
//! This crate re-exports what an application needs to multiplex byte-stream sockets over
//! the two 256-byte shared rings:
//!
//! - The shared area and the driver (`ComArea`, `Driver`, `Client`)
//! - Requests and completions (`Command`, `Completion`, `Status`)
//! - Core configuration (`Config`)
//! - The software register bank and peer endpoint, for tests and demos (`emulator`)
//!
//! Example
//! ```no_run
//! use ringmux::prelude::*;
//!
//! let area = ComArea::new();
//! let (registers, interrupts, _peer) = emulator::attach(&area).unwrap();
//! let driver = Driver::start(Config::default(), &area, registers, interrupts).unwrap();
//!
//! let client = driver.client();
//! let answer = client.connect(0, b"echo").unwrap();
//! if answer.status == Status::Ok {
//!     client.write(0, b"hello").unwrap();
//! }
//! ```

// Core config and errors
pub use ringmux_core::{
    config::Config,
    error::{ErrorKind, Result},
    registers::{LocalEvents, NotificationRegisters, PeerEvents, Register},
};
// Host: driver, clients and the emulated link
pub use ringmux_host::{
    emulator, Client, Device, DeviceStatistics, Driver, InterruptLine, Interrupts, PeerEndpoint,
    PendingRequest, SoftRegisters,
};
// Protocol: packets and the shared area
pub use ringmux_protocol::{ComArea, Packet, PacketKind};
// Streams: requests and completions
pub use ringmux_stream::{Command, Completion, OwnerId, Status};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        emulator, Client, ComArea, Command, Completion, Config, Driver, ErrorKind, Packet,
        PacketKind, PeerEndpoint, Status,
    };
}
