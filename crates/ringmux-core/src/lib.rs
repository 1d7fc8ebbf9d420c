#![warn(missing_docs)]

//! ringmux-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core utilities shared across all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - Hardware notification register access
//!
//! Protocol-specific logic lives in specialized crates:
//! - `ringmux-protocol`: packet types, ring channels and the packet codec
//! - `ringmux-stream`: socket state machines, socket table and send arbiter
//! - `ringmux-host`: device context, event loop and client handles

/// Protocol constants shared across layers.
pub mod constants {
    /// Size in bytes of each shared ring buffer.
    pub const RING_SIZE: usize = 256;
    /// Highest occupancy a ring may reach; one slot of sequence space is never used.
    pub const MAX_OCCUPANCY: usize = RING_SIZE - 1;
    /// The size of the packet header (`length`, `kind`, `stream_id`).
    pub const HEADER_SIZE: usize = 3;
    /// Largest payload a single packet may carry so that it fits a freshly emptied ring.
    pub const MAX_PAYLOAD: usize = MAX_OCCUPANCY - HEADER_SIZE;
    /// First stream id handed out by the socket table. Host-initiated streams use odd ids.
    pub const FIRST_STREAM_ID: u8 = 1;
    /// Distance between consecutive host-initiated stream ids.
    pub const STREAM_ID_STEP: u8 = 2;
    /// Number of distinct stream ids the host may allocate.
    pub const STREAM_ID_SPACE: usize = 128;
}

/// Configuration options for the engine and worker.
pub mod config;
/// Error types and results.
pub mod error;
/// Hardware notification register abstraction.
pub mod registers;
