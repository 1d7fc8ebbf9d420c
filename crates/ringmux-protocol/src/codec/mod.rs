//! Packet serialization and deserialization.
//!
//! Frames are laid out as `length, kind, stream_id` followed by `length` payload bytes.
//!
//! # Module Organization
//!
//! - [`encoder`] - Packet encoding to the frame format
//! - [`decoder`] - Packet decoding from the frame format

pub mod decoder;
pub mod encoder;


pub use decoder::PacketDecoder;
pub use encoder::PacketEncoder;
