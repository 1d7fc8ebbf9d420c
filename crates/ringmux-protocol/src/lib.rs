#![warn(missing_docs)]

//! ringmux-protocol: packet types, the frame codec and the shared ring channels.

/// Packet serialization and deserialization.
pub mod codec;
/// Packet types and structures.
pub mod packet;
/// Shared ring channels and their endpoints.
pub mod ring;

pub use codec::{PacketDecoder, PacketEncoder};
pub use packet::{Packet, PacketHeader, PacketKind, CONNECT_ACCEPTED, CONNECT_UNKNOWN_SERVICE};
pub use ring::{ComArea, Consumer, Direction, Producer};
