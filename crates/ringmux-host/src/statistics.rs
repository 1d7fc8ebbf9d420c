//! Device traffic statistics.
//!
//! Counters cover both rings. Byte counts are payload bytes only; headers are not counted.

/// Traffic and error counters of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStatistics {
    /// Packets appended to the outbound ring
    pub packets_sent: u64,
    /// Packets consumed from the inbound ring
    pub packets_received: u64,
    /// Payload bytes appended to the outbound ring
    pub bytes_sent: u64,
    /// Payload bytes consumed from the inbound ring
    pub bytes_received: u64,
    /// Inbound packets dropped because their stream was unknown or closed
    pub packets_discarded: u64,
    /// Inbound packets the peer should never have sent
    pub protocol_violations: u64,
    /// Reset packets appended to the outbound ring
    pub resets_sent: u64,
}

impl DeviceStatistics {
    /// Resets all statistics counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
