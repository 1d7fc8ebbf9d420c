use std::default::Default;

use crate::constants::STREAM_ID_SPACE;

#[derive(Clone, Debug)]
/// Configuration options to tune the engine and its worker.
pub struct Config {
    /// Max bytes of inbound data buffered per socket before the stream is reset (0 = unlimited).
    /// Data the peer sends while no read is outstanding is held until the caller reads it.
    pub max_receive_queue_bytes: usize,
    /// Max number of resident sockets, closed-but-resident ones included.
    /// Values above the stream id space are clamped to it.
    pub max_sockets: usize,
    /// Capacity of the request channel feeding the worker. None makes it unbounded.
    pub request_queue_size: Option<usize>,
    /// Name given to the worker thread.
    pub worker_name: String,
}

impl Config {
    /// Returns the socket limit after clamping it to the stream id space.
    pub fn effective_max_sockets(&self) -> usize {
        self.max_sockets.min(STREAM_ID_SPACE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_receive_queue_bytes: 64 * 1024, // 64 KiB per stream
            max_sockets: STREAM_ID_SPACE,
            request_queue_size: None,
            worker_name: String::from("ringmux-worker"),
        }
    }
}
