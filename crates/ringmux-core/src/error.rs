use std::{io, result};

use thiserror::Error;

/// Wrapped result type for ringmux operations.
pub type Result<T> = result::Result<T, ErrorKind>;

/// Enum with all possible errors that could occur in ringmux.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Error in decoding a packet read from a ring.
    #[error("Something went wrong with parsing the packet. Reason: {0:?}.")]
    DecodingError(#[from] DecodingErrorKind),
    /// Payload does not fit in a single packet.
    #[error("Payload of {0} bytes does not fit in a single packet.")]
    PayloadTooLarge(usize),
    /// The outbound ring has no room for the frame.
    #[error("Ring has {available} bytes free but the frame needs {required}.")]
    RingFull {
        /// Bytes the frame needs, header included.
        required: usize,
        /// Bytes currently free.
        available: usize,
    },
    /// A ring endpoint for this side was already claimed.
    #[error("This side of the shared area already has its ring endpoints.")]
    EndpointClaimed,
    /// No stream id is left for a new socket.
    #[error("No free stream id is left.")]
    SocketTableFull,
    /// The worker is no longer accepting or answering requests.
    #[error("The device worker has stopped.")]
    WorkerStopped,
    /// The worker thread panicked.
    #[error("The device worker panicked.")]
    WorkerPanicked,
    /// Wrapper around a std io::Error.
    #[error("An IO Error occurred. Reason: {0:?}.")]
    IOError(#[from] io::Error),
}

/// Errors that could occur while decoding a packet.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodingErrorKind {
    /// The kind byte does not name a known packet kind.
    #[error("unknown packet kind")]
    PacketKind,
    /// The buffer ended before the header or payload was complete.
    #[error("truncated packet")]
    Truncated,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_ring_full_display_names_both_sizes() {
        let err = ErrorKind::RingFull { required: 13, available: 4 };
        assert_eq!(err.to_string(), "Ring has 4 bytes free but the frame needs 13.");
    }

    #[test]
    fn test_io_error_is_source() {
        let err: ErrorKind = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(err.source().is_some());
        assert!(ErrorKind::WorkerStopped.source().is_none());
    }

    #[test]
    fn test_decoding_error_conversion() {
        let err: ErrorKind = DecodingErrorKind::Truncated.into();
        assert!(matches!(err, ErrorKind::DecodingError(DecodingErrorKind::Truncated)));
        assert_eq!(err.to_string(), "Something went wrong with parsing the packet. Reason: Truncated.");
        assert_eq!(err.source().map(|e| e.to_string()), Some(String::from("truncated packet")));
    }
}
