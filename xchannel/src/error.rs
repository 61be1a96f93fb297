//! Error types for the channel and session layers.

use std::io;

/// Errors produced while connecting, framing, encoding or exchanging messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport could not be established or the stream handshake failed.
    #[error("failed to connect to {address}: {reason}")]
    Connect {
        /// Address the connection was attempted against.
        address: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A write or flush failed on an open channel. The channel is closed.
    #[error("send failed: {0}")]
    SendFailed(#[source] Box<Error>),

    /// The channel has already been closed.
    #[error("channel is closed")]
    Closed,

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer's stream header does not carry the expected magic.
    #[error("invalid stream magic 0x{0:04x}")]
    InvalidMagic(u16),

    /// The peer speaks a protocol version this side does not.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// A packet payload does not match its CRC32.
    #[error("CRC checksum mismatch (expected 0x{expected:08x}, got 0x{actual:08x})")]
    ChecksumMismatch {
        /// Checksum carried in the packet header.
        expected: u32,
        /// Checksum computed over the received payload.
        actual: u32,
    },

    /// A packet arrived with an unexpected sequence number.
    #[error("packet out of sequence (expected {expected}, got {actual})")]
    OutOfSequence {
        /// Next sequence number the reader was waiting for.
        expected: u32,
        /// Sequence number found in the packet header.
        actual: u32,
    },

    /// The packet type byte is not recognised.
    #[error("unknown packet type 0x{0:02x}")]
    UnknownPacketType(u8),

    /// A back-reference names an object the reader never saw.
    #[error("unknown back-reference handle {0}")]
    UnknownHandle(u32),

    /// A message exceeds the configured size limit.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Encoded size of the message.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// The message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The receive loop thread could not be started.
    #[error("failed to spawn receive loop: {0}")]
    Spawn(#[source] io::Error),
}

impl Error {
    /// Returns true if this error means the peer went away rather than
    /// something going wrong on the wire.
    ///
    /// End of stream inside a packet, connection reset/abort, broken pipe
    /// and a locally closed channel all count as a disconnect.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Closed => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            Error::SendFailed(inner) => inner.is_disconnect(),
            _ => false,
        }
    }
}

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, Error>;
