//! Stream header and packet header definitions.
//!
//! # Stream Header
//!
//! Written once, when the outbound stream is constructed:
//!
//! ```text
//! 0                   1                   2
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Magic ("XC")          |    Version    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! # Packet Format
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |   Reserved    |     Sequence Number (hi)      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Sequence Number (lo)      |      Payload Length (hi)      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      Payload Length (lo)      |          CRC32 (hi)           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |          CRC32 (lo)           |          Payload...           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All integers are big-endian. The CRC32 covers the payload only.

use crate::error::{Error, Result};
use crate::{STREAM_MAGIC, VERSION};

/// Stream header size in bytes.
pub const STREAM_HEADER_SIZE: usize = 3;

/// Packet header size in bytes.
pub const PACKET_HEADER_SIZE: usize = 14;

/// Largest payload the 32-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Header that opens every object stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Magic number.
    pub magic: u16,

    /// Protocol version.
    pub version: u8,
}

impl StreamHeader {
    /// Creates the header for this protocol version.
    pub const fn current() -> Self {
        Self {
            magic: STREAM_MAGIC,
            version: VERSION,
        }
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; STREAM_HEADER_SIZE] {
        let magic = self.magic.to_be_bytes();
        [magic[0], magic[1], self.version]
    }

    /// Parses and validates a header received from the peer.
    pub fn from_bytes(buf: &[u8; STREAM_HEADER_SIZE]) -> Result<Self> {
        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != STREAM_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let version = buf[2];
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        Ok(Self { magic, version })
    }
}

/// Packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// A newly written object. The reader assigns it the next handle.
    Object = 0x01,

    /// Reference to an object already sent since the last reset.
    BackRef = 0x02,

    /// Both sides clear their back-reference tables.
    Reset = 0x03,
}

impl PacketType {
    /// Converts a byte to a PacketType.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Object),
            0x02 => Some(Self::BackRef),
            0x03 => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Header preceding every packet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet type.
    pub packet_type: PacketType,

    /// Per-stream sequence number, starting at zero.
    pub sequence: u32,

    /// Payload length in bytes.
    pub length: u32,

    /// CRC32 of the payload.
    pub checksum: u32,
}

impl PacketHeader {
    /// Builds the header for `payload`, computing its length and checksum.
    ///
    /// Payloads are bounded by [`MAX_PAYLOAD_SIZE`]; callers enforce that
    /// limit before framing.
    pub fn new(packet_type: PacketType, sequence: u32, payload: &[u8]) -> Self {
        Self {
            packet_type,
            sequence,
            length: payload.len() as u32,
            checksum: crc32fast::hash(payload),
        }
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; PACKET_HEADER_SIZE] {
        let mut buf = [0u8; PACKET_HEADER_SIZE];
        buf[0] = self.packet_type as u8;
        buf[1] = 0;
        buf[2..6].copy_from_slice(&self.sequence.to_be_bytes());
        buf[6..10].copy_from_slice(&self.length.to_be_bytes());
        buf[10..14].copy_from_slice(&self.checksum.to_be_bytes());
        buf
    }

    /// Parses a header. Does not validate the sequence number or payload.
    pub fn from_bytes(buf: &[u8; PACKET_HEADER_SIZE]) -> Result<Self> {
        let packet_type = PacketType::from_u8(buf[0]).ok_or(Error::UnknownPacketType(buf[0]))?;

        Ok(Self {
            packet_type,
            sequence: u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]),
            length: u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]),
            checksum: u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]),
        })
    }

    /// Checks `payload` against the header's checksum.
    pub fn verify(&self, payload: &[u8]) -> Result<()> {
        let actual = crc32fast::hash(payload);
        if actual != self.checksum {
            return Err(Error::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_header_roundtrip() {
        let bytes = StreamHeader::current().to_bytes();
        assert_eq!(bytes, [0x58, 0x43, VERSION]);
        assert_eq!(StreamHeader::from_bytes(&bytes).unwrap(), StreamHeader::current());
    }

    #[test]
    fn test_stream_header_rejects_bad_magic() {
        let err = StreamHeader::from_bytes(&[0xAC, 0xED, VERSION]).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(0xACED)));
    }

    #[test]
    fn test_stream_header_rejects_version() {
        let err = StreamHeader::from_bytes(&[0x58, 0x43, VERSION + 1]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(v) if v == VERSION + 1));
    }

    #[test]
    fn test_packet_header_layout() {
        let header = PacketHeader::new(PacketType::Object, 7, b"abc");
        let bytes = header.to_bytes();

        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[2..6], &7u32.to_be_bytes());
        assert_eq!(&bytes[6..10], &3u32.to_be_bytes());

        let decoded = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.verify(b"abc").is_ok());
    }

    #[test]
    fn test_packet_header_detects_corruption() {
        let header = PacketHeader::new(PacketType::Object, 0, b"abc");
        assert!(matches!(
            header.verify(b"abd"),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_checksum_known_value() {
        // "123456789" is the standard check value for CRC-32/IEEE
        let header = PacketHeader::new(PacketType::Object, 0, b"123456789");
        assert_eq!(header.checksum, 0xCBF43926);
        assert_eq!(&header.to_bytes()[10..14], &0xCBF43926u32.to_be_bytes());
    }

    #[test]
    fn test_empty_payload_checksum() {
        let header = PacketHeader::new(PacketType::Reset, 3, &[]);
        assert_eq!(header.checksum, 0);
        assert_eq!(header.length, 0);
        assert!(header.verify(&[]).is_ok());
    }

    #[test]
    fn test_unknown_packet_type() {
        let mut bytes = PacketHeader::new(PacketType::Reset, 0, &[]).to_bytes();
        bytes[0] = 0x7f;
        assert!(matches!(
            PacketHeader::from_bytes(&bytes),
            Err(Error::UnknownPacketType(0x7f))
        ));
    }
}
