//! Inbound object stream.

use std::io::{self, Read};

use crate::error::{Error, Result};
use crate::wire::{PacketHeader, PacketType, StreamHeader, PACKET_HEADER_SIZE, STREAM_HEADER_SIZE};

/// Outcome of a single [`ObjectReader::read_object`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete object.
    Object(Vec<u8>),

    /// The peer closed the stream cleanly at a packet boundary.
    EndOfStream,
}

/// Reads packets from a byte stream and yields complete objects.
#[derive(Debug)]
pub struct ObjectReader<R: Read> {
    /// Underlying byte stream.
    inner: R,

    /// Sequence number expected on the next packet.
    sequence: u32,

    /// Objects received since the last reset, indexed by handle.
    handles: Vec<Vec<u8>>,

    /// Largest object this reader accepts.
    max_object_size: usize,
}

impl<R: Read> ObjectReader<R> {
    /// Creates the reader, blocking until the peer's stream header arrives.
    pub fn new(mut inner: R, max_object_size: usize) -> Result<Self> {
        let mut buf = [0u8; STREAM_HEADER_SIZE];
        inner.read_exact(&mut buf)?;
        let header = StreamHeader::from_bytes(&buf)?;
        log::trace!("Read stream header, version={}", header.version);

        Ok(Self {
            inner,
            sequence: 0,
            handles: Vec::new(),
            max_object_size,
        })
    }

    /// Blocks until one object is available or the stream ends.
    ///
    /// Reset packets are consumed silently. An end of stream inside a
    /// packet is reported as an `UnexpectedEof` I/O error.
    pub fn read_object(&mut self) -> Result<ReadOutcome> {
        loop {
            let Some(header) = self.read_header()? else {
                return Ok(ReadOutcome::EndOfStream);
            };

            if header.sequence != self.sequence {
                return Err(Error::OutOfSequence {
                    expected: self.sequence,
                    actual: header.sequence,
                });
            }
            self.sequence = self.sequence.wrapping_add(1);

            let length = header.length as usize;
            if length > self.max_object_size {
                return Err(Error::MessageTooLarge {
                    size: length,
                    max: self.max_object_size,
                });
            }

            let mut payload = vec![0u8; length];
            self.inner.read_exact(&mut payload)?;
            header.verify(&payload)?;

            log::trace!(
                "Received packet type={:?}, seq={}, len={}",
                header.packet_type,
                header.sequence,
                length
            );

            match header.packet_type {
                PacketType::Object => {
                    self.handles.push(payload.clone());
                    return Ok(ReadOutcome::Object(payload));
                }
                PacketType::BackRef => {
                    let handle: [u8; 4] = payload.as_slice().try_into().map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            "back-reference payload must be 4 bytes",
                        )
                    })?;
                    let handle = u32::from_be_bytes(handle);
                    let object = self
                        .handles
                        .get(handle as usize)
                        .cloned()
                        .ok_or(Error::UnknownHandle(handle))?;
                    log::debug!("Resolved back-reference to handle {}", handle);
                    return Ok(ReadOutcome::Object(object));
                }
                PacketType::Reset => {
                    self.handles.clear();
                }
            }
        }
    }

    /// Number of objects currently remembered for back-references.
    pub fn cached_objects(&self) -> usize {
        self.handles.len()
    }

    /// Reads the next packet header, or `None` on a clean end of stream.
    fn read_header(&mut self) -> Result<Option<PacketHeader>> {
        let mut buf = [0u8; PACKET_HEADER_SIZE];
        let mut filled = 0;

        while filled < PACKET_HEADER_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        PacketHeader::from_bytes(&buf).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ObjectWriter;
    use std::io::Cursor;

    fn written(f: impl FnOnce(&mut ObjectWriter<Vec<u8>>)) -> Vec<u8> {
        let mut writer = ObjectWriter::new(Vec::new(), 1024).unwrap();
        f(&mut writer);
        writer.get_ref().clone()
    }

    #[test]
    fn test_reads_objects_in_order() {
        let bytes = written(|w| {
            w.write_object(b"first").unwrap();
            w.reset().unwrap();
            w.write_object(b"second").unwrap();
            w.reset().unwrap();
        });

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        assert_eq!(reader.read_object().unwrap(), ReadOutcome::Object(b"first".to_vec()));
        assert_eq!(reader.read_object().unwrap(), ReadOutcome::Object(b"second".to_vec()));
        assert_eq!(reader.read_object().unwrap(), ReadOutcome::EndOfStream);
        assert_eq!(reader.cached_objects(), 0);
    }

    #[test]
    fn test_resolves_back_references() {
        let bytes = written(|w| {
            w.write_object(b"same").unwrap();
            w.write_object(b"same").unwrap();
        });

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        assert_eq!(reader.read_object().unwrap(), ReadOutcome::Object(b"same".to_vec()));
        assert_eq!(reader.read_object().unwrap(), ReadOutcome::Object(b"same".to_vec()));
        assert_eq!(reader.cached_objects(), 1);
    }

    #[test]
    fn test_missing_header_fails_handshake() {
        let err = ObjectReader::new(Cursor::new(vec![0x58]), 1024).unwrap_err();
        assert!(err.is_disconnect());

        let err = ObjectReader::new(Cursor::new(vec![0, 0, 1]), 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(0)));
    }

    #[test]
    fn test_truncated_packet_is_unexpected_eof() {
        let mut bytes = written(|w| w.write_object(b"payload").unwrap());
        bytes.truncate(bytes.len() - 3);

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        let err = reader.read_object().unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_truncated_header_is_unexpected_eof() {
        let mut bytes = written(|w| w.write_object(b"payload").unwrap());
        bytes.truncate(STREAM_HEADER_SIZE + 5);

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        assert!(reader.read_object().unwrap_err().is_disconnect());
    }

    #[test]
    fn test_corrupted_payload() {
        let mut bytes = written(|w| w.write_object(b"payload").unwrap());
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        let err = reader.read_object().unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_out_of_sequence_packet() {
        let mut bytes = StreamHeader::current().to_bytes().to_vec();
        let header = PacketHeader::new(PacketType::Object, 5, b"x");
        bytes.extend_from_slice(&header.to_bytes());
        bytes.push(b'x');

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        assert!(matches!(
            reader.read_object().unwrap_err(),
            Error::OutOfSequence { expected: 0, actual: 5 }
        ));
    }

    #[test]
    fn test_unknown_back_reference() {
        let mut bytes = StreamHeader::current().to_bytes().to_vec();
        let payload = 9u32.to_be_bytes();
        bytes.extend_from_slice(&PacketHeader::new(PacketType::BackRef, 0, &payload).to_bytes());
        bytes.extend_from_slice(&payload);

        let mut reader = ObjectReader::new(Cursor::new(bytes), 1024).unwrap();
        assert!(matches!(reader.read_object().unwrap_err(), Error::UnknownHandle(9)));
    }

    #[test]
    fn test_oversized_packet_rejected() {
        let bytes = written(|w| w.write_object(&[0xAB; 64]).unwrap());

        let mut reader = ObjectReader::new(Cursor::new(bytes), 16).unwrap();
        assert!(matches!(
            reader.read_object().unwrap_err(),
            Error::MessageTooLarge { size: 64, max: 16 }
        ));
    }
}
