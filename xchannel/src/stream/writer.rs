//! Outbound object stream.

use std::collections::HashMap;
use std::io::Write;

use crate::error::{Error, Result};
use crate::wire::{PacketHeader, PacketType, StreamHeader};

/// Writes encoded objects as packets onto a byte stream.
///
/// Objects written since the last [`reset`](Self::reset) are remembered;
/// writing the same bytes again emits a back-reference instead of the full
/// payload. Callers that send structurally similar objects must reset after
/// every write so each object goes out in full.
#[derive(Debug)]
pub struct ObjectWriter<W: Write> {
    /// Underlying byte stream.
    inner: W,

    /// Sequence number of the next packet.
    sequence: u32,

    /// Objects sent since the last reset, keyed by their bytes.
    handles: HashMap<Vec<u8>, u32>,

    /// Handle the next new object will receive.
    next_handle: u32,

    /// Largest object this writer accepts.
    max_object_size: usize,
}

impl<W: Write> ObjectWriter<W> {
    /// Creates the writer and immediately writes and flushes the stream
    /// header, so the peer's reader can complete its handshake.
    pub fn new(mut inner: W, max_object_size: usize) -> Result<Self> {
        inner.write_all(&StreamHeader::current().to_bytes())?;
        inner.flush()?;
        log::trace!("Wrote stream header");

        Ok(Self {
            inner,
            sequence: 0,
            handles: HashMap::new(),
            next_handle: 0,
            max_object_size,
        })
    }

    /// Writes one object. Does not flush.
    pub fn write_object(&mut self, object: &[u8]) -> Result<()> {
        if object.len() > self.max_object_size {
            return Err(Error::MessageTooLarge {
                size: object.len(),
                max: self.max_object_size,
            });
        }

        if let Some(&handle) = self.handles.get(object) {
            self.write_packet(PacketType::BackRef, &handle.to_be_bytes())?;
            log::debug!("Wrote back-reference to handle {}", handle);
            return Ok(());
        }

        self.write_packet(PacketType::Object, object)?;
        self.handles.insert(object.to_vec(), self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        log::debug!("Wrote object: {} bytes", object.len());
        Ok(())
    }

    /// Forgets every object written so far and tells the peer to do the same.
    pub fn reset(&mut self) -> Result<()> {
        self.handles.clear();
        self.next_handle = 0;
        self.write_packet(PacketType::Reset, &[])
    }

    /// Flushes buffered bytes to the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Number of objects currently remembered for back-references.
    pub fn cached_objects(&self) -> usize {
        self.handles.len()
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    fn write_packet(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<()> {
        let header = PacketHeader::new(packet_type, self.sequence, payload);
        self.inner.write_all(&header.to_bytes())?;
        self.inner.write_all(payload)?;
        self.sequence = self.sequence.wrapping_add(1);

        log::trace!(
            "Sent packet type={:?}, seq={}, len={}",
            packet_type,
            header.sequence,
            payload.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{PACKET_HEADER_SIZE, STREAM_HEADER_SIZE};

    fn packet_types(bytes: &[u8]) -> Vec<PacketType> {
        let mut types = Vec::new();
        let mut pos = STREAM_HEADER_SIZE;
        while pos < bytes.len() {
            let mut buf = [0u8; PACKET_HEADER_SIZE];
            buf.copy_from_slice(&bytes[pos..pos + PACKET_HEADER_SIZE]);
            let header = PacketHeader::from_bytes(&buf).unwrap();
            types.push(header.packet_type);
            pos += PACKET_HEADER_SIZE + header.length as usize;
        }
        types
    }

    #[test]
    fn test_header_written_on_construction() {
        let writer = ObjectWriter::new(Vec::new(), 1024).unwrap();
        assert_eq!(writer.get_ref().as_slice(), &StreamHeader::current().to_bytes());
    }

    #[test]
    fn test_repeated_object_becomes_back_reference() {
        let mut writer = ObjectWriter::new(Vec::new(), 1024).unwrap();
        writer.write_object(b"same").unwrap();
        writer.write_object(b"same").unwrap();
        writer.write_object(b"other").unwrap();

        assert_eq!(writer.cached_objects(), 2);
        assert_eq!(
            packet_types(writer.get_ref()),
            vec![PacketType::Object, PacketType::BackRef, PacketType::Object]
        );
    }

    #[test]
    fn test_reset_sends_objects_in_full() {
        let mut writer = ObjectWriter::new(Vec::new(), 1024).unwrap();
        writer.write_object(b"same").unwrap();
        writer.reset().unwrap();
        writer.write_object(b"same").unwrap();
        writer.reset().unwrap();

        assert_eq!(writer.cached_objects(), 0);
        assert_eq!(
            packet_types(writer.get_ref()),
            vec![
                PacketType::Object,
                PacketType::Reset,
                PacketType::Object,
                PacketType::Reset
            ]
        );
    }

    #[test]
    fn test_rejects_oversized_object() {
        let mut writer = ObjectWriter::new(Vec::new(), 4).unwrap();
        let err = writer.write_object(b"too long").unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { size: 8, max: 4 }));
        assert_eq!(writer.get_ref().len(), STREAM_HEADER_SIZE);
    }
}
