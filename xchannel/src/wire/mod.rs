//! Wire-level building blocks.
//!
//! - Packet: stream header and per-packet header, CRC32-checked payloads

mod packet;

pub use packet::{
    MAX_PAYLOAD_SIZE, PACKET_HEADER_SIZE, PacketHeader, PacketType, STREAM_HEADER_SIZE,
    StreamHeader,
};
