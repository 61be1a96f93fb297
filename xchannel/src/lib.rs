//! # XChannel - A Message-Oriented Client Channel
//!
//! XChannel connects a client to a server over a single persistent TCP
//! socket and exchanges serializable messages over it:
//!
//! - **Object streams**: one outbound and one inbound stream, each opened
//!   with a stream header and carrying CRC32-checked packets
//! - **Back-reference tables**: repeated objects are sent as handles until
//!   the stream is explicitly reset
//! - **Dedicated receive loop**: one thread per session delivers inbound
//!   messages to a handler, in wire order
//! - **Fail closed**: transport failures close the channel instead of
//!   panicking; a clean disconnect is reported as a synthetic message
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │              (MessageHandler, send, close)               │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Session Layer                         │
//! │  ┌──────────────────────┐ ┌──────────────────────────┐  │
//! │  │    Receive Loop      │ │   Disconnect Handling    │  │
//! │  └──────────────────────┘ └──────────────────────────┘  │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Channel Layer                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────┐    │
//! │  │ObjectWriter │ │ObjectReader │ │  bincode codec  │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────┘    │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Transport Layer                       │
//! │  ┌─────────────────────────────────────────────────┐    │
//! │  │                   TcpStream                      │    │
//! │  └─────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use xchannel::{Session, TextMessage};
//!
//! let session = Session::connect("alice", "127.0.0.1", 4000, |message: TextMessage| {
//!     println!("{message}");
//! })?;
//!
//! session.send(&TextMessage::text("alice", "hello"))?;
//! session.close();
//! # Ok::<(), xchannel::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod error;
pub mod message;
pub mod session;
pub mod stream;
pub mod wire;

// Re-export commonly used types
pub use channel::{ChannelState, MessageChannel, Received};
pub use config::ChannelConfig;
pub use error::{Error, Result};
pub use message::{Message, MessageHandler, TextMessage};
pub use session::Session;
pub use wire::{PACKET_HEADER_SIZE, PacketHeader, PacketType, StreamHeader};

/// Protocol version written into every stream header.
pub const VERSION: u8 = 1;

/// Stream header magic ("XC").
pub const STREAM_MAGIC: u16 = 0x5843;

/// Default maximum encoded message size (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Sender identity carried by the synthetic disconnect notification.
pub const DISCONNECT_SENDER: &str = "server";

/// Description carried by the synthetic disconnect notification.
pub const DISCONNECT_DESCRIPTION: &str = "server disconnected";
