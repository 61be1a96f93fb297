//! Message channel: one TCP connection plus its two object streams.

use std::io::{self, BufReader, BufWriter};
use std::marker::PhantomData;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use crate::message::{self, Message};
use crate::stream::{ObjectReader, ObjectWriter, ReadOutcome};

/// Channel state. Moves from `Open` to `Closed` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Channel is open and operational.
    Open,

    /// Channel is closed.
    Closed,
}

/// Outcome of a blocking [`MessageChannel::receive`].
#[derive(Debug)]
pub enum Received<M> {
    /// A complete, decoded message.
    Message(M),

    /// The peer ended the stream cleanly.
    EndOfStream,

    /// The transport failed or the data could not be decoded.
    Fault(Error),
}

/// Owns a TCP connection and the outbound/inbound object streams over it.
///
/// `send` and `receive` may be called from different threads. Only one
/// thread should receive; outbound order is the call order of a single
/// sender.
#[derive(Debug)]
pub struct MessageChannel<M> {
    /// Outbound stream.
    writer: Mutex<ObjectWriter<BufWriter<TcpStream>>>,

    /// Inbound stream.
    reader: Mutex<ObjectReader<BufReader<TcpStream>>>,

    /// Handle used to shut the socket down without taking either lock.
    control: TcpStream,

    /// Set once the channel is closed.
    closed: AtomicBool,

    /// Remote address.
    peer_addr: SocketAddr,

    _message: PhantomData<fn() -> M>,
}

impl<M: Message> MessageChannel<M> {
    /// Connects to `address:port` with the default configuration.
    pub fn open(address: &str, port: u16) -> Result<Self> {
        Self::open_with_config(address, port, ChannelConfig::default())
    }

    /// Connects to `address:port` and performs the stream handshake.
    ///
    /// Any failure, whether resolving, connecting or exchanging stream
    /// headers, is reported as [`Error::Connect`].
    pub fn open_with_config(address: &str, port: u16, config: ChannelConfig) -> Result<Self> {
        let target = format!("{}:{}", address, port);
        let connect_error = |reason: String| Error::Connect {
            address: target.clone(),
            reason,
        };

        let stream = connect(&target, &config).map_err(|e| connect_error(e.to_string()))?;
        log::info!("Connected to {}", target);

        Self::from_stream(stream, config).map_err(|e| connect_error(e.to_string()))
    }

    /// Builds a channel over an already connected socket.
    pub fn from_stream(stream: TcpStream, config: ChannelConfig) -> Result<Self> {
        stream.set_nodelay(config.nodelay)?;
        let peer_addr = stream.peer_addr()?;
        let control = stream.try_clone()?;
        let read_half = stream.try_clone()?;

        // The outbound stream must exist before the inbound one: its header
        // is what the peer's reader is waiting for.
        let writer = ObjectWriter::new(BufWriter::new(stream), config.max_message_size)?;
        let reader = ObjectReader::new(BufReader::new(read_half), config.max_message_size)?;
        log::debug!("Stream handshake with {} complete", peer_addr);

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            control,
            closed: AtomicBool::new(false),
            peer_addr,
            _message: PhantomData,
        })
    }

    /// Writes one message, resets the back-reference table, and flushes.
    ///
    /// A transport failure closes the channel and returns
    /// [`Error::SendFailed`]. Sending on a closed channel returns
    /// [`Error::Closed`]. Encoding failures and oversized messages are
    /// reported without touching the connection.
    pub fn send(&self, message: &M) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let bytes = message::encode(message)?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let result = writer
            .write_object(&bytes)
            .and_then(|()| writer.reset())
            .and_then(|()| writer.flush());
        drop(writer);

        match result {
            Ok(()) => Ok(()),
            Err(e @ Error::MessageTooLarge { .. }) => Err(e),
            Err(e) => {
                log::warn!("Send to {} failed, closing channel: {}", self.peer_addr, e);
                self.close();
                Err(Error::SendFailed(Box::new(e)))
            }
        }
    }

    /// Blocks until a message arrives, the stream ends, or the transport
    /// fails. Must not be called from more than one thread at a time.
    pub fn receive(&self) -> Received<M> {
        if self.is_closed() {
            return Received::Fault(Error::Closed);
        }

        let outcome = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_object();

        match outcome {
            Ok(ReadOutcome::Object(bytes)) => match message::decode(&bytes) {
                Ok(message) => Received::Message(message),
                Err(e) => Received::Fault(e),
            },
            Ok(ReadOutcome::EndOfStream) => Received::EndOfStream,
            // Whatever the OS reports after a local close is just the close.
            Err(_) if self.is_closed() => Received::Fault(Error::Closed),
            Err(e) => Received::Fault(e),
        }
    }
}

impl<M> MessageChannel<M> {
    /// Shuts the connection down. Idempotent and callable from any thread,
    /// including while another thread is blocked in `receive`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // NotConnected here just means the peer got there first.
        if let Err(e) = self.control.shutdown(Shutdown::Both) {
            log::debug!("Shutdown of {} reported: {}", self.peer_addr, e);
        }
        log::info!("Channel to {} closed", self.peer_addr);
    }

    /// Returns the current state.
    pub fn state(&self) -> ChannelState {
        if self.is_closed() {
            ChannelState::Closed
        } else {
            ChannelState::Open
        }
    }

    /// Returns true once the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Remote address of the connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

fn connect(target: &str, config: &ChannelConfig) -> io::Result<TcpStream> {
    let Some(timeout) = config.connect_timeout else {
        return TcpStream::connect(target);
    };

    let mut last_err = None;
    for addr in target.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}
