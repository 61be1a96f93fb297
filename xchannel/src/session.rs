//! Connection session: a message channel driven by a dedicated receive loop.
//!
//! Constructing a [`Session`] opens the channel and spawns exactly one
//! receive thread for it. That thread delivers every inbound message to the
//! registered [`MessageHandler`] in wire order, and turns the end of the
//! connection into a final, locally fabricated disconnect notice.
//!
//! ```text
//!   caller thread                    receive thread
//!   ─────────────                    ──────────────
//!   Session::connect ──spawn──────▶  loop {
//!   send(&m) ──▶ writer                receive() ──▶ handler.on_message(m)
//!   close() ───▶ shutdown ─────────▶   EndOfStream ─▶ notice + close, exit
//!                                      Fault      ──▶ log + close, exit
//!                                    }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::channel::{ChannelState, MessageChannel, Received};
use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use crate::message::{Message, MessageHandler};
use crate::{DISCONNECT_DESCRIPTION, DISCONNECT_SENDER};

/// A client connection with its own receive loop.
#[derive(Debug)]
pub struct Session<M> {
    /// Display name; never sent on the wire.
    identity: String,

    /// Channel shared with the receive loop.
    channel: Arc<MessageChannel<M>>,

    /// The one receive thread of this session.
    receive_loop: JoinHandle<()>,
}

impl<M: Message> Session<M> {
    /// Connects with the default channel configuration.
    pub fn connect<H>(
        identity: impl Into<String>,
        address: &str,
        port: u16,
        handler: H,
    ) -> Result<Self>
    where
        H: MessageHandler<M>,
    {
        Self::connect_with_config(identity, address, port, ChannelConfig::default(), handler)
    }

    /// Opens the channel and starts the receive loop.
    ///
    /// Connection failures are returned here, before any thread exists.
    pub fn connect_with_config<H>(
        identity: impl Into<String>,
        address: &str,
        port: u16,
        config: ChannelConfig,
        handler: H,
    ) -> Result<Self>
    where
        H: MessageHandler<M>,
    {
        let identity = identity.into();
        let channel = Arc::new(MessageChannel::open_with_config(address, port, config)?);
        log::info!("Session '{}' connected to {}", identity, channel.peer_addr());

        let loop_channel = Arc::clone(&channel);
        let loop_identity = identity.clone();
        let spawned = thread::Builder::new()
            .name("xchannel-recv".into())
            .spawn(move || run_receive_loop(&loop_identity, &loop_channel, handler));

        let receive_loop = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                channel.close();
                return Err(Error::Spawn(e));
            }
        };

        Ok(Self {
            identity,
            channel,
            receive_loop,
        })
    }

    /// Sends one message to the server.
    ///
    /// Never panics on transport failure: the channel is closed and the
    /// failure is returned. After the session is closed every call returns
    /// [`Error::Closed`].
    pub fn send(&self, message: &M) -> Result<()> {
        self.channel.send(message)
    }
}

impl<M> Session<M> {
    /// Closes the connection. Idempotent.
    ///
    /// A receive loop blocked on the socket wakes up and treats the
    /// shutdown like a peer disconnect. A loop that had not yet gone back
    /// to reading just exits.
    pub fn close(&self) {
        self.channel.close();
    }

    /// Display name given at construction.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the current state.
    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Returns true once the session is closed.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Remote address of the connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.channel.peer_addr()
    }

    /// Blocks until the receive loop has exited.
    ///
    /// Does not close the session; call [`close`](Self::close) first to
    /// stop a loop that is still reading.
    pub fn wait(self) {
        if self.receive_loop.join().is_err() {
            log::error!("Receive loop of session '{}' panicked", self.identity);
        }
    }
}

fn run_receive_loop<M, H>(identity: &str, channel: &MessageChannel<M>, mut handler: H)
where
    M: Message,
    H: MessageHandler<M>,
{
    while !channel.is_closed() {
        match channel.receive() {
            Received::Message(message) => handler.on_message(message),
            Received::EndOfStream => {
                notify_disconnect(identity, channel, &mut handler);
                break;
            }
            Received::Fault(e) if e.is_disconnect() => {
                log::debug!("Session '{}' lost its connection: {}", identity, e);
                notify_disconnect(identity, channel, &mut handler);
                break;
            }
            Received::Fault(e) => {
                log::error!(
                    "Session '{}' failed receiving from {}: {}",
                    identity,
                    channel.peer_addr(),
                    e
                );
                channel.close();
                break;
            }
        }
    }

    log::debug!("Receive loop of session '{}' exited", identity);
}

fn notify_disconnect<M, H>(identity: &str, channel: &MessageChannel<M>, handler: &mut H)
where
    M: Message,
    H: MessageHandler<M>,
{
    log::info!("Session '{}': {}", identity, DISCONNECT_DESCRIPTION);
    handler.on_message(M::disconnect_notice(DISCONNECT_SENDER, DISCONNECT_DESCRIPTION));
    channel.close();
}
