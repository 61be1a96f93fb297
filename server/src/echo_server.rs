use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

use log::*;
use xchannel::{ChannelConfig, MessageChannel, Received, TextMessage};

pub struct EchoServer {
    listener: TcpListener,
}

impl EchoServer {
    pub fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// Accepts connections, one thread each. Returns after `limit`
    /// connections have been served, or never when `limit` is `None`.
    pub fn run(&self, limit: Option<usize>) -> io::Result<()> {
        let mut workers = Vec::new();

        for (served, stream) in self.listener.incoming().enumerate() {
            let stream = stream?;
            let peer = stream.peer_addr()?;
            info!("Accepted connection from {}", peer);

            workers.push(thread::spawn(move || Self::handle_connection(stream, peer)));

            if limit.is_some_and(|limit| served + 1 >= limit) {
                break;
            }
        }

        for worker in workers {
            if worker.join().is_err() {
                error!("Connection handler panicked");
            }
        }
        Ok(())
    }

    /// Echoes every message back until the client disconnects.
    fn handle_connection(stream: TcpStream, peer: SocketAddr) {
        let config = ChannelConfig::default();
        let channel = match MessageChannel::<TextMessage>::from_stream(stream, config) {
            Ok(channel) => channel,
            Err(e) => {
                error!("Handshake with {} failed: {}", peer, e);
                return;
            }
        };

        let mut echoed = 0usize;
        loop {
            match channel.receive() {
                Received::Message(message) => {
                    debug!("{} -> {}", peer, message);
                    if let Err(e) = channel.send(&message) {
                        warn!("Echo to {} failed: {}", peer, e);
                        break;
                    }
                    echoed += 1;
                }
                Received::EndOfStream => {
                    info!("Connection closed by {}", peer);
                    break;
                }
                Received::Fault(e) => {
                    error!("Connection error from {}: {}", peer, e);
                    break;
                }
            }
        }

        channel.close();
        info!("Echoed {} messages to {}", echoed, peer);
    }
}
