use std::io::{self, BufRead};
use std::time::Duration;

use log::*;
use xchannel::{ChannelConfig, Error, Session, TextMessage};

/// Console front end for one session: prints whatever the server sends and
/// forwards each input line as a text message.
pub struct ChatClient {
    session: Session<TextMessage>,
}

impl ChatClient {
    pub fn connect(
        identity: &str,
        address: &str,
        port: u16,
        connect_timeout: Option<u64>,
    ) -> xchannel::Result<Self> {
        let config = ChannelConfig::default()
            .with_connect_timeout(connect_timeout.map(Duration::from_secs));
        let session =
            Session::connect_with_config(identity, address, port, config, Self::display)?;
        Ok(Self { session })
    }

    pub fn identity(&self) -> &str {
        self.session.identity()
    }

    /// Sends lines from `input` until it ends or the server goes away.
    pub fn run<R: BufRead>(self, input: R) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let body = line.trim();
            if body.is_empty() {
                continue;
            }

            match self.session.send(&TextMessage::text(self.identity(), body)) {
                Ok(()) => debug!("Sent {} bytes of text", body.len()),
                Err(Error::Closed) | Err(Error::SendFailed(_)) => {
                    warn!("Session closed, dropping input");
                    break;
                }
                Err(e) => warn!("Message not sent: {}", e),
            }
        }

        self.session.close();
        self.session.wait();
        Ok(())
    }

    fn display(message: TextMessage) {
        if message.is_error() {
            warn!("{}", message);
        }
        println!("{}", message);
    }
}
