//! Message and handler abstractions.
//!
//! The channel treats messages as opaque: it encodes them with `bincode`
//! and hands decoded values to a [`MessageHandler`] without looking inside.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A unit of application protocol data exchanged over a channel.
pub trait Message: Serialize + DeserializeOwned + Send + 'static {
    /// Builds the error-kind message a session delivers when the peer
    /// goes away. It is fabricated locally, never read from the wire.
    fn disconnect_notice(sender: &str, description: &str) -> Self;
}

/// Consumer of inbound messages.
///
/// Invoked strictly sequentially from the session's receive loop, in the
/// order messages were decoded. A slow handler holds up the loop; nothing
/// is buffered or dropped on its behalf.
pub trait MessageHandler<M>: Send + 'static {
    /// Handles one inbound message.
    fn on_message(&mut self, message: M);
}

impl<M, F> MessageHandler<M> for F
where
    F: FnMut(M) + Send + 'static,
{
    fn on_message(&mut self, message: M) {
        self(message)
    }
}

/// Encodes a message into its wire bytes.
pub fn encode<M: Message>(message: &M) -> Result<Vec<u8>> {
    Ok(bincode::serialize(message)?)
}

/// Decodes a message from its wire bytes.
pub fn decode<M: Message>(bytes: &[u8]) -> Result<M> {
    Ok(bincode::deserialize(bytes)?)
}

/// A minimal chat-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMessage {
    /// Free text from a participant.
    Text {
        /// Identity of the sender.
        sender: String,
        /// Message body.
        body: String,
    },

    /// An error report.
    Error {
        /// Identity of the reporter.
        sender: String,
        /// What went wrong.
        description: String,
    },
}

impl TextMessage {
    /// Creates a text message.
    pub fn text(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Text {
            sender: sender.into(),
            body: body.into(),
        }
    }

    /// Creates an error message.
    pub fn error(sender: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Error {
            sender: sender.into(),
            description: description.into(),
        }
    }

    /// Identity of whoever produced this message.
    pub fn sender(&self) -> &str {
        match self {
            Self::Text { sender, .. } | Self::Error { sender, .. } => sender,
        }
    }

    /// Returns true for error messages.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl Message for TextMessage {
    fn disconnect_notice(sender: &str, description: &str) -> Self {
        Self::error(sender, description)
    }
}

impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { sender, body } => write!(f, "{}: {}", sender, body),
            Self::Error { sender, description } => write!(f, "[{}] error: {}", sender, description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_preserves_message() {
        let message = TextMessage::text("alice", "hi there");
        let decoded: TextMessage = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode::<TextMessage>(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]).is_err());
    }

    #[test]
    fn test_disconnect_notice_is_error() {
        let notice = TextMessage::disconnect_notice("server", "server disconnected");
        assert!(notice.is_error());
        assert_eq!(notice.sender(), "server");
        assert_eq!(notice.to_string(), "[server] error: server disconnected");
    }

    #[test]
    fn test_closure_handler() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut handler = move |m: TextMessage| tx.send(m).unwrap();
        handler.on_message(TextMessage::text("bob", "one"));
        assert_eq!(rx.try_recv().unwrap(), TextMessage::text("bob", "one"));
    }
}
