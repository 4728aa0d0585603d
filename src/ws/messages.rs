//! WebSocket framing for job events.
//!
//! Every event goes out as one JSON text frame holding the bare
//! [`JobEvent`] object, with no envelope around it.

use axum::extract::ws::Message;

use crate::domain::JobEvent;

/// Text a client may send to keep an idle connection open.
pub const KEEPALIVE_PING: &str = "ping";

/// Encodes `event` as a WebSocket text frame.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the event cannot be serialized.
pub fn event_frame(event: &JobEvent) -> Result<Message, serde_json::Error> {
    serde_json::to_string(event).map(Message::text)
}

/// What the relay does with a frame received from a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFrame {
    /// Keep-alive text; nothing to do.
    KeepAlive,
    /// The client is closing the connection.
    Close,
    /// Anything else; ignored.
    Ignored,
}

impl ClientFrame {
    /// Classifies an incoming frame.
    #[must_use]
    pub fn classify(message: &Message) -> Self {
        match message {
            Message::Text(text) if text.as_str().trim() == KEEPALIVE_PING => Self::KeepAlive,
            Message::Close(_) => Self::Close,
            _ => Self::Ignored,
        }
    }
}
