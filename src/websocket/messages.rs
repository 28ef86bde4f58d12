//! WebSocket Message Types
//!
//! An [`Update`] is one rendered snapshot of every metric for a single
//! sampling cycle. The hub never looks inside it; it is cloned into each
//! subscriber's queue and framed for the wire by the connection handler.

use axum::extract::ws::Message;
use std::sync::Arc;

/// Immutable, cheaply clonable message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update(Arc<[u8]>);

impl Update {
    /// Wrap a pre-serialized payload
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// Raw payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Frame the payload for a WebSocket connection
    ///
    /// UTF-8 payloads go out as text frames, anything else as binary.
    pub fn to_ws_message(&self) -> Message {
        match std::str::from_utf8(&self.0) {
            Ok(text) => Message::Text(text.to_owned()),
            Err(_) => Message::Binary(self.0.to_vec()),
        }
    }
}

impl From<String> for Update {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl From<&str> for Update {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Update {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
