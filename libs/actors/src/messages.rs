//! Actor Messages
//!
//! Messages carry a kind tag and an optional opaque payload. They hold no
//! routing state: where a message goes is decided by the sender's target
//! list at send time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind tags emitted by the generated topologies
pub mod kinds {
    pub const BATCH: &str = "batch";
    pub const DATA: &str = "data";
    pub const EVENT: &str = "event";
    pub const REQUEST: &str = "request";
    pub const MSG: &str = "msg";
}

/// Tag identifying the semantic event a message stands for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(Arc<str>);

impl MessageKind {
    pub fn new(kind: impl AsRef<str>) -> Self {
        Self(Arc::from(kind.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        Self(Arc::from(kind))
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::new(kinds::MSG)
    }
}

/// A single message between actors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub payload: Option<Bytes>,
}

impl Message {
    /// Message with no payload, the common case for fan-out traffic
    pub fn new(kind: impl Into<MessageKind>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    pub fn with_payload(kind: impl Into<MessageKind>, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload.into()),
        }
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Payload size in bytes, zero when absent
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Bytes::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_equality_across_constructors() {
        assert_eq!(MessageKind::from("batch"), MessageKind::from(kinds::BATCH.to_string()));
        assert_eq!(MessageKind::default().as_str(), kinds::MSG);
    }

    #[test]
    fn test_message_payload() {
        let empty = Message::new(kinds::EVENT);
        assert_eq!(empty.payload_len(), 0);

        let full = Message::with_payload(kinds::DATA, vec![1u8, 2, 3]);
        assert_eq!(full.payload_len(), 3);
        assert_eq!(full.kind().to_string(), "data");
    }

    #[test]
    fn test_kind_serializes_as_plain_string() {
        let json = serde_json::to_string(&MessageKind::from(kinds::BATCH)).unwrap();
        assert_eq!(json, "\"batch\"");

        let kind: MessageKind = serde_json::from_str("\"request\"").unwrap();
        assert_eq!(kind.as_str(), kinds::REQUEST);
    }
}
