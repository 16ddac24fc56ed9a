//! Identifiers and message intents shared by every component.

use std::fmt;

/// An opaque broadcast payload. Compared by equality only.
pub type Value = i64;

/// Identifier of a node in the cluster (e.g. `"n1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What a node wants to tell a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gossip {
    /// Forward a value to a neighbor. Expects an [`Gossip::Ack`] back.
    Value(Value),
    /// Confirm receipt of a value. Never acknowledged itself.
    Ack(Value),
}

impl Gossip {
    /// The value carried by this message.
    pub const fn value(&self) -> Value {
        match self {
            Self::Value(v) | Self::Ack(v) => *v,
        }
    }
}

/// A message the engine has decided to send, not yet handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: NodeId,
    pub message: Gossip,
}

impl Outbound {
    pub fn value(to: NodeId, value: Value) -> Self {
        Self {
            to,
            message: Gossip::Value(value),
        }
    }

    pub fn ack(to: NodeId, value: Value) -> Self {
        Self {
            to,
            message: Gossip::Ack(value),
        }
    }
}
