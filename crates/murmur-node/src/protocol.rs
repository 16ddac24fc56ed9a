//! Wire format: one JSON message per line.
//!
//! ```text
//! {"src":"c1","dest":"n1","body":{"type":"broadcast","msg_id":3,"message":5}}
//! {"src":"n1","dest":"c1","body":{"type":"broadcast_ok","msg_id":1,"in_reply_to":3}}
//! ```
//!
//! Peer gossip reuses `broadcast`; the peer acknowledgment is a
//! `broadcast_ok` that carries the value it confirms.

use std::collections::HashMap;

use murmur_gossip::{NodeId, Value};
use serde::{Deserialize, Serialize};

/// Error codes understood by the cluster harness.
pub mod code {
    /// The message type is not handled by this node.
    pub const NOT_SUPPORTED: u32 = 10;
    /// The node cannot serve the request yet (e.g. before `init`).
    pub const TEMPORARILY_UNAVAILABLE: u32 = 11;
    /// The message could not be decoded.
    pub const MALFORMED_REQUEST: u32 = 12;
}

/// Message types this node decodes. Anything else is answered with
/// [`code::NOT_SUPPORTED`].
pub const KNOWN_TYPES: &[&str] = &[
    "init",
    "init_ok",
    "echo",
    "echo_ok",
    "generate",
    "generate_ok",
    "topology",
    "topology_ok",
    "broadcast",
    "broadcast_ok",
    "read",
    "read_ok",
    "error",
];

/// A routed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub src: NodeId,
    pub dest: NodeId,
    pub body: Body,
}

/// Message body: correlation ids plus a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Init {
        node_id: NodeId,
        node_ids: Vec<NodeId>,
    },
    InitOk,
    Echo {
        echo: serde_json::Value,
    },
    EchoOk {
        echo: serde_json::Value,
    },
    Generate,
    GenerateOk {
        id: String,
    },
    Topology {
        topology: HashMap<NodeId, Vec<NodeId>>,
    },
    TopologyOk,
    Broadcast {
        message: Value,
    },
    /// Reply to a client (`message` absent) or ack to a peer (`message` set).
    BroadcastOk {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },
    Read,
    ReadOk {
        messages: Vec<Value>,
    },
    Error {
        code: u32,
        text: String,
    },
}

/// An inbound line that could not be turned into a [`Message`] but still
/// names a sender, so it can be answered with an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub src: NodeId,
    pub dest: NodeId,
    pub msg_id: Option<u64>,
    pub code: u32,
    pub text: String,
}

impl Rejected {
    /// The error reply for this rejection.
    pub fn reply(&self) -> Message {
        Message {
            src: self.dest.clone(),
            dest: self.src.clone(),
            body: Body {
                msg_id: None,
                in_reply_to: self.msg_id,
                payload: Payload::Error {
                    code: self.code,
                    text: self.text.clone(),
                },
            },
        }
    }
}

/// Why a line was not decoded.
#[derive(Debug)]
pub enum Decode {
    /// Not even a routable envelope. Nothing can be replied.
    Garbage(serde_json::Error),
    /// Routable, but the body was unknown or malformed.
    Rejected(Rejected),
}

#[derive(Deserialize)]
struct Envelope {
    src: NodeId,
    dest: NodeId,
    body: serde_json::Value,
}

/// Decode one input line.
pub fn decode(line: &str) -> Result<Message, Decode> {
    let envelope: Envelope = serde_json::from_str(line).map_err(Decode::Garbage)?;
    let msg_id = envelope.body.get("msg_id").and_then(serde_json::Value::as_u64);
    let kind = envelope
        .body
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    match serde_json::from_value::<Body>(envelope.body) {
        Ok(body) => Ok(Message {
            src: envelope.src,
            dest: envelope.dest,
            body,
        }),
        Err(e) => {
            let (code, text) = match kind {
                Some(k) if !KNOWN_TYPES.contains(&k.as_str()) => {
                    (code::NOT_SUPPORTED, format!("unsupported message type: {}", k))
                }
                _ => (code::MALFORMED_REQUEST, format!("malformed body: {}", e)),
            };
            Err(Decode::Rejected(Rejected {
                src: envelope.src,
                dest: envelope.dest,
                msg_id,
                code,
                text,
            }))
        }
    }
}

/// Encode a message as one output line (newline included).
pub fn encode(msg: &Message) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}
