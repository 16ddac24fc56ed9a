//! Outbound side of the transport.
//!
//! All output funnels through one channel into a single writer task so that
//! lines are never interleaved. Sending is non-blocking: handlers and the
//! retry task push onto the channel and move on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use murmur_gossip::{Gossip, NodeId, Transport};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{encode, Body, Message, Payload};

/// Spawn the task that writes queued messages as JSON lines.
///
/// The task ends once every [`Outbox`] (and raw sender) is dropped.
pub fn spawn_writer<W>(mut writer: W) -> (mpsc::UnboundedSender<Message>, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let line = encode(&msg)?;
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<(), Error>(())
    });
    (tx, handle)
}

/// Handle for sending messages as this node.
#[derive(Clone)]
pub struct Outbox {
    inner: Arc<OutboxInner>,
}

struct OutboxInner {
    id: NodeId,
    next_msg_id: AtomicU64,
    tx: mpsc::UnboundedSender<Message>,
}

impl Outbox {
    pub fn new(id: NodeId, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            inner: Arc::new(OutboxInner {
                id,
                next_msg_id: AtomicU64::new(1),
                tx,
            }),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    /// Send a new message that is not a reply.
    pub fn send_payload(&self, dest: &NodeId, payload: Payload) {
        self.push(dest.clone(), None, payload);
    }

    /// Reply to a request, echoing its `msg_id` as `in_reply_to`.
    pub fn reply(&self, request: &Message, payload: Payload) {
        self.push(request.src.clone(), request.body.msg_id, payload);
    }

    /// Reply when only the sender and its `msg_id` are known.
    pub fn reply_to(&self, dest: &NodeId, in_reply_to: Option<u64>, payload: Payload) {
        self.push(dest.clone(), in_reply_to, payload);
    }

    fn push(&self, dest: NodeId, in_reply_to: Option<u64>, payload: Payload) {
        let msg = Message {
            src: self.inner.id.clone(),
            dest,
            body: Body {
                msg_id: Some(self.inner.next_msg_id.fetch_add(1, Ordering::Relaxed)),
                in_reply_to,
                payload,
            },
        };
        trace!(dest = %msg.dest, msg_id = ?msg.body.msg_id, "Queued message");
        if self.inner.tx.send(msg).is_err() {
            warn!("Output closed, dropping message");
        }
    }
}

impl Transport for Outbox {
    fn send(&self, to: &NodeId, message: Gossip) {
        let payload = match message {
            Gossip::Value(v) => Payload::Broadcast { message: v },
            Gossip::Ack(v) => Payload::BroadcastOk { message: Some(v) },
        };
        self.send_payload(to, payload);
    }
}
