//! Shared, lock-guarded engine handle.
//!
//! Every inbound message and the retry task go through one [`Broadcaster`].
//! The engine runs under a single mutex so the "novel? store, track" sequence
//! is atomic; the resulting messages are sent only after the guard is gone.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::trace;

use crate::{EngineStats, Gossip, GossipEngine, NodeId, Outbound, Value};

/// Fire-and-forget message delivery to a peer.
///
/// Implementations must not block. Delivery failures are swallowed: an
/// undelivered value stays pending and is retried.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, to: &NodeId, message: Gossip);
}

/// A [`GossipEngine`] behind one lock, paired with the transport it sends on.
pub struct Broadcaster<T: Transport> {
    engine: Arc<Mutex<GossipEngine>>,
    transport: Arc<T>,
}

impl<T: Transport> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> Broadcaster<T> {
    pub fn new(engine: GossipEngine, transport: T) -> Self {
        Self::with_shared_transport(engine, Arc::new(transport))
    }

    pub fn with_shared_transport(engine: GossipEngine, transport: Arc<T>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            transport,
        }
    }

    /// Accept a value from a client and start disseminating it.
    pub async fn accept(&self, value: Value) {
        let out = self.engine.lock().await.accept_external_value(value);
        self.dispatch(out);
    }

    /// Handle a value forwarded by a peer.
    ///
    /// Forwards are sent here. The acknowledgment for `sender` is returned
    /// instead, so the caller can send it as a reply to the inbound message.
    pub async fn receive_gossip(&self, value: Value, sender: &NodeId) -> Gossip {
        let out = self.engine.lock().await.receive_gossip(value, sender);
        let forwards = out
            .into_iter()
            .filter(|o| !matches!(o.message, Gossip::Ack(_)))
            .collect();
        self.dispatch(forwards);
        Gossip::Ack(value)
    }

    /// Handle an acknowledgment from a peer.
    pub async fn receive_ack(&self, value: Value, sender: &NodeId) -> bool {
        self.engine.lock().await.receive_ack(value, sender)
    }

    pub async fn read(&self) -> BTreeSet<Value> {
        self.engine.lock().await.read()
    }

    pub async fn apply_topology(&self, neighbors: Vec<NodeId>) {
        let out = self.engine.lock().await.apply_topology(neighbors);
        self.dispatch(out);
    }

    /// Resend what has been pending for at least `grace`, at most
    /// `batch_limit` records. Returns how many messages went out.
    pub async fn retry(&self, grace: Duration, batch_limit: Option<usize>) -> usize {
        let out = {
            let mut engine = self.engine.lock().await;
            engine.set_batch_limit(batch_limit);
            engine.retry_due(grace)
        };
        let sent = out.len();
        self.dispatch(out);
        sent
    }

    pub async fn stats(&self) -> EngineStats {
        self.engine.lock().await.stats()
    }

    pub async fn pending_count(&self) -> usize {
        self.engine.lock().await.pending_count()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    fn dispatch(&self, out: Vec<Outbound>) {
        for Outbound { to, message } in out {
            trace!(to = %to, ?message, "Sending");
            self.transport.send(&to, message);
        }
    }
}
