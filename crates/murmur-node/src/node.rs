//! Broadcast Node - message dispatch for an initialised node.
//!
//! Maps each inbound message kind onto the gossip core:
//!
//! ```text
//! TYPE            FROM     ACTION                          REPLY
//! ─────────────────────────────────────────────────────────────────────
//! broadcast       client   Broadcaster::accept             broadcast_ok
//! broadcast       peer     Broadcaster::receive_gossip     broadcast_ok + message
//! broadcast_ok    peer     Broadcaster::receive_ack        none
//! read            any      Broadcaster::read               read_ok
//! topology        any      Broadcaster::apply_topology     topology_ok
//! echo            any      -                               echo_ok
//! generate        any      IdGenerator::next_id            generate_ok
//! ```
//!
//! A sender is a peer iff it is listed in `node_ids` from `init`.

use std::collections::HashSet;

use murmur_gossip::{Broadcaster, GossipEngine, NodeId, RetryScheduler};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::Result;
use crate::outbox::Outbox;
use crate::protocol::{Message, Payload};
use crate::uid::IdGenerator;

/// A node that has completed `init`.
pub struct BroadcastNode {
    id: NodeId,
    cluster: HashSet<NodeId>,
    outbox: Outbox,
    broadcaster: Broadcaster<Outbox>,
    ids: IdGenerator,
    config: NodeConfig,
}

impl BroadcastNode {
    pub fn new(id: NodeId, node_ids: Vec<NodeId>, outbox: Outbox, config: NodeConfig) -> Self {
        let engine = GossipEngine::new(id.clone());
        let broadcaster = Broadcaster::new(engine, outbox.clone());
        let cluster: HashSet<NodeId> = node_ids.into_iter().filter(|n| n != &id).collect();

        info!(node = %id, peers = cluster.len(), "Node initialised");

        Self {
            ids: IdGenerator::new(id.clone()),
            id,
            cluster,
            outbox,
            broadcaster,
            config,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn broadcaster(&self) -> &Broadcaster<Outbox> {
        &self.broadcaster
    }

    /// Check whether `id` is another member of the cluster.
    pub fn is_peer(&self, id: &NodeId) -> bool {
        self.cluster.contains(id)
    }

    /// Build the retry task for this node's broadcaster.
    pub fn retry_scheduler(&self) -> Result<RetryScheduler<Outbox>> {
        Ok(RetryScheduler::new(self.broadcaster.clone(), self.config.retry)?)
    }

    /// Handle one inbound message.
    pub async fn handle(&self, msg: Message) {
        match &msg.body.payload {
            Payload::Init { node_id, .. } => {
                if node_id != &self.id {
                    warn!(node = %self.id, requested = %node_id, "Ignoring re-init with a different id");
                }
                self.outbox.reply(&msg, Payload::InitOk);
            }

            Payload::Echo { echo } => {
                self.outbox.reply(&msg, Payload::EchoOk { echo: echo.clone() });
            }

            Payload::Generate => {
                let id = self.ids.next_id();
                self.outbox.reply(&msg, Payload::GenerateOk { id });
            }

            Payload::Topology { topology } => {
                let neighbors = topology.get(&self.id).cloned().unwrap_or_default();
                if neighbors.is_empty() {
                    warn!(node = %self.id, "Topology has no neighbors for this node");
                }
                self.broadcaster.apply_topology(neighbors).await;
                self.outbox.reply(&msg, Payload::TopologyOk);
            }

            Payload::Broadcast { message } => {
                if self.is_peer(&msg.src) {
                    let ack = self.broadcaster.receive_gossip(*message, &msg.src).await;
                    self.outbox.reply(
                        &msg,
                        Payload::BroadcastOk {
                            message: Some(ack.value()),
                        },
                    );
                } else {
                    self.broadcaster.accept(*message).await;
                    self.outbox
                        .reply(&msg, Payload::BroadcastOk { message: None });
                }
            }

            Payload::BroadcastOk { message: Some(value) } => {
                self.broadcaster.receive_ack(*value, &msg.src).await;
            }

            Payload::Read => {
                let messages = self.broadcaster.read().await.into_iter().collect();
                self.outbox.reply(&msg, Payload::ReadOk { messages });
            }

            Payload::Error { code, text } => {
                debug!(from = %msg.src, code, text = %text, "Peer reported error");
            }

            Payload::BroadcastOk { message: None }
            | Payload::InitOk
            | Payload::EchoOk { .. }
            | Payload::GenerateOk { .. }
            | Payload::TopologyOk
            | Payload::ReadOk { .. } => {
                debug!(from = %msg.src, payload = ?msg.body.payload, "Ignoring reply");
            }
        }
    }
}
