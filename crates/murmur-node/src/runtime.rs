//! Node runtime: read lines, wait for `init`, then dispatch concurrently.

use std::sync::Arc;

use murmur_gossip::NodeId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, Lines};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::node::BroadcastNode;
use crate::outbox::{spawn_writer, Outbox};
use crate::protocol::{code, decode, Body, Decode, Message, Payload};

/// The `init` request and the identity it assigns.
struct Init {
    node_id: NodeId,
    node_ids: Vec<NodeId>,
    request: Message,
}

/// Run a node over the given input and output until input closes.
///
/// Every message after `init` is handled on its own task. The retry
/// scheduler runs alongside and is stopped once input is exhausted and all
/// in-flight handlers have finished.
pub async fn run<R, W>(config: NodeConfig, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, writer_task) = spawn_writer(writer);
    let mut lines = reader.lines();

    let Some(init) = wait_for_init(&mut lines, &tx).await? else {
        drop(tx);
        writer_task.await.map_err(std::io::Error::other)??;
        return Err(Error::NotInitialized);
    };

    let outbox = Outbox::new(init.node_id.clone(), tx);
    let node = Arc::new(BroadcastNode::new(
        init.node_id,
        init.node_ids,
        outbox.clone(),
        config,
    ));
    outbox.reply(&init.request, Payload::InitOk);

    let retry = node.retry_scheduler()?.spawn();
    let mut handlers = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        while let Some(joined) = handlers.try_join_next() {
            log_join(joined);
        }

        match decode(&line) {
            Ok(msg) => {
                let node = Arc::clone(&node);
                handlers.spawn(async move { node.handle(msg).await });
            }
            Err(Decode::Rejected(rejected)) => {
                warn!(from = %rejected.src, code = rejected.code, text = %rejected.text, "Rejected message");
                outbox.reply_to(
                    &rejected.src,
                    rejected.msg_id,
                    Payload::Error {
                        code: rejected.code,
                        text: rejected.text,
                    },
                );
            }
            Err(Decode::Garbage(e)) => {
                warn!(error = %e, "Dropping undecodable line");
            }
        }
    }

    info!(node = %node.id(), "Input closed, shutting down");
    while let Some(joined) = handlers.join_next().await {
        log_join(joined);
    }
    retry.abort();
    let _ = retry.await;

    let stats = node.broadcaster().stats().await;
    info!(
        values = stats.values,
        pending = stats.pending,
        retries = stats.retries,
        "Final gossip state"
    );

    drop(node);
    drop(outbox);
    writer_task.await.map_err(std::io::Error::other)??;
    Ok(())
}

/// Consume lines until `init` arrives. Anything earlier is refused with
/// "temporarily unavailable". Returns `None` if input ends first.
async fn wait_for_init<L>(
    lines: &mut Lines<L>,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<Option<Init>>
where
    L: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        match decode(&line) {
            Ok(msg) => {
                if let Payload::Init { node_id, node_ids } = &msg.body.payload {
                    debug!(node = %node_id, cluster = node_ids.len(), "Received init");
                    return Ok(Some(Init {
                        node_id: node_id.clone(),
                        node_ids: node_ids.clone(),
                        request: msg,
                    }));
                }
                warn!(from = %msg.src, "Message before init");
                send_raw(tx, unavailable(&msg));
            }
            Err(Decode::Rejected(rejected)) => {
                send_raw(tx, rejected.reply());
            }
            Err(Decode::Garbage(e)) => {
                warn!(error = %e, "Dropping undecodable line");
            }
        }
    }
    Ok(None)
}

/// Queue a message before an [`Outbox`] exists.
fn send_raw(tx: &mpsc::UnboundedSender<Message>, msg: Message) {
    if tx.send(msg).is_err() {
        warn!("Output closed, dropping message");
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "Message handler failed");
    }
}

fn unavailable(request: &Message) -> Message {
    Message {
        src: request.dest.clone(),
        dest: request.src.clone(),
        body: Body {
            msg_id: None,
            in_reply_to: request.body.msg_id,
            payload: Payload::Error {
                code: code::TEMPORARILY_UNAVAILABLE,
                text: "node not initialised".to_string(),
            },
        },
    }
}
