//! Several node runtimes wired together through a lossy in-memory router.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use murmur_gossip::RetryConfig;
use murmur_node::{run, NodeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const NODES: usize = 5;
const DROP_RATE: f64 = 0.25;

type Input = Arc<Mutex<DuplexStream>>;

struct Cluster {
    inputs: Vec<Input>,
    client: mpsc::UnboundedReceiver<Value>,
    tasks: Vec<JoinHandle<()>>,
}

fn name(i: usize) -> String {
    format!("n{}", i)
}

async fn write_line(input: &Input, msg: &Value) {
    let line = format!("{}\n", msg);
    input.lock().await.write_all(line.as_bytes()).await.unwrap();
}

impl Cluster {
    fn start(seed: u64) -> Self {
        let rng = Arc::new(StdMutex::new(StdRng::seed_from_u64(seed)));
        let (client_tx, client) = mpsc::unbounded_channel();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut tasks = Vec::new();

        for _ in 0..NODES {
            let (input, node_in) = duplex(1 << 20);
            let (node_out, output) = duplex(1 << 20);
            let config = NodeConfig::default().with_retry(RetryConfig::fast());
            tasks.push(tokio::spawn(async move {
                let _ = run(config, BufReader::new(node_in), node_out).await;
            }));
            inputs.push(Arc::new(Mutex::new(input)));
            outputs.push(output);
        }

        for output in outputs {
            let inputs = inputs.clone();
            let rng = Arc::clone(&rng);
            let client_tx = client_tx.clone();
            tasks.push(tokio::spawn(async move {
                let mut lines = BufReader::new(output).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let msg: Value = serde_json::from_str(&line).unwrap();
                    let dest = msg["dest"].as_str().unwrap().to_string();
                    match dest.strip_prefix('n').and_then(|i| i.parse::<usize>().ok()) {
                        Some(i) => {
                            let dropped = rng.lock().unwrap().gen_bool(DROP_RATE);
                            if !dropped {
                                write_line(&inputs[i], &msg).await;
                            }
                        }
                        None => {
                            let _ = client_tx.send(msg);
                        }
                    }
                }
            }));
        }

        Self {
            inputs,
            client,
            tasks,
        }
    }

    async fn request(&self, node: usize, body: Value) {
        let msg = json!({"src": "c1", "dest": name(node), "body": body});
        write_line(&self.inputs[node], &msg).await;
    }

    /// Wait for `n` client replies of the given type.
    async fn expect(&mut self, kind: &str, n: usize) -> Vec<Value> {
        let mut out = Vec::new();
        while out.len() < n {
            let msg = timeout(Duration::from_secs(5), self.client.recv())
                .await
                .expect("timed out waiting for client reply")
                .unwrap();
            if msg["body"]["type"] == kind {
                out.push(msg);
            }
        }
        out
    }

    async fn init_line(&mut self) {
        let ids: Vec<String> = (0..NODES).map(name).collect();
        for i in 0..NODES {
            self.request(
                i,
                json!({"type": "init", "msg_id": 1, "node_id": name(i), "node_ids": ids}),
            )
            .await;
        }
        self.expect("init_ok", NODES).await;

        let mut topology = serde_json::Map::new();
        for i in 0..NODES {
            let mut neighbors = Vec::new();
            if i > 0 {
                neighbors.push(name(i - 1));
            }
            if i + 1 < NODES {
                neighbors.push(name(i + 1));
            }
            topology.insert(name(i), json!(neighbors));
        }
        for i in 0..NODES {
            self.request(i, json!({"type": "topology", "msg_id": 2, "topology": topology}))
                .await;
        }
        self.expect("topology_ok", NODES).await;
    }

    async fn read_all(&mut self) -> Vec<BTreeSet<i64>> {
        for i in 0..NODES {
            self.request(i, json!({"type": "read", "msg_id": 3})).await;
        }
        let mut views = vec![BTreeSet::new(); NODES];
        for reply in self.expect("read_ok", NODES).await {
            let from = reply["src"].as_str().unwrap();
            let i: usize = from[1..].parse().unwrap();
            views[i] = reply["body"]["messages"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_i64().unwrap())
                .collect();
        }
        views
    }

    fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

#[tokio::test]
async fn lossy_line_cluster_converges() {
    let mut cluster = Cluster::start(7);
    cluster.init_line().await;

    let values: BTreeSet<i64> = (0..20).collect();
    for v in &values {
        let node = (*v as usize) % NODES;
        cluster
            .request(node, json!({"type": "broadcast", "msg_id": 100 + v, "message": v}))
            .await;
    }
    cluster.expect("broadcast_ok", values.len()).await;

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let views = cluster.read_all().await;
        if views.iter().all(|view| view == &values) {
            break;
        }
        assert!(Instant::now() < deadline, "cluster did not converge: {:?}", views);
        sleep(Duration::from_millis(50)).await;
    }

    cluster.stop();
}
