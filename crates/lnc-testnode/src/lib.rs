// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LNC - TEST LEDGER NODE
//
// A ledger node that lives in memory and speaks the console's HTTP routes.
// - /chain, /node-id, /mine, /transaction/new
// - /nodes, /nodes/register, /nodes/resolve
// No hashing and no proof-of-work: the proof is a counter. Tests can inject
// failures and latency per route.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use lnc_core::{Block, TransactionRecord};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

/// Proof recorded in the genesis block.
const GENESIS_PROOF: u64 = 100;

/// Sender used for the reward transaction appended to every mined block.
const REWARD_SENDER: &str = "0";

/// Recover from poisoned mutex instead of panicking
fn safe_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Reduce a registered node URL to the bare `host:port` form peers are
/// reported in.
fn host_of(node: &str) -> Option<String> {
    let node = node.trim();
    let without_scheme = node.split_once("://").map(|(_, rest)| rest).unwrap_or(node);
    let host = without_scheme.split('/').next().unwrap_or_default();
    (!host.is_empty()).then(|| host.to_string())
}

#[derive(Debug, Clone)]
struct Failure {
    status: StatusCode,
    message: String,
}

#[derive(Debug)]
struct NodeState {
    node_id: String,
    chain: Vec<Block>,
    pending: Vec<TransactionRecord>,
    /// Bare hosts, insertion ordered, no duplicates.
    peers: Vec<String>,
    register_calls: Vec<Vec<String>>,
    failures: HashMap<String, Failure>,
    hits: HashMap<String, usize>,
    /// Artificial latency per route, applied before the handler runs.
    delays: HashMap<String, Duration>,
    resolve_replaced: bool,
}

impl NodeState {
    fn new(node_id: String) -> Self {
        let genesis = Block {
            index: 1,
            timestamp: now_secs(),
            proof: GENESIS_PROOF,
            prev_hash: None,
            transactions: Vec::new(),
        };
        NodeState {
            node_id,
            chain: vec![genesis],
            pending: Vec::new(),
            peers: Vec::new(),
            register_calls: Vec::new(),
            failures: HashMap::new(),
            hits: HashMap::new(),
            delays: HashMap::new(),
            resolve_replaced: false,
        }
    }

    fn add_peer(&mut self, host: String) {
        if !self.peers.contains(&host) {
            self.peers.push(host);
        }
    }

    fn mine(&mut self) -> Block {
        let (index, prev_hash, proof) = match self.chain.last() {
            Some(last) => (
                last.index + 1,
                Some(format!("{:08x}{:08x}", last.index, last.proof)),
                last.proof + 1,
            ),
            None => (1, None, GENESIS_PROOF),
        };
        let mut transactions = std::mem::take(&mut self.pending);
        transactions.push(TransactionRecord {
            sender: REWARD_SENDER.to_string(),
            recipient: self.node_id.clone(),
            amount: 1.0,
        });
        let block = Block {
            index,
            timestamp: now_secs(),
            proof,
            prev_hash,
            transactions,
        };
        self.chain.push(block.clone());
        block
    }

    fn next_index(&self) -> u64 {
        self.chain.last().map(|b| b.index + 1).unwrap_or(1)
    }
}

type SharedState = Arc<Mutex<NodeState>>;

/// Helper to inject state into route handlers
fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Count the hit, short-circuit with an injected failure, otherwise run
/// `handler` against the node state.
fn respond<F>(state: &SharedState, route: &str, handler: F) -> WithStatus<Json>
where
    F: FnOnce(&mut NodeState) -> (StatusCode, serde_json::Value),
{
    let mut node = safe_lock(state);
    *node.hits.entry(route.to_string()).or_insert(0) += 1;
    if let Some(failure) = node.failures.get(route).cloned() {
        debug!("{} failing with {}", route, failure.status);
        return warp::reply::with_status(
            warp::reply::json(&json!({ "message": failure.message })),
            failure.status,
        );
    }
    let (status, body) = handler(&mut node);
    warp::reply::with_status(warp::reply::json(&body), status)
}

/// Sleep for the delay configured on `route`, if any.
async fn pause(state: &SharedState, route: &str) {
    let delay = safe_lock(state)
        .delays
        .get(route)
        .copied()
        .unwrap_or_default();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    nodes: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct NewTransaction {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<f64>,
}

fn routes(
    state: SharedState,
) -> impl Filter<Extract = (WithStatus<Json>,), Error = warp::Rejection> + Clone {
    let chain = warp::path!("chain")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: SharedState| {
            respond(&state, "/chain", |node| {
                (
                    StatusCode::OK,
                    json!({ "chain": node.chain, "length": node.chain.len() }),
                )
            })
        });

    let node_id = warp::path!("node-id")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: SharedState| {
            respond(&state, "/node-id", |node| {
                (StatusCode::OK, json!({ "node_id": node.node_id }))
            })
        });

    let mine = warp::path!("mine")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: SharedState| {
            respond(&state, "/mine", |node| {
                let block = node.mine();
                info!("forged block {}", block.index);
                (
                    StatusCode::OK,
                    json!({
                        "message": "New Block Forged",
                        "index": block.index,
                        "transactions": block.transactions,
                        "proof": block.proof,
                        "prev_hash": block.prev_hash,
                    }),
                )
            })
        });

    let new_transaction = warp::path!("transaction" / "new")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|req: NewTransaction, state: SharedState| {
            respond(&state, "/transaction/new", |node| {
                match (req.sender, req.recipient, req.amount) {
                    (Some(sender), Some(recipient), Some(amount)) => {
                        node.pending.push(TransactionRecord {
                            sender,
                            recipient,
                            amount,
                        });
                        let index = node.next_index();
                        (
                            StatusCode::CREATED,
                            json!({
                                "message": format!("Transaction will be added to Block {}", index)
                            }),
                        )
                    }
                    _ => (
                        StatusCode::BAD_REQUEST,
                        json!({ "message": "Missing values" }),
                    ),
                }
            })
        });

    let list_nodes = warp::path!("nodes")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: SharedState| async move {
            pause(&state, "/nodes").await;
            Ok::<_, Infallible>(respond(&state, "/nodes", |node| {
                (StatusCode::OK, json!({ "total_nodes": node.peers }))
            }))
        });

    let register = warp::path!("nodes" / "register")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|req: RegisterRequest, state: SharedState| {
            respond(&state, "/nodes/register", |node| {
                let nodes = req.nodes.unwrap_or_default();
                node.register_calls.push(nodes.clone());
                if nodes.is_empty() {
                    return (
                        StatusCode::BAD_REQUEST,
                        json!({ "message": "Error: Please supply a valid list of nodes" }),
                    );
                }
                for host in nodes.iter().filter_map(|n| host_of(n)) {
                    node.add_peer(host);
                }
                (
                    StatusCode::CREATED,
                    json!({
                        "message": "New nodes have been added",
                        "total_nodes": node.peers,
                    }),
                )
            })
        });

    let resolve = warp::path!("nodes" / "resolve")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: SharedState| async move {
            pause(&state, "/nodes/resolve").await;
            Ok::<_, Infallible>(respond(&state, "/nodes/resolve", |node| {
                let message = if node.resolve_replaced {
                    "Our chain was replaced"
                } else {
                    "Our chain is authoritative"
                };
                (
                    StatusCode::OK,
                    json!({
                        "message": message,
                        "replaced": node.resolve_replaced,
                        "chain": node.chain,
                    }),
                )
            }))
        });

    chain
        .or(node_id)
        .unify()
        .or(mine)
        .unify()
        .or(new_transaction)
        .unify()
        .or(register)
        .unify()
        .or(resolve)
        .unify()
        .or(list_nodes)
        .unify()
}

/// A running test node. Dropping it stops the server.
pub struct TestNode {
    state: SharedState,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl TestNode {
    /// Serve on an ephemeral localhost port.
    pub async fn spawn() -> Result<Self, warp::Error> {
        Self::spawn_on(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    pub async fn spawn_on(addr: SocketAddr) -> Result<Self, warp::Error> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let node_id = format!("{:032x}", nanos ^ u128::from(addr.port()));
        Self::spawn_with_id(addr, node_id).await
    }

    pub async fn spawn_with_id(addr: SocketAddr, node_id: String) -> Result<Self, warp::Error> {
        let state: SharedState = Arc::new(Mutex::new(NodeState::new(node_id)));
        let (tx, rx) = oneshot::channel::<()>();
        let (bound, server) = warp::serve(routes(state.clone()))
            .try_bind_with_graceful_shutdown(addr, async move {
                rx.await.ok();
            })?;
        info!("test ledger node listening on {}", bound);
        Ok(TestNode {
            state,
            addr: bound,
            shutdown: Some(tx),
            server: Some(tokio::spawn(server)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port`, the form peers are reported in.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn node_id(&self) -> String {
        safe_lock(&self.state).node_id.clone()
    }

    /// Replace the peer list served on `GET /nodes`. Entries may be URLs
    /// or bare hosts.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = safe_lock(&self.state);
        node.peers.clear();
        for host in peers.into_iter().filter_map(|p| host_of(p.as_ref())) {
            node.add_peer(host);
        }
    }

    pub fn peers(&self) -> Vec<String> {
        safe_lock(&self.state).peers.clone()
    }

    /// Bodies of every `POST /nodes/register`, in arrival order.
    pub fn register_calls(&self) -> Vec<Vec<String>> {
        safe_lock(&self.state).register_calls.clone()
    }

    /// Answer `route` (e.g. `/nodes`) with `status` and `{"message": ...}`
    /// until cleared.
    pub fn fail_route(&self, route: &str, status: u16, message: &str) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        safe_lock(&self.state).failures.insert(
            route.to_string(),
            Failure {
                status,
                message: message.to_string(),
            },
        );
    }

    pub fn clear_failure(&self, route: &str) {
        safe_lock(&self.state).failures.remove(route);
    }

    /// Requests served on `route` so far, injected failures included.
    pub fn hits(&self, route: &str) -> usize {
        safe_lock(&self.state).hits.get(route).copied().unwrap_or(0)
    }

    /// Hold every answer on `route` (e.g. `/nodes/resolve`) for `delay`.
    pub fn set_delay(&self, route: &str, delay: Duration) {
        safe_lock(&self.state)
            .delays
            .insert(route.to_string(), delay);
    }

    pub fn set_replaced(&self, replaced: bool) {
        safe_lock(&self.state).resolve_replaced = replaced;
    }

    pub fn chain(&self) -> Vec<Block> {
        safe_lock(&self.state).chain.clone()
    }

    pub fn pending_transactions(&self) -> Vec<TransactionRecord> {
        safe_lock(&self.state).pending.clone()
    }

    /// Stop accepting connections and wait for the server task.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
