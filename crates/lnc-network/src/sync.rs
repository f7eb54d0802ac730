// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LNC - SYNCHRONIZATION CONTROLLER
//
// Drives the active node:
// - switch: announce the previously known peers to the new node, then refresh
// - refresh: pull the node's peer list into the registry (start, every 5s,
//   after switch / add-peer)
// - resolve: longest-chain conflict resolution, bounded at 10s
// Every ledger failure is caught here and turned into a notification.
// Nothing is delivered and nothing is written after shutdown().
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::client::LedgerClient;
use crate::error::LedgerError;
use crate::handle::{safe_lock, RegistryHandle};
use lnc_core::{
    ChainSnapshot, MiningResult, NodeAddress, PeerEndpoint, Receipt, RegistrationResult,
    RegistrySnapshot, ResolveOutcome, TransactionRequest, PEER_REFRESH_INTERVAL_SECS,
};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

/// Operator-facing message produced by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Notify(Notification),
    /// Chain and identity shown to the operator are out of date.
    DashboardStale,
    PeersRefreshed { known: usize, added: usize },
}

/// Result of a controller action. Failures have already been notified.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome<T> {
    Completed(T),
    Failed(LedgerError),
    /// The controller was shut down while the call was in flight.
    Discarded,
}

impl<T> ActionOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            ActionOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LedgerError> {
        match self {
            ActionOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ActionOutcome<U> {
        match self {
            ActionOutcome::Completed(value) => ActionOutcome::Completed(f(value)),
            ActionOutcome::Failed(err) => ActionOutcome::Failed(err),
            ActionOutcome::Discarded => ActionOutcome::Discarded,
        }
    }
}

/// What the dashboard needs after a full refresh. Either half may be
/// missing when its request failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSnapshot {
    pub chain: Option<ChainSnapshot>,
    pub node_id: Option<String>,
}

struct Shared {
    client: LedgerClient,
    events: broadcast::Sender<SyncEvent>,
    alive: AtomicBool,
    /// Serializes peer propagation and refresh so they never overlap.
    gate: tokio::sync::Mutex<()>,
    refresh_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
    stop: watch::Sender<bool>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.stop.send_replace(true);
        let poller = match self.poller.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = poller {
            handle.abort();
        }
    }
}

/// Cloneable handle; all clones drive the same session. Dropping the last
/// clone behaves like [`SyncController::shutdown`].
#[derive(Clone)]
pub struct SyncController {
    shared: Arc<Shared>,
}

impl SyncController {
    pub fn new(client: LedgerClient) -> Self {
        Self::with_interval(client, Duration::from_secs(PEER_REFRESH_INTERVAL_SECS))
    }

    pub fn with_interval(client: LedgerClient, refresh_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (stop, _) = watch::channel(false);
        SyncController {
            shared: Arc::new(Shared {
                client,
                events,
                alive: AtomicBool::new(true),
                gate: tokio::sync::Mutex::new(()),
                refresh_interval,
                poller: Mutex::new(None),
                stop,
            }),
        }
    }

    // ── Observation ─────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    pub fn watch_registry(&self) -> watch::Receiver<RegistrySnapshot> {
        self.registry().watch()
    }

    pub fn get_active_endpoint(&self) -> PeerEndpoint {
        self.registry().get_active()
    }

    pub fn list_known_endpoints(&self) -> Vec<PeerEndpoint> {
        self.registry().list_known()
    }

    pub fn registry(&self) -> &RegistryHandle {
        self.shared.client.registry()
    }

    pub fn client(&self) -> &LedgerClient {
        &self.shared.client
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Mount: announce bootstrap peers to the active node, refresh once, then
    /// keep refreshing on the configured interval until shutdown.
    pub async fn start(&self) {
        if !self.is_alive() || safe_lock(&self.shared.poller).is_some() {
            return;
        }
        self.initial_pass().await;
        if !self.is_alive() {
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let stop = self.shared.stop.subscribe();
        let period = self.shared.refresh_interval;
        let handle = tokio::spawn(poll_peers(weak, stop, period));

        let mut slot = safe_lock(&self.shared.poller);
        if slot.is_some() {
            // Another start() won the race.
            handle.abort();
        } else {
            *slot = Some(handle);
        }
    }

    /// Stop the timer. In-flight calls finish but their results are dropped.
    pub fn shutdown(&self) {
        if self.shared.alive.swap(false, Ordering::SeqCst) {
            info!("sync controller shutting down");
        }
        self.shared.stop.send_replace(true);
        if let Some(handle) = safe_lock(&self.shared.poller).take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_alive() && safe_lock(&self.shared.poller).is_some()
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    // ── Peer propagation ────────────────────────────────────────

    /// Make `address` active and tell it about every peer known before the
    /// switch. The selection is kept even if the announcement fails.
    ///
    /// With no other peers known, no request is sent and the outcome carries
    /// a local `RegistrationResult` with an empty `total_nodes`.
    pub async fn switch_active(&self, address: NodeAddress) -> ActionOutcome<RegistrationResult> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        // Snapshot before the switch so the new node is not told about itself.
        let other_peers = self.registry().peers_except(&address);
        if self.registry().set_active(address.clone()) {
            info!("active node is now {}", address);
        }

        let _gate = self.shared.gate.lock().await;
        let result = if other_peers.is_empty() {
            Ok(RegistrationResult {
                message: "No other nodes to register".to_string(),
                total_nodes: Vec::new(),
            })
        } else {
            self.shared.client.register_peers(&other_peers).await
        };
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        match result {
            Ok(registration) => {
                debug!(
                    "registered {} peer(s) with {}",
                    other_peers.len(),
                    address
                );
                if let ActionOutcome::Discarded = self.refresh_locked().await {
                    return ActionOutcome::Discarded;
                }
                self.notify(
                    NotificationLevel::Success,
                    "Node switched successfully",
                    Some("Nodes have been registered with the new active node".to_string()),
                );
                ActionOutcome::Completed(registration)
            }
            Err(err) => {
                self.notify_failure("Error switching nodes", &err);
                ActionOutcome::Failed(err)
            }
        }
    }

    /// Register one more peer with the active node.
    pub async fn add_peer(&self, address: NodeAddress) -> ActionOutcome<RegistrationResult> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let result = self
            .shared
            .client
            .register_peers(std::slice::from_ref(&address))
            .await;
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        match result {
            Ok(registration) => {
                info!("registered {} with the active node", address);
                self.notify(
                    NotificationLevel::Success,
                    "Node added successfully",
                    non_empty(&registration.message),
                );
                self.refresh_now().await;
                ActionOutcome::Completed(registration)
            }
            Err(err) => {
                self.notify_failure("Error adding node", &err);
                ActionOutcome::Failed(err)
            }
        }
    }

    /// Pull the active node's peer list. Failures are logged, never notified,
    /// and leave the registry untouched. Returns the number of new peers.
    pub async fn refresh_now(&self) -> ActionOutcome<usize> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let _gate = self.shared.gate.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> ActionOutcome<usize> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let result = self.shared.client.list_peers().await;
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        let hosts = match result {
            Ok(hosts) => hosts,
            Err(err) => {
                warn!("peer refresh failed, keeping known peers: {}", err);
                return ActionOutcome::Failed(err);
            }
        };

        // Whatever is active now, not when the request went out.
        let active = self.registry().active_address();
        let peers: Vec<NodeAddress> = hosts
            .iter()
            .filter_map(|host| match NodeAddress::from_host(host) {
                Ok(addr) => Some(addr),
                Err(e) => {
                    debug!("ignoring peer entry '{}': {}", host, e);
                    None
                }
            })
            .filter(|addr| *addr != active)
            .collect();

        let added = self.registry().upsert_known(peers);
        if added > 0 {
            info!("discovered {} new peer(s) via {}", added, active);
        }
        self.emit(SyncEvent::PeersRefreshed {
            known: self.registry().known_count(),
            added,
        });
        ActionOutcome::Completed(added)
    }

    async fn initial_pass(&self) {
        let _gate = self.shared.gate.lock().await;
        let active = self.registry().active_address();
        let others = self.registry().peers_except(&active);
        if !others.is_empty() {
            match self.shared.client.register_peers(&others).await {
                Ok(_) => info!("announced {} bootstrap peer(s) to {}", others.len(), active),
                Err(err) => warn!("bootstrap registration with {} failed: {}", active, err),
            }
        }
        self.refresh_locked().await;
    }

    async fn periodic_refresh(&self) {
        match self.shared.gate.try_lock() {
            Ok(_gate) => {
                self.refresh_locked().await;
            }
            Err(_) => debug!("peer propagation in progress, skipping refresh tick"),
        }
    }

    // ── Ledger actions ──────────────────────────────────────────

    /// Conflict resolution on the active node. On success the consumer is
    /// told to reload chain and identity; the outcome is not cached.
    pub async fn resolve_conflicts_now(&self) -> ActionOutcome<ResolveOutcome> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let result = self.shared.client.resolve_conflicts().await;
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        match result {
            Ok(outcome) => {
                info!(
                    "conflict resolution finished (replaced: {})",
                    outcome.replaced
                );
                self.notify(
                    NotificationLevel::Success,
                    "Chain synchronized successfully",
                    non_empty(&outcome.message),
                );
                self.emit(SyncEvent::DashboardStale);
                ActionOutcome::Completed(outcome)
            }
            Err(err) => {
                let title = if err.is_timeout() {
                    "Node unreachable"
                } else {
                    "Failed to sync chain"
                };
                self.notify_failure(title, &err);
                ActionOutcome::Failed(err)
            }
        }
    }

    /// Chain and identity of the active node, fetched together.
    pub async fn refresh_dashboard(&self) -> ActionOutcome<DashboardSnapshot> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let client = &self.shared.client;
        let (chain, identity) = tokio::join!(client.fetch_chain(), client.fetch_identity());
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        match (chain, identity) {
            (Err(chain_err), Err(id_err)) => {
                self.notify_failure("Error fetching chain", &chain_err);
                self.notify_failure("Error fetching node ID", &id_err);
                ActionOutcome::Failed(chain_err)
            }
            (chain, identity) => {
                let chain = chain
                    .map_err(|e| self.notify_failure("Error fetching chain", &e))
                    .ok();
                let node_id = identity
                    .map_err(|e| self.notify_failure("Error fetching node ID", &e))
                    .ok()
                    .map(|id| id.node_id);
                ActionOutcome::Completed(DashboardSnapshot { chain, node_id })
            }
        }
    }

    pub async fn mine_block(&self) -> ActionOutcome<MiningResult> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let result = self.shared.client.mine_block().await;
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        match result {
            Ok(mined) => {
                self.notify(
                    NotificationLevel::Success,
                    "Block mined successfully",
                    mined.message.clone(),
                );
                self.emit(SyncEvent::DashboardStale);
                ActionOutcome::Completed(mined)
            }
            Err(err) => {
                self.notify_failure("Error mining block", &err);
                ActionOutcome::Failed(err)
            }
        }
    }

    pub async fn submit_transaction(&self, request: &TransactionRequest) -> ActionOutcome<Receipt> {
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }
        let result = self.shared.client.submit_transaction(request).await;
        if !self.is_alive() {
            return ActionOutcome::Discarded;
        }

        match result {
            Ok(receipt) => {
                self.notify(
                    NotificationLevel::Success,
                    "Transaction created successfully",
                    receipt.message.clone(),
                );
                ActionOutcome::Completed(receipt)
            }
            Err(err) => {
                self.notify_failure("Error creating transaction", &err);
                ActionOutcome::Failed(err)
            }
        }
    }

    // ── Delivery ────────────────────────────────────────────────

    fn emit(&self, event: SyncEvent) {
        if !self.is_alive() {
            return;
        }
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }

    fn notify(&self, level: NotificationLevel, title: &str, detail: Option<String>) {
        debug!("notify {:?}: {} {:?}", level, title, detail);
        self.emit(SyncEvent::Notify(Notification {
            level,
            title: title.to_string(),
            detail,
        }));
    }

    fn notify_failure(&self, title: &str, err: &LedgerError) {
        warn!("{}: {}", title, err);
        self.notify(NotificationLevel::Error, title, Some(err.message().to_string()));
    }
}

fn non_empty(message: &str) -> Option<String> {
    let trimmed = message.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn poll_peers(weak: Weak<Shared>, mut stop: watch::Receiver<bool>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // Consume the first immediate tick

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(shared) = weak.upgrade() else { break };
                let controller = SyncController { shared };
                if !controller.is_alive() {
                    break;
                }
                controller.periodic_refresh().await;
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
    debug!("peer refresh timer stopped");
}
