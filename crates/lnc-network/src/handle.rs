// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LNC - REGISTRY HANDLE
//
// Owned, cloneable access to the one RegistryStore of the process. The
// client reads the active endpoint through it on every call; the controller
// is the only writer. Every change is published on a watch channel.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use lnc_core::{NodeAddress, PeerEndpoint, RegistrySnapshot, RegistryStore};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Recover from poisoned mutex instead of panicking
pub(crate) fn safe_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Clone)]
pub struct RegistryHandle {
    store: Arc<Mutex<RegistryStore>>,
    updates: Arc<watch::Sender<RegistrySnapshot>>,
}

impl RegistryHandle {
    pub fn new(store: RegistryStore) -> Self {
        let (updates, _) = watch::channel(store.snapshot());
        RegistryHandle {
            store: Arc::new(Mutex::new(store)),
            updates: Arc::new(updates),
        }
    }

    /// Read the active address now. Never cache the result across a call.
    pub fn active_address(&self) -> NodeAddress {
        safe_lock(&self.store).active_address().clone()
    }

    pub fn get_active(&self) -> PeerEndpoint {
        safe_lock(&self.store).get_active()
    }

    pub fn list_known(&self) -> Vec<PeerEndpoint> {
        safe_lock(&self.store).list_known()
    }

    pub fn peers_except(&self, exclude: &NodeAddress) -> Vec<NodeAddress> {
        safe_lock(&self.store).peers_except(exclude)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        safe_lock(&self.store).snapshot()
    }

    pub fn set_active(&self, address: NodeAddress) -> bool {
        let mut store = safe_lock(&self.store);
        let changed = store.set_active(address);
        if changed {
            // Published under the lock so writers cannot overtake each other.
            self.updates.send_replace(store.snapshot());
        }
        changed
    }

    pub fn upsert_known<I>(&self, addresses: I) -> usize
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        let mut store = safe_lock(&self.store);
        let added = store.upsert_known(addresses);
        if added > 0 {
            self.updates.send_replace(store.snapshot());
        }
        added
    }

    pub fn known_count(&self) -> usize {
        safe_lock(&self.store).known_count()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<RegistrySnapshot> {
        self.updates.subscribe()
    }
}

impl Default for RegistryHandle {
    fn default() -> Self {
        RegistryHandle::new(RegistryStore::default())
    }
}
