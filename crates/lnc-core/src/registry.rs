// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LNC - NODE REGISTRY
//
// Single source of truth for "which endpoint is active" and "which
// endpoints are known". Pure state: every operation is infallible and
// in-memory. Reachability is only discovered when a client uses the
// active endpoint.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::form::ValidationError;
use crate::ACTIVE_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Endpoint identifier of a ledger node, e.g. `http://127.0.0.1:5000`.
///
/// Surrounding whitespace and trailing slashes are stripped so that the
/// same node typed two ways compares equal. Nothing else is checked: a
/// malformed URL shows up later as a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim().trim_end_matches('/');
        if cleaned.is_empty() {
            return Err(ValidationError::EmptyNodeAddress);
        }
        Ok(NodeAddress(cleaned.to_string()))
    }

    /// Build an endpoint from a peer-list entry. Nodes report peers as bare
    /// `host:port`, so `http://` is prefixed unless a scheme is present.
    pub fn from_host(host: &str) -> Result<Self, ValidationError> {
        let host = host.trim();
        if host.contains("://") {
            Self::parse(host)
        } else if host.is_empty() {
            Err(ValidationError::EmptyNodeAddress)
        } else {
            Self::parse(&format!("http://{}", host))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a route path (starting with `/`) onto this endpoint.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NodeAddress::parse(&value)
    }
}

impl From<NodeAddress> for String {
    fn from(addr: NodeAddress) -> Self {
        addr.0
    }
}

impl std::str::FromStr for NodeAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeAddress::parse(s)
    }
}

/// One ledger node as presented to the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub address: NodeAddress,
    pub label: String,
}

/// Immutable copy of the registry handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub active: PeerEndpoint,
    /// Active endpoint first, then the rest in insertion order.
    pub known: Vec<PeerEndpoint>,
}

/// Known endpoints plus the active one.
///
/// Labels are assigned once per address and never recomputed from list
/// position: the active endpoint is always shown as `Node 1`, every other
/// address keeps the `Node {n}` it received when it was first seen as a
/// non-active peer (`n` counts up from 2 in assignment order).
#[derive(Debug, Clone)]
pub struct RegistryStore {
    active: NodeAddress,
    /// Insertion ordered, unique, always contains `active`.
    known: Vec<NodeAddress>,
    labels: HashMap<NodeAddress, String>,
    next_label: usize,
}

impl RegistryStore {
    pub fn new(active: NodeAddress) -> Self {
        RegistryStore {
            known: vec![active.clone()],
            active,
            labels: HashMap::new(),
            next_label: 0,
        }
    }

    /// Registry seeded with bootstrap peers next to the active endpoint.
    pub fn with_peers<I>(active: NodeAddress, peers: I) -> Self
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        let mut store = Self::new(active);
        store.upsert_known(peers);
        store
    }

    pub fn get_active(&self) -> PeerEndpoint {
        PeerEndpoint {
            address: self.active.clone(),
            label: ACTIVE_LABEL.to_string(),
        }
    }

    pub fn active_address(&self) -> &NodeAddress {
        &self.active
    }

    pub fn list_known(&self) -> Vec<PeerEndpoint> {
        let mut out = Vec::with_capacity(self.known.len());
        out.push(self.get_active());
        for addr in self.known.iter().filter(|a| **a != self.active) {
            out.push(PeerEndpoint {
                address: addr.clone(),
                label: self.label_of(addr),
            });
        }
        out
    }

    /// Addresses from [`list_known`](Self::list_known) without `exclude`.
    pub fn peers_except(&self, exclude: &NodeAddress) -> Vec<NodeAddress> {
        self.list_known()
            .into_iter()
            .map(|p| p.address)
            .filter(|a| a != exclude)
            .collect()
    }

    /// Make `address` the active endpoint. Returns `false` when it already was.
    pub fn set_active(&mut self, address: NodeAddress) -> bool {
        if address == self.active {
            return false;
        }
        if !self.known.contains(&address) {
            self.known.push(address.clone());
        }
        let previous = std::mem::replace(&mut self.active, address);
        // The displaced endpoint is now an ordinary peer and needs its own label.
        self.ensure_label(&previous);
        true
    }

    /// Merge addresses into the known set. Nothing is ever removed and the
    /// active address is skipped. Returns how many addresses were new.
    pub fn upsert_known<I>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        let mut added = 0;
        for addr in addresses {
            if addr == self.active {
                continue;
            }
            if !self.known.contains(&addr) {
                self.known.push(addr.clone());
                added += 1;
            }
            self.ensure_label(&addr);
        }
        added
    }

    pub fn contains(&self, address: &NodeAddress) -> bool {
        self.known.contains(address)
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            active: self.get_active(),
            known: self.list_known(),
        }
    }

    fn label_of(&self, address: &NodeAddress) -> String {
        if *address == self.active {
            return ACTIVE_LABEL.to_string();
        }
        self.labels
            .get(address)
            .cloned()
            .unwrap_or_else(|| ACTIVE_LABEL.to_string())
    }

    fn ensure_label(&mut self, address: &NodeAddress) {
        if self.labels.contains_key(address) {
            return;
        }
        let label = format!("Node {}", 2 + self.next_label);
        self.next_label += 1;
        self.labels.insert(address.clone(), label);
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        RegistryStore::new(NodeAddress(crate::DEFAULT_NODE_URL.to_string()))
    }
}
