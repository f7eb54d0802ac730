// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LEDGER NODE CONSOLE (LNC) - CORE MODULE
//
// Wire payloads exchanged with a ledger node, the node registry, the
// transaction form and console configuration. No I/O happens here apart
// from reading and writing the config file.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

pub mod config;
pub mod form;
pub mod registry;

pub use config::{ConfigError, ConsoleConfig};
pub use form::{TransactionForm, TransactionRequest, ValidationError};
pub use registry::{NodeAddress, PeerEndpoint, RegistrySnapshot, RegistryStore};

/// Endpoint the registry starts with when nothing else is configured.
pub const DEFAULT_NODE_URL: &str = "http://localhost:5000";

/// Fixed interval between two peer refreshes.
pub const PEER_REFRESH_INTERVAL_SECS: u64 = 5;

/// Upper bound on the conflict-resolution round trip.
pub const RESOLVE_TIMEOUT_SECS: u64 = 10;

/// Label reserved for the active endpoint.
pub const ACTIVE_LABEL: &str = "Node 1";

// ─────────────────────────────────────────────────────────────────
// LEDGER PAYLOADS
// ─────────────────────────────────────────────────────────────────
// Opaque to the sync core. The view only reads counts, the latest
// block and its transactions.
// ─────────────────────────────────────────────────────────────────

/// A transfer as recorded inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix seconds. Nodes written in dynamic languages send fractional values.
    pub timestamp: f64,
    pub proof: u64,
    /// `None` for the genesis block.
    #[serde(default)]
    pub prev_hash: Option<String>,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

impl Block {
    /// Whole seconds since the epoch, clamped at zero.
    pub fn timestamp_secs(&self) -> i64 {
        if self.timestamp.is_finite() && self.timestamp > 0.0 {
            self.timestamp.trunc() as i64
        } else {
            0
        }
    }
}

/// Response of `GET /chain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: u64,
}

impl ChainSnapshot {
    pub fn latest_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Length as reported by the node, which is what the dashboard shows.
    pub fn total_blocks(&self) -> u64 {
        self.length
    }
}

/// Response of `GET /node-id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_id: String,
}

/// Response of `POST /nodes/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub total_nodes: Vec<String>,
}

/// Response of `GET /nodes`. Entries are bare hosts such as `127.0.0.1:5001`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerList {
    #[serde(default)]
    pub total_nodes: Vec<String>,
}

/// Response of `GET /nodes/resolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveOutcome {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub replaced: bool,
}

/// Loosely shaped reply used for mining results and transaction receipts.
///
/// Nodes disagree on these bodies (some answer with JSON, some with a bare
/// sentence), so the raw body is kept next to the extracted message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMessage {
    pub message: Option<String>,
    pub body: serde_json::Value,
}

pub type MiningResult = NodeMessage;
pub type Receipt = NodeMessage;

impl NodeMessage {
    /// Decode a response body. JSON objects contribute their `message`
    /// field; anything that is not JSON becomes the message itself.
    pub fn from_body(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(body) => {
                let message = match &body {
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => other["message"].as_str().map(str::to_string),
                };
                NodeMessage { message, body }
            }
            Err(_) => {
                let trimmed = text.trim();
                NodeMessage {
                    message: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                    body: serde_json::Value::Null,
                }
            }
        }
    }

    /// Block index reported by a mining reply, if any.
    pub fn block_index(&self) -> Option<u64> {
        self.body["index"].as_u64()
    }
}
