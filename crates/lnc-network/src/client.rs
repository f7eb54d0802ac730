// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LNC - LEDGER CLIENT
//
// Stateless JSON-over-HTTP wrapper around the ledger node API. Every call
// targets whatever endpoint is active in the registry at the moment the
// request is built. No retries here: callers decide what a failure means.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::LedgerError;
use crate::handle::RegistryHandle;
use lnc_core::{
    ChainSnapshot, MiningResult, NodeAddress, NodeIdentity, NodeMessage, PeerList, Receipt,
    RegistrationResult, ResolveOutcome, TransactionRequest, RESOLVE_TIMEOUT_SECS,
};
use log::debug;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    registry: RegistryHandle,
    resolve_timeout: Duration,
}

impl LedgerClient {
    /// Client with the transport's default timeouts and the 10s resolve bound.
    pub fn new(registry: RegistryHandle) -> Self {
        LedgerClient {
            http: reqwest::Client::new(),
            registry,
            resolve_timeout: Duration::from_secs(RESOLVE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeouts(
        registry: RegistryHandle,
        request_timeout: Option<Duration>,
        resolve_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(limit) = request_timeout {
            builder = builder.timeout(limit);
        }
        let http = builder
            .build()
            .map_err(|e| LedgerError::transport(format!("HTTP client setup failed: {}", e)))?;
        Ok(LedgerClient {
            http,
            registry,
            resolve_timeout,
        })
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    pub async fn fetch_chain(&self) -> Result<ChainSnapshot, LedgerError> {
        let target = self.registry.active_address();
        let body = self
            .execute(self.http.get(target.url("/chain")), &target, None)
            .await?;
        decode(&body, &target, "/chain")
    }

    pub async fn fetch_identity(&self) -> Result<NodeIdentity, LedgerError> {
        let target = self.registry.active_address();
        let body = self
            .execute(self.http.get(target.url("/node-id")), &target, None)
            .await?;
        decode(&body, &target, "/node-id")
    }

    pub async fn mine_block(&self) -> Result<MiningResult, LedgerError> {
        let target = self.registry.active_address();
        let body = self
            .execute(self.http.get(target.url("/mine")), &target, None)
            .await?;
        Ok(NodeMessage::from_body(&body))
    }

    pub async fn submit_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Receipt, LedgerError> {
        let target = self.registry.active_address();
        let builder = self.http.post(target.url("/transaction/new")).json(request);
        let body = self.execute(builder, &target, None).await?;
        Ok(NodeMessage::from_body(&body))
    }

    /// Tell the active node about `peers`.
    pub async fn register_peers(
        &self,
        peers: &[NodeAddress],
    ) -> Result<RegistrationResult, LedgerError> {
        let target = self.registry.active_address();
        let nodes: Vec<&str> = peers.iter().map(NodeAddress::as_str).collect();
        let builder = self
            .http
            .post(target.url("/nodes/register"))
            .json(&serde_json::json!({ "nodes": nodes }));
        let body = self.execute(builder, &target, None).await?;
        decode(&body, &target, "/nodes/register")
    }

    /// Peers the active node tracks, as bare hosts, duplicates removed.
    pub async fn list_peers(&self) -> Result<Vec<String>, LedgerError> {
        let target = self.registry.active_address();
        let body = self
            .execute(self.http.get(target.url("/nodes")), &target, None)
            .await?;
        let list: PeerList = decode(&body, &target, "/nodes")?;

        let mut hosts: Vec<String> = Vec::with_capacity(list.total_nodes.len());
        for host in list.total_nodes {
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        Ok(hosts)
    }

    /// Ask the active node to adopt the longest valid chain among its peers.
    /// Bounded by the resolve timeout; running out yields [`LedgerError::Timeout`].
    pub async fn resolve_conflicts(&self) -> Result<ResolveOutcome, LedgerError> {
        let target = self.registry.active_address();
        let builder = self
            .http
            .get(target.url("/nodes/resolve"))
            .timeout(self.resolve_timeout);
        let body = self
            .execute(builder, &target, Some(self.resolve_timeout))
            .await?;
        decode(&body, &target, "/nodes/resolve")
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        target: &NodeAddress,
        bound: Option<Duration>,
    ) -> Result<String, LedgerError> {
        let response = builder
            .send()
            .await
            .map_err(|e| LedgerError::from_reqwest(e, target.as_str(), bound))?;
        let status = response.status();
        debug!("{} answered {}", response.url(), status);

        let body = response
            .text()
            .await
            .map_err(|e| LedgerError::from_reqwest(e, target.as_str(), bound))?;

        if !status.is_success() {
            return Err(LedgerError::from_status(status, &body));
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(
    body: &str,
    target: &NodeAddress,
    path: &str,
) -> Result<T, LedgerError> {
    serde_json::from_str(body).map_err(|e| {
        LedgerError::transport(format!("unexpected response from {}{}: {}", target, path, e))
    })
}
