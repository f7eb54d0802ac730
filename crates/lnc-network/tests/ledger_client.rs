// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LEDGER CLIENT TESTS - against the in-memory test node
//
// Run: cargo test -p lnc-network --test ledger_client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use lnc_core::{NodeAddress, RegistryStore, TransactionForm, TransactionRequest};
use lnc_network::{LedgerClient, RegistryHandle};
use lnc_testnode::TestNode;
use std::time::Duration;

fn client_for(url: &str) -> LedgerClient {
    let store = RegistryStore::new(NodeAddress::parse(url).unwrap());
    LedgerClient::new(RegistryHandle::new(store))
}

#[tokio::test]
async fn test_fetch_chain_and_identity() {
    let node = TestNode::spawn().await.unwrap();
    let client = client_for(&node.url());

    let chain = client.fetch_chain().await.unwrap();
    assert_eq!(chain.total_blocks(), 1);
    assert_eq!(chain.latest_block().unwrap().prev_hash, None);

    let identity = client.fetch_identity().await.unwrap();
    assert_eq!(identity.node_id, node.node_id());
}

#[tokio::test]
async fn test_mine_returns_server_message() {
    let node = TestNode::spawn().await.unwrap();
    let client = client_for(&node.url());

    let mined = client.mine_block().await.unwrap();
    assert_eq!(mined.message.as_deref(), Some("New Block Forged"));
    assert_eq!(mined.block_index(), Some(2));
    assert_eq!(node.chain().len(), 2);
}

#[tokio::test]
async fn test_submit_transaction_lands_in_pending() {
    let node = TestNode::spawn().await.unwrap();
    let client = client_for(&node.url());

    let request = TransactionRequest::new("alice", "bob", 4.5).unwrap();
    let receipt = client.submit_transaction(&request).await.unwrap();
    assert_eq!(
        receipt.message.as_deref(),
        Some("Transaction will be added to Block 2")
    );

    let pending = node.pending_transactions();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].recipient, "bob");
    assert_eq!(pending[0].amount, 4.5);
}

#[tokio::test]
async fn test_submit_surfaces_server_message_and_keeps_form() {
    let node = TestNode::spawn().await.unwrap();
    node.fail_route("/transaction/new", 400, "Missing values");
    let client = client_for(&node.url());

    let form = TransactionForm::new("alice", "bob", "3");
    let request = form.validate().unwrap();
    let err = client.submit_transaction(&request).await.unwrap_err();

    assert_eq!(err.to_string(), "Missing values");
    assert_eq!(err.status(), Some(400));
    assert_eq!(form, TransactionForm::new("alice", "bob", "3"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let client = client_for("http://127.0.0.1:1");
    let request = TransactionRequest::new("alice", "bob", 1.0).unwrap();

    let err = client.submit_transaction(&request).await.unwrap_err();
    assert!(err.is_transport());
    assert!(!err.is_timeout());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_register_sends_full_urls() {
    let node = TestNode::spawn().await.unwrap();
    let client = client_for(&node.url());

    let peers = vec![
        NodeAddress::parse("http://10.0.0.2:5000").unwrap(),
        NodeAddress::parse("http://10.0.0.3:5000").unwrap(),
    ];
    let result = client.register_peers(&peers).await.unwrap();
    assert_eq!(result.message, "New nodes have been added");
    assert_eq!(
        node.register_calls(),
        vec![vec![
            "http://10.0.0.2:5000".to_string(),
            "http://10.0.0.3:5000".to_string()
        ]]
    );

    let hosts = client.list_peers().await.unwrap();
    assert_eq!(hosts, vec!["10.0.0.2:5000", "10.0.0.3:5000"]);
}

#[tokio::test]
async fn test_resolve_timeout_differs_from_server_error() {
    let slow = TestNode::spawn().await.unwrap();
    slow.set_delay("/nodes/resolve", Duration::from_secs(2));
    let store = RegistryStore::new(NodeAddress::parse(&slow.url()).unwrap());
    let client = LedgerClient::with_timeouts(
        RegistryHandle::new(store),
        None,
        Duration::from_millis(200),
    )
    .unwrap();

    let timed_out = client.resolve_conflicts().await.unwrap_err();
    assert!(timed_out.is_timeout());
    assert!(timed_out.is_transport());
    assert!(!timed_out.is_server_error());

    let broken = TestNode::spawn().await.unwrap();
    broken.fail_route("/nodes/resolve", 500, "chain store corrupted");
    let failed = client_for(&broken.url()).resolve_conflicts().await.unwrap_err();
    assert!(!failed.is_timeout());
    assert!(failed.is_server_error());
    assert_eq!(failed.message(), "chain store corrupted");
}

#[tokio::test]
async fn test_resolve_reports_replacement() {
    let node = TestNode::spawn().await.unwrap();
    let client = client_for(&node.url());

    let outcome = client.resolve_conflicts().await.unwrap();
    assert!(!outcome.replaced);
    assert_eq!(outcome.message, "Our chain is authoritative");

    node.set_replaced(true);
    assert!(client.resolve_conflicts().await.unwrap().replaced);
}

#[tokio::test]
async fn test_client_follows_active_endpoint() {
    let a = TestNode::spawn().await.unwrap();
    let b = TestNode::spawn().await.unwrap();
    let client = client_for(&a.url());

    assert_eq!(client.fetch_identity().await.unwrap().node_id, a.node_id());
    client
        .registry()
        .set_active(NodeAddress::parse(&b.url()).unwrap());
    assert_eq!(client.fetch_identity().await.unwrap().node_id, b.node_id());
}
