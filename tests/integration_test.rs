// ========================================
// INTEGRATION TESTS FOR LEDGER NODE CONSOLE (LNC)
// ========================================
//
// Test Scenarios:
// 1. Three-node session: bootstrap, transact, mine, switch, resolve
// 2. Controller built from a config file
// 3. Invalid config rejected before any request
//
// Usage:
//   cargo test --test integration_test -- --nocapture
//
// ========================================

use std::time::Duration;
use tokio::sync::broadcast;

use lnc_core::{ConsoleConfig, NodeAddress, TransactionForm};
use lnc_network::{controller_from_config, ActionOutcome, SetupError, SyncEvent};
use lnc_testnode::TestNode;

fn addr(url: &str) -> NodeAddress {
    NodeAddress::parse(url).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn titles(events: &[SyncEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Notify(n) => Some(n.title.clone()),
            _ => None,
        })
        .collect()
}

// ========================================
// TEST 1: THREE-NODE SESSION
// ========================================
#[tokio::test]
async fn test_three_node_session() {
    println!("\n🧪 TEST 1: Three-node session");
    println!("================================================\n");

    let a = TestNode::spawn().await.unwrap();
    let b = TestNode::spawn().await.unwrap();
    let c = TestNode::spawn().await.unwrap();

    let config = ConsoleConfig {
        default_node: a.url(),
        bootstrap_peers: vec![b.url()],
        refresh_interval_secs: 1,
        resolve_timeout_secs: 2,
        request_timeout_secs: Some(5),
    };
    let ctl = controller_from_config(&config).unwrap();
    let mut events = ctl.subscribe();

    // Bootstrap: A learns about B.
    ctl.start().await;
    assert_eq!(a.register_calls(), vec![vec![b.url()]]);
    assert_eq!(a.peers(), vec![b.host()]);
    println!("✅ Bootstrap peer announced to {}", a.url());

    // Transact and mine on A.
    let request = TransactionForm::new("alice", "bob", "7.25").validate().unwrap();
    assert!(ctl.submit_transaction(&request).await.is_completed());
    assert!(ctl.mine_block().await.is_completed());

    let dashboard = ctl.refresh_dashboard().await.completed().unwrap();
    let chain = dashboard.chain.unwrap();
    assert_eq!(chain.total_blocks(), 2);
    assert_eq!(chain.latest_block().unwrap().transactions[0].amount, 7.25);
    assert_eq!(dashboard.node_id.as_deref(), Some(a.node_id().as_str()));
    println!("✅ Block 2 mined on A with the submitted transaction");

    // Switch to C: C is told about A and B, and the view follows.
    let outcome = ctl.switch_active(addr(&c.url())).await;
    assert!(outcome.is_completed());
    assert_eq!(c.register_calls(), vec![vec![a.url(), b.url()]]);

    let known = ctl.list_known_endpoints();
    assert_eq!(known[0].address, addr(&c.url()));
    assert_eq!(known[0].label, "Node 1");
    assert_eq!(known.len(), 3);

    let dashboard = ctl.refresh_dashboard().await.completed().unwrap();
    assert_eq!(dashboard.node_id.as_deref(), Some(c.node_id().as_str()));
    assert_eq!(dashboard.chain.unwrap().total_blocks(), 1);
    println!("✅ Switched to C, dashboard now reads C");

    // Conflict resolution on C.
    c.set_replaced(true);
    let resolved = ctl.resolve_conflicts_now().await.completed().unwrap();
    assert!(resolved.replaced);

    let seen = drain(&mut events);
    assert_eq!(
        titles(&seen),
        vec![
            "Transaction created successfully",
            "Block mined successfully",
            "Node switched successfully",
            "Chain synchronized successfully",
        ]
    );
    assert_eq!(
        seen.iter()
            .filter(|e| **e == SyncEvent::DashboardStale)
            .count(),
        2
    );

    // Teardown: nothing reaches the view afterwards.
    ctl.shutdown();
    assert_eq!(ctl.mine_block().await, ActionOutcome::Discarded);
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(drain(&mut events).is_empty());
    assert_eq!(c.chain().len(), 1);
    println!("✅ Shutdown: no further events or requests");
}

// ========================================
// TEST 2: CONTROLLER FROM CONFIG FILE
// ========================================
#[tokio::test]
async fn test_controller_from_config_file() {
    let a = TestNode::spawn().await.unwrap();
    let b = TestNode::spawn().await.unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join(".lnc");

    let config = ConsoleConfig {
        default_node: format!("{}/", a.url()),
        bootstrap_peers: vec![b.url()],
        ..ConsoleConfig::default()
    };
    config.save_to_file(&ConsoleConfig::path_in(&dir)).unwrap();

    let loaded = ConsoleConfig::load_or_default(&dir).unwrap();
    let ctl = controller_from_config(&loaded).unwrap();
    assert_eq!(ctl.get_active_endpoint().address, addr(&a.url()));
    assert_eq!(ctl.list_known_endpoints()[1].address, addr(&b.url()));
    assert_eq!(ctl.client().resolve_timeout(), Duration::from_secs(10));
}

// ========================================
// TEST 3: INVALID CONFIG
// ========================================
#[test]
fn test_invalid_config_is_rejected() {
    let config = ConsoleConfig {
        refresh_interval_secs: 0,
        ..ConsoleConfig::default()
    };
    assert!(matches!(
        controller_from_config(&config),
        Err(SetupError::Config(_))
    ));
}
