// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROPERTY-BASED TESTS - lnc-core registry
//
// Invariants of the node registry that must hold for every sequence of
// refreshes and active switches.
//
// Run: cargo test -p lnc-core --test prop_registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use lnc_core::{NodeAddress, RegistryStore};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
enum Op {
    Upsert(Vec<u8>),
    SetActive(u8),
}

fn node(id: u8) -> NodeAddress {
    NodeAddress::parse(&format!("http://10.0.0.{}:5000", id)).unwrap()
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(0u8..12, 0..6).prop_map(Op::Upsert),
        1 => (0u8..12).prop_map(Op::SetActive),
    ]
}

fn apply(store: &mut RegistryStore, op: &Op) {
    match op {
        Op::Upsert(ids) => {
            store.upsert_known(ids.iter().map(|id| node(*id)));
        }
        Op::SetActive(id) => {
            store.set_active(node(*id));
        }
    }
}

proptest! {
    #[test]
    fn prop_active_is_listed_first(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut store = RegistryStore::new(node(0));
        for op in &ops {
            apply(&mut store, op);
            let known = store.list_known();
            prop_assert_eq!(&known[0], &store.get_active());
            prop_assert_eq!(known[0].label.as_str(), "Node 1");
        }
    }

    #[test]
    fn prop_addresses_are_unique(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut store = RegistryStore::new(node(0));
        for op in &ops {
            apply(&mut store, op);
        }
        let known = store.list_known();
        let unique: HashSet<_> = known.iter().map(|p| p.address.clone()).collect();
        prop_assert_eq!(unique.len(), known.len());
        prop_assert_eq!(known.len(), store.known_count());
    }

    #[test]
    fn prop_labels_never_change_while_inactive(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut store = RegistryStore::new(node(0));
        let mut seen: HashMap<NodeAddress, String> = HashMap::new();
        for op in &ops {
            apply(&mut store, op);
            for peer in store.list_known().into_iter().skip(1) {
                if let Some(previous) = seen.get(&peer.address) {
                    prop_assert_eq!(previous, &peer.label);
                } else {
                    seen.insert(peer.address.clone(), peer.label.clone());
                }
            }
        }
    }

    #[test]
    fn prop_non_active_labels_are_distinct(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut store = RegistryStore::new(node(0));
        for op in &ops {
            apply(&mut store, op);
        }
        let labels: Vec<String> = store.list_known().into_iter().skip(1).map(|p| p.label).collect();
        let unique: HashSet<_> = labels.iter().collect();
        prop_assert_eq!(unique.len(), labels.len());
        prop_assert!(labels.iter().all(|l| l != "Node 1"));
    }

    #[test]
    fn prop_upsert_never_forgets(ops in prop::collection::vec(arb_op(), 0..40), extra in prop::collection::vec(0u8..12, 0..6)) {
        let mut store = RegistryStore::new(node(0));
        for op in &ops {
            apply(&mut store, op);
        }
        let before: HashSet<_> = store.list_known().into_iter().map(|p| p.address).collect();
        store.upsert_known(extra.iter().map(|id| node(*id)));
        let after: HashSet<_> = store.list_known().into_iter().map(|p| p.address).collect();
        prop_assert!(before.is_subset(&after));
    }
}
