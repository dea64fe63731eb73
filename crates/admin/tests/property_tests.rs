//! Property tests for edit session bookkeeping.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeSet, HashSet};

use artistic_gurl_admin::{EditSession, SessionState, Snapshot};
use artistic_gurl_core::{ContentDocument, ProductId, VersionToken};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Op {
    Add,
    /// Remove an existing product, picked by position.
    RemoveExisting(prop::sample::Index),
    /// Remove an id that may or may not be present.
    RemoveAny(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        2 => any::<prop::sample::Index>().prop_map(Op::RemoveExisting),
        1 => (1u32..80).prop_map(Op::RemoveAny),
    ]
}

fn session_with(ids: &BTreeSet<u32>) -> EditSession {
    let products: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
    let document = ContentDocument::parse(json!({
        "siteConfig": {}, "contact": {}, "reviews": [], "categories": [],
        "products": products
    }))
    .unwrap();
    let mut session = EditSession::new();
    session
        .finish_hydrate(Snapshot {
            document,
            token: VersionToken::new("seed"),
        })
        .unwrap();
    session
}

fn ids(session: &EditSession) -> Vec<ProductId> {
    session
        .document()
        .unwrap()
        .products
        .iter()
        .map(|p| p.id)
        .collect()
}

proptest! {
    /// Ids stay pairwise distinct after any add/remove sequence.
    #[test]
    fn prop_ids_stay_unique(
        seed in prop::collection::btree_set(1u32..60, 0..8),
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let mut session = session_with(&seed);

        for op in ops {
            match op {
                Op::Add => {
                    let before = ids(&session);
                    let added = session.add_product().unwrap().id;
                    prop_assert!(!before.contains(&added));
                }
                Op::RemoveExisting(index) => {
                    let current = ids(&session);
                    if !current.is_empty() {
                        let id = *index.get(&current);
                        prop_assert!(session.remove_product(id).unwrap());
                        prop_assert!(!ids(&session).contains(&id));
                    }
                }
                Op::RemoveAny(n) => {
                    let id = ProductId::new(n).unwrap();
                    let existed = ids(&session).contains(&id);
                    prop_assert_eq!(session.remove_product(id).unwrap(), existed);
                }
            }

            let current = ids(&session);
            let distinct: HashSet<_> = current.iter().collect();
            prop_assert_eq!(distinct.len(), current.len());
        }

        prop_assert!(session.state() == SessionState::Hydrated || session.state() == SessionState::Dirty);
    }
}
