use proptest::prelude::*;
use serde_json::{json, Value};

use pocket_federation::federation::join::{hash_join, nested_loop_join};
use pocket_federation::{Document, JoinClause, JoinType};

/// Small key domain so collisions and misses both show up; `None` leaves the key out.
fn key() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        4 => (0u8..5).prop_map(|k| Some(json!(format!("k{k}")))),
        1 => Just(Some(Value::Null)),
        1 => Just(None),
    ]
}

fn side(field: &'static str) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(key(), 0..12).prop_map(move |keys| {
        keys.into_iter()
            .enumerate()
            .map(|(seq, key)| {
                let mut doc = Document::new();
                doc.insert("seq", json!(seq));
                if let Some(key) = key {
                    doc.insert(field, key);
                }
                doc
            })
            .collect()
    })
}

fn clause(join_type: JoinType) -> JoinClause {
    JoinClause::new("orders-db", "orders", "_id")
        .with_foreign_key("userId")
        .with_type(join_type)
}

fn join_type() -> impl Strategy<Value = JoinType> {
    prop_oneof![Just(JoinType::Inner), Just(JoinType::Left), Just(JoinType::Full)]
}

proptest! {
    #[test]
    fn hash_and_nested_loop_agree(
        primary in side("_id"),
        secondary in side("userId"),
        join_type in join_type(),
    ) {
        let c = clause(join_type);
        let hashed = hash_join(primary.clone(), &secondary, &c);
        let looped = nested_loop_join(primary, &secondary, &c);
        prop_assert_eq!(hashed, looped);
    }

    #[test]
    fn join_types_are_nested(primary in side("_id"), secondary in side("userId")) {
        let inner = hash_join(primary.clone(), &secondary, &clause(JoinType::Inner));
        let left = hash_join(primary.clone(), &secondary, &clause(JoinType::Left));
        let full = hash_join(primary.clone(), &secondary, &clause(JoinType::Full));

        // left is the inner rows plus unmatched primaries, in primary order
        let left_matched: Vec<_> = left.rows.iter().filter(|r| r.matched.is_some()).cloned().collect();
        prop_assert_eq!(&left_matched, &inner.rows);

        // full begins with exactly the left rows
        prop_assert!(full.rows.len() >= left.rows.len());
        prop_assert_eq!(&full.rows[..left.rows.len()], &left.rows[..]);
        prop_assert!(full.rows[left.rows.len()..].iter().all(|r| r.primary.is_none()));

        prop_assert_eq!(inner.joined_count, left.joined_count);
        prop_assert_eq!(left.joined_count, full.joined_count);
        prop_assert!(left.rows.len() >= primary.len());
    }

    #[test]
    fn every_secondary_row_appears_in_a_full_join(
        primary in side("_id"),
        secondary in side("userId"),
    ) {
        let full = nested_loop_join(primary, &secondary, &clause(JoinType::Full));
        for doc in &secondary {
            prop_assert!(full.rows.iter().any(|r| r.matched.as_ref() == Some(doc)));
        }
    }
}
