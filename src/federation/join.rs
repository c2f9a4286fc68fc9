// SPDX-License-Identifier: Apache-2.0

//! Join execution.
//!
//! Hash-join and nested-loop only differ in how matches are found. Both
//! report, per primary row, the indices of every matching secondary row in
//! secondary order, and share one assembly step applying the join type. The
//! output is therefore identical for both strategies, row for row.

use std::collections::HashMap;

use serde_json::Value;

use pocket_core::{Document, Filter};

use super::types::{FederatedRow, JoinClause, JoinStrategy, JoinType};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutput {
    pub rows: Vec<FederatedRow>,
    /// Output rows carrying a non-null match.
    pub joined_count: usize,
}

/// Join key of a document. Missing and `null` keys never match.
fn join_key<'a>(doc: &'a Document, field: &str) -> Option<&'a Value> {
    doc.get_path(field).filter(|value| !value.is_null())
}

/// Canonical hashable form of a key; agrees with `Value` equality.
fn hash_key(value: &Value) -> String {
    value.to_string()
}

/// Keeps only primary rows whose fields equal every global filter entry.
pub fn apply_global_filter(docs: &mut Vec<Document>, filter: Option<&Filter>) {
    if let Some(filter) = filter {
        docs.retain(|doc| filter.matches_exact(doc));
    }
}

/// Joins `primary` against `secondary` with the given strategy. `NoJoin`
/// passes primary rows through without a counterpart.
pub fn join_documents(
    strategy: JoinStrategy,
    primary: Vec<Document>,
    secondary: &[Document],
    clause: &JoinClause,
) -> JoinOutput {
    match strategy {
        JoinStrategy::NoJoin => JoinOutput {
            rows: primary.into_iter().map(FederatedRow::unjoined).collect(),
            joined_count: 0,
        },
        JoinStrategy::HashJoin => hash_join(primary, secondary, clause),
        JoinStrategy::NestedLoop => nested_loop_join(primary, secondary, clause),
    }
}

/// Builds a multi-map over the secondary side, then probes it per primary row.
pub fn hash_join(primary: Vec<Document>, secondary: &[Document], clause: &JoinClause) -> JoinOutput {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, doc) in secondary.iter().enumerate() {
        if let Some(key) = join_key(doc, clause.foreign_key()) {
            index.entry(hash_key(key)).or_default().push(idx);
        }
    }

    assemble(primary, secondary, clause, |row| {
        join_key(row, &clause.on_field)
            .and_then(|key| index.get(&hash_key(key)))
            .cloned()
            .unwrap_or_default()
    })
}

/// Scans the whole secondary side for every primary row.
pub fn nested_loop_join(primary: Vec<Document>, secondary: &[Document], clause: &JoinClause) -> JoinOutput {
    let foreign_key = clause.foreign_key();
    assemble(primary, secondary, clause, |row| {
        let Some(key) = join_key(row, &clause.on_field) else {
            return Vec::new();
        };
        secondary
            .iter()
            .enumerate()
            .filter(|(_, doc)| join_key(doc, foreign_key) == Some(key))
            .map(|(idx, _)| idx)
            .collect()
    })
}

fn assemble(
    primary: Vec<Document>,
    secondary: &[Document],
    clause: &JoinClause,
    mut matches_for: impl FnMut(&Document) -> Vec<usize>,
) -> JoinOutput {
    let mut output = JoinOutput::default();
    let mut secondary_used = vec![false; secondary.len()];

    for row in primary {
        let hits = matches_for(&row);
        if hits.is_empty() {
            if clause.join_type != JoinType::Inner {
                output.rows.push(FederatedRow::unjoined(row));
            }
            continue;
        }

        for idx in hits {
            secondary_used[idx] = true;
            output.joined_count += 1;
            output.rows.push(FederatedRow {
                primary: Some(row.clone()),
                matched: Some(secondary[idx].clone()),
            });
        }
    }

    if clause.join_type == JoinType::Full {
        let right_only = secondary
            .iter()
            .zip(&secondary_used)
            .filter(|(_, used)| !**used)
            .map(|(doc, _)| FederatedRow {
                primary: None,
                matched: Some(doc.clone()),
            });
        output.rows.extend(right_only);
    }

    output
}
