// Sequence helpers shared by the server (validation) and the client editor
// (moving rows and numbering them).

use std::collections::HashSet;

use crate::error::MesError;
use crate::routing::model::{Operation, OrderEntry};

/// Checks that `entries` name every id in `known` exactly once and that
/// their orders are exactly `1..=N`.
pub fn validate_full_order(entries: &[OrderEntry], known: &[i64]) -> Result<(), MesError> {
    if entries.len() != known.len() {
        return Err(MesError::validation(format!(
            "order list has {} entries but there are {} operations",
            entries.len(),
            known.len()
        )));
    }

    let known: HashSet<i64> = known.iter().copied().collect();
    let mut seen_ids = HashSet::with_capacity(entries.len());
    let mut seen_orders = HashSet::with_capacity(entries.len());
    let n = entries.len() as i32;

    for e in entries {
        if !known.contains(&e.id) {
            return Err(MesError::not_found("operation", e.id));
        }
        if !seen_ids.insert(e.id) {
            return Err(MesError::validation(format!("operation {} listed twice", e.id)));
        }
        if e.order < 1 || e.order > n {
            return Err(MesError::validation(format!(
                "order {} out of range 1..={n}",
                e.order
            )));
        }
        if !seen_orders.insert(e.order) {
            return Err(MesError::validation(format!("order {} used twice", e.order)));
        }
    }

    Ok(())
}

/// `{id, order}` pairs for rows in their displayed sequence, numbered from 1.
pub fn order_entries(rows: &[Operation]) -> Vec<OrderEntry> {
    rows.iter()
        .enumerate()
        .map(|(idx, op)| OrderEntry {
            id: op.id,
            order: idx as i32 + 1,
        })
        .collect()
}

/// Removes the element at `from` and reinserts it at `to`; everything else
/// keeps its relative order. Returns false when either index is out of range.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    true
}
