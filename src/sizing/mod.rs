//! Approximate, cycle-safe size estimation for sandbox values
//!
//! Bounded containers keep their estimate cached in the shared record and
//! answer from it directly; the traversal paths here exist for sizing raw
//! data entering a container and for recomputing an estimate from scratch.
//! Traversal cost is proportional to the number of distinct reachable
//! containers, not edges, so adversarial structural sharing stays cheap.

use std::collections::HashSet;

use crate::value::{Key, Value};

/// Identity set of shared records already counted in one traversal.
///
/// Accumulates across one whole estimate call; a value reachable by
/// multiple paths contributes once.
#[derive(Debug, Default)]
pub(crate) struct Visited {
    seen: HashSet<usize>,
}

impl Visited {
    /// Marks an identity as counted. Returns false if it already was.
    fn mark(&mut self, id: usize) -> bool {
        self.seen.insert(id)
    }
}

/// Approximate size of a single value.
///
/// Text answers by character count, containers by their cached size,
/// scalars count for nothing beyond their parent's length hint.
pub fn approx_size_of(value: &Value) -> usize {
    match value {
        Value::Text(text) => text.char_len(),
        Value::List(list) => list.approx_len(),
        Value::Map(map) => map.approx_len(),
        Value::Set(set) => set.approx_len(),
        _ => 0,
    }
}

/// Size of a batch of values about to enter a sequence: the batch length
/// plus each distinct child's estimate.
pub(crate) fn values_size(items: &[Value], visited: &mut Visited) -> usize {
    let mut size = items.len();
    for item in items {
        if let Some(id) = item.identity() {
            if !visited.mark(id) {
                continue;
            }
        }
        size += approx_size_of(item);
    }
    size
}

/// Size of a batch of key/value pairs about to enter a mapping.
pub(crate) fn entries_size(entries: &[(Key, Value)], visited: &mut Visited) -> usize {
    let mut size = entries.len();
    for (key, value) in entries {
        size += key.approx_size();
        if let Some(id) = value.identity() {
            if !visited.mark(id) {
                continue;
            }
        }
        size += approx_size_of(value);
    }
    size
}

/// Size of a batch of keys about to enter a set.
pub(crate) fn keys_size(keys: &[Key]) -> usize {
    keys.len() + keys.iter().map(Key::approx_size).sum::<usize>()
}

/// Size of a value computed from a full traversal, ignoring the root's
/// cached estimate. Each distinct reachable container is counted once.
pub fn deep_size_of(value: &Value) -> usize {
    let mut visited = Visited::default();
    if let Some(id) = value.identity() {
        visited.mark(id);
    }
    deep_size_with(value, &mut visited)
}

fn deep_size_with(value: &Value, visited: &mut Visited) -> usize {
    match value {
        Value::Text(text) => text.char_len(),
        Value::List(list) => {
            let values = list.values();
            let mut size = values.len();
            for child in values.iter() {
                if let Some(id) = child.identity() {
                    if !visited.mark(id) {
                        continue;
                    }
                }
                size += deep_size_with(child, visited);
            }
            size
        }
        Value::Map(map) => {
            let entries = map.entries();
            let mut size = entries.len();
            for (key, child) in entries.iter() {
                size += key.approx_size();
                if let Some(id) = child.identity() {
                    if !visited.mark(id) {
                        continue;
                    }
                }
                size += deep_size_with(child, visited);
            }
            size
        }
        Value::Set(set) => {
            let members = set.members();
            members.len() + members.iter().map(Key::approx_size).sum::<usize>()
        }
        _ => 0,
    }
}
