//! Keyed-child reconciliation.
//!
//! Given the caller's next entity list and the previous render list, produce
//! the next render list. Entities are never dropped here: a record whose key
//! disappeared stays in the list with `should_render == false` until its
//! controller finishes the exit animation and removes it.

use std::collections::{HashMap, HashSet};

use rune_config::InsertPolicy;

use crate::types::Keyed;

/// Per-entity bookkeeping in the render list.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord<T> {
    /// Latest entity supplied for this key.
    pub entity: T,
    /// Whether the caller still asks for this entity.
    pub should_render: bool,
    /// Suppress the enter animation of the first activation. Fixed at creation.
    pub prevent_mount_transition: bool,
}

impl<T: Keyed> RenderRecord<T> {
    pub fn new(entity: T, prevent_mount_transition: bool) -> Self {
        Self {
            entity,
            should_render: true,
            prevent_mount_transition,
        }
    }

    pub fn key(&self) -> &str {
        self.entity.key()
    }
}

/// Compute the next render list.
///
/// * Survivors get their entity refreshed so prop changes reach in-flight
///   animations.
/// * `should_render` is recomputed from presence in `next`.
/// * Untracked entities become new records (in `next` order) placed before or
///   after the existing records according to `insert_policy`.
/// * Relative order of existing records is preserved.
pub fn reconcile<T: Keyed + Clone>(
    next: &[T],
    current: Vec<RenderRecord<T>>,
    insert_policy: InsertPolicy,
    prevent_mount_transition: bool,
) -> Vec<RenderRecord<T>> {
    let next_by_key: HashMap<&str, &T> = next.iter().map(|e| (e.key(), e)).collect();
    let tracked: HashSet<String> = current.iter().map(|r| r.key().to_string()).collect();

    let updated = current.into_iter().map(|mut record| {
        match next_by_key.get(record.key()) {
            Some(entity) => {
                record.entity = (*entity).clone();
                record.should_render = true;
            }
            None => record.should_render = false,
        }
        record
    });

    let added = next
        .iter()
        .filter(|e| !tracked.contains(e.key()))
        .map(|e| RenderRecord::new(e.clone(), prevent_mount_transition));

    match insert_policy {
        InsertPolicy::Append => updated.chain(added).collect(),
        InsertPolicy::Prepend => {
            let added: Vec<_> = added.collect();
            added.into_iter().chain(updated).collect()
        }
    }
}
