//! Merge staged cross-reference data into the persistent store.
//!
//! Stored values are LF-joined sets. A sync unions the staged set with
//! the stored one and writes back only when the staged set adds
//! something, so re-indexing unchanged units produces no writes.

use std::path::Path;

use tracing::{debug, error, warn};

use crate::staging::{Category, StagingArea, StagingMap, ValueSet};
use crate::store::XrefStore;

/// Outcome of syncing one category.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncStats {
    /// Keys whose stored set grew this cycle.
    pub keys_merged: usize,
    /// Keys whose staged values were already stored.
    pub keys_skipped: usize,
}

/// Parse an LF-joined value into a set, dropping empty elements.
///
/// Accepts values with or without a trailing LF.
pub fn parse_set(bytes: &[u8]) -> ValueSet {
    bytes
        .split(|&b| b == b'\n')
        .filter(|element| !element.is_empty())
        .map(|element| element.to_vec())
        .collect()
}

/// Serialise a set as LF-joined elements, each with a trailing LF.
///
/// Element order is arbitrary; readers must never rely on it.
pub fn serialize_set(set: &ValueSet) -> Vec<u8> {
    let mut out = Vec::with_capacity(set.iter().map(|v| v.len() + 1).sum());
    for value in set {
        out.extend_from_slice(value);
        out.push(b'\n');
    }
    out
}

/// Sync every category into the store under `root`.
///
/// A failed store open skips the whole cycle; the staged data stays put
/// and the next trigger retries.
pub fn sync_all(root: &Path, staging: &StagingArea) -> Vec<(Category, SyncStats)> {
    let store = match XrefStore::open(root) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "skipping sync cycle, store not available");
            return Vec::new();
        }
    };

    let stats: Vec<_> = Category::ALL
        .iter()
        .map(|&category| (category, sync_category(&store, staging.map(category), category)))
        .collect();

    if let Err(e) = store.flush() {
        warn!(error = %e, "failed to flush xref store");
    }
    stats
}

/// Merge one staging map into its database tree.
///
/// Holds the category lock for the full read-merge-clear-commit, so a
/// worker contending on the same category observes an empty map when it
/// proceeds and its insertions form the next batch.
pub fn sync_category(store: &XrefStore, map: &StagingMap, category: Category) -> SyncStats {
    let tree = match store.tree(category) {
        Ok(tree) => tree,
        Err(e) => {
            warn!(category = category.tree_name(), error = %e, "skipping category sync");
            return SyncStats::default();
        }
    };

    let mut stats = SyncStats::default();
    let mut entries = map.lock();
    let mut batch = sled::Batch::default();

    for (key, staged) in entries.iter() {
        // A failed point read merges against the empty set.
        let stored_bytes = match XrefStore::read(&tree, key) {
            Ok(value) => value,
            Err(e) => {
                warn!(category = category.tree_name(), error = %e, "point read failed, assuming absent");
                None
            }
        };
        let mut stored: ValueSet = stored_bytes.as_deref().map(parse_set).unwrap_or_default();

        if staged.is_subset(&stored) {
            stats.keys_skipped += 1;
            continue;
        }

        stored.extend(staged.iter().cloned());
        batch.insert(key.clone(), serialize_set(&stored));
        stats.keys_merged += 1;
    }

    entries.clear();

    if let Err(e) = XrefStore::commit(&tree, batch) {
        // The staged entries were already cleared; they are lost until
        // the same units are indexed again.
        error!(category = category.tree_name(), error = %e, "batch commit failed, staged data dropped");
    }
    drop(entries);

    debug!(
        category = category.tree_name(),
        merged = stats.keys_merged,
        skipped = stats.keys_skipped,
        "category synced"
    );
    stats
}
