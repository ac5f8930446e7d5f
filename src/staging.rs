//! In-memory staging for extracted cross-reference data.
//!
//! Each category keeps a byte-string key to byte-string set map behind
//! its own mutex. Workers fold job-local results in; the sync engine
//! drains a map into its persistent database. Keeping the four locks
//! separate lets one slow merge proceed without blocking the others.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque byte-string key.
pub type Key = Vec<u8>;

/// Unordered set of byte-string values. Never contains the empty string.
pub type ValueSet = HashSet<Vec<u8>>;

/// Job-local accumulator folded into a [`StagingMap`] in one lock hold.
pub type LocalMap = HashMap<Key, ValueSet>;

/// The four cross-reference categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Include,
    Definition,
    Reference,
    Symbol,
}

impl Category {
    /// All categories in sync order.
    pub const ALL: [Category; 4] = [
        Category::Include,
        Category::Definition,
        Category::Reference,
        Category::Symbol,
    ];

    /// Name of the persistent database tree for this category.
    pub fn tree_name(self) -> &'static str {
        match self {
            Category::Include => "Include",
            Category::Definition => "Definition",
            Category::Reference => "Reference",
            Category::Symbol => "Symbol",
        }
    }
}

/// Insert into a job-local map, dropping empty values.
pub fn stage_local(map: &mut LocalMap, key: Key, value: Vec<u8>) {
    if value.is_empty() {
        return;
    }
    map.entry(key).or_default().insert(value);
}

/// One category's shared staging map.
#[derive(Debug, Default)]
pub struct StagingMap {
    entries: Mutex<HashMap<Key, ValueSet>>,
}

impl StagingMap {
    /// Insert a single value under `key`. Empty values are dropped.
    pub fn insert(&self, key: Key, value: Vec<u8>) {
        if value.is_empty() {
            return;
        }
        self.lock().entry(key).or_default().insert(value);
    }

    /// Fold a job-local map in under one lock acquisition.
    pub fn fold(&self, local: LocalMap) {
        if local.is_empty() {
            return;
        }
        let mut entries = self.lock();
        for (key, values) in local {
            entries.entry(key).or_default().extend(values);
        }
    }

    /// Number of staged keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Staged values for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<ValueSet> {
        self.lock().get(key).cloned()
    }

    /// Take the category lock. A poisoned lock is recovered; staged data
    /// is merge-only, so a panicking holder cannot leave it half-applied
    /// in a way the union protocol would not absorb.
    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<Key, ValueSet>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The four shared staging maps.
#[derive(Debug, Default)]
pub struct StagingArea {
    includes: StagingMap,
    definitions: StagingMap,
    references: StagingMap,
    symbols: StagingMap,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// The staging map for `category`.
    pub fn map(&self, category: Category) -> &StagingMap {
        match category {
            Category::Include => &self.includes,
            Category::Definition => &self.definitions,
            Category::Reference => &self.references,
            Category::Symbol => &self.symbols,
        }
    }

    /// True when all four maps are empty.
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.map(*c).is_empty())
    }
}
