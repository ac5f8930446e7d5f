//! Shared mock semantic parser for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use xref_daemon::{
    parse_set, Category, Cursor, CursorKind, Diagnostic, Inclusion, IndexEvent, SourceLocation,
    Unit, UnitCache, UnitFlags, UnitOrigin, XrefStore,
};

/// Cursor tree node with explicit semantic-parent chains.
pub struct MockCursor {
    pub kind: CursorKind,
    pub usr: Vec<u8>,
    pub display_name: Vec<u8>,
    pub location: Option<SourceLocation>,
    pub is_definition: bool,
    pub referenced: Option<Box<MockCursor>>,
    pub semantic_parent: Option<Box<MockCursor>>,
    pub children: Vec<MockCursor>,
}

impl MockCursor {
    pub fn new(kind: CursorKind) -> Self {
        Self {
            kind,
            usr: Vec::new(),
            display_name: Vec::new(),
            location: None,
            is_definition: false,
            referenced: None,
            semantic_parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_usr(mut self, usr: &[u8]) -> Self {
        self.usr = usr.to_vec();
        self
    }

    pub fn with_name(mut self, name: &[u8]) -> Self {
        self.display_name = name.to_vec();
        self
    }

    pub fn with_location(mut self, file: &str, line: u32, column: u32) -> Self {
        self.location = Some(SourceLocation::new(file, line, column));
        self
    }

    pub fn definition(mut self) -> Self {
        self.is_definition = true;
        self
    }

    pub fn with_parent(mut self, parent: MockCursor) -> Self {
        self.semantic_parent = Some(Box::new(parent));
        self
    }

    pub fn with_referenced(mut self, referenced: MockCursor) -> Self {
        self.referenced = Some(Box::new(referenced));
        self
    }

    pub fn with_child(mut self, child: MockCursor) -> Self {
        self.children.push(child);
        self
    }
}

impl Cursor for MockCursor {
    fn kind(&self) -> CursorKind {
        self.kind
    }

    fn usr(&self) -> &[u8] {
        &self.usr
    }

    fn display_name(&self) -> &[u8] {
        &self.display_name
    }

    fn location(&self) -> Option<SourceLocation> {
        self.location.clone()
    }

    fn is_definition(&self) -> bool {
        self.is_definition
    }

    fn referenced(&self) -> Option<&dyn Cursor> {
        self.referenced.as_deref().map(|c| c as &dyn Cursor)
    }

    fn semantic_parent(&self) -> Option<&dyn Cursor> {
        self.semantic_parent.as_deref().map(|c| c as &dyn Cursor)
    }

    fn children(&self) -> Vec<&dyn Cursor> {
        self.children.iter().map(|c| c as &dyn Cursor).collect()
    }
}

/// A preconfigured translation unit.
pub struct MockUnit {
    pub filename: PathBuf,
    pub origin: UnitOrigin,
    pub diagnostics: Vec<Diagnostic>,
    pub inclusions: Vec<Inclusion>,
    pub root: MockCursor,
}

impl MockUnit {
    pub fn source(filename: &str, root: MockCursor) -> Self {
        Self {
            filename: PathBuf::from(filename),
            origin: UnitOrigin::Source,
            diagnostics: Vec::new(),
            inclusions: Vec::new(),
            root,
        }
    }

    pub fn with_origin(mut self, origin: UnitOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn with_inclusion(mut self, file: &str, stack: Vec<SourceLocation>) -> Self {
        self.inclusions.push(Inclusion {
            file: PathBuf::from(file),
            stack,
        });
        self
    }
}

impl Unit for MockUnit {
    fn filename(&self) -> &Path {
        &self.filename
    }

    fn origin(&self) -> UnitOrigin {
        self.origin
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.clone()
    }

    fn inclusions(&self) -> Vec<Inclusion> {
        self.inclusions.clone()
    }

    fn root(&self) -> &dyn Cursor {
        &self.root
    }
}

/// Unit cache serving preconfigured units, with optional artificial
/// parse latency to hold jobs open.
#[derive(Default)]
pub struct MockUnitCache {
    units: Mutex<HashMap<PathBuf, Arc<MockUnit>>>,
    pub acquires: AtomicUsize,
    pub last_flags: Mutex<Option<UnitFlags>>,
    delay: Option<Duration>,
}

impl MockUnitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_unit(&self, input: &str, unit: MockUnit) {
        self.units
            .lock()
            .unwrap()
            .insert(PathBuf::from(input), Arc::new(unit));
    }
}

#[async_trait]
impl UnitCache for MockUnitCache {
    async fn acquire(
        &self,
        input: &Path,
        _arguments: &[String],
        flags: UnitFlags,
    ) -> Option<Arc<dyn Unit>> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        *self.last_flags.lock().unwrap() = Some(flags);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let unit = self.units.lock().unwrap().get(input).cloned()?;
        Some(unit as Arc<dyn Unit>)
    }
}

/// Unit for a file defining one free function.
pub fn function_unit(path: &str, usr: &[u8], display: &[u8], line: u32, col: u32) -> MockUnit {
    let func = MockCursor::new(CursorKind::Function)
        .with_usr(usr)
        .with_name(display)
        .with_location(path, line, col)
        .definition();
    MockUnit::source(
        path,
        MockCursor::new(CursorKind::TranslationUnit).with_child(func),
    )
}

/// Read one database set from the store under `root`.
pub fn read_db_set(root: &Path, category: Category, key: &[u8]) -> HashSet<Vec<u8>> {
    let store = XrefStore::open(root).expect("open store");
    let tree = store.tree(category).expect("open tree");
    match tree.get(key).expect("read key") {
        Some(value) => parse_set(&value),
        None => HashSet::new(),
    }
}

/// All key/value-set pairs in one database.
pub fn read_db_all(root: &Path, category: Category) -> HashMap<Vec<u8>, HashSet<Vec<u8>>> {
    let store = XrefStore::open(root).expect("open store");
    let tree = store.tree(category).expect("open tree");
    let mut out = HashMap::new();
    for item in tree.iter() {
        let (key, value) = item.expect("iterate tree");
        out.insert(key.to_vec(), parse_set(&value));
    }
    out
}

/// Wait for `count` completion events, with a generous timeout.
pub async fn wait_for_done(rx: &mut broadcast::Receiver<IndexEvent>, count: usize) {
    for _ in 0..count {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for completion")
            .expect("event channel closed");
    }
}
