//! The consumed semantic-parser interface.
//!
//! The indexer drives a C/C++ parser through these traits. A production
//! binding wraps a real parser toolkit behind them; tests supply mock
//! cursor trees. The shapes mirror what such toolkits expose: cached
//! translation units, cursors with stable symbol identifiers, and
//! rendered diagnostics.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

/// How a parse request may be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitFlags {
    /// Allow parsing from source.
    pub source: bool,
    /// Allow reusing a previously built syntax tree.
    pub ast: bool,
    /// Discard cached state and reparse.
    pub force: bool,
}

impl UnitFlags {
    /// Source parse and syntax-tree reuse, no forced reparse.
    pub fn source_and_ast() -> Self {
        Self {
            source: true,
            ast: true,
            force: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Whether an acquired unit was parsed from source or reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOrigin {
    Source,
    Ast,
}

/// Requested indexing behavior for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Normal,
    Force,
}

/// Parser diagnostic severities, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

/// A rendered parser diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Pre-rendered message including source location and option hints.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A spelling location inside a file. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// One file included by a unit, with the chain of locations that led to
/// the inclusion, innermost first.
#[derive(Debug, Clone)]
pub struct Inclusion {
    pub file: PathBuf,
    pub stack: Vec<SourceLocation>,
}

/// Cursor kinds the extraction distinguishes. Everything else is
/// `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    TranslationUnit,
    AccessSpecifier,
    Namespace,
    Function,
    Struct,
    Variable,
    Reference,
    Other,
}

/// A node in the parsed syntax tree.
pub trait Cursor: Send + Sync {
    fn kind(&self) -> CursorKind;

    /// Stable identifier of the declaration this cursor names. Empty
    /// when the parser has none for this node.
    fn usr(&self) -> &[u8];

    /// Display name including parameter lists, as the parser renders it.
    fn display_name(&self) -> &[u8];

    /// Spelling location, absent when the cursor has no file.
    fn location(&self) -> Option<SourceLocation>;

    /// True when this cursor is the definition of its entity.
    fn is_definition(&self) -> bool;

    /// The cursor this one references, if any.
    fn referenced(&self) -> Option<&dyn Cursor>;

    /// The declaration-scope parent used to build qualified names.
    fn semantic_parent(&self) -> Option<&dyn Cursor>;

    fn children(&self) -> Vec<&dyn Cursor>;
}

/// A parsed translation unit.
pub trait Unit: Send + Sync {
    /// Absolute path of the unit's main file.
    fn filename(&self) -> &Path;

    fn origin(&self) -> UnitOrigin;

    fn diagnostics(&self) -> Vec<Diagnostic>;

    fn inclusions(&self) -> Vec<Inclusion>;

    /// The translation-unit cursor.
    fn root(&self) -> &dyn Cursor;
}

/// Cache of parsed translation units keyed by input and arguments.
#[async_trait]
pub trait UnitCache: Send + Sync {
    /// Acquire a unit for `input`, parsing or reusing per `flags`.
    /// Returns `None` when no unit can be produced.
    async fn acquire(
        &self,
        input: &Path,
        arguments: &[String],
        flags: UnitFlags,
    ) -> Option<Arc<dyn Unit>>;
}
