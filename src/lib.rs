// Cross-reference indexer core
// Exposes the coordinator, the staged-data model, and the consumed
// parser-facing interfaces for embedding into a daemon.

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod path_resolver;

// Storage modules
pub mod staging;
pub mod store;
pub mod sync;

// Consumed interfaces
pub mod resource;
pub mod semantic;

// Indexing subsystem
pub mod indexer;
mod job;

// Re-export commonly used types
pub use config::{IndexerConfig, SYNC_INTERVAL};
pub use error::IndexerError;
pub use indexer::{IndexEvent, Indexer};
pub use job::JobId;
pub use path_resolver::PathResolver;
pub use resource::{InformationRecord, ResourceError, ResourceStore};
pub use semantic::{
    Cursor, CursorKind, Diagnostic, Inclusion, ParseMode, Severity, SourceLocation, Unit,
    UnitCache, UnitFlags, UnitOrigin,
};
pub use staging::{Category, StagingArea, StagingMap};
pub use store::{StoreError, XrefStore};
pub use sync::{parse_set, serialize_set, sync_all, sync_category, SyncStats};
