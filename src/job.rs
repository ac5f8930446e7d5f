//! One extraction job: parse a translation unit and stage what it
//! defines, references and includes.
//!
//! A job accumulates definitions, references and symbol names in
//! job-local maps and folds them into the shared staging area one
//! category at a time, so concurrent jobs only contend per category.
//! Inclusions are the exception and go straight to the shared map; a
//! unit produces few of them and the lock is cheap.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::path_resolver::PathResolver;
use crate::semantic::{
    Cursor, CursorKind, ParseMode, Severity, SourceLocation, Unit, UnitCache, UnitFlags,
    UnitOrigin,
};
use crate::staging::{stage_local, Category, LocalMap, StagingArea, StagingMap};

/// Identifier assigned by the coordinator.
pub type JobId = u64;

/// The `"c:"` value some parsers return for cursors without a real
/// unified symbol reference.
const USR_SENTINEL: &[u8] = b"c:";

fn usable_usr(usr: &[u8]) -> bool {
    !usr.is_empty() && usr != USR_SENTINEL
}

pub(crate) struct IndexJob {
    pub id: JobId,
    pub mode: ParseMode,
    pub input: PathBuf,
    pub arguments: Vec<String>,
}

#[derive(Default)]
struct Extraction {
    defs: LocalMap,
    refs: LocalMap,
    syms: LocalMap,
}

impl IndexJob {
    /// Run to completion or early abort. The caller reports completion
    /// either way.
    pub(crate) async fn run(
        &self,
        staging: &StagingArea,
        unit_cache: &dyn UnitCache,
        resolver: &PathResolver,
    ) {
        let flags = UnitFlags::source_and_ast().with_force(self.mode == ParseMode::Force);
        let Some(unit) = unit_cache.acquire(&self.input, &self.arguments, flags).await else {
            debug!(job = self.id, input = %self.input.display(), "no unit produced");
            return;
        };

        debug!(
            job = self.id,
            input = %self.input.display(),
            unit = %unit.filename().display(),
            "parsing"
        );

        for diagnostic in unit.diagnostics() {
            if diagnostic.severity >= Severity::Warning {
                warn!(unit = %unit.filename().display(), "parser: {diagnostic}");
            }
        }

        // A unit reused from a previously built tree was extracted by an
        // earlier run; walking it again would only produce merge no-ops.
        if unit.origin() != UnitOrigin::Source {
            return;
        }
        debug!(unit = %unit.filename().display(), "reread from source, revisiting");

        self.walk_inclusions(unit.as_ref(), staging, resolver);

        let mut extraction = Extraction::default();
        for child in unit.root().children() {
            visit_cursor(child, resolver, &mut extraction);
        }
        add_filename_symbol(unit.filename(), &mut extraction.syms);

        // One category lock at a time, released between folds.
        staging.map(Category::Definition).fold(extraction.defs);
        staging.map(Category::Reference).fold(extraction.refs);
        staging.map(Category::Symbol).fold(extraction.syms);
    }

    /// Record, for every file this unit pulls in, that the unit includes
    /// it. The inclusion stacks are walked too so indirect includers are
    /// attributed to this unit as well.
    fn walk_inclusions(&self, unit: &dyn Unit, staging: &StagingArea, resolver: &PathResolver) {
        let includes = staging.map(Category::Include);
        let input_bytes = path_bytes(&self.input);

        for inclusion in unit.inclusions() {
            self.add_inclusion(&inclusion.file, includes, resolver, &input_bytes);
            for frame in &inclusion.stack {
                self.add_inclusion(&frame.file, includes, resolver, &input_bytes);
            }
        }
    }

    fn add_inclusion(
        &self,
        file: &Path,
        includes: &StagingMap,
        resolver: &PathResolver,
        input_bytes: &[u8],
    ) {
        let resolved = resolver.resolved(file);
        // A unit is never recorded as including itself.
        if resolved == self.input {
            return;
        }
        includes.insert(path_bytes(&resolved), input_bytes.to_vec());
    }
}

/// Location key `<resolved_path>:<line>:<column>`.
fn location_key(resolver: &PathResolver, location: &SourceLocation) -> Vec<u8> {
    let resolved = resolver.resolved(&location.file);
    format!("{}:{}:{}", resolved.display(), location.line, location.column).into_bytes()
}

fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Visit one cursor, then its children.
fn visit_cursor(cursor: &dyn Cursor, resolver: &PathResolver, out: &mut Extraction) {
    record_cursor(cursor, resolver, out);
    for child in cursor.children() {
        visit_cursor(child, resolver, out);
    }
}

/// Stage the definition, reference and symbol entries for one cursor.
fn record_cursor(cursor: &dyn Cursor, resolver: &PathResolver, out: &mut Extraction) {
    if cursor.kind() == CursorKind::AccessSpecifier {
        return;
    }

    // Prefer the cursor's own identifier; fall back to the referenced
    // declaration for reference cursors the parser leaves unnamed.
    let usr: Vec<u8> = if usable_usr(cursor.usr()) {
        cursor.usr().to_vec()
    } else {
        match cursor.referenced() {
            Some(referenced) if usable_usr(referenced.usr()) => referenced.usr().to_vec(),
            _ => return,
        }
    };

    let Some(location) = cursor.location() else {
        return;
    };
    if location.file.as_os_str().is_empty() {
        return;
    }
    let key = location_key(resolver, &location);

    if cursor.is_definition() {
        stage_local(&mut out.defs, usr.clone(), key.clone());
        add_name_permutations(cursor, &usr, &mut out.syms);
    }
    // Every definition site is also a reference site.
    stage_local(&mut out.refs, usr.clone(), key);

    debug_assert!(usable_usr(&usr));
}

/// Progressively qualified names for the cursor, walking semantic
/// parents toward the translation unit. Each level is recorded with
/// and, when it differs, without the leaf's parameter list.
fn add_name_permutations(cursor: &dyn Cursor, usr: &[u8], syms: &mut LocalMap) {
    let mut qparam: Vec<u8> = Vec::new();
    let mut qnoparam: Vec<u8> = Vec::new();

    let mut current: Option<&dyn Cursor> = Some(cursor);
    while let Some(cur) = current {
        if cur.kind() == CursorKind::TranslationUnit {
            break;
        }
        let name = cur.display_name();
        if name.is_empty() {
            break;
        }

        if qparam.is_empty() {
            qparam = name.to_vec();
            qnoparam = match name.iter().position(|&b| b == b'(') {
                Some(paren) => name[..paren].to_vec(),
                None => name.to_vec(),
            };
        } else {
            qparam = [name, b"::".as_slice(), qparam.as_slice()].concat();
            qnoparam = [name, b"::".as_slice(), qnoparam.as_slice()].concat();
        }

        stage_local(syms, qparam.clone(), usr.to_vec());
        if qparam != qnoparam {
            stage_local(syms, qnoparam.clone(), usr.to_vec());
        }

        current = cur.semantic_parent();
    }
}

/// Map the unit's basename to its full path, so files are findable by
/// name alone.
fn add_filename_symbol(filename: &Path, syms: &mut LocalMap) {
    let full = path_bytes(filename);
    if let Some(start) = basename_start(&full) {
        stage_local(syms, full[start..].to_vec(), full.clone());
    }
}

/// Index just past the last unescaped `/`, or `None` when the path has
/// no unescaped slash. A slash is escaped when preceded by an odd
/// number of backslashes.
fn basename_start(path: &[u8]) -> Option<usize> {
    let mut i = path.len();
    while i > 0 {
        i -= 1;
        if path[i] != b'/' {
            continue;
        }
        let mut backslashes = 0;
        while i > backslashes && path[i - 1 - backslashes] == b'\\' {
            backslashes += 1;
        }
        if backslashes % 2 == 0 {
            return Some(i + 1);
        }
        // Escaped; resume the scan before the backslash run.
        i -= backslashes;
    }
    None
}
