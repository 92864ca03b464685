//! Engine operations
//!
//! One module per command family. Every operation takes the project explicitly and
//! returns a serializable result; failures are `RefactorError`s that the API layer turns
//! into `success: false` payloads.

pub mod callers;
pub mod diagnostics;
pub mod extract;
pub mod implementations;
pub mod inspect;
pub mod references;
pub mod rename;

use serde::Serialize;

use crate::error::{RefactorError, Result};
use crate::project::{FileId, Project};
use crate::resolver::{resolve_identifier, resolve_node};
use crate::semantic::{SemanticModel, SymbolId};

/// The identifier a caller pointed at, and the symbol bound to it (if any)
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub name: String,
    pub symbol: Option<SymbolId>,
}

/// Resolve `(file, utf16 offset)` to an identifier-class node and its symbol
///
/// `SymbolNotFound` when nothing covers the offset, `NotRenameable` when the covering
/// node has no identifier ancestor.
pub(crate) fn resolve_target(
    project: &Project,
    model: &SemanticModel,
    file: FileId,
    offset: usize,
) -> Result<Target> {
    let source = project.file(file);
    let node = resolve_node(source, offset).ok_or_else(|| RefactorError::SymbolNotFound {
        file: project.display_path(file),
        offset,
    })?;
    let identifier = resolve_identifier(node).ok_or_else(|| {
        RefactorError::NotRenameable(format!(
            "Node at offset {} is a '{}', not an identifier",
            offset,
            node.kind()
        ))
    })?;

    let symbol = model
        .occurrence_at(file, identifier.start_byte())
        .filter(|o| o.start == identifier.start_byte())
        .map(|o| o.symbol);

    Ok(Target {
        name: source.node_text(&identifier).to_string(),
        symbol,
    })
}

/// 1-based line/column of a byte offset, as reported in results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn of(project: &Project, file: FileId, byte: usize) -> Self {
        let (line, column) = project.file(file).line_col(byte);
        Self { line, column }
    }
}

/// Source line containing `byte`, trimmed and capped for result context
pub(crate) fn context_line(project: &Project, file: FileId, byte: usize, max_chars: usize) -> String {
    let line = project.file(file).line_text(byte).trim();
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => line[..cut].to_string(),
        None => line.to_string(),
    }
}
