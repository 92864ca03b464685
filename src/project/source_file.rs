//! Source File - text, syntax tree and dirty flag for one loaded file

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::{Node, Tree};

use super::line_index::LineIndex;
use crate::language;
use crate::utils::file_utils;

/// One loaded file of the project
///
/// The tree always reflects `text`: every mutation goes through [`SourceFile::set_text`],
/// which re-parses.
pub struct SourceFile {
    path: PathBuf,
    language: &'static str,
    text: String,
    tree: Tree,
    line_index: LineIndex,
    /// blake3 digest of the content as read from disk
    disk_hash: String,
    /// Text as read from disk, kept for preview diffs
    original_text: String,
    dirty: bool,
}

impl SourceFile {
    /// Read and parse a file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let language = language::detect_language(path)
            .ok_or_else(|| anyhow::anyhow!("Unsupported source file: {}", path.display()))?;
        let text = file_utils::read_file_content(path)?;
        debug!("Loaded {} ({} bytes, {})", path.display(), text.len(), language);
        Self::from_text(path.to_path_buf(), language, text)
    }

    /// Build a file from in-memory text (treated as the on-disk state)
    pub fn from_text(path: PathBuf, language: &'static str, text: String) -> Result<Self> {
        let tree = language::parse_source(language, &text)?;
        Ok(Self {
            line_index: LineIndex::new(&text),
            disk_hash: file_utils::hash_content(&text),
            original_text: text.clone(),
            path,
            language,
            text,
            tree,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn disk_hash(&self) -> &str {
        &self.disk_hash
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_declaration_file(&self) -> bool {
        language::is_declaration_file(&self.path)
    }

    pub fn is_javascript(&self) -> bool {
        language::is_javascript(self.language)
    }

    /// Replace the text, re-parse, and mark the file dirty
    pub fn set_text(&mut self, text: String) -> Result<()> {
        self.tree = language::parse_source(self.language, &text)?;
        self.line_index = LineIndex::new(&text);
        self.dirty = self.dirty || text != self.text;
        self.text = text;
        Ok(())
    }

    /// Record that the in-memory text now matches disk
    pub fn mark_saved(&mut self) {
        self.disk_hash = file_utils::hash_content(&self.text);
        self.original_text = self.text.clone();
        self.dirty = false;
    }

    /// Get text from a tree-sitter node
    pub fn node_text(&self, node: &Node) -> &str {
        self.text.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }

    /// Byte offset for a caller-supplied UTF-16 offset
    pub fn byte_offset(&self, utf16: usize) -> Option<usize> {
        self.line_index.byte_offset(utf16)
    }

    /// UTF-16 offset of a byte offset
    pub fn utf16_offset(&self, byte: usize) -> usize {
        self.line_index.utf16_offset(byte)
    }

    /// 1-based line/column of a byte offset
    pub fn line_col(&self, byte: usize) -> (usize, usize) {
        self.line_index.line_col(byte)
    }

    /// The full source line containing a byte offset
    pub fn line_text(&self, byte: usize) -> &str {
        self.line_index.line_text(&self.text, byte)
    }

    pub fn indentation_at(&self, byte: usize) -> &str {
        self.line_index.indentation_at(&self.text, byte)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("len", &self.text.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_text_reparses_and_marks_dirty() {
        let mut file = SourceFile::from_text(
            PathBuf::from("/p/a.ts"),
            "typescript",
            "let count = 0;".to_string(),
        )
        .unwrap();
        assert!(!file.is_dirty());

        file.set_text("let total = 0;".to_string()).unwrap();
        assert!(file.is_dirty());
        assert_eq!(file.original_text(), "let count = 0;");

        let decl = file.root().named_child(0).unwrap();
        assert_eq!(decl.kind(), "lexical_declaration");
        assert!(file.node_text(&decl).contains("total"));

        file.mark_saved();
        assert!(!file.is_dirty());
        assert_eq!(file.original_text(), "let total = 0;");
    }
}
