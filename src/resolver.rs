//! Offset resolution - from a caller's (file, UTF-16 offset) to a syntax node

use tree_sitter::Node;

use crate::language::IDENTIFIER_NODE_KINDS;
use crate::project::SourceFile;
use crate::semantic::tree_methods::{deepest_node_at, find_ancestor};

/// Deepest node whose span contains the UTF-16 `offset`
///
/// `None` when the offset is past the end of the file or only the root covers it.
pub fn resolve_node(file: &SourceFile, offset: usize) -> Option<Node<'_>> {
    let byte = file.byte_offset(offset)?;
    deepest_node_at(file.root(), byte)
}

/// `node` itself if it is identifier-class, else the nearest identifier ancestor
///
/// String literals count as identifier-class so quoted member names
/// (`{ "key": 1 }`, `obj["key"]`) can be addressed.
pub fn resolve_identifier(node: Node<'_>) -> Option<Node<'_>> {
    if is_identifier_class(node) {
        return Some(node);
    }
    if node.kind() == "string_fragment" {
        return node.parent().filter(|parent| parent.kind() == "string");
    }
    find_ancestor(node, is_identifier_class)
}

fn is_identifier_class(node: Node) -> bool {
    IDENTIFIER_NODE_KINDS.contains(&node.kind()) || node.kind() == "string"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(text: &str) -> SourceFile {
        SourceFile::from_text(PathBuf::from("/tmp/a.ts"), "typescript", text.to_string()).unwrap()
    }

    #[test]
    fn test_resolves_identifier_at_offset() {
        let f = file("let count = 0; count += 1;");
        let node = resolve_node(&f, 15).unwrap();
        assert_eq!(node.kind(), "identifier");
        assert_eq!(f.node_text(&node), "count");
        assert_eq!(resolve_identifier(node).unwrap().id(), node.id());
    }

    #[test]
    fn test_offsets_are_utf16() {
        // "é" is 2 bytes but 1 UTF-16 unit
        let f = file("const é = 1; let value = é;");
        let offset = "const é = 1; let ".encode_utf16().count();
        let node = resolve_node(&f, offset).unwrap();
        assert_eq!(f.node_text(&node), "value");
    }

    #[test]
    fn test_beyond_eof_and_non_identifiers() {
        let f = file("let a = 1;");
        assert!(resolve_node(&f, 500).is_none());

        let number = resolve_node(&f, 8).unwrap();
        assert_eq!(number.kind(), "number");
        assert!(resolve_identifier(number).is_none());

        let f = file("const o = { 'key': 1 };");
        let fragment = resolve_node(&f, 13).unwrap();
        assert_eq!(resolve_identifier(fragment).unwrap().kind(), "string");
    }
}
