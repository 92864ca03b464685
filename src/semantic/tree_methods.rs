// Tree navigation helpers
//
// Generic "nearest ancestor matching a predicate" walks and child lookups shared by
// the binder, the offset resolver and the text transformations.

use tree_sitter::Node;

/// Walk tree with visitor, pre-order
pub fn walk_tree<'a, F>(node: Node<'a>, visitor: &mut F)
where
    F: FnMut(Node<'a>),
{
    visitor(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_tree(child, visitor);
    }
}

/// Nearest strict ancestor matching `predicate`
pub fn find_ancestor<'a, P>(node: Node<'a>, mut predicate: P) -> Option<Node<'a>>
where
    P: FnMut(Node<'a>) -> bool,
{
    let mut current = node.parent();
    while let Some(parent) = current {
        if predicate(parent) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// Nearest strict ancestor whose kind is one of `kinds`
pub fn find_parent_of_kinds<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    find_ancestor(node, |parent| kinds.contains(&parent.kind()))
}

/// Find nodes by kind anywhere below (and including) `node`
pub fn find_nodes_by_kind<'a>(node: Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut nodes = Vec::new();
    walk_tree(node, &mut |n| {
        if n.kind() == kind {
            nodes.push(n);
        }
    });
    nodes
}

/// First direct child of the given kind
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Direct children of the given kind
pub fn children_of_kind<'a>(node: Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == kind)
        .collect()
}

pub fn named_children<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Deepest node with `start <= byte < end`, descending from `root`
///
/// Returns `None` when only the root itself covers the offset.
pub fn deepest_node_at(root: Node<'_>, byte: usize) -> Option<Node<'_>> {
    let mut current = root;
    'descend: loop {
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            if child.start_byte() <= byte && byte < child.end_byte() {
                current = child;
                continue 'descend;
            }
        }
        break;
    }
    (current.id() != root.id()).then_some(current)
}

/// The node spanning exactly `start..end`, preferring the deepest such node
pub fn node_for_range(root: Node<'_>, start: usize, end: usize) -> Option<Node<'_>> {
    let node = root.descendant_for_byte_range(start, end)?;
    (node.start_byte() == start && node.end_byte() == end).then_some(node)
}

/// Whether `node` is `parent`'s child under `field`
pub fn is_field_of(node: Node, parent: Node, field: &str) -> bool {
    parent
        .child_by_field_name(field)
        .map(|child| child.id() == node.id())
        .unwrap_or(false)
}

/// Node kinds that hold a list of statements
pub const STATEMENT_CONTAINERS: &[&str] = &[
    "program",
    "statement_block",
    "switch_case",
    "switch_default",
    "class_static_block",
];

/// Whether the node sits directly in a statement list
pub fn is_statement(node: Node) -> bool {
    node.is_named()
        && node.kind() != "comment"
        && node
            .parent()
            .map(|parent| STATEMENT_CONTAINERS.contains(&parent.kind()))
            .unwrap_or(false)
}

/// The statement containing `node` (inclusive), if any
pub fn enclosing_statement(node: Node<'_>) -> Option<Node<'_>> {
    if is_statement(node) {
        return Some(node);
    }
    find_ancestor(node, is_statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parse_source;

    #[test]
    fn test_deepest_node_is_half_open() {
        let src = "let count = 0;";
        let tree = parse_source("typescript", src).unwrap();
        let root = tree.root_node();

        let node = deepest_node_at(root, 4).unwrap();
        assert_eq!(node.kind(), "identifier");
        // byte 9 is the space after `count`, not the identifier
        let after = deepest_node_at(root, 9).unwrap();
        assert_ne!(after.kind(), "identifier");
        assert!(deepest_node_at(root, src.len()).is_none());
    }

    #[test]
    fn test_enclosing_statement() {
        let src = "function f() {\n  if (x) return a + b;\n}";
        let tree = parse_source("typescript", src).unwrap();
        let root = tree.root_node();
        let a = deepest_node_at(root, src.find("a +").unwrap()).unwrap();

        let stmt = enclosing_statement(a).unwrap();
        assert_eq!(stmt.kind(), "if_statement");
        let func = find_parent_of_kinds(a, &["function_declaration"]).unwrap();
        assert_eq!(func.start_byte(), 0);
    }
}
