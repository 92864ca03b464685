//! Helper functions for reading TypeScript syntax
//!
//! Small node inspections shared by the binder, type introspection and the query
//! operations: modifiers, annotations, binding patterns and qualified names.

use tree_sitter::Node;

use super::tree_methods::named_children;

/// Check if a node has a modifier child of the given kind
///
/// Useful for checking for 'async', 'static', 'abstract', etc.
pub fn has_modifier(node: Node, modifier_kind: &str) -> bool {
    node.children(&mut node.walk())
        .any(|child| child.kind() == modifier_kind)
}

/// `private`/`protected`/`public` from an accessibility modifier; `#name` is private
pub fn visibility(node: Node, text: &str) -> &'static str {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            return match &text[child.start_byte()..child.end_byte()] {
                "private" => "private",
                "protected" => "protected",
                _ => "public",
            };
        }
    }
    let private_name = node
        .child_by_field_name("name")
        .map(|name| name.kind() == "private_property_identifier")
        .unwrap_or(false);
    if private_name {
        "private"
    } else {
        "public"
    }
}

/// Text of a `type_annotation`/`return_type` field without the leading `:`
pub fn annotation_text(node: Node, field: &str, text: &str) -> Option<String> {
    let annotation = node.child_by_field_name(field)?;
    let type_node = if annotation.kind() == "type_annotation" {
        annotation.named_child(0)?
    } else {
        annotation
    };
    Some(text[type_node.start_byte()..type_node.end_byte()].trim().to_string())
}

/// The type node inside a `type_annotation` field
pub fn annotation_type<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    let annotation = node.child_by_field_name(field)?;
    if matches!(
        annotation.kind(),
        "type_annotation" | "asserts_annotation" | "type_predicate_annotation"
    ) {
        annotation.named_child(0)
    } else {
        Some(annotation)
    }
}

/// Identifier nodes bound by a declaration name or destructuring pattern
pub fn binding_identifiers<'a>(pattern: Node<'a>) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    collect_bindings(pattern, &mut out);
    out
}

fn collect_bindings<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(node),
        "object_pattern" | "array_pattern" => {
            for child in named_children(node) {
                collect_bindings(child, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_bindings(value, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_bindings(left, out);
            }
        }
        "rest_pattern" => {
            for child in named_children(node) {
                collect_bindings(child, out);
            }
        }
        _ => {}
    }
}

/// Dotted name of an identifier / member expression / qualified type reference
///
/// `Base` -> `["Base"]`, `ns.Base` -> `["ns", "Base"]`, `Base<T>` -> `["Base"]`.
pub fn qualified_path(node: Node, text: &str) -> Option<Vec<String>> {
    let node_text = |n: Node| text[n.start_byte()..n.end_byte()].to_string();
    match node.kind() {
        "identifier" | "type_identifier" | "property_identifier" => Some(vec![node_text(node)]),
        "member_expression" | "nested_identifier" => {
            let object = node
                .child_by_field_name("object")
                .or_else(|| node.named_child(0))?;
            let property = node
                .child_by_field_name("property")
                .or_else(|| node.named_child(node.named_child_count().saturating_sub(1)))?;
            let mut path = qualified_path(object, text)?;
            path.push(node_text(property));
            Some(path)
        }
        "nested_type_identifier" => {
            let module = node.child_by_field_name("module")?;
            let name = node.child_by_field_name("name")?;
            let mut path = qualified_path(module, text)?;
            path.push(node_text(name));
            Some(path)
        }
        "generic_type" => {
            let name = node.child_by_field_name("name").or_else(|| node.named_child(0))?;
            qualified_path(name, text)
        }
        "parenthesized_expression" | "parenthesized_type" => {
            qualified_path(node.named_child(0)?, text)
        }
        _ => None,
    }
}

/// Type reference path for a type hint, unwrapping `Promise<T>`-like wrappers
pub fn hint_path(type_node: Node, text: &str) -> Option<Vec<String>> {
    if type_node.kind() == "generic_type" {
        let name = type_node.child_by_field_name("name")?;
        let name_text = &text[name.start_byte()..name.end_byte()];
        if matches!(name_text, "Promise" | "PromiseLike" | "Readonly") {
            let args = type_node.child_by_field_name("type_arguments")?;
            return hint_path(args.named_child(0)?, text);
        }
    }
    qualified_path(type_node, text)
}

/// Name text of a member/declaration `name` field, with string-literal names unquoted
pub fn declaration_name<'a>(node: Node<'a>, text: &str) -> Option<(Node<'a>, String)> {
    let name = node.child_by_field_name("name")?;
    let raw = &text[name.start_byte()..name.end_byte()];
    match name.kind() {
        "identifier"
        | "type_identifier"
        | "property_identifier"
        | "private_property_identifier"
        | "number" => Some((name, raw.to_string())),
        "string" => Some((name, crate::project::modules::string_literal_value(raw))),
        _ => None,
    }
}

/// Function declarations, expressions, arrows and methods
pub fn is_function_like(kind: &str) -> bool {
    crate::language::FUNCTION_NODE_KINDS.contains(&kind)
}

/// The `let`/`const`/`var` keyword of a declaration node
pub fn declaration_keyword<'a>(node: Node, text: &'a str) -> &'a str {
    if let Some(kind) = node.child_by_field_name("kind") {
        return &text[kind.start_byte()..kind.end_byte()];
    }
    node.child(0)
        .map(|first| &text[first.start_byte()..first.end_byte()])
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parse_source;
    use crate::semantic::tree_methods::find_nodes_by_kind;

    #[test]
    fn test_binding_identifiers_from_patterns() {
        let src = "const { a, b: c, d = 1, ...rest } = obj; const [x, [y]] = arr;";
        let tree = parse_source("typescript", src).unwrap();
        let names: Vec<&str> = find_nodes_by_kind(tree.root_node(), "variable_declarator")
            .into_iter()
            .flat_map(|d| binding_identifiers(d.child_by_field_name("name").unwrap()))
            .map(|n| &src[n.start_byte()..n.end_byte()])
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "rest", "x", "y"]);
    }

    #[test]
    fn test_hint_path_unwraps_promise() {
        let src = "let p: Promise<models.User>;";
        let tree = parse_source("typescript", src).unwrap();
        let decl = find_nodes_by_kind(tree.root_node(), "variable_declarator")[0];
        let ty = annotation_type(decl, "type").unwrap();
        assert_eq!(
            hint_path(ty, src),
            Some(vec!["models".to_string(), "User".to_string()])
        );
    }

    #[test]
    fn test_visibility_and_modifiers() {
        let src = "class A { private static x = 1; #y = 2; async run() {} }";
        let tree = parse_source("typescript", src).unwrap();
        let fields = find_nodes_by_kind(tree.root_node(), "public_field_definition");
        assert_eq!(visibility(fields[0], src), "private");
        assert!(has_modifier(fields[0], "static"));
        assert_eq!(visibility(fields[1], src), "private");
        let method = find_nodes_by_kind(tree.root_node(), "method_definition")[0];
        assert!(has_modifier(method, "async"));
        assert_eq!(visibility(method, src), "public");
    }
}
