//! Type introspection: inspect-type and list-types
//!
//! Both read declarations straight from the syntax tree. Member lists follow the
//! declaration as written; inherited members are not merged in.

use serde::Serialize;
use tracing::debug;
use tree_sitter::Node;

use crate::error::{RefactorError, Result};
use crate::language::TYPE_DECLARATION_KINDS;
use crate::project::source_file::SourceFile;
use crate::project::{FileId, Project};
use crate::semantic::helpers::{annotation_text, declaration_name, has_modifier, visibility};
use crate::semantic::tree_methods::{find_child_by_kind, named_children, walk_tree};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub name: String,
    pub kind: String,
    pub visibility: String,
    pub is_static: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
    pub is_readonly: bool,
    pub is_optional: bool,
    #[serde(rename = "type")]
    pub type_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub line: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInspection {
    pub success: bool,
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: usize,
    pub is_exported: bool,
    pub is_abstract: bool,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub type_parameters: Vec<String>,
    pub members: Vec<MemberInfo>,
    pub member_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSummary {
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: usize,
    pub is_exported: bool,
    pub member_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTypesResult {
    pub success: bool,
    pub types: Vec<TypeSummary>,
    pub count: usize,
}

/// Find a class, interface, enum or type alias by name and describe it
///
/// With `file` only that file is searched; otherwise every non-dependency project
/// file, in path order. The first declaration found wins.
pub fn inspect_type(
    project: &mut Project,
    type_name: &str,
    file: Option<&str>,
) -> Result<TypeInspection> {
    let files = search_files(project, file)?;

    for file_id in files {
        let source = project.file(file_id);
        let text = source.text();
        let found = type_declarations(source.root())
            .into_iter()
            .find(|node| declared_name(*node, text).as_deref() == Some(type_name));

        if let Some(node) = found {
            debug!(
                "Found type '{}' in {}",
                type_name,
                project.display_path(file_id)
            );
            let members = members_of(node, source);
            return Ok(TypeInspection {
                success: true,
                name: type_name.to_string(),
                kind: type_kind(node).to_string(),
                file: project.display_path(file_id),
                line: name_line(node, source),
                is_exported: is_exported(node),
                is_abstract: node.kind() == "abstract_class_declaration",
                extends: extends_of(node, text),
                implements: implements_of(node, text),
                type_parameters: type_parameters_of(node, text),
                member_count: members.len(),
                members,
            });
        }
    }

    Err(RefactorError::TypeNotFound(type_name.to_string()))
}

/// Every type declaration outside dependency and declaration files, optionally
/// filtered by a case-insensitive name substring
pub fn list_types(project: &mut Project, filter: Option<&str>) -> Result<ListTypesResult> {
    let files = search_files(project, None)?;
    let needle = filter.map(str::to_lowercase);

    let mut types = Vec::new();
    for file_id in files {
        let source = project.file(file_id);
        if source.is_declaration_file() {
            continue;
        }
        let text = source.text();
        for node in type_declarations(source.root()) {
            let Some(name) = declared_name(node, text) else {
                continue;
            };
            if let Some(needle) = &needle {
                if !name.to_lowercase().contains(needle.as_str()) {
                    continue;
                }
            }
            types.push(TypeSummary {
                name,
                kind: type_kind(node).to_string(),
                file: project.display_path(file_id),
                line: name_line(node, source),
                is_exported: is_exported(node),
                member_count: members_of(node, source).len(),
            });
        }
    }
    types.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    Ok(ListTypesResult {
        success: true,
        count: types.len(),
        types,
    })
}

fn search_files(project: &mut Project, file: Option<&str>) -> Result<Vec<FileId>> {
    if let Some(file) = file {
        return Ok(vec![project.open_file(file)?]);
    }
    project.load_root_files();
    Ok(project
        .sorted_file_ids()
        .into_iter()
        .filter(|id| !project.is_dependency(*id))
        .collect())
}

/// Type declarations in pre-order, including those nested in namespaces
fn type_declarations(root: Node<'_>) -> Vec<Node<'_>> {
    let mut found = Vec::new();
    walk_tree(root, &mut |node| {
        if TYPE_DECLARATION_KINDS.contains(&node.kind()) {
            found.push(node);
        }
    });
    found
}

fn declared_name(node: Node, text: &str) -> Option<String> {
    declaration_name(node, text).map(|(_, name)| name)
}

fn type_kind(node: Node) -> &'static str {
    match node.kind() {
        "interface_declaration" => "interface",
        "enum_declaration" => "enum",
        "type_alias_declaration" => "type_alias",
        _ => "class",
    }
}

fn name_line(node: Node, source: &SourceFile) -> usize {
    let anchor = node.child_by_field_name("name").unwrap_or(node);
    source.line_col(anchor.start_byte()).0
}

fn is_exported(node: Node) -> bool {
    node.parent()
        .map(|parent| parent.kind() == "export_statement")
        .unwrap_or(false)
}

fn node_text(node: Node, text: &str) -> String {
    text[node.start_byte()..node.end_byte()].to_string()
}

/// `extends` clause entries: base class with type arguments, or extended interfaces
fn extends_of(node: Node, text: &str) -> Vec<String> {
    if node.kind() == "interface_declaration" {
        return find_child_by_kind(node, "extends_type_clause")
            .map(|clause| {
                named_children(clause)
                    .into_iter()
                    .map(|n| node_text(n, text))
                    .collect()
            })
            .unwrap_or_default();
    }

    let Some(clause) = find_child_by_kind(node, "class_heritage")
        .and_then(|heritage| find_child_by_kind(heritage, "extends_clause"))
    else {
        return Vec::new();
    };
    let mut bases: Vec<String> = Vec::new();
    for child in named_children(clause) {
        match (child.kind(), bases.last_mut()) {
            ("type_arguments", Some(last)) => last.push_str(&node_text(child, text)),
            _ => bases.push(node_text(child, text)),
        }
    }
    bases
}

fn implements_of(node: Node, text: &str) -> Vec<String> {
    find_child_by_kind(node, "class_heritage")
        .and_then(|heritage| find_child_by_kind(heritage, "implements_clause"))
        .map(|clause| {
            named_children(clause)
                .into_iter()
                .map(|n| node_text(n, text))
                .collect()
        })
        .unwrap_or_default()
}

fn type_parameters_of(node: Node, text: &str) -> Vec<String> {
    node.child_by_field_name("type_parameters")
        .map(|params| {
            named_children(params)
                .into_iter()
                .filter(|p| p.kind() == "type_parameter")
                .map(|p| node_text(p, text))
                .collect()
        })
        .unwrap_or_default()
}

fn members_of(node: Node, source: &SourceFile) -> Vec<MemberInfo> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };
    match node.kind() {
        "interface_declaration" => interface_members(body, source),
        "enum_declaration" => enum_members(body, source),
        "type_alias_declaration" => Vec::new(),
        _ => class_members(body, source),
    }
}

/// Sort rank of each member kind in class results
fn member_rank(kind: &str) -> u8 {
    match kind {
        "constructor" => 0,
        "property" => 1,
        "method" => 2,
        "getter" => 3,
        _ => 4,
    }
}

fn class_members(body: Node, source: &SourceFile) -> Vec<MemberInfo> {
    let text = source.text();
    let mut members = Vec::new();

    for child in named_children(body) {
        let Some((_, name)) = declaration_name(child, text) else {
            continue;
        };
        let line = source.line_col(child.start_byte()).0;
        let member = match child.kind() {
            "public_field_definition" => MemberInfo {
                name,
                kind: "property".to_string(),
                visibility: visibility(child, text).to_string(),
                is_static: has_modifier(child, "static"),
                is_async: None,
                is_readonly: has_modifier(child, "readonly"),
                is_optional: has_modifier(child, "?"),
                type_text: annotation_text(child, "type", text),
                value: child.child_by_field_name("value").map(|v| node_text(v, text)),
                line,
            },
            "method_definition" | "abstract_method_signature" => {
                let kind = if name == "constructor" {
                    "constructor"
                } else if has_modifier(child, "get") {
                    "getter"
                } else if has_modifier(child, "set") {
                    "setter"
                } else {
                    "method"
                };
                let type_text = match kind {
                    "constructor" => None,
                    "setter" => setter_parameter_type(child, text),
                    _ => annotation_text(child, "return_type", text),
                };
                MemberInfo {
                    name,
                    kind: kind.to_string(),
                    visibility: visibility(child, text).to_string(),
                    is_static: has_modifier(child, "static"),
                    is_async: (kind == "method").then(|| has_modifier(child, "async")),
                    is_readonly: false,
                    is_optional: has_modifier(child, "?"),
                    type_text,
                    value: None,
                    line,
                }
            }
            _ => continue,
        };
        members.push(member);
    }

    members.sort_by_key(|m| member_rank(&m.kind));
    members
}

fn setter_parameter_type(setter: Node, text: &str) -> Option<String> {
    let params = setter.child_by_field_name("parameters")?;
    let first = named_children(params).into_iter().next()?;
    annotation_text(first, "type", text)
}

fn interface_members(body: Node, source: &SourceFile) -> Vec<MemberInfo> {
    let text = source.text();
    let mut properties = Vec::new();
    let mut methods = Vec::new();

    for child in named_children(body) {
        let Some((_, name)) = declaration_name(child, text) else {
            continue;
        };
        let line = source.line_col(child.start_byte()).0;
        match child.kind() {
            "property_signature" => properties.push(MemberInfo {
                name,
                kind: "property".to_string(),
                visibility: "public".to_string(),
                is_static: false,
                is_async: None,
                is_readonly: has_modifier(child, "readonly"),
                is_optional: has_modifier(child, "?"),
                type_text: annotation_text(child, "type", text),
                value: None,
                line,
            }),
            "method_signature" => methods.push(MemberInfo {
                name,
                kind: "method".to_string(),
                visibility: "public".to_string(),
                is_static: false,
                is_async: Some(false),
                is_readonly: false,
                is_optional: has_modifier(child, "?"),
                type_text: annotation_text(child, "return_type", text),
                value: None,
                line,
            }),
            _ => {}
        }
    }

    properties.extend(methods);
    properties
}

/// Enum members with their values; implicit values count up from the last
/// numeric one, and are unknown after a non-numeric initializer
fn enum_members(body: Node, source: &SourceFile) -> Vec<MemberInfo> {
    let text = source.text();
    let mut next: Option<i64> = Some(0);
    let mut members = Vec::new();

    for child in named_children(body) {
        let (name_node, value) = match child.kind() {
            "enum_assignment" => {
                let Some(name) = child.child_by_field_name("name") else {
                    continue;
                };
                let value = child.child_by_field_name("value").map(|v| node_text(v, text));
                next = value
                    .as_deref()
                    .and_then(|v| v.parse::<i64>().ok())
                    .map(|n| n + 1);
                (name, value)
            }
            "property_identifier" | "string" => {
                let value = next.map(|n| n.to_string());
                next = next.map(|n| n + 1);
                (child, value)
            }
            _ => continue,
        };

        let raw = node_text(name_node, text);
        let name = if name_node.kind() == "string" {
            crate::project::modules::string_literal_value(&raw)
        } else {
            raw
        };
        members.push(MemberInfo {
            name,
            kind: "enum_member".to_string(),
            visibility: "public".to_string(),
            is_static: true,
            is_async: None,
            is_readonly: true,
            is_optional: false,
            type_text: None,
            value,
            line: source.line_col(child.start_byte()).0,
        });
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::project_with;

    const SERVICE: &str = "export class UserService {\n\
        \x20 constructor(private db: Db) {}\n\
        \x20 readonly name: string = 'users';\n\
        \x20 protected count?: number;\n\
        \x20 static async load(id: string): Promise<User> { return null as any; }\n\
        }\n";

    #[test]
    fn test_inspect_class_member_order_and_flags() {
        let (_dir, mut project) = project_with(&[("svc.ts", SERVICE)]);
        let result = inspect_type(&mut project, "UserService", None).unwrap();

        assert_eq!(result.kind, "class");
        assert!(result.is_exported);
        assert_eq!(result.member_count, 4);
        let kinds: Vec<&str> = result.members.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, vec!["constructor", "property", "property", "method"]);

        let load = &result.members[3];
        assert!(load.is_static);
        assert_eq!(load.is_async, Some(true));
        assert_eq!(load.type_text.as_deref(), Some("Promise<User>"));

        let name = &result.members[1];
        assert!(name.is_readonly);
        assert_eq!(name.visibility, "public");
        assert_eq!(name.value.as_deref(), Some("'users'"));

        let count = &result.members[2];
        assert_eq!(count.visibility, "protected");
        assert!(count.is_optional);
    }

    #[test]
    fn test_inspect_heritage_and_type_parameters() {
        let src = "interface Named { name: string }\n\
                   abstract class Repo<T, K extends string> extends Base<T> implements Named, Disposable {\n\
                   \x20 name = 'r';\n  get size(): number { return 0; }\n  set size(v: number) {}\n}\n";
        let (_dir, mut project) = project_with(&[("repo.ts", src)]);
        let result = inspect_type(&mut project, "Repo", Some("repo.ts")).unwrap();

        assert!(result.is_abstract);
        assert!(!result.is_exported);
        assert_eq!(result.line, 2);
        assert_eq!(result.extends, vec!["Base<T>"]);
        assert_eq!(result.implements, vec!["Named", "Disposable"]);
        assert_eq!(result.type_parameters, vec!["T", "K extends string"]);
        let kinds: Vec<&str> = result.members.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, vec!["property", "getter", "setter"]);
        assert_eq!(result.members[2].type_text.as_deref(), Some("number"));
    }

    #[test]
    fn test_inspect_interface_and_enum() {
        let src = "export interface Shape extends Base {\n  area(): number;\n  readonly sides?: number;\n}\n\
                   enum Color { Red, Green = 5, Blue, Named = 'n' }\n";
        let (_dir, mut project) = project_with(&[("types.ts", src)]);

        let shape = inspect_type(&mut project, "Shape", None).unwrap();
        assert_eq!(shape.kind, "interface");
        assert_eq!(shape.extends, vec!["Base"]);
        let names: Vec<&str> = shape.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["sides", "area"]);
        assert!(shape.members[0].is_optional && shape.members[0].is_readonly);

        let color = inspect_type(&mut project, "Color", None).unwrap();
        let values: Vec<Option<&str>> = color.members.iter().map(|m| m.value.as_deref()).collect();
        assert_eq!(values, vec![Some("0"), Some("5"), Some("6"), Some("'n'")]);
    }

    #[test]
    fn test_type_not_found() {
        let (_dir, mut project) = project_with(&[("a.ts", "type Id = string;\n")]);
        let alias = inspect_type(&mut project, "Id", None).unwrap();
        assert_eq!(alias.kind, "type_alias");
        assert!(alias.members.is_empty());

        let err = inspect_type(&mut project, "Missing", None).unwrap_err();
        assert_eq!(err.error_type(), "TypeNotFound");
    }

    #[test]
    fn test_list_types_sorted_and_filtered() {
        let (_dir, mut project) = project_with(&[
            ("b.ts", "export enum Mode { A }\nclass UserCache {}\n"),
            ("a.ts", "interface User { id: number }\n"),
            ("globals.d.ts", "declare interface UserGlobal {}\n"),
            ("node_modules/lib/index.d.ts", "export interface UserLib {}\n"),
        ]);

        let all = list_types(&mut project, None).unwrap();
        let listed: Vec<(&str, &str, usize)> = all
            .types
            .iter()
            .map(|t| (t.name.as_str(), t.file.as_str(), t.line))
            .collect();
        assert_eq!(
            listed,
            vec![("User", "a.ts", 1), ("Mode", "b.ts", 1), ("UserCache", "b.ts", 2)]
        );
        assert_eq!(all.types[0].member_count, 1);

        let users = list_types(&mut project, Some("user")).unwrap();
        assert_eq!(users.count, 2);
    }
}
