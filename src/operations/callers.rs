//! Find-callers: the functions, methods and constructors that reference a symbol

use serde::Serialize;
use std::collections::HashSet;
use tree_sitter::Node;

use super::{context_line, resolve_target, Position};
use crate::error::{RefactorError, Result};
use crate::project::{FileId, Project};
use crate::semantic::helpers::declaration_name;
use crate::semantic::tree_methods::{deepest_node_at, find_parent_of_kinds};
use crate::semantic::{SemanticModel, SymbolId, SymbolKind};

const CONTEXT_MAX_CHARS: usize = 200;
const MODULE_CALLER: &str = "<module>";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub caller: String,
    pub kind: String,
    pub context: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallersResult {
    pub success: bool,
    pub symbol: String,
    pub callers: Vec<Caller>,
    pub count: usize,
}

pub fn find_callers(project: &mut Project, file: &str, offset: usize) -> Result<CallersResult> {
    let file_id = project.open_file(file)?;
    let model = SemanticModel::build(project);
    let target = resolve_target(project, &model, file_id, offset)?;
    let symbol = target.symbol.ok_or_else(|| {
        RefactorError::NotRenameable(format!(
            "'{}' is not bound to a symbol declared in this project",
            target.name
        ))
    })?;

    let ids = symbol_and_aliases(&model, symbol);
    let declarations: Vec<(FileId, usize)> = ids
        .iter()
        .flat_map(|id| model.symbol(*id).declarations.iter())
        .map(|d| (d.file, d.name_start))
        .collect();
    let tolerance = model.symbol(symbol).name.len();

    let mut seen = HashSet::new();
    let mut callers = Vec::new();
    for occurrence in model.occurrences_of(&ids) {
        let near_definition = declarations.iter().any(|(file, start)| {
            *file == occurrence.file && occurrence.start.abs_diff(*start) <= tolerance
        });
        if occurrence.is_definition || near_definition {
            continue;
        }

        let root = project.file(occurrence.file).root();
        let node = deepest_node_at(root, occurrence.start);
        let in_specifier = node
            .and_then(|n| n.parent())
            .map(|parent| matches!(parent.kind(), "import_specifier" | "export_specifier"))
            .unwrap_or(false);
        if in_specifier {
            continue;
        }
        let (caller, kind) = node
            .and_then(|node| enclosing_caller(project, occurrence.file, node))
            .unwrap_or_else(|| (MODULE_CALLER.to_string(), "module"));
        let position = Position::of(project, occurrence.file, occurrence.start);
        let display = project.display_path(occurrence.file);

        if !seen.insert((display.clone(), position.line, caller.clone())) {
            continue;
        }
        callers.push(Caller {
            file: display,
            line: position.line,
            column: position.column,
            caller,
            kind: kind.to_string(),
            context: context_line(project, occurrence.file, occurrence.start, CONTEXT_MAX_CHARS),
        });
    }

    Ok(CallersResult {
        success: true,
        symbol: model.symbol(symbol).name.clone(),
        count: callers.len(),
        callers,
    })
}

/// The symbol plus aliases that stand for it (`import { f as g }`, default imports)
fn symbol_and_aliases(model: &SemanticModel, symbol: SymbolId) -> Vec<SymbolId> {
    let original = model.original(symbol);
    let mut ids = vec![original];
    for (index, candidate) in model.symbols().iter().enumerate() {
        let id = SymbolId(index);
        if candidate.kind == SymbolKind::Alias && id != original && model.original(id) == original {
            ids.push(id);
        }
    }
    ids
}

/// Nearest named function-like ancestor: (display name, kind)
///
/// Anonymous functions are named after the variable they are assigned to; unbound
/// ones (callbacks) are skipped in favour of their own enclosing function.
fn enclosing_caller(project: &Project, file: FileId, node: Node) -> Option<(String, &'static str)> {
    let source = project.file(file);
    let text = source.text();
    let mut current = node.parent();

    while let Some(n) = current {
        match n.kind() {
            "method_definition" => {
                let (_, method) = declaration_name(n, text)?;
                let class = class_name(n, text);
                if method == "constructor" {
                    return Some((qualified(class, "constructor"), "constructor"));
                }
                return Some((qualified(class, &method), "method"));
            }
            "function_declaration" | "generator_function_declaration" => {
                let (_, name) = declaration_name(n, text)?;
                return Some((name, "function"));
            }
            "function_expression" | "function" | "generator_function" | "arrow_function" => {
                if let Some((_, name)) = declaration_name(n, text) {
                    return Some((name, "function"));
                }
                if let Some(name) = bound_name(n, text) {
                    return Some((name, "function"));
                }
            }
            _ => {}
        }
        current = n.parent();
    }
    None
}

/// Variable or property an anonymous function is assigned to
fn bound_name(function: Node, text: &str) -> Option<String> {
    let parent = function.parent()?;
    let name = match parent.kind() {
        "variable_declarator" => parent.child_by_field_name("name")?,
        "public_field_definition" | "pair" => {
            parent.child_by_field_name("name").or_else(|| parent.child_by_field_name("key"))?
        }
        "assignment_expression" => parent.child_by_field_name("left")?,
        _ => return None,
    };
    Some(text[name.start_byte()..name.end_byte()].to_string())
}

fn class_name(member: Node, text: &str) -> Option<String> {
    let class = find_parent_of_kinds(
        member,
        &["class_declaration", "abstract_class_declaration", "class"],
    )?;
    class
        .child_by_field_name("name")
        .map(|name| text[name.start_byte()..name.end_byte()].to_string())
}

fn qualified(class: Option<String>, member: &str) -> String {
    match class {
        Some(class) => format!("{}.{}", class, member),
        None => member.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::project_with;

    #[test]
    fn test_callers_by_enclosing_function() {
        let src = "function helper() { return 1; }\n\
                   function a() { helper(); helper(); }\n\
                   const b = () => helper();\n\
                   class Svc {\n  constructor() { helper(); }\n  run() { [1].map(() => helper()); }\n}\n\
                   helper();\n";
        let (_dir, mut project) = project_with(&[("a.ts", src)]);
        let result = find_callers(&mut project, "a.ts", 9).unwrap();

        let names: Vec<(&str, &str)> = result
            .callers
            .iter()
            .map(|c| (c.caller.as_str(), c.kind.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a", "function"),
                ("b", "function"),
                ("Svc.constructor", "constructor"),
                ("Svc.run", "method"),
                ("<module>", "module"),
            ]
        );
        assert!(result.callers.iter().all(|c| c.line != 1), "definition excluded");
    }

    #[test]
    fn test_callers_through_imports() {
        let (_dir, mut project) = project_with(&[
            ("lib.ts", "export function save() {}\n"),
            ("ui.ts", "import { save as persist } from './lib';\nexport function onClick() { persist(); }\n"),
        ]);
        let result = find_callers(&mut project, "lib.ts", 16).unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(result.callers[0].file, "ui.ts");
        assert_eq!(result.callers[0].caller, "onClick");
        assert_eq!(result.callers[0].context, "export function onClick() { persist(); }");
    }
}
