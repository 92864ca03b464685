//! Extract-function and extract-variable
//!
//! Both insert a new declaration before an anchor and replace the selected range with a
//! reference to it. The insertion and the replacement go into one edit batch and are
//! spliced against the same original text, so neither sees shifted offsets.
//!
//! The selection is moved as-is: free variables are not turned into parameters and
//! returned values are not rewired.

use serde::Serialize;
use tracing::debug;
use tree_sitter::Node;

use super::Position;
use crate::error::{RefactorError, Result};
use crate::project::edits::{commit, CommitMode, EditBatch, StagedChange, TextEdit};
use crate::project::{FileId, Project};
use crate::resolver::resolve_node;
use crate::semantic::helpers::is_function_like;
use crate::semantic::tree_methods::{enclosing_statement, find_ancestor, named_children};
use crate::utils::identifiers::is_valid_identifier;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    pub success: bool,
    pub preview: bool,
    pub changed_files: Vec<String>,
    pub description: String,
    pub new_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<StagedChange>>,
}

/// A validated selection: trimmed byte range plus its text
struct Selection {
    file: FileId,
    start: usize,
    end: usize,
    text: String,
}

fn select(
    project: &mut Project,
    file: &str,
    start: usize,
    end: usize,
    new_name: &str,
) -> Result<Selection> {
    if !is_valid_identifier(new_name) {
        return Err(RefactorError::InvalidName(new_name.to_string()));
    }
    let file_id = project.open_file(file)?;
    let source = project.file(file_id);
    let invalid = || RefactorError::InvalidRange {
        file: project.display_path(file_id),
        start,
        end,
        len: source.line_index().utf16_len(),
    };

    let start_byte = source.byte_offset(start).ok_or_else(invalid)?;
    let end_byte = source.byte_offset(end).ok_or_else(invalid)?;
    if start_byte > end_byte {
        return Err(invalid());
    }
    if resolve_node(source, start).is_none() {
        return Err(RefactorError::CodeNotFound {
            file: project.display_path(file_id),
            offset: start,
        });
    }

    let raw = &source.text()[start_byte..end_byte];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RefactorError::CodeNotFound {
            file: project.display_path(file_id),
            offset: start,
        });
    }

    Ok(Selection {
        file: file_id,
        start: start_byte + leading,
        end: start_byte + leading + trimmed.len(),
        text: trimmed.to_string(),
    })
}

pub fn extract_function(
    project: &mut Project,
    file: &str,
    start: usize,
    end: usize,
    new_name: &str,
    mode: CommitMode,
) -> Result<ExtractResult> {
    let selection = select(project, file, start, end, new_name)?;
    let source = project.file(selection.file);
    let root = source.root();
    let anchor = root
        .descendant_for_byte_range(selection.start, selection.start)
        .and_then(function_anchor)
        .unwrap_or_else(|| first_statement_start(root));

    let indent = source.indentation_at(anchor).to_string();
    let declaration = format!(
        "function {name}() {{\n{indent}    {body}\n{indent}}}\n\n{indent}",
        name = new_name,
        indent = indent,
        body = selection.text
    );
    let call = if selection.text.ends_with(';') {
        format!("{}();", new_name)
    } else {
        format!("{}()", new_name)
    };
    let inserted_at = Position::of(project, selection.file, anchor);
    debug!(
        "Extracting {} bytes into {}() at byte {}",
        selection.text.len(),
        new_name,
        anchor
    );

    let mut batch = EditBatch::new();
    batch.push(selection.file, TextEdit::insert(anchor, declaration));
    batch.push(selection.file, TextEdit::replace(selection.start, selection.end, call));
    let outcome = commit(project, batch, mode)?;

    Ok(ExtractResult {
        success: true,
        preview: mode.is_preview(),
        description: format!("Extracted function '{}'", new_name),
        new_name: new_name.to_string(),
        inserted_at: Some(inserted_at),
        changed_files: outcome.changed_files,
        changes: mode.is_preview().then_some(outcome.changes),
    })
}

pub fn extract_variable(
    project: &mut Project,
    file: &str,
    start: usize,
    end: usize,
    new_name: &str,
    mode: CommitMode,
) -> Result<ExtractResult> {
    let selection = select(project, file, start, end, new_name)?;
    let source = project.file(selection.file);
    let anchor = source
        .root()
        .descendant_for_byte_range(selection.start, selection.start)
        .and_then(enclosing_statement)
        .map(|statement| statement.start_byte())
        .unwrap_or(selection.start);

    let expression = selection.text.trim_end_matches(';').trim_end();
    let indent = source.indentation_at(anchor).to_string();
    let declaration = format!("const {} = {};\n{}", new_name, expression, indent);
    let replace_end = selection.start + expression.len();

    let mut batch = EditBatch::new();
    batch.push(selection.file, TextEdit::insert(anchor, declaration));
    batch.push(selection.file, TextEdit::replace(selection.start, replace_end, new_name));
    let outcome = commit(project, batch, mode)?;

    Ok(ExtractResult {
        success: true,
        preview: mode.is_preview(),
        description: format!("Extracted variable '{}'", new_name),
        new_name: new_name.to_string(),
        inserted_at: None,
        changed_files: outcome.changed_files,
        changes: mode.is_preview().then_some(outcome.changes),
    })
}

/// Start of the statement holding the nearest enclosing function-like node
fn function_anchor(node: Node) -> Option<usize> {
    let function = find_ancestor(node, |n| is_function_like(n.kind()))?;
    let statement = enclosing_statement(function).unwrap_or(function);
    Some(statement.start_byte())
}

/// First top-level statement that is not a comment; end of file when there is none
fn first_statement_start(root: Node) -> usize {
    named_children(root)
        .into_iter()
        .find(|n| !matches!(n.kind(), "comment" | "hash_bang_line"))
        .map(|n| n.start_byte())
        .unwrap_or(root.end_byte())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::references::find_definition;
    use crate::project::Project;
    use crate::test_support::{hash_tree, project_with};
    use std::fs;

    #[test]
    fn test_extract_function_inside_function() {
        let src = "function main() {\n    console.log('hi');\n    return 1;\n}\n";
        let (dir, mut project) = project_with(&[("a.ts", src)]);
        let start = src.find("console").unwrap();
        let end = src.find("\n    return").unwrap();

        let result =
            extract_function(&mut project, "a.ts", start, end, "greet", CommitMode::Apply).unwrap();
        assert_eq!(result.inserted_at, Some(Position { line: 1, column: 1 }));

        let text = fs::read_to_string(dir.path().join("a.ts")).unwrap();
        assert_eq!(
            text,
            "function greet() {\n    console.log('hi');\n}\n\nfunction main() {\n    greet();\n    return 1;\n}\n"
        );

        // the new call site resolves back to the inserted declaration
        let mut reloaded = Project::load(dir.path());
        let call = text.find("greet();").unwrap();
        let definition = find_definition(&mut reloaded, "a.ts", call).unwrap();
        assert!(definition.found);
        assert_eq!(definition.line, Some(1));
        assert_eq!(definition.column, Some(10));
    }

    #[test]
    fn test_extract_function_in_method_goes_before_class() {
        let src = "class A {\n  run() {\n    return 2 * 3;\n  }\n}\n";
        let (_dir, mut project) = project_with(&[("a.ts", src)]);
        let start = src.find("2 * 3").unwrap();

        let result =
            extract_function(&mut project, "a.ts", start, start + 5, "six", CommitMode::Preview)
                .unwrap();
        let changes = result.changes.unwrap();
        assert_eq!(
            changes[0].new_content,
            "function six() {\n    2 * 3\n}\n\nclass A {\n  run() {\n    return six();\n  }\n}\n"
        );
    }

    #[test]
    fn test_extract_function_at_module_scope_skips_leading_comments() {
        let src = "// header\nimport { a } from './lib';\nconsole.log(a);\n";
        let (_dir, mut project) =
            project_with(&[("lib.ts", "export const a = 1;\n"), ("main.ts", src)]);
        let start = src.find("console").unwrap();
        let end = src.rfind(';').unwrap() + 1;

        let result =
            extract_function(&mut project, "main.ts", start, end, "logIt", CommitMode::Preview)
                .unwrap();
        assert_eq!(result.inserted_at, Some(Position { line: 2, column: 1 }));
        assert_eq!(result.changed_files, vec!["main.ts"]);
        assert_eq!(
            result.changes.unwrap()[0].new_content,
            "// header\nfunction logIt() {\n    console.log(a);\n}\n\nimport { a } from './lib';\nlogIt();\n"
        );
    }

    #[test]
    fn test_extract_variable() {
        let src = "function area(r: number) {\n  return Math.PI * r * r;\n}\n";
        let (dir, mut project) = project_with(&[("a.ts", src)]);
        let before = hash_tree(dir.path());
        let start = src.find("Math.PI").unwrap();

        let result =
            extract_variable(&mut project, "a.ts", start, start + 7, "pi", CommitMode::Preview)
                .unwrap();
        assert_eq!(
            result.changes.unwrap()[0].new_content,
            "function area(r: number) {\n  const pi = Math.PI;\n  return pi * r * r;\n}\n"
        );
        assert_eq!(hash_tree(dir.path()), before);
    }

    #[test]
    fn test_extract_variable_then_definition_points_to_declaration() {
        let src = "let total = 1 + 2;\n";
        let (dir, mut project) = project_with(&[("a.ts", src)]);
        extract_variable(&mut project, "a.ts", 12, 17, "sum", CommitMode::Apply).unwrap();

        let text = fs::read_to_string(dir.path().join("a.ts")).unwrap();
        assert_eq!(text, "const sum = 1 + 2;\nlet total = sum;\n");
        let mut reloaded = Project::load(dir.path());
        let use_site = text.rfind("sum").unwrap();
        let definition = find_definition(&mut reloaded, "a.ts", use_site).unwrap();
        assert_eq!(definition.offset, Some(6));
    }

    #[test]
    fn test_extract_errors() {
        let (_dir, mut project) = project_with(&[("a.ts", "let a = 1;\n")]);
        let err =
            extract_variable(&mut project, "a.ts", 8, 9, "class", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "InvalidName");

        let err =
            extract_variable(&mut project, "a.ts", 9, 8, "x", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "InvalidRange");

        let err =
            extract_function(&mut project, "a.ts", 11, 11, "x", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "CodeNotFound");
    }
}
