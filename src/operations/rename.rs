//! Rename-by-offset
//!
//! Every occurrence of the symbol (and of related members across its class hierarchy)
//! is rewritten in one edit batch, so a rename either lands everywhere or nowhere.

use serde::Serialize;
use tracing::info;

use super::resolve_target;
use crate::error::{RefactorError, Result};
use crate::project::edits::{commit, CommitMode, EditBatch, StagedChange, TextEdit};
use crate::project::Project;
use crate::semantic::{SemanticModel, Shorthand, SymbolKind};
use crate::utils::identifiers::is_valid_identifier;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameResult {
    pub success: bool,
    pub preview: bool,
    pub changed_files: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<StagedChange>>,
}

pub fn rename(
    project: &mut Project,
    file: &str,
    offset: usize,
    new_name: &str,
    mode: CommitMode,
) -> Result<RenameResult> {
    let bare_name = new_name.strip_prefix('#').unwrap_or(new_name);
    if !is_valid_identifier(bare_name) {
        return Err(RefactorError::InvalidName(new_name.to_string()));
    }

    let file_id = project.open_file(file)?;
    let model = SemanticModel::build(project);
    let target = resolve_target(project, &model, file_id, offset)?;

    let symbol = target.symbol.ok_or_else(|| {
        RefactorError::NotRenameable(format!(
            "'{}' is not bound to a symbol declared in this project",
            target.name
        ))
    })?;
    if model.symbol(symbol).kind == SymbolKind::Constructor {
        return Err(RefactorError::NotRenameable(
            "Constructors cannot be renamed".to_string(),
        ));
    }

    let related = model.related_symbols(symbol);
    for id in &related {
        let library_declaration = model.symbol(*id).declarations.iter().find(|d| {
            project.is_dependency(d.file) || project.file(d.file).is_declaration_file()
        });
        if let Some(declaration) = library_declaration {
            return Err(RefactorError::NotRenameable(format!(
                "'{}' is declared in library file {}",
                model.symbol(*id).name,
                project.display_path(declaration.file)
            )));
        }
    }

    let occurrences = model.occurrences_of(&related);
    let mut batch = EditBatch::new();
    for occurrence in &occurrences {
        let source = project.file(occurrence.file);
        let old_text = &source.text()[occurrence.start..occurrence.end];
        batch.push(
            occurrence.file,
            TextEdit::replace(
                occurrence.start,
                occurrence.end,
                replacement_text(old_text, bare_name, occurrence.shorthand),
            ),
        );
    }

    let edit_count = batch.edit_count();
    let outcome = commit(project, batch, mode)?;
    info!(
        "Renamed '{}' -> '{}': {} occurrences",
        target.name, new_name, edit_count
    );

    Ok(RenameResult {
        success: true,
        preview: mode.is_preview(),
        description: format!(
            "Renamed '{}' to '{}' ({} occurrences in {} files)",
            target.name,
            bare_name,
            edit_count,
            outcome.changed_files.len()
        ),
        changed_files: outcome.changed_files,
        changes: mode.is_preview().then_some(outcome.changes),
    })
}

/// New text for one occurrence, keeping `#`, quotes and the other side of a
/// shorthand intact
fn replacement_text(old_text: &str, new_name: &str, shorthand: Shorthand) -> String {
    match shorthand {
        Shorthand::Binding => return format!("{}: {}", old_text, new_name),
        Shorthand::Property => return format!("{}: {}", new_name, old_text),
        Shorthand::Plain => {}
    }
    if old_text.starts_with('#') {
        return format!("#{}", new_name);
    }
    match old_text.chars().next() {
        Some(quote @ ('"' | '\'' | '`')) => format!("{quote}{new_name}{quote}"),
        _ => new_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hash_tree, project_with};
    use std::fs;

    #[test]
    fn test_rename_local_variable() {
        let (dir, mut project) = project_with(&[("a.ts", "let count = 0; count += 1;")]);
        let result = rename(&mut project, "a.ts", 4, "total", CommitMode::Apply).unwrap();

        assert!(result.success);
        assert_eq!(result.changed_files, vec!["a.ts"]);
        assert!(result.changes.is_none());
        assert_eq!(
            fs::read_to_string(dir.path().join("a.ts")).unwrap(),
            "let total = 0; total += 1;"
        );
    }

    #[test]
    fn test_rename_across_files_updates_imports() {
        let (dir, mut project) = project_with(&[
            ("lib.ts", "export function greet() { return 1; }\n"),
            ("main.ts", "import { greet } from './lib';\ngreet();\n"),
        ]);
        rename(&mut project, "lib.ts", 16, "welcome", CommitMode::Apply).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("main.ts")).unwrap(),
            "import { welcome } from './lib';\nwelcome();\n"
        );
    }

    #[test]
    fn test_preview_does_not_touch_disk() {
        let (dir, mut project) = project_with(&[("a.ts", "let count = 0; count += 1;")]);
        let before = hash_tree(dir.path());

        let result = rename(&mut project, "a.ts", 15, "total", CommitMode::Preview).unwrap();

        assert!(result.preview);
        let changes = result.changes.unwrap();
        assert_eq!(changes[0].new_content, "let total = 0; total += 1;");
        assert_eq!(hash_tree(dir.path()), before);
    }

    #[test]
    fn test_rename_method_renames_overrides_and_interface() {
        let (dir, mut project) = project_with(&[(
            "a.ts",
            "interface Runner { run(): void }\n\
             class Fast implements Runner { run() {} }\n\
             const r: Runner = new Fast();\nr.run();\n",
        )]);
        let offset = "interface Runner { ".len();
        rename(&mut project, "a.ts", offset, "execute", CommitMode::Apply).unwrap();

        let text = fs::read_to_string(dir.path().join("a.ts")).unwrap();
        assert!(!text.contains("run"));
        assert_eq!(text.matches("execute").count(), 3);
    }

    #[test]
    fn test_shorthand_property_is_expanded() {
        let (dir, mut project) =
            project_with(&[("a.ts", "const name = 'x';\nconst o = { name };\n")]);
        rename(&mut project, "a.ts", 6, "label", CommitMode::Apply).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.ts")).unwrap(),
            "const label = 'x';\nconst o = { name: label };\n"
        );
    }

    #[test]
    fn test_rename_member_through_destructuring() {
        let src = concat!(
            "interface User { name: string }\n",
            "function greet(u: User) {\n",
            "  const { name } = u;\n",
            "  const { name: alias } = u;\n",
            "  const copy: User = { name };\n",
            "  return name + alias + u.name + copy.name;\n",
            "}\n",
        );
        let (dir, mut project) = project_with(&[("a.ts", src)]);
        let offset = "interface User { ".len();
        rename(&mut project, "a.ts", offset, "label", CommitMode::Apply).unwrap();

        let expected = concat!(
            "interface User { label: string }\n",
            "function greet(u: User) {\n",
            "  const { label: name } = u;\n",
            "  const { label: alias } = u;\n",
            "  const copy: User = { label: name };\n",
            "  return name + alias + u.label + copy.label;\n",
            "}\n",
        );
        assert_eq!(fs::read_to_string(dir.path().join("a.ts")).unwrap(), expected);
    }

    #[test]
    fn test_rename_destructured_local_keeps_property() {
        let src = concat!(
            "interface User { name: string }\n",
            "function greet(u: User) {\n",
            "  const { name } = u;\n",
            "  return name;\n",
            "}\n",
        );
        let (dir, mut project) = project_with(&[("a.ts", src)]);
        let offset = src.find("{ name }").unwrap() + 2;
        rename(&mut project, "a.ts", offset, "who", CommitMode::Apply).unwrap();

        let expected = concat!(
            "interface User { name: string }\n",
            "function greet(u: User) {\n",
            "  const { name: who } = u;\n",
            "  return who;\n",
            "}\n",
        );
        assert_eq!(fs::read_to_string(dir.path().join("a.ts")).unwrap(), expected);
    }

    #[test]
    fn test_rename_errors() {
        let (_dir, mut project) = project_with(&[("a.ts", "let a = 1;\nconsole.log(a);\n")]);

        let err = rename(&mut project, "a.ts", 4, "1bad", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "InvalidName");

        let err = rename(&mut project, "a.ts", 8, "b", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "NotRenameable", "number literal");

        let err = rename(&mut project, "a.ts", 500, "b", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "SymbolNotFound");

        let err = rename(&mut project, "a.ts", 12, "b", CommitMode::Preview).unwrap_err();
        assert_eq!(err.error_type(), "NotRenameable", "unbound global");
    }
}
