// Command boundary - one command in, one JSON object out
//
// Every operation runs behind `execute`, which turns errors and panics into
// `{ success: false, error, errorType }` so nothing escapes to the process.

use serde::Serialize;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::{RefactorError, Result};
use crate::operations::{callers, diagnostics, extract, implementations, inspect, references, rename};
use crate::project::edits::CommitMode;
use crate::project::Project;

/// A fully parsed command; offsets are UTF-16 code units
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Rename {
        file: String,
        offset: usize,
        new_name: String,
        preview: bool,
    },
    ExtractFunction {
        file: String,
        start: usize,
        end: usize,
        new_name: String,
        preview: bool,
    },
    ExtractVariable {
        file: String,
        start: usize,
        end: usize,
        new_name: String,
        preview: bool,
    },
    FindReferences { file: String, offset: usize },
    FindDefinition { file: String, offset: usize },
    FindCallers { file: String, offset: usize },
    FindImplementations { file: String, offset: usize },
    InspectType { type_name: String, file: Option<String> },
    ListTypes { name_filter: Option<String> },
    Check,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Rename { .. } => "rename",
            Command::ExtractFunction { .. } => "extract-function",
            Command::ExtractVariable { .. } => "extract-variable",
            Command::FindReferences { .. } => "find-references",
            Command::FindDefinition { .. } => "find-definition",
            Command::FindCallers { .. } => "find-callers",
            Command::FindImplementations { .. } => "find-implementations",
            Command::InspectType { .. } => "inspect-type",
            Command::ListTypes { .. } => "list-types",
            Command::Check => "check",
        }
    }
}

/// Run one command against the project at `root`
///
/// Always returns a JSON object: the operation result on success, an error payload
/// otherwise. Panics inside an operation are caught and reported as `Panic`.
pub fn execute(root: &Path, command: Command) -> Value {
    let name = command.name();
    let root: PathBuf = root.to_path_buf();
    info!("Running {} in {}", name, root.display());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut project = Project::load(&root);
        run(&mut project, command)
    }));

    match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            info!("{} failed: {}", name, e);
            error_json(e.error_type(), &e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("{} panicked: {}", name, message);
            let e = RefactorError::Panic(message);
            error_json(e.error_type(), &e.to_string())
        }
    }
}

/// `{ success: false, error, errorType }`
pub fn error_json(error_type: &str, message: &str) -> Value {
    json!({
        "success": false,
        "error": message,
        "errorType": error_type,
    })
}

fn run(project: &mut Project, command: Command) -> Result<Value> {
    match command {
        Command::Rename {
            file,
            offset,
            new_name,
            preview,
        } => to_json(rename::rename(
            project,
            &file,
            offset,
            &new_name,
            CommitMode::from_preview_flag(preview),
        )?),
        Command::ExtractFunction {
            file,
            start,
            end,
            new_name,
            preview,
        } => to_json(extract::extract_function(
            project,
            &file,
            start,
            end,
            &new_name,
            CommitMode::from_preview_flag(preview),
        )?),
        Command::ExtractVariable {
            file,
            start,
            end,
            new_name,
            preview,
        } => to_json(extract::extract_variable(
            project,
            &file,
            start,
            end,
            &new_name,
            CommitMode::from_preview_flag(preview),
        )?),
        Command::FindReferences { file, offset } => {
            to_json(references::find_references(project, &file, offset)?)
        }
        Command::FindDefinition { file, offset } => {
            to_json(references::find_definition(project, &file, offset)?)
        }
        Command::FindCallers { file, offset } => {
            to_json(callers::find_callers(project, &file, offset)?)
        }
        Command::FindImplementations { file, offset } => {
            to_json(implementations::find_implementations(project, &file, offset)?)
        }
        Command::InspectType { type_name, file } => {
            to_json(inspect::inspect_type(project, &type_name, file.as_deref())?)
        }
        Command::ListTypes { name_filter } => {
            to_json(inspect::list_types(project, name_filter.as_deref())?)
        }
        Command::Check => to_json(diagnostics::check(project)?),
    }
}

fn to_json<T: Serialize>(result: T) -> Result<Value> {
    serde_json::to_value(result).map_err(|e| RefactorError::Other(e.into()))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hash_tree, write_files};
    use tempfile::TempDir;

    #[test]
    fn test_rename_then_references_resolve_to_new_name() {
        let dir = TempDir::new().unwrap();
        write_files(
            dir.path(),
            &[
                ("src/counter.ts", "export let count = 0;\nexport function bump() { count += 1; }\n"),
                ("src/main.ts", "import { count, bump } from './counter';\nbump();\nconsole.log(count);\n"),
            ],
        );

        let before = execute(
            dir.path(),
            Command::FindReferences {
                file: "src/counter.ts".to_string(),
                offset: 11,
            },
        );
        assert_eq!(before["count"], 4);

        let renamed = execute(
            dir.path(),
            Command::Rename {
                file: "src/counter.ts".to_string(),
                offset: 11,
                new_name: "total".to_string(),
                preview: false,
            },
        );
        assert_eq!(renamed["success"], true);
        assert_eq!(renamed["changedFiles"], json!(["src/counter.ts", "src/main.ts"]));

        let after = execute(
            dir.path(),
            Command::FindReferences {
                file: "src/counter.ts".to_string(),
                offset: 11,
            },
        );
        let references = after["references"].as_array().unwrap();
        assert_eq!(references.len(), 4);
        assert!(references.iter().all(|r| r["text"] == "total"));
        for file in ["src/counter.ts", "src/main.ts"] {
            let text = std::fs::read_to_string(dir.path().join(file)).unwrap();
            assert!(!text.contains("count"), "{}", text);
        }
    }

    #[test]
    fn test_preview_extract_leaves_disk_untouched() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), &[("a.ts", "const x = 1 + 2;\n")]);
        let before = hash_tree(dir.path());

        let result = execute(
            dir.path(),
            Command::ExtractVariable {
                file: "a.ts".to_string(),
                start: 10,
                end: 15,
                new_name: "sum".to_string(),
                preview: true,
            },
        );
        assert_eq!(result["preview"], true);
        assert_eq!(result["newName"], "sum");
        assert!(result["changes"][0]["newContent"].is_string());
        assert_eq!(hash_tree(dir.path()), before);
    }

    #[test]
    fn test_errors_become_payloads() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), &[("a.ts", "let a = 1;\n")]);

        let missing = execute(
            dir.path(),
            Command::FindReferences {
                file: "nope.ts".to_string(),
                offset: 0,
            },
        );
        assert_eq!(missing["success"], false);
        assert_eq!(missing["errorType"], "FileNotFound");

        let not_found = execute(
            dir.path(),
            Command::InspectType {
                type_name: "Ghost".to_string(),
                file: None,
            },
        );
        assert_eq!(not_found["errorType"], "TypeNotFound");
        assert_eq!(not_found["error"], "Type 'Ghost' not found");
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}
