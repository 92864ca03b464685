//! Whole-project diagnostics for the `check` command
//!
//! Syntax errors come from the parse tree; name, import and assignment errors come
//! from the binder's issue list; unreachable code is found by scanning statement
//! lists.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};
use tree_sitter::Node;

use crate::error::Result;
use crate::project::{FileId, Project};
use crate::semantic::lib_globals::is_lib_global;
use crate::semantic::tree_methods::named_children;
use crate::semantic::{BindIssue, SemanticModel};

/// Reported diagnostics are capped; counts cover the full set
const MAX_DIAGNOSTICS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub code: u32,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResult {
    pub success: bool,
    pub compilation_succeeded: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub truncated: bool,
}

pub fn check(project: &mut Project) -> Result<DiagnosticsResult> {
    let model = SemanticModel::build(project);
    let mut diagnostics = Vec::new();

    if let Some((path, reason)) = project.config().load_error() {
        warn!("Configuration rejected: {}", reason);
        diagnostics.push(Diagnostic {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            code: 5083,
            severity: Severity::Warning,
            message: format!("Cannot read file '{}': {}", path.display(), reason),
        });
    }

    let options = project.compiler_options();
    let reported: Vec<FileId> = project
        .sorted_file_ids()
        .into_iter()
        .filter(|id| !project.is_dependency(*id))
        .filter(|id| !(options.skip_lib_check && project.file(*id).is_declaration_file()))
        .collect();
    let semantic_files: HashSet<FileId> = reported
        .iter()
        .copied()
        .filter(|id| !project.file(*id).is_javascript() || options.check_js)
        .collect();

    let mut collector = Collector {
        project,
        diagnostics: &mut diagnostics,
    };
    for file in &reported {
        collector.syntax(*file);
    }
    for file in &reported {
        if !semantic_files.contains(file) {
            continue;
        }
        collector.unresolved_imports(&model, *file);
        if let Some(severity) = unreachable_severity(options.allow_unreachable_code) {
            collector.unreachable(*file, severity);
        }
    }
    for issue in model.issues() {
        collector.issue(issue, &semantic_files);
    }

    diagnostics.sort_by(|a, b| {
        (&a.file, a.line, a.column, a.code).cmp(&(&b.file, b.line, b.column, b.code))
    });
    diagnostics.dedup_by(|a, b| {
        a.file == b.file && a.line == b.line && a.column == b.column && a.code == b.code
    });

    let error_count = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warning_count = diagnostics.len() - error_count;
    let truncated = diagnostics.len() > MAX_DIAGNOSTICS;
    diagnostics.truncate(MAX_DIAGNOSTICS);
    info!(
        "Checked {} files: {} errors, {} warnings",
        reported.len(),
        error_count,
        warning_count
    );

    Ok(DiagnosticsResult {
        success: true,
        compilation_succeeded: error_count == 0,
        error_count,
        warning_count,
        diagnostics,
        truncated,
    })
}

fn unreachable_severity(allow_unreachable_code: Option<bool>) -> Option<Severity> {
    match allow_unreachable_code {
        Some(true) => None,
        Some(false) => Some(Severity::Error),
        None => Some(Severity::Warning),
    }
}

struct Collector<'a> {
    project: &'a Project,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Collector<'_> {
    fn push(&mut self, file: FileId, byte: usize, code: u32, severity: Severity, message: String) {
        let (line, column) = self.project.file(file).line_col(byte);
        self.diagnostics.push(Diagnostic {
            file: self.project.display_path(file),
            line,
            column,
            code,
            severity,
            message,
        });
    }

    fn syntax(&mut self, file: FileId) {
        let root = self.project.file(file).root();
        if root.has_error() {
            self.syntax_node(file, root);
        }
    }

    fn syntax_node(&mut self, file: FileId, node: Node) {
        if node.is_missing() {
            let message = format!("'{}' expected.", node.kind());
            self.push(file, node.start_byte(), 1005, Severity::Error, message);
            return;
        }
        if node.is_error() {
            let statement_position = node
                .parent()
                .map(|p| matches!(p.kind(), "program" | "statement_block" | "class_body"))
                .unwrap_or(true);
            let (code, message) = if statement_position {
                (1128, "Declaration or statement expected.")
            } else {
                (1109, "Expression expected.")
            };
            self.push(file, node.start_byte(), code, Severity::Error, message.to_string());
            return;
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            if child.has_error() || child.is_missing() {
                self.syntax_node(file, child);
            }
        }
    }

    fn unresolved_imports(&mut self, model: &SemanticModel, file: FileId) {
        for record in model.imports(file) {
            if record.resolution.is_resolved() {
                continue;
            }
            let message = format!(
                "Cannot find module '{}' or its corresponding type declarations.",
                record.specifier
            );
            self.push(file, record.start, 2307, Severity::Error, message);
        }
    }

    /// First statement after a `return`/`throw`/`break`/`continue` in each statement list
    fn unreachable(&mut self, file: FileId, severity: Severity) {
        let root = self.project.file(file).root();
        let mut lists = vec![root];
        let mut found = Vec::new();

        while let Some(list) = lists.pop() {
            let mut terminated = false;
            let mut reported = false;
            for statement in named_children(list) {
                if terminated && !reported && !is_hoisted(statement) {
                    found.push(statement.start_byte());
                    reported = true;
                }
                if matches!(
                    statement.kind(),
                    "return_statement" | "throw_statement" | "break_statement" | "continue_statement"
                ) {
                    terminated = true;
                }
            }
            collect_statement_lists(list, &mut lists);
        }

        for start in found {
            self.push(file, start, 7027, severity, "Unreachable code detected.".to_string());
        }
    }

    fn issue(&mut self, issue: &BindIssue, semantic_files: &HashSet<FileId>) {
        let (file, start, code, message) = match issue {
            BindIssue::Duplicate {
                file,
                start,
                name,
                block_scoped,
            } => {
                if *block_scoped {
                    (*file, *start, 2451, format!("Cannot redeclare block-scoped variable '{}'.", name))
                } else {
                    (*file, *start, 2300, format!("Duplicate identifier '{}'.", name))
                }
            }
            BindIssue::Unresolved { file, start, name } => {
                if is_lib_global(name) {
                    return;
                }
                (*file, *start, 2304, format!("Cannot find name '{}'.", name))
            }
            BindIssue::MissingExport {
                file,
                start,
                module,
                name,
            } => (
                *file,
                *start,
                2305,
                format!("Module '\"{}\"' has no exported member '{}'.", module, name),
            ),
            BindIssue::ConstAssignment { file, start, name } => (
                *file,
                *start,
                2588,
                format!("Cannot assign to '{}' because it is a constant.", name),
            ),
        };
        if semantic_files.contains(&file) {
            self.push(file, start, code, Severity::Error, message);
        }
    }
}

/// Declarations that are not executed in statement order
fn is_hoisted(statement: Node) -> bool {
    matches!(
        statement.kind(),
        "function_declaration"
            | "generator_function_declaration"
            | "interface_declaration"
            | "type_alias_declaration"
            | "empty_statement"
            | "comment"
    )
}

/// Push every statement list nested under `node` (not descending past the lists found)
fn collect_statement_lists<'a>(node: Node<'a>, lists: &mut Vec<Node<'a>>) {
    for child in named_children(node) {
        if matches!(
            child.kind(),
            "statement_block" | "switch_case" | "switch_default" | "class_static_block"
        ) {
            lists.push(child);
        } else {
            collect_statement_lists(child, lists);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::project_with;

    fn codes(result: &DiagnosticsResult) -> Vec<u32> {
        result.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_clean_project_compiles() {
        let (_dir, mut project) = project_with(&[
            ("lib.ts", "export function add(a: number, b: number): number { return a + b; }\n"),
            ("main.ts", "import { add } from './lib';\nconsole.log(add(1, 2));\n"),
        ]);
        let result = check(&mut project).unwrap();
        assert!(result.compilation_succeeded, "{:?}", result.diagnostics);
        assert_eq!(result.error_count, 0);
        assert!(!result.truncated);
    }

    #[test]
    fn test_runtime_globals_and_types_packages_resolve() {
        let browser = "const started = performance.now();\n\
                       localStorage.setItem('k', String(started));\n\
                       const el: HTMLInputElement | null = document.querySelector('input');\n\
                       requestAnimationFrame(() => el?.focus());\n\
                       window.addEventListener('keydown', (e: KeyboardEvent) => e.key);\n";
        let node = "export const home = process.env.HOME ?? __dirname;\n\
                    export const bytes = Buffer.from('x');\n";
        let spec = "describe('home', () => {\n  it('is set', () => expect(1).toBe(1));\n});\n";
        let (_dir, mut project) = project_with(&[
            ("src/browser.ts", browser),
            ("src/node.ts", node),
            ("src/home.test.ts", spec),
            (
                "node_modules/@types/jest/index.d.ts",
                "declare function describe(name: string, fn: () => void): void;\n\
                 declare function it(name: string, fn: () => void): void;\n\
                 declare function expect(value: unknown): any;\n",
            ),
        ]);

        let result = check(&mut project).unwrap();
        assert!(result.compilation_succeeded, "{:?}", result.diagnostics);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_semantic_errors() {
        let src = "import { missing } from './lib';\n\
                   import x from './nowhere';\n\
                   const limit = 1;\nlimit = 2;\n\
                   let a = 1;\nlet a = 2;\n\
                   undefinedName();\n";
        let (_dir, mut project) = project_with(&[("lib.ts", "export const present = 1;\n"), ("main.ts", src)]);
        let result = check(&mut project).unwrap();

        assert!(!result.compilation_succeeded);
        assert_eq!(codes(&result), vec![2305, 2307, 2588, 2451, 2304]);
        let missing = &result.diagnostics[0];
        assert_eq!((missing.file.as_str(), missing.line, missing.column), ("main.ts", 1, 10));
    }

    #[test]
    fn test_syntax_error_reported() {
        let (_dir, mut project) = project_with(&[("bad.ts", "let x = ;\n")]);
        let result = check(&mut project).unwrap();
        assert!(result.error_count >= 1);
        assert!(result
            .diagnostics
            .iter()
            .all(|d| d.file == "bad.ts" && matches!(d.code, 1005 | 1109 | 1128)));
    }

    #[test]
    fn test_unreachable_code_severity() {
        let src = "function f() {\n  return 1;\n  console.log('never');\n}\n";
        let (dir, mut project) = project_with(&[("a.ts", src)]);
        let result = check(&mut project).unwrap();
        assert_eq!(codes(&result), vec![7027]);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
        assert_eq!(result.diagnostics[0].line, 3);
        assert!(result.compilation_succeeded);

        std::fs::write(
            dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "allowUnreachableCode": false } }"#,
        )
        .unwrap();
        let mut strict = Project::load(dir.path());
        let result = check(&mut strict).unwrap();
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
        assert!(!result.compilation_succeeded);
    }

    #[test]
    fn test_bad_config_is_a_warning_and_falls_back() {
        let (_dir, mut project) = project_with(&[
            ("tsconfig.json", "{ not json"),
            ("a.ts", "export const a = 1;\n"),
        ]);
        let result = check(&mut project).unwrap();
        assert_eq!(codes(&result), vec![5083]);
        assert_eq!(result.diagnostics[0].file, "<unknown>");
        assert_eq!(result.warning_count, 1);
        assert!(result.compilation_succeeded);
    }

    #[test]
    fn test_javascript_needs_check_js_and_cap() {
        let mut body = String::new();
        for i in 0..60 {
            body.push_str(&format!("missing{}();\n", i));
        }
        let (_dir, mut project) = project_with(&[
            ("tsconfig.json", r#"{ "compilerOptions": { "allowJs": true } }"#),
            ("a.js", "nothingHere();\n"),
            ("b.ts", body.as_str()),
        ]);
        let result = check(&mut project).unwrap();
        assert!(result.diagnostics.iter().all(|d| d.file == "b.ts"));
        assert_eq!(result.error_count, 60);
        assert_eq!(result.diagnostics.len(), MAX_DIAGNOSTICS);
        assert!(result.truncated);
    }
}
