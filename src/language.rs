//! Language Support - Shared tree-sitter language configuration
//!
//! The engine understands one language family (TypeScript and JavaScript), but two
//! grammars: plain TypeScript and TSX. Everything grammar-specific goes through here
//! so the rest of the crate never names a tree-sitter language directly.

use anyhow::{anyhow, Result};
use std::path::Path;
use tree_sitter::{Parser, Tree};

/// Get tree-sitter language parser for a given language name
///
/// JavaScript files are parsed with the TypeScript grammar (a superset for our purposes),
/// JSX files with the TSX grammar.
pub fn get_tree_sitter_language(language: &str) -> Result<tree_sitter::Language> {
    match language {
        "typescript" | "javascript" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "tsx" | "jsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => Err(anyhow!(
            "Unsupported language: '{}'. Supported languages: typescript, tsx, javascript, jsx",
            language
        )),
    }
}

/// Detect language from file extension
///
/// Returns the language name that can be passed to `get_tree_sitter_language()`.
pub fn detect_language_from_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "ts" | "mts" | "cts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "js" | "mjs" | "cjs" => Some("javascript"),
        "jsx" => Some("jsx"),
        _ => None,
    }
}

/// Detect language for a path, `None` for files the engine does not analyse
pub fn detect_language(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(detect_language_from_extension)
}

/// Whether a language name denotes a JavaScript (untyped) dialect
pub fn is_javascript(language: &str) -> bool {
    matches!(language, "javascript" | "jsx")
}

/// Declaration-only files (`.d.ts`, `.d.mts`, `.d.cts`)
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts"))
        .unwrap_or(false)
}

/// Parse `content` with the grammar matching `language`
pub fn parse_source(language: &str, content: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&get_tree_sitter_language(language)?)
        .map_err(|e| anyhow!("Failed to set {} language: {}", language, e))?;
    parser
        .parse(content, None)
        .ok_or_else(|| anyhow!("tree-sitter produced no tree for {} source", language))
}

/// AST node kinds that open a function scope
///
/// Used by extraction to find the enclosing function-like construct and by the binder
/// to decide where `var` declarations hoist to.
pub const FUNCTION_NODE_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// AST node kinds that declare a named type (class, interface, enum, alias)
pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "interface_declaration",
    "enum_declaration",
    "type_alias_declaration",
];

/// AST node kinds that are identifier-class for offset resolution
pub const IDENTIFIER_NODE_KINDS: &[&str] = &[
    "identifier",
    "property_identifier",
    "type_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
    "private_property_identifier",
    "statement_identifier",
];
