//! Module specifier resolution
//!
//! Maps an `import`/`export ... from` specifier to a file on disk. Relative specifiers
//! are tried against the TypeScript extension list and `index.*`; bare specifiers go
//! through `paths`/`baseUrl` and then `node_modules`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use tree_sitter::Node;

use super::config::CompilerOptions;
use super::source_file::SourceFile;
use crate::utils::paths::normalize_path;

/// Extensions appended to an extensionless specifier, in probe order
const EXTENSION_CANDIDATES: [&str; 9] = [
    ".ts", ".tsx", ".d.ts", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs",
];

/// JS suffixes that may be written in an import while the source is TypeScript
const JS_TO_TS: [(&str, &[&str]); 4] = [
    (".js", &[".ts", ".tsx", ".d.ts"]),
    (".jsx", &[".tsx"]),
    (".mjs", &[".mts", ".d.mts"]),
    (".cjs", &[".cts", ".d.cts"]),
];

const NODE_BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http",
    "http2", "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process",
    "punycode", "querystring", "readline", "repl", "stream", "string_decoder", "sys",
    "timers", "tls", "trace_events", "tty", "url", "util", "v8", "vm", "wasi",
    "worker_threads", "zlib",
];

/// `/// <reference path="..." />` directives in declaration files
static REFERENCE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*///\s*<reference\s+path\s*=\s*["']([^"']+)["']"#)
        .expect("static regex")
});

/// Outcome of resolving one module specifier
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleResolution {
    /// A source or declaration file
    File(PathBuf),
    /// A Node built-in module (`fs`, `node:path`)
    Builtin,
    /// An installed package without type information
    Package(String),
    Unresolved,
}

impl ModuleResolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ModuleResolution::Unresolved)
    }

    pub fn file(&self) -> Option<&Path> {
        match self {
            ModuleResolution::File(path) => Some(path),
            _ => None,
        }
    }
}

/// A module specifier found in a file's import/export statements
#[derive(Debug, Clone)]
pub struct ModuleSpecifier {
    pub text: String,
    /// Byte range of the string literal, quotes included
    pub start: usize,
    pub end: usize,
}

/// Resolves specifiers relative to one project
pub struct ModuleResolver<'a> {
    root: &'a Path,
    options: &'a CompilerOptions,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(root: &'a Path, options: &'a CompilerOptions) -> Self {
        Self { root, options }
    }

    pub fn resolve(&self, from_file: &Path, specifier: &str) -> ModuleResolution {
        let resolution = self.resolve_inner(from_file, specifier);
        trace!("resolve '{}' from {} -> {:?}", specifier, from_file.display(), resolution);
        resolution
    }

    fn resolve_inner(&self, from_file: &Path, specifier: &str) -> ModuleResolution {
        if specifier.is_empty() {
            return ModuleResolution::Unresolved;
        }

        if specifier.starts_with('.') || specifier.starts_with('/') {
            let base_dir = from_file.parent().unwrap_or(self.root);
            let joined = normalize_path(&base_dir.join(specifier));
            return match self.probe(&joined) {
                Some(path) => ModuleResolution::File(path),
                None => ModuleResolution::Unresolved,
            };
        }

        if is_builtin(specifier) {
            return ModuleResolution::Builtin;
        }

        if let Some(path) = self.resolve_paths_mapping(specifier) {
            return ModuleResolution::File(path);
        }

        if let Some(base_url) = &self.options.base_url {
            let candidate = normalize_path(&self.root.join(base_url).join(specifier));
            if let Some(path) = self.probe(&candidate) {
                return ModuleResolution::File(path);
            }
        }

        self.resolve_node_modules(from_file, specifier)
    }

    /// Declaration files included without an import
    ///
    /// Every package under the root's `node_modules/@types` (only those listed in
    /// `types` when it is set), plus whatever their `/// <reference path>` directives
    /// pull in.
    pub fn automatic_type_files(&self) -> Vec<PathBuf> {
        let types_root = self.root.join("node_modules").join("@types");
        let packages: Vec<PathBuf> = match &self.options.types {
            Some(names) => names
                .iter()
                .map(|name| types_root.join(types_package_name(name)))
                .collect(),
            None => {
                let Ok(entries) = fs::read_dir(&types_root) else {
                    return Vec::new();
                };
                let mut dirs: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| path.is_dir())
                    .collect();
                dirs.sort();
                dirs
            }
        };

        let mut files = Vec::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<PathBuf> = packages
            .iter()
            .filter_map(|dir| self.package_entry(dir))
            .map(|entry| normalize_path(&entry))
            .rev()
            .collect();

        while let Some(path) = pending.pop() {
            if !seen.insert(path.clone()) {
                continue;
            }
            if let (Ok(content), Some(dir)) = (fs::read_to_string(&path), path.parent()) {
                let referenced: Vec<PathBuf> = REFERENCE_PATH
                    .captures_iter(&content)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| normalize_path(&dir.join(m.as_str())))
                    .filter(|candidate| candidate.is_file())
                    .collect();
                pending.extend(referenced.into_iter().rev());
            }
            files.push(path);
        }

        debug!("{} automatic type files", files.len());
        files
    }

    /// Try `base` as a file, with extensions, then as a directory with `index.*`
    fn probe(&self, base: &Path) -> Option<PathBuf> {
        let base_str = base.to_string_lossy();

        if base.is_file() && crate::utils::file_utils::is_supported_file(base) {
            return Some(base.to_path_buf());
        }

        for ext in EXTENSION_CANDIDATES {
            let candidate = PathBuf::from(format!("{}{}", base_str, ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        for (js_suffix, ts_suffixes) in JS_TO_TS {
            if let Some(stem) = base_str.strip_suffix(js_suffix) {
                for ts_suffix in ts_suffixes {
                    let candidate = PathBuf::from(format!("{}{}", stem, ts_suffix));
                    if candidate.is_file() {
                        return Some(candidate);
                    }
                }
            }
        }

        if base.is_dir() {
            for ext in EXTENSION_CANDIDATES {
                let candidate = base.join(format!("index{}", ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        None
    }

    fn resolve_paths_mapping(&self, specifier: &str) -> Option<PathBuf> {
        let base = match &self.options.base_url {
            Some(base_url) => self.root.join(base_url),
            None => self.root.to_path_buf(),
        };

        for (pattern, targets) in &self.options.paths {
            let Some(captured) = match_path_pattern(pattern, specifier) else {
                continue;
            };
            for target in targets {
                let substituted = target.replacen('*', captured, 1);
                if let Some(path) = self.probe(&normalize_path(&base.join(substituted))) {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Walk up from the importing file looking for `node_modules/<pkg>`
    fn resolve_node_modules(&self, from_file: &Path, specifier: &str) -> ModuleResolution {
        let package = package_name(specifier);
        let mut dir = from_file.parent();

        while let Some(current) = dir {
            let modules = current.join("node_modules");
            let package_dir = modules.join(package);

            if package_dir.is_dir() {
                if specifier != package {
                    if let Some(path) = self.probe(&modules.join(specifier)) {
                        return ModuleResolution::File(path);
                    }
                } else if let Some(path) = self.package_entry(&package_dir) {
                    return ModuleResolution::File(path);
                }
            }

            let types_dir = modules.join("@types").join(types_package_name(package));
            if let Some(path) = self.package_entry(&types_dir) {
                return ModuleResolution::File(path);
            }

            if package_dir.is_dir() {
                return ModuleResolution::Package(package.to_string());
            }

            if current == self.root || !current.starts_with(self.root) {
                break;
            }
            dir = current.parent();
        }

        ModuleResolution::Unresolved
    }

    /// Typings entry of an installed package: `types`/`typings`, else `index.d.ts`
    fn package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        if !package_dir.is_dir() {
            return None;
        }

        let manifest = package_dir.join("package.json");
        if let Ok(content) = fs::read_to_string(&manifest) {
            if let Ok(value) = serde_json::from_str::<Value>(&content) {
                for field in ["types", "typings"] {
                    if let Some(entry) = value.get(field).and_then(Value::as_str) {
                        let entry_path = normalize_path(&package_dir.join(entry));
                        if entry_path.is_file() {
                            return Some(entry_path);
                        }
                        if let Some(path) = self.probe(&entry_path) {
                            return Some(path);
                        }
                    }
                }
            }
        }

        let index = package_dir.join("index.d.ts");
        index.is_file().then_some(index)
    }
}

pub fn is_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let head = specifier.split('/').next().unwrap_or(specifier);
    NODE_BUILTINS.contains(&head)
}

/// `@scope/pkg/sub` -> `@scope/pkg`, `pkg/sub` -> `pkg`
fn package_name(specifier: &str) -> &str {
    let mut slashes = specifier.match_indices('/');
    let cut = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match cut {
        Some((idx, _)) => &specifier[..idx],
        None => specifier,
    }
}

/// `@scope/pkg` -> `scope__pkg` (DefinitelyTyped naming)
fn types_package_name(package: &str) -> String {
    match package.strip_prefix('@') {
        Some(scoped) => scoped.replacen('/', "__", 1),
        None => package.to_string(),
    }
}

/// Match a `paths` key (at most one `*`) and return what the star captured
fn match_path_pattern<'s>(pattern: &str, specifier: &'s str) -> Option<&'s str> {
    match pattern.split_once('*') {
        None => (pattern == specifier).then_some(""),
        Some((prefix, suffix)) => {
            if specifier.len() >= prefix.len() + suffix.len()
                && specifier.starts_with(prefix)
                && specifier.ends_with(suffix)
            {
                Some(&specifier[prefix.len()..specifier.len() - suffix.len()])
            } else {
                None
            }
        }
    }
}

/// Every static module specifier in a file (`import`, `export ... from`,
/// `import x = require(...)`)
pub fn collect_specifiers(file: &SourceFile) -> Vec<ModuleSpecifier> {
    let mut specifiers = Vec::new();
    collect_from(file, file.root(), &mut specifiers);
    specifiers
}

fn collect_from(file: &SourceFile, node: Node, out: &mut Vec<ModuleSpecifier>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" | "export_statement" => {
                if let Some(spec) = specifier_node(child) {
                    out.push(ModuleSpecifier {
                        text: string_literal_value(file.node_text(&spec)),
                        start: spec.start_byte(),
                        end: spec.end_byte(),
                    });
                }
            }
            // `declare module "x" { ... }` and namespaces can hold their own imports
            "ambient_declaration" | "module" | "internal_module" | "statement_block" => {
                collect_from(file, child, out);
            }
            _ => {}
        }
    }
}

/// The string literal naming the module of an import/export statement
pub fn specifier_node(statement: Node) -> Option<Node> {
    if let Some(source) = statement.child_by_field_name("source") {
        return Some(source);
    }
    // import x = require("y")
    let mut cursor = statement.walk();
    let found = statement
        .named_children(&mut cursor)
        .find(|child| child.kind() == "import_require_clause")
        .and_then(|clause| clause.child_by_field_name("source"));
    found
}

/// Strip the quotes from a string literal's source text
pub fn string_literal_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 {
        let first = trimmed.as_bytes()[0];
        if (first == b'"' || first == b'\'' || first == b'`')
            && trimmed.as_bytes()[trimmed.len() - 1] == first
        {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn options() -> CompilerOptions {
        CompilerOptions::fallback()
    }

    #[test]
    fn test_relative_resolution_tries_extensions_and_index() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/models")).unwrap();
        fs::write(root.join("src/util.ts"), "export const a = 1;").unwrap();
        fs::write(root.join("src/models/index.ts"), "export class User {}").unwrap();
        let opts = options();
        let resolver = ModuleResolver::new(root, &opts);
        let from = root.join("src/main.ts");

        assert_eq!(
            resolver.resolve(&from, "./util"),
            ModuleResolution::File(root.join("src/util.ts"))
        );
        assert_eq!(
            resolver.resolve(&from, "./util.js"),
            ModuleResolution::File(root.join("src/util.ts"))
        );
        assert_eq!(
            resolver.resolve(&from, "./models"),
            ModuleResolution::File(root.join("src/models/index.ts"))
        );
        assert_eq!(resolver.resolve(&from, "./missing"), ModuleResolution::Unresolved);
    }

    #[test]
    fn test_builtins_and_packages() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/plain")).unwrap();
        fs::create_dir_all(root.join("node_modules/@types/typed")).unwrap();
        fs::write(root.join("node_modules/@types/typed/index.d.ts"), "export {};").unwrap();
        let opts = options();
        let resolver = ModuleResolver::new(root, &opts);
        let from = root.join("a.ts");

        assert_eq!(resolver.resolve(&from, "fs"), ModuleResolution::Builtin);
        assert_eq!(resolver.resolve(&from, "node:path"), ModuleResolution::Builtin);
        assert_eq!(
            resolver.resolve(&from, "plain"),
            ModuleResolution::Package("plain".to_string())
        );
        assert_eq!(
            resolver.resolve(&from, "typed"),
            ModuleResolution::File(root.join("node_modules/@types/typed/index.d.ts"))
        );
        assert_eq!(resolver.resolve(&from, "nope"), ModuleResolution::Unresolved);
    }

    #[test]
    fn test_automatic_type_files_follow_references() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/@types/node")).unwrap();
        fs::create_dir_all(root.join("node_modules/@types/jest")).unwrap();
        fs::write(
            root.join("node_modules/@types/node/index.d.ts"),
            "/// <reference path=\"globals.d.ts\" />\ndeclare module 'fs' {}\n",
        )
        .unwrap();
        fs::write(
            root.join("node_modules/@types/node/globals.d.ts"),
            "declare var process: any;\n",
        )
        .unwrap();
        fs::write(
            root.join("node_modules/@types/jest/index.d.ts"),
            "declare function describe(name: string, fn: () => void): void;\n",
        )
        .unwrap();
        let mut opts = options();
        let types = root.join("node_modules/@types");

        let all = ModuleResolver::new(root, &opts).automatic_type_files();
        assert_eq!(
            all,
            vec![
                types.join("jest/index.d.ts"),
                types.join("node/index.d.ts"),
                types.join("node/globals.d.ts"),
            ]
        );

        opts.types = Some(vec!["node".to_string()]);
        let only_node = ModuleResolver::new(root, &opts).automatic_type_files();
        assert_eq!(
            only_node,
            vec![types.join("node/index.d.ts"), types.join("node/globals.d.ts")]
        );
    }

    #[test]
    fn test_paths_mapping() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::write(root.join("src/lib/math.ts"), "export const pi = 3;").unwrap();
        let mut opts = options();
        opts.paths = BTreeMap::from([("@lib/*".to_string(), vec!["src/lib/*".to_string()])]);
        let resolver = ModuleResolver::new(root, &opts);

        assert_eq!(
            resolver.resolve(&root.join("a.ts"), "@lib/math"),
            ModuleResolution::File(root.join("src/lib/math.ts"))
        );
    }

    #[test]
    fn test_package_name_splitting() {
        assert_eq!(package_name("@scope/pkg/deep"), "@scope/pkg");
        assert_eq!(package_name("pkg/deep"), "pkg");
        assert_eq!(types_package_name("@scope/pkg"), "scope__pkg");
        assert_eq!(string_literal_value("'./x'"), "./x");
    }

    #[test]
    fn test_collect_specifiers() {
        let file = SourceFile::from_text(
            PathBuf::from("/p/a.ts"),
            "typescript",
            "import { a } from './a';\nexport * from \"./b\";\nimport fs = require('fs');\nconst x = 1;"
                .to_string(),
        )
        .unwrap();
        let specs: Vec<String> = collect_specifiers(&file).into_iter().map(|s| s.text).collect();
        assert_eq!(specs, vec!["./a", "./b", "fs"]);
    }
}
