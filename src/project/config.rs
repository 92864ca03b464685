//! Project configuration - tsconfig.json / jsconfig.json discovery and defaults
//!
//! Loading never fails: a missing or unreadable configuration degrades to the fixed
//! default options, and the reason is kept so `check` can surface it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::utils::ignore::DEFAULT_EXCLUDES;

/// Configuration file names probed at the project root, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// Resolved compiler/module options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    pub target: String,
    pub module: String,
    pub module_resolution: String,
    pub strict: bool,
    pub es_module_interop: bool,
    pub skip_lib_check: bool,
    pub allow_js: bool,
    pub check_js: bool,
    /// `None` reports unreachable code as a warning, `Some(false)` as an error,
    /// `Some(true)` suppresses it
    pub allow_unreachable_code: Option<bool>,
    pub base_url: Option<String>,
    pub paths: BTreeMap<String, Vec<String>>,
    pub out_dir: Option<String>,
    /// `@types` packages included without an import; `None` includes all of them
    pub types: Option<Vec<String>>,
}

impl CompilerOptions {
    /// The fixed fallback used when no configuration file can be used
    pub fn fallback() -> Self {
        Self {
            target: "ES2022".to_string(),
            module: "ESNext".to_string(),
            module_resolution: "node".to_string(),
            strict: true,
            es_module_interop: true,
            skip_lib_check: true,
            allow_js: true,
            check_js: false,
            allow_unreachable_code: None,
            base_url: None,
            paths: BTreeMap::new(),
            out_dir: None,
            types: None,
        }
    }

    /// Compiler defaults for options a configuration file leaves unset
    fn unset() -> Self {
        Self {
            target: "ES5".to_string(),
            module: "CommonJS".to_string(),
            module_resolution: "node".to_string(),
            strict: false,
            es_module_interop: false,
            skip_lib_check: false,
            allow_js: false,
            check_js: false,
            allow_unreachable_code: None,
            base_url: None,
            paths: BTreeMap::new(),
            out_dir: None,
            types: None,
        }
    }

    fn apply(&mut self, raw: &RawCompilerOptions) {
        if let Some(v) = &raw.target {
            self.target = v.clone();
        }
        if let Some(v) = &raw.module {
            self.module = v.clone();
        }
        if let Some(v) = &raw.module_resolution {
            self.module_resolution = v.clone();
        }
        if let Some(v) = raw.strict {
            self.strict = v;
        }
        if let Some(v) = raw.es_module_interop {
            self.es_module_interop = v;
        }
        if let Some(v) = raw.skip_lib_check {
            self.skip_lib_check = v;
        }
        if let Some(v) = raw.allow_js {
            self.allow_js = v;
        }
        if let Some(v) = raw.check_js {
            self.check_js = v;
        }
        if raw.allow_unreachable_code.is_some() {
            self.allow_unreachable_code = raw.allow_unreachable_code;
        }
        if let Some(v) = &raw.base_url {
            self.base_url = Some(v.clone());
        }
        if let Some(v) = &raw.paths {
            self.paths = v.clone();
        }
        if let Some(v) = &raw.out_dir {
            self.out_dir = Some(v.clone());
        }
        if let Some(v) = &raw.types {
            self.types = Some(v.clone());
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No configuration file exists
    Default,
    /// A configuration file exists but could not be used
    Fallback { path: PathBuf, reason: String },
}

/// Effective project configuration
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub source: ConfigSource,
    pub compiler_options: CompilerOptions,
    pub files: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ProjectConfig {
    pub fn fallback(source: ConfigSource) -> Self {
        Self {
            source,
            compiler_options: CompilerOptions::fallback(),
            files: Vec::new(),
            include: vec!["**/*".to_string()],
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Discover and load the configuration for `root`
    pub fn load(root: &Path) -> Self {
        let Some(path) = CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|candidate| candidate.is_file())
        else {
            debug!("No project configuration in {}, using defaults", root.display());
            return Self::fallback(ConfigSource::Default);
        };

        match parse_config_file(&path, 0) {
            Ok(raw) => {
                info!("Loaded project configuration from {}", path.display());
                Self::from_raw(path, raw)
            }
            Err(reason) => {
                warn!(
                    "Failed to parse {}: {} - falling back to default configuration",
                    path.display(),
                    reason
                );
                Self::fallback(ConfigSource::Fallback { path, reason })
            }
        }
    }

    fn from_raw(path: PathBuf, raw: RawTsConfig) -> Self {
        let mut compiler_options = CompilerOptions::unset();
        if let Some(options) = &raw.compiler_options {
            compiler_options.apply(options);
        }

        let mut exclude = raw
            .exclude
            .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect());
        if let Some(out_dir) = &compiler_options.out_dir {
            exclude.push(out_dir.clone());
        }

        let files = raw.files.unwrap_or_default();
        // An explicit `files` list without `include` means "only these files"
        let include = match raw.include {
            Some(include) => include,
            None if !files.is_empty() => Vec::new(),
            None => vec!["**/*".to_string()],
        };

        Self {
            source: ConfigSource::File(path),
            compiler_options,
            files,
            include,
            exclude,
        }
    }

    /// Human-readable reason when the configuration file was rejected
    pub fn load_error(&self) -> Option<(&Path, &str)> {
        match &self.source {
            ConfigSource::Fallback { path, reason } => Some((path.as_path(), reason.as_str())),
            _ => None,
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        match &self.source {
            ConfigSource::File(path) => Some(path),
            ConfigSource::Fallback { path, .. } => Some(path),
            ConfigSource::Default => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    extends: Option<String>,
    compiler_options: Option<RawCompilerOptions>,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    target: Option<String>,
    module: Option<String>,
    module_resolution: Option<String>,
    strict: Option<bool>,
    es_module_interop: Option<bool>,
    skip_lib_check: Option<bool>,
    allow_js: Option<bool>,
    check_js: Option<bool>,
    allow_unreachable_code: Option<bool>,
    base_url: Option<String>,
    paths: Option<BTreeMap<String, Vec<String>>>,
    out_dir: Option<String>,
    types: Option<Vec<String>>,
}

impl RawCompilerOptions {
    /// Overlay `child` on top of `self` (child wins)
    fn merged_with(mut self, child: RawCompilerOptions) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if child.$field.is_some() { self.$field = child.$field; })*
            };
        }
        overlay!(
            target,
            module,
            module_resolution,
            strict,
            es_module_interop,
            skip_lib_check,
            allow_js,
            check_js,
            allow_unreachable_code,
            base_url,
            paths,
            out_dir,
            types
        );
        self
    }
}

/// Parse a configuration file, following one level of relative `extends`
fn parse_config_file(path: &Path, depth: usize) -> Result<RawTsConfig, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let stripped = strip_json_comments(&content);
    let mut raw: RawTsConfig = serde_json::from_str(&stripped).map_err(|e| e.to_string())?;

    let Some(extends) = raw.extends.clone() else {
        return Ok(raw);
    };
    if depth > 0 || !extends.starts_with('.') {
        debug!("Not following 'extends: {}' from {}", extends, path.display());
        return Ok(raw);
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut base_path = base_dir.join(&extends);
    if base_path.extension().is_none() {
        base_path.set_extension("json");
    }
    let base = parse_config_file(&base_path, depth + 1)
        .map_err(|e| format!("in extended config '{}': {}", extends, e))?;

    raw.compiler_options = match (base.compiler_options, raw.compiler_options.take()) {
        (Some(base), Some(child)) => Some(base.merged_with(child)),
        (base, child) => child.or(base),
    };
    raw.files = raw.files.or(base.files);
    raw.include = raw.include.or(base.include);
    raw.exclude = raw.exclude.or(base.exclude);
    Ok(raw)
}

/// Remove `//` and `/* */` comments and trailing commas from JSON-with-comments text
pub fn strip_json_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                // Trailing comma: drop it, keep whatever follows
                if !matches!(chars.get(j), Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load(dir.path());

        assert_eq!(config.source, ConfigSource::Default);
        let opts = &config.compiler_options;
        assert!(opts.strict && opts.es_module_interop && opts.skip_lib_check && opts.allow_js);
        assert_eq!(opts.module_resolution, "node");
        assert!(config.exclude.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_parses_tsconfig_with_comments_and_trailing_commas() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{
  // compiler settings
  "compilerOptions": {
    "target": "ES2020", /* modern */
    "strict": false,
    "outDir": "dist",
    "paths": { "@app/*": ["src/*"], },
  },
  "include": ["src"],
}"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path());
        assert!(matches!(config.source, ConfigSource::File(_)));
        assert_eq!(config.compiler_options.target, "ES2020");
        assert!(!config.compiler_options.strict);
        assert!(!config.compiler_options.allow_js, "unset options use compiler defaults");
        assert_eq!(config.include, vec!["src".to_string()]);
        assert!(config.exclude.contains(&"dist".to_string()));
        assert_eq!(config.compiler_options.paths["@app/*"], vec!["src/*".to_string()]);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{ not json").unwrap();

        let config = ProjectConfig::load(dir.path());
        assert!(config.load_error().is_some());
        assert_eq!(config.compiler_options, CompilerOptions::fallback());
    }

    #[test]
    fn test_extends_merges_compiler_options() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.json"),
            r#"{ "compilerOptions": { "strict": true, "allowJs": true }, "include": ["lib"] }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{ "extends": "./base", "compilerOptions": { "allowJs": false } }"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path());
        assert!(config.compiler_options.strict);
        assert!(!config.compiler_options.allow_js);
        assert_eq!(config.include, vec!["lib".to_string()]);
    }

    #[test]
    fn test_strip_keeps_comment_markers_inside_strings() {
        let stripped = strip_json_comments(r#"{"a": "http://x/*y*/", "b": [1,2,],}"#);
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], "http://x/*y*/");
        assert_eq!(value["b"].as_array().unwrap().len(), 2);
    }
}
