//! Include/exclude pattern handling for project file discovery
//!
//! tsconfig `include`/`exclude` entries are either directory names (`src`, `node_modules`)
//! or globs (`src/**/*`, `**/*.spec.ts`). Both are compiled to `glob::Pattern`s and
//! matched against project-relative, `/`-separated paths.

use glob::{MatchOptions, Pattern};
use std::path::{Component, Path};
use tracing::{debug, warn};

/// Directories excluded when the configuration does not name its own `exclude` list
pub const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// Directory that marks externally-vendored dependency code
pub const DEPENDENCY_DIR: &str = "node_modules";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled list of tsconfig-style path patterns
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile patterns; invalid globs are logged and skipped
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut patterns = Vec::new();
        for entry in raw {
            for expanded in expand_pattern(entry.as_ref()) {
                match Pattern::new(&expanded) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(e) => warn!("Skipping invalid path pattern '{}': {}", expanded, e),
                }
            }
        }
        debug!("Compiled {} path patterns", patterns.len());
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a project-relative, `/`-separated path against every pattern
    pub fn matches(&self, relative_unix: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(relative_unix, MATCH_OPTIONS))
    }
}

/// Expand one tsconfig entry into glob patterns
///
/// A wildcard-free entry names a file or a directory; it matches itself and, as a
/// directory, everything below it.
fn expand_pattern(entry: &str) -> Vec<String> {
    let trimmed = entry
        .trim()
        .trim_start_matches("./")
        .trim_end_matches('/')
        .replace('\\', "/");

    if trimmed.is_empty() || trimmed == "." {
        return vec!["**/*".to_string()];
    }

    if trimmed.contains('*') || trimmed.contains('?') {
        return vec![trimmed];
    }

    vec![trimmed.clone(), format!("{}/**/*", trimmed)]
}

/// Whether a path lies inside a dependency (vendor) directory
///
/// Matches whole path components only, so `my_node_modules/` is not a dependency.
pub fn is_dependency_path(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name == DEPENDENCY_DIR,
        _ => false,
    })
}
