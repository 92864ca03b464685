//! Project model - root path, resolved configuration and the lazily-populated file set
//!
//! One `Project` is created per invocation and passed explicitly to every operation.
//! Root files are discovered eagerly (paths only); content is read and parsed the first
//! time a file is needed, and files are never evicted within a run.

pub mod config;
pub mod edits;
pub mod line_index;
pub mod modules;
pub mod source_file;

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{RefactorError, Result};
use crate::utils::ignore::{is_dependency_path, PatternSet};
use crate::utils::{file_utils, paths};
pub use config::{CompilerOptions, ConfigSource, ProjectConfig};
pub use modules::{ModuleResolution, ModuleResolver};
pub use source_file::SourceFile;

/// Index of a loaded file within its project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
    root_files: Vec<PathBuf>,
    /// `@types` declarations tsc includes automatically
    type_files: Vec<PathBuf>,
    files: Vec<SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
}

impl Project {
    /// Build the project model for `root`
    ///
    /// Never fails: configuration problems degrade to defaults and unreadable
    /// directories are skipped.
    pub fn load(root: &Path) -> Self {
        let root = paths::canonical_root(root);
        let config = ProjectConfig::load(&root);
        let root_files = discover_root_files(&root, &config);
        let type_files =
            ModuleResolver::new(&root, &config.compiler_options).automatic_type_files();
        info!(
            "Project {}: {} root files, {} type files (config: {})",
            root.display(),
            root_files.len(),
            type_files.len(),
            config
                .config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".to_string())
        );

        Self {
            root,
            config,
            root_files,
            type_files,
            files: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.config.compiler_options
    }

    /// Paths selected by the configuration (loaded or not)
    pub fn root_files(&self) -> &[PathBuf] {
        &self.root_files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.0]
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(&paths::normalize_path(path)).copied()
    }

    /// Loaded files, in load order
    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, file)| (FileId(idx), file))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Loaded file ids sorted by display path
    pub fn sorted_file_ids(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = (0..self.files.len()).map(FileId).collect();
        ids.sort_by_cached_key(|id| self.display_path(*id));
        ids
    }

    /// Project-relative `/`-separated path for results
    pub fn display_path(&self, id: FileId) -> String {
        paths::display_path(self.files[id.0].path(), &self.root)
    }

    /// Whether a file lives in a dependency (vendor) directory
    pub fn is_dependency(&self, id: FileId) -> bool {
        is_dependency_path(self.files[id.0].path())
    }

    pub fn module_resolver(&self) -> ModuleResolver<'_> {
        ModuleResolver::new(&self.root, &self.config.compiler_options)
    }

    /// Return the id of `path`, reading and parsing it on first use
    pub fn get_or_load(&mut self, path: &Path) -> Result<FileId> {
        let normalized = paths::normalize_path(path);
        if let Some(id) = self.by_path.get(&normalized) {
            return Ok(*id);
        }

        let file = SourceFile::load(&normalized)?;
        let id = FileId(self.files.len());
        debug!("Loaded file #{}: {}", id.0, normalized.display());
        self.files.push(file);
        self.by_path.insert(normalized, id);
        Ok(id)
    }

    /// Resolve a caller-supplied `--file` argument and load it
    pub fn open_file(&mut self, file_arg: &str) -> Result<FileId> {
        let path = paths::resolve_input_path(file_arg, &self.root);
        if !path.is_file() || !file_utils::is_supported_file(&path) {
            return Err(RefactorError::FileNotFound(file_arg.to_string()));
        }
        self.get_or_load(&path)
    }

    /// Ambient declaration files from `node_modules/@types`
    pub fn type_files(&self) -> &[PathBuf] {
        &self.type_files
    }

    /// Load every configured root file and the automatic type files; unreadable
    /// ones are logged and skipped
    pub fn load_root_files(&mut self) {
        let paths: Vec<PathBuf> = self
            .root_files
            .iter()
            .chain(self.type_files.iter())
            .cloned()
            .collect();
        for path in paths {
            if let Err(e) = self.get_or_load(&path) {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
            }
        }
    }

    /// Load root files plus every file reachable through imports of project files
    pub fn load_all(&mut self) {
        self.load_root_files();

        let mut queue: VecDeque<FileId> = (0..self.files.len()).map(FileId).collect();
        let mut seen: HashSet<FileId> = queue.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            // Imports inside dependency files are not followed
            if self.is_dependency(id) {
                continue;
            }

            let from = self.files[id.0].path().to_path_buf();
            let targets: Vec<PathBuf> = {
                let resolver = self.module_resolver();
                modules::collect_specifiers(&self.files[id.0])
                    .into_iter()
                    .filter_map(|spec| match resolver.resolve(&from, &spec.text) {
                        ModuleResolution::File(path) => Some(path),
                        _ => None,
                    })
                    .collect()
            };

            for target in targets {
                match self.get_or_load(&target) {
                    Ok(target_id) => {
                        if seen.insert(target_id) {
                            queue.push_back(target_id);
                        }
                    }
                    Err(e) => warn!("Failed to load imported file {}: {}", target.display(), e),
                }
            }
        }

        debug!("Project fully loaded: {} files", self.files.len());
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("config", &self.config.source)
            .field("root_files", &self.root_files.len())
            .field("loaded", &self.files.len())
            .finish()
    }
}

/// Select root files: `files` entries plus `include` matches minus `exclude` matches
fn discover_root_files(root: &Path, config: &ProjectConfig) -> Vec<PathBuf> {
    let include = PatternSet::new(&config.include);
    let exclude = PatternSet::new(&config.exclude);
    let allow_js = config.compiler_options.allow_js;

    let mut selected: Vec<PathBuf> = Vec::new();
    let mut seen = HashSet::new();

    for entry in &config.files {
        let path = paths::resolve_input_path(entry, root);
        if path.is_file() && seen.insert(path.clone()) {
            selected.push(path);
        } else if !path.is_file() {
            warn!("Configured file not found: {}", entry);
        }
    }

    if include.is_empty() {
        return selected;
    }

    let relative_of = |path: &Path| -> Option<String> {
        paths::to_relative_unix_style(path, root).ok()
    };

    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let hidden = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false);
        if hidden {
            return false;
        }
        match relative_of(entry.path()) {
            Some(relative) => !exclude.matches(&relative),
            None => false,
        }
    });

    let mut discovered = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path during discovery: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !file_utils::is_supported_file(path) {
            continue;
        }
        if !allow_js && file_utils::is_javascript_file(path) {
            continue;
        }
        let Some(relative) = relative_of(path) else {
            continue;
        };
        if include.matches(&relative) && !exclude.matches(&relative) {
            discovered.push(paths::normalize_path(path));
        }
    }

    discovered.sort();
    for path in discovered {
        if seen.insert(path.clone()) {
            selected.push(path);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_files;
    use tempfile::TempDir;

    #[test]
    fn test_discovers_sources_and_skips_dependencies() {
        let dir = TempDir::new().unwrap();
        write_files(
            dir.path(),
            &[
                ("src/a.ts", "export const a = 1;"),
                ("src/b.js", "module.exports = {};"),
                ("node_modules/lib/index.d.ts", "export {};"),
                ("README.md", "# docs"),
            ],
        );

        let project = Project::load(dir.path());
        let names: Vec<String> = project
            .root_files()
            .iter()
            .map(|p| paths::display_path(p, project.root()))
            .collect();

        assert_eq!(names, vec!["src/a.ts", "src/b.js"]);
    }

    #[test]
    fn test_tsconfig_include_and_allow_js() {
        let dir = TempDir::new().unwrap();
        write_files(
            dir.path(),
            &[
                ("tsconfig.json", r#"{ "include": ["src"] }"#),
                ("src/a.ts", "export const a = 1;"),
                ("src/b.js", "var b = 2;"),
                ("scripts/c.ts", "const c = 3;"),
            ],
        );

        let project = Project::load(dir.path());
        let names: Vec<String> = project
            .root_files()
            .iter()
            .map(|p| paths::display_path(p, project.root()))
            .collect();

        assert_eq!(names, vec!["src/a.ts"], "allowJs defaults off with a tsconfig");
    }

    #[test]
    fn test_lazy_loading_follows_imports() {
        let dir = TempDir::new().unwrap();
        write_files(
            dir.path(),
            &[
                ("tsconfig.json", r#"{ "files": ["src/main.ts"] }"#),
                ("src/main.ts", "import { helper } from './lib/helper';\nhelper();"),
                ("src/lib/helper.ts", "export function helper() {}"),
            ],
        );

        let mut project = Project::load(dir.path());
        assert_eq!(project.file_count(), 0, "nothing is read before first use");

        project.load_all();
        assert_eq!(project.file_count(), 2);
        let helper = project.root().join("src/lib/helper.ts");
        assert!(project.file_id(&helper).is_some());
    }

    #[test]
    fn test_types_packages_load_as_dependencies() {
        let dir = TempDir::new().unwrap();
        write_files(
            dir.path(),
            &[
                ("src/a.test.ts", "describe('a', () => {});"),
                (
                    "node_modules/@types/jest/index.d.ts",
                    "declare function describe(name: string, fn: () => void): void;",
                ),
            ],
        );

        let mut project = Project::load(dir.path());
        assert_eq!(project.root_files().len(), 1);
        assert_eq!(project.type_files().len(), 1);

        project.load_root_files();
        assert_eq!(project.file_count(), 2);
        let jest = project
            .file_id(&project.root().join("node_modules/@types/jest/index.d.ts"))
            .unwrap();
        assert!(project.is_dependency(jest));
    }

    #[test]
    fn test_open_file_rejects_missing_paths() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), &[("a.ts", "let a = 1;")]);
        let mut project = Project::load(dir.path());

        assert!(project.open_file("a.ts").is_ok());
        let err = project.open_file("missing.ts").unwrap_err();
        assert_eq!(err.error_type(), "FileNotFound");
    }
}
