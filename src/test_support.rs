// Fixture helpers shared by unit tests

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::project::Project;

/// Write `(relative path, content)` pairs under `root`, creating directories
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }
}

/// blake3 hash of every file under `root`, keyed by relative path
pub fn hash_tree(root: &Path) -> BTreeMap<String, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = fs::read(entry.path()).unwrap();
            (relative, blake3::hash(&bytes).to_hex().to_string())
        })
        .collect()
}

/// A project in a fresh temp dir; keep the `TempDir` alive for the test's duration
pub fn project_with(files: &[(&str, &str)]) -> (TempDir, Project) {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), files);
    let project = Project::load(dir.path());
    (dir, project)
}
