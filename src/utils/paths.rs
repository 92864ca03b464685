// Path Conversion Utilities
//
// Results report project-relative, `/`-separated paths; internally files are keyed by
// absolute, lexically normalised native paths. These helpers convert between the two.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Convert an absolute path to a relative Unix-style path (with `/` separators)
///
/// Fails when `absolute` is not inside `project_root`.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use ts_refactor::utils::paths::to_relative_unix_style;
///
/// let rel = to_relative_unix_style(Path::new("/work/app/src/main.ts"), Path::new("/work/app"));
/// assert_eq!(rel.unwrap(), "src/main.ts");
/// ```
pub fn to_relative_unix_style(absolute: &Path, project_root: &Path) -> Result<String> {
    let path = normalize_path(absolute);
    let root = normalize_path(project_root);

    let relative = path.strip_prefix(&root).with_context(|| {
        format!(
            "File path '{}' is not within project root '{}'",
            path.display(),
            root.display()
        )
    })?;

    let path_str = relative.to_str().context("Path contains invalid UTF-8")?;

    // On Unix, MAIN_SEPARATOR is already '/', so this is a no-op
    let unix_style = if MAIN_SEPARATOR == '\\' {
        path_str.replace('\\', "/")
    } else {
        path_str.to_string()
    };

    Ok(unix_style)
}

/// Path for display in results: project-relative when possible, absolute otherwise
pub fn display_path(path: &Path, project_root: &Path) -> String {
    to_relative_unix_style(path, project_root)
        .unwrap_or_else(|_| path.to_string_lossy().replace('\\', "/"))
}

/// Resolve a caller-supplied path (absolute, or relative to the project root)
pub fn resolve_input_path(file_path: &str, project_root: &Path) -> PathBuf {
    let candidate = Path::new(file_path);
    if candidate.is_absolute() {
        normalize_path(candidate)
    } else {
        normalize_path(&project_root.join(candidate))
    }
}

/// Lexically resolve `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

/// Canonical project root: canonicalised when it exists, normalised otherwise
pub fn canonical_root(root: &Path) -> PathBuf {
    // Resolves symlinks such as macOS /var -> /private/var so prefixes line up
    root.canonicalize()
        .map(|p| strip_unc_prefix(&p))
        .unwrap_or_else(|_| normalize_path(root))
}

#[cfg(windows)]
fn strip_unc_prefix(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    match path_str.strip_prefix(r"\\?\") {
        Some(rest) => PathBuf::from(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(not(windows))]
fn strip_unc_prefix(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_unix_style() {
        let root = PathBuf::from("/home/dev/app");
        let file = PathBuf::from("/home/dev/app/src/models/user.ts");

        let result = to_relative_unix_style(&file, &root).unwrap();

        assert_eq!(result, "src/models/user.ts");
        assert!(!result.contains('\\'), "Should have no backslashes");
    }

    #[test]
    fn test_file_outside_project_rejected() {
        let root = PathBuf::from("/home/dev/app");
        let result = to_relative_unix_style(&PathBuf::from("/etc/passwd"), &root);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not within project root"));
    }

    #[test]
    fn test_display_path_falls_back_to_absolute() {
        let root = PathBuf::from("/home/dev/app");
        assert_eq!(
            display_path(&PathBuf::from("/opt/lib/x.d.ts"), &root),
            "/opt/lib/x.d.ts"
        );
        assert_eq!(
            display_path(&PathBuf::from("/home/dev/app/index.ts"), &root),
            "index.ts"
        );
    }

    #[test]
    fn test_normalize_resolves_dot_segments() {
        assert_eq!(
            normalize_path(&PathBuf::from("/a/b/./c/../d.ts")),
            PathBuf::from("/a/b/d.ts")
        );
        assert_eq!(
            resolve_input_path("src/../lib/x.ts", &PathBuf::from("/p")),
            PathBuf::from("/p/lib/x.ts")
        );
        assert_eq!(
            resolve_input_path("/abs/y.ts", &PathBuf::from("/p")),
            PathBuf::from("/abs/y.ts")
        );
    }

    #[test]
    fn test_unicode_and_spaces() {
        let root = PathBuf::from("/home/dev/my プロジェクト");
        let file = PathBuf::from("/home/dev/my プロジェクト/src/日本語.ts");
        assert_eq!(to_relative_unix_style(&file, &root).unwrap(), "src/日本語.ts");
    }
}
