//! Edit batches and the single commit path for preview/apply
//!
//! Operations never mutate files directly. They collect `TextEdit`s into an
//! `EditBatch`, and `commit` applies the whole batch in one step: all edits of a file
//! are spliced against the same original text with a running length delta, so an
//! insertion before a replacement never leaves the replacement on stale offsets.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{FileId, Project};
use crate::error::{RefactorError, Result};
use crate::utils::file_utils;

/// Replace `start..end` (bytes of the file's current text) with `new_text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            new_text: new_text.into(),
        }
    }

    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self::replace(at, at, new_text)
    }
}

/// All edits produced by one operation, grouped per file
#[derive(Debug, Default)]
pub struct EditBatch {
    files: BTreeMap<FileId, Vec<TextEdit>>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: FileId, edit: TextEdit) {
        self.files.entry(file).or_default().push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }

    pub fn edit_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

/// Whether a commit stages the result or writes it to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Preview,
    Apply,
}

impl CommitMode {
    pub fn from_preview_flag(preview: bool) -> Self {
        if preview {
            CommitMode::Preview
        } else {
            CommitMode::Apply
        }
    }

    pub fn is_preview(self) -> bool {
        self == CommitMode::Preview
    }
}

/// Staged content of one changed file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedChange {
    pub file: String,
    pub old_content: String,
    pub new_content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    /// Display paths of changed files, sorted
    pub changed_files: Vec<String>,
    /// Per-file diff; only filled in preview mode
    pub changes: Vec<StagedChange>,
}

/// Splice `edits` into `text`
///
/// Edits are ordered by start (zero-width insertions before a replacement at the
/// same offset) and must not overlap.
pub fn apply_edits(text: &str, edits: &[TextEdit], file_label: &str) -> Result<String> {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| (edit.start, edit.end));

    let mut previous_end = 0usize;
    for (idx, edit) in ordered.iter().enumerate() {
        if edit.start > edit.end
            || edit.end > text.len()
            || !text.is_char_boundary(edit.start)
            || !text.is_char_boundary(edit.end)
        {
            return Err(RefactorError::InvalidRange {
                file: file_label.to_string(),
                start: edit.start,
                end: edit.end,
                len: text.len(),
            });
        }
        if idx > 0 && edit.start < previous_end {
            return Err(RefactorError::EditConflict {
                file: file_label.to_string(),
                first: previous_end,
                second: edit.start,
            });
        }
        previous_end = previous_end.max(edit.end);
    }

    let inserted: usize = ordered.iter().map(|e| e.new_text.len()).sum();
    let mut result = String::with_capacity(text.len() + inserted);
    let mut cursor = 0;
    for edit in ordered {
        result.push_str(&text[cursor..edit.start]);
        result.push_str(&edit.new_text);
        cursor = edit.end;
    }
    result.push_str(&text[cursor..]);
    Ok(result)
}

/// Commit a batch: update in-memory files and, in `Apply` mode, flush them to disk
///
/// Nothing is written unless every file's new text could be computed, every file is
/// unchanged on disk since load, and every temporary file was written.
pub fn commit(project: &mut Project, batch: EditBatch, mode: CommitMode) -> Result<CommitOutcome> {
    let mut staged: Vec<(FileId, String)> = Vec::new();
    for (id, edits) in &batch.files {
        if edits.is_empty() {
            continue;
        }
        let label = project.display_path(*id);
        let new_text = apply_edits(project.file(*id).text(), edits, &label)?;
        if new_text != project.file(*id).text() {
            staged.push((*id, new_text));
        }
    }

    if mode == CommitMode::Apply {
        flush(project, &staged)?;
    }

    let mut outcome = CommitOutcome::default();
    for (id, new_text) in staged {
        let display = project.display_path(id);
        let file = project.file_mut(id);
        file.set_text(new_text)?;

        match mode {
            CommitMode::Preview => outcome.changes.push(StagedChange {
                file: display.clone(),
                old_content: file.original_text().to_string(),
                new_content: file.text().to_string(),
            }),
            CommitMode::Apply => file.mark_saved(),
        }
        outcome.changed_files.push(display);
    }

    outcome.changed_files.sort();
    outcome.changes.sort_by(|a, b| a.file.cmp(&b.file));
    info!(
        "Committed {} edits to {} files ({:?})",
        batch.edit_count(),
        outcome.changed_files.len(),
        mode
    );
    Ok(outcome)
}

/// Write staged texts atomically: stale check, temp files, then persist
fn flush(project: &Project, staged: &[(FileId, String)]) -> Result<()> {
    for (id, _) in staged {
        let file = project.file(*id);
        let on_disk = fs::read_to_string(file.path())?;
        if file_utils::hash_content(&on_disk) != file.disk_hash() {
            return Err(RefactorError::StaleFile(project.display_path(*id)));
        }
    }

    let mut temporaries = Vec::with_capacity(staged.len());
    for (id, new_text) in staged {
        let path = project.file(*id).path();
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("File has no parent directory: {}", path.display()))?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(new_text.as_bytes())?;
        temp.flush()?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(temp.path(), metadata.permissions())?;
        }
        temporaries.push((path.to_path_buf(), temp));
    }

    for (path, temp) in temporaries {
        temp.persist(&path).map_err(|e| RefactorError::Io(e.error))?;
        debug!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hash_tree, write_files};
    use tempfile::TempDir;

    #[test]
    fn test_insert_then_replace_uses_original_offsets() {
        let text = "let x = a + b;";
        let edits = vec![
            TextEdit::replace(8, 13, "sum"),
            TextEdit::insert(0, "const sum = a + b;\n"),
        ];
        let result = apply_edits(text, &edits, "a.ts").unwrap();
        assert_eq!(result, "const sum = a + b;\nlet x = sum;");
    }

    #[test]
    fn test_insertion_at_replacement_start_goes_first() {
        let result = apply_edits(
            "abc",
            &[TextEdit::replace(0, 3, "x"), TextEdit::insert(0, ">")],
            "a.ts",
        )
        .unwrap();
        assert_eq!(result, ">x");
    }

    #[test]
    fn test_overlapping_edits_conflict() {
        let err = apply_edits(
            "abcdef",
            &[TextEdit::replace(0, 4, "x"), TextEdit::replace(2, 5, "y")],
            "a.ts",
        )
        .unwrap_err();
        assert_eq!(err.error_type(), "EditConflict");
    }

    #[test]
    fn test_preview_keeps_disk_untouched() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), &[("a.ts", "let count = 0;")]);
        let before = hash_tree(dir.path());

        let mut project = Project::load(dir.path());
        let id = project.open_file("a.ts").unwrap();
        let mut batch = EditBatch::new();
        batch.push(id, TextEdit::replace(4, 9, "total"));
        let outcome = commit(&mut project, batch, CommitMode::Preview).unwrap();

        assert_eq!(outcome.changed_files, vec!["a.ts"]);
        assert_eq!(outcome.changes[0].old_content, "let count = 0;");
        assert_eq!(outcome.changes[0].new_content, "let total = 0;");
        assert_eq!(hash_tree(dir.path()), before);
        assert!(project.file(id).is_dirty());
    }

    #[test]
    fn test_apply_writes_and_detects_stale_files() {
        let dir = TempDir::new().unwrap();
        write_files(dir.path(), &[("a.ts", "let count = 0;"), ("b.ts", "let b = 1;")]);

        let mut project = Project::load(dir.path());
        let a = project.open_file("a.ts").unwrap();
        let b = project.open_file("b.ts").unwrap();

        let mut batch = EditBatch::new();
        batch.push(a, TextEdit::replace(4, 9, "total"));
        commit(&mut project, batch, CommitMode::Apply).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.ts")).unwrap(),
            "let total = 0;"
        );
        assert!(!project.file(a).is_dirty());

        fs::write(dir.path().join("b.ts"), "let b = 2;").unwrap();
        let mut batch = EditBatch::new();
        batch.push(a, TextEdit::replace(4, 9, "grand"));
        batch.push(b, TextEdit::replace(4, 5, "c"));
        let err = commit(&mut project, batch, CommitMode::Apply).unwrap_err();

        assert_eq!(err.error_type(), "StaleFile");
        assert_eq!(
            fs::read_to_string(dir.path().join("a.ts")).unwrap(),
            "let total = 0;",
            "no file is written when any file is stale"
        );
    }
}
