//! Error taxonomy for engine operations
//!
//! Every variant name doubles as the `errorType` string reported to callers, so the
//! names are part of the external contract.

use thiserror::Error;

/// Failures an operation can report
#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("No symbol found at offset {offset} in {file}")]
    SymbolNotFound { file: String, offset: usize },

    #[error("{0}")]
    NotRenameable(String),

    #[error("No code found at offset {offset} in {file}")]
    CodeNotFound { file: String, offset: usize },

    #[error("Invalid range {start}..{end} in {file} (file length {len})")]
    InvalidRange {
        file: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("'{0}' is not a valid identifier")]
    InvalidName(String),

    #[error("Type '{0}' not found")]
    TypeNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File changed on disk since it was loaded: {0}")]
    StaleFile(String),

    #[error("Overlapping edits in {file} at {first}..{second}")]
    EditConflict {
        file: String,
        first: usize,
        second: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Operation panicked: {0}")]
    Panic(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RefactorError {
    /// The `errorType` tag for this failure
    pub fn error_type(&self) -> &'static str {
        match self {
            RefactorError::SymbolNotFound { .. } => "SymbolNotFound",
            RefactorError::NotRenameable(_) => "NotRenameable",
            RefactorError::CodeNotFound { .. } => "CodeNotFound",
            RefactorError::InvalidRange { .. } => "InvalidRange",
            RefactorError::InvalidName(_) => "InvalidName",
            RefactorError::TypeNotFound(_) => "TypeNotFound",
            RefactorError::FileNotFound(_) => "FileNotFound",
            RefactorError::StaleFile(_) => "StaleFile",
            RefactorError::EditConflict { .. } => "EditConflict",
            RefactorError::Io(_) => "Io",
            RefactorError::Panic(_) => "Panic",
            RefactorError::Other(_) => "Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, RefactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_matches_variant_name() {
        let err = RefactorError::SymbolNotFound {
            file: "a.ts".to_string(),
            offset: 4,
        };
        assert_eq!(err.error_type(), "SymbolNotFound");
        assert!(err.to_string().contains("offset 4"));

        let err: RefactorError = anyhow::anyhow!("boom").into();
        assert_eq!(err.error_type(), "Error");
        assert_eq!(err.to_string(), "boom");
    }
}
