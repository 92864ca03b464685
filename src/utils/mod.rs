// Utilities Module
//
// Common utilities and helper functions used throughout the engine.

use anyhow::Result;
use std::path::Path;

/// File utilities
pub mod file_utils {
    use super::*;
    use std::fs;

    /// Check if a file has an extension the engine analyses
    pub fn is_supported_file(path: &Path) -> bool {
        crate::language::detect_language(path).is_some()
    }

    /// Whether a supported file is plain JavaScript (only loaded with `allowJs`)
    pub fn is_javascript_file(path: &Path) -> bool {
        crate::language::detect_language(path)
            .map(crate::language::is_javascript)
            .unwrap_or(false)
    }

    /// Read file content safely
    pub fn read_file_content(path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    /// blake3 hex digest of file content
    pub fn hash_content(content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }
}

/// Path conversion utilities (absolute ↔ relative Unix-style)
pub mod paths;

/// Include/exclude pattern utilities (tsconfig `include`/`exclude`)
pub mod ignore;

/// Identifier validation for new names
pub mod identifiers {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static IDENTIFIER_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex"));

    /// Reserved words that can never be used as binding names
    pub const RESERVED_WORDS: &[&str] = &[
        "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
        "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
        "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this",
        "throw", "true", "try", "typeof", "var", "void", "while", "with",
    ];

    /// Check that `name` can be used as a declaration name
    pub fn is_valid_identifier(name: &str) -> bool {
        IDENTIFIER_RE.is_match(name) && !RESERVED_WORDS.contains(&name)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_identifier_validation() {
            assert!(is_valid_identifier("total"));
            assert!(is_valid_identifier("_private$1"));
            assert!(!is_valid_identifier("1abc"));
            assert!(!is_valid_identifier("my-name"));
            assert!(!is_valid_identifier(""));
            assert!(!is_valid_identifier("class"));
        }
    }
}
