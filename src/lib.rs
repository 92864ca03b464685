// ts-refactor - tree-sitter powered refactoring engine for TypeScript
//
// A project is loaded once per invocation, bound into a semantic model, and one
// operation (rename, extract, find-*, inspect, check) runs against it.
// Architecture: project loader -> binder -> operations -> JSON command boundary.

pub mod error;
pub mod language;
pub mod project;
pub mod resolver;
pub mod semantic;
pub mod utils;

// Refactorings and queries
pub mod operations;

// Command boundary used by the binary
pub mod api;

#[cfg(test)]
mod test_support;

pub use error::{RefactorError, Result};
pub use project::edits::CommitMode;
pub use project::Project;
