//! Project-wide symbol binding
//!
//! `SemanticModel::build` loads every file reachable from the project roots and binds
//! them in four passes:
//!
//! 1. declaration: scopes, symbols, member tables, import/export bindings
//! 2. link: imports and re-exports resolved against other modules' export tables
//! 3. heritage: `extends`/`implements` clauses resolved to symbols
//! 4. references: every identifier use bound to a symbol through scopes or receiver types
//!
//! The finished model is plain data (symbols, occurrences, issues) addressed by file id
//! and byte range. Queries never touch the syntax trees.

mod binder;
mod classes;
pub mod helpers;
mod identifiers;
mod imports_exports;
pub mod inference;
pub mod lib_globals;
pub mod tree_methods;
pub mod types;

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

use crate::project::{FileId, Project};
pub use binder::ImportRecord;
use binder::Binder;
pub use types::{
    BindIssue, Declaration, Occurrence, Shorthand, Symbol, SymbolId, SymbolKind,
};

pub struct SemanticModel {
    symbols: Vec<Symbol>,
    /// Sorted by (file, start)
    occurrences: Vec<Occurrence>,
    by_symbol: HashMap<SymbolId, Vec<usize>>,
    issues: Vec<BindIssue>,
    imports: Vec<Vec<ImportRecord>>,
    /// base type -> types that extend or implement it directly
    derived: HashMap<SymbolId, Vec<SymbolId>>,
}

impl SemanticModel {
    /// Load every reachable file and bind the whole project
    pub fn build(project: &mut Project) -> Self {
        project.load_all();
        Self::bind(project)
    }

    /// Bind the files already loaded into `project`
    pub fn bind(project: &Project) -> Self {
        let mut binder = Binder::new(project);
        for index in 0..project.file_count() {
            binder.declare_file(FileId(index));
        }
        binder.link();
        binder.resolve_heritage();
        binder.resolve_references();

        let model = Self::finish(binder);
        info!(
            "Bound {} files: {} symbols, {} occurrences",
            project.file_count(),
            model.symbols.len(),
            model.occurrences.len()
        );
        model
    }

    fn finish(binder: Binder<'_>) -> Self {
        let mut occurrences: Vec<Occurrence> = binder
            .occurrences
            .iter()
            .map(|occurrence| {
                let canonical = binder.canonical(occurrence.symbol);
                let mut occurrence = occurrence.clone();
                if canonical != occurrence.symbol {
                    // the name in `import { a }` is a use of the imported symbol
                    occurrence.is_definition = false;
                    occurrence.symbol = canonical;
                }
                occurrence
            })
            .collect();
        // A shorthand site can carry a property occurrence next to its binding; the
        // binding sorts last so `occurrence_at` returns it
        occurrences.sort_by_key(|o| {
            (o.file, o.start, o.shorthand != Shorthand::Property, !o.is_definition)
        });
        occurrences.dedup_by_key(|o| (o.file, o.start, o.shorthand == Shorthand::Property));

        let mut by_symbol: HashMap<SymbolId, Vec<usize>> = HashMap::new();
        for (index, occurrence) in occurrences.iter().enumerate() {
            by_symbol.entry(occurrence.symbol).or_default().push(index);
        }

        let mut derived: HashMap<SymbolId, Vec<SymbolId>> = HashMap::new();
        for (index, symbol) in binder.symbols.iter().enumerate() {
            for base in symbol
                .heritage
                .extends
                .iter()
                .chain(symbol.heritage.implements.iter())
            {
                derived.entry(*base).or_default().push(SymbolId(index));
            }
        }

        let imports = binder
            .files
            .iter()
            .map(|state| state.imports.clone())
            .collect();
        debug!("{} binding issues", binder.issues.len());

        Self {
            symbols: binder.symbols,
            occurrences,
            by_symbol,
            issues: binder.issues,
            imports,
            derived,
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn issues(&self) -> &[BindIssue] {
        &self.issues
    }

    /// Module specifiers of a file's import/export statements
    pub fn imports(&self, file: FileId) -> &[ImportRecord] {
        self.imports
            .get(file.0)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    /// The bound occurrence covering `byte`, if any
    pub fn occurrence_at(&self, file: FileId, byte: usize) -> Option<&Occurrence> {
        let index = self
            .occurrences
            .partition_point(|o| (o.file, o.start) <= (file, byte));
        let candidate = self.occurrences[..index].last()?;
        (candidate.file == file && byte < candidate.end).then_some(candidate)
    }

    /// Every occurrence of any of `ids`, in (file, offset) order
    pub fn occurrences_of(&self, ids: &[SymbolId]) -> Vec<&Occurrence> {
        let mut indices: Vec<usize> = ids
            .iter()
            .flat_map(|id| self.by_symbol.get(id).into_iter().flatten().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|i| &self.occurrences[i]).collect()
    }

    pub fn canonical(&self, mut id: SymbolId) -> SymbolId {
        for _ in 0..32 {
            match self.symbols[id.0].redirect {
                Some(next) if next != id => id = next,
                _ => break,
            }
        }
        id
    }

    /// Follow aliases (`import { a as b }`, default imports) to the declared symbol
    pub fn original(&self, id: SymbolId) -> SymbolId {
        let mut current = self.canonical(id);
        for _ in 0..32 {
            match self.symbols[current.0].alias_of {
                Some(next) if next != current => current = self.canonical(next),
                _ => break,
            }
        }
        current
    }

    /// Types that directly extend or implement `id`
    pub fn derived(&self, id: SymbolId) -> &[SymbolId] {
        self.derived.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// `id` plus same-named members across its class/interface hierarchy
    ///
    /// Overrides and interface implementations share one identity for references and
    /// rename. Non-members relate only to themselves.
    pub fn related_symbols(&self, id: SymbolId) -> Vec<SymbolId> {
        let symbol = &self.symbols[id.0];
        let Some(owner) = symbol.parent else {
            return vec![id];
        };
        if !symbol.kind.is_member() || symbol.kind == SymbolKind::Constructor {
            return vec![id];
        }

        let mut related = vec![id];
        for class in self.hierarchy(owner) {
            let table = if symbol.is_static {
                &self.symbols[class.0].statics
            } else {
                &self.symbols[class.0].members
            };
            if let Some(member) = table.get(&symbol.name) {
                if !related.contains(member) {
                    related.push(*member);
                }
            }
        }
        related
    }

    /// Every class/interface connected to `start` through extends/implements links
    fn hierarchy(&self, start: SymbolId) -> Vec<SymbolId> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            out.push(current);
            let heritage = &self.symbols[current.0].heritage;
            let neighbours = heritage
                .extends
                .iter()
                .chain(heritage.implements.iter())
                .chain(self.derived(current).iter());
            for next in neighbours {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        out
    }

    /// Direct and transitive subtypes of `id`, nearest first
    pub fn all_derived(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for next in self.derived(current) {
                if seen.insert(*next) {
                    out.push(*next);
                    queue.push_back(*next);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::project_with;

    #[test]
    fn test_related_members_across_hierarchy() {
        let (_dir, mut project) = project_with(&[(
            "a.ts",
            "interface Shape { area(): number }\n\
             class Square implements Shape { area() { return 1; } }\n\
             class Big extends Square { area() { return 2; } }\n\
             class Other { area() { return 3; } }\n",
        )]);
        let model = SemanticModel::build(&mut project);
        let shape = model.symbols().iter().find(|s| s.name == "Shape").unwrap();
        let related = model.related_symbols(shape.members["area"]);

        assert_eq!(related.len(), 3, "Other.area is unrelated");
    }

    #[test]
    fn test_occurrence_lookup_is_half_open() {
        let src = "let count = 0;";
        let (_dir, mut project) = project_with(&[("a.ts", src)]);
        let model = SemanticModel::build(&mut project);
        let file = FileId(0);

        assert!(model.occurrence_at(file, 4).is_some());
        assert!(model.occurrence_at(file, 8).is_some());
        assert!(model.occurrence_at(file, 9).is_none());
    }

    #[test]
    fn test_all_derived_is_transitive() {
        let (_dir, mut project) = project_with(&[(
            "a.ts",
            "abstract class A {}\nclass B extends A {}\nclass C extends B {}\n",
        )]);
        let model = SemanticModel::build(&mut project);
        let a = model
            .symbols()
            .iter()
            .position(|s| s.name == "A")
            .map(SymbolId)
            .unwrap();
        let names: Vec<&str> = model
            .all_derived(a)
            .into_iter()
            .map(|id| model.symbol(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }
}
