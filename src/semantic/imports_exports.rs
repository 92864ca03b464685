//! Import and export bindings, and the link pass that connects them across files
//!
//! Imports are declared as alias symbols during the declaration pass. Once every file
//! has been declared, `link` resolves each alias against the export table of its target
//! module (following `export { .. } from` and `export *` chains) and turns references
//! that were deferred (re-exported names, `export { a as b }`) into occurrences.

use tracing::debug;
use tree_sitter::Node;

use super::binder::{Binder, ImportRecord, PendingLink, PendingRef};
use super::tree_methods::{children_of_kind, find_child_by_kind, named_children};
use super::types::{
    meaning, AliasTarget, BindIssue, ExportEntry, Occurrence, ScopeId, ScopeKind, Shorthand,
    SymbolId, SymbolKind,
};
use crate::project::modules::{specifier_node, string_literal_value};
use crate::project::FileId;

const MAX_EXPORT_DEPTH: usize = 24;

impl<'p> Binder<'p> {
    /// Record the module specifier of an import/export statement and resolve it
    fn record_specifier(&mut self, file: FileId, statement: Node<'p>) -> Option<(Option<FileId>, String)> {
        let spec = specifier_node(statement)?;
        let specifier = string_literal_value(self.node_text(file, spec));
        let source = self.source(file);
        let resolution = self.project.module_resolver().resolve(source.path(), &specifier);
        let module = resolution.file().and_then(|path| self.project.file_id(path));

        self.files[file.0].imports.push(ImportRecord {
            specifier: specifier.clone(),
            start: spec.start_byte(),
            end: spec.end_byte(),
            resolution,
            module,
        });
        Some((module, specifier))
    }

    fn declare_alias(
        &mut self,
        scope: ScopeId,
        name_node: Node,
        decl_node: Node,
        link: PendingLink,
    ) -> SymbolId {
        let id = self.declare(scope, name_node, decl_node, SymbolKind::Alias, false);
        self.pending_links.insert(id, link);
        id
    }

    pub(super) fn declare_import(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let Some((module, specifier)) = self.record_specifier(file, node) else {
            return;
        };

        for child in named_children(node) {
            match child.kind() {
                "import_clause" => {
                    for part in named_children(child) {
                        self.declare_import_clause_part(file, node, part, scope, module, &specifier);
                    }
                }
                // import fs = require("fs")
                "import_require_clause" => {
                    if let Some(name) = find_child_by_kind(child, "identifier") {
                        let link = PendingLink {
                            target: AliasTarget::Module(module),
                            redirect: false,
                            site: None,
                        };
                        self.declare_alias(scope, name, node, link);
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_import_clause_part(
        &mut self,
        file: FileId,
        statement: Node<'p>,
        part: Node<'p>,
        scope: ScopeId,
        module: Option<FileId>,
        specifier: &str,
    ) {
        match part.kind() {
            // import Foo from "./foo"
            "identifier" => {
                let link = PendingLink {
                    target: AliasTarget::Export {
                        module,
                        name: "default".to_string(),
                    },
                    redirect: false,
                    site: None,
                };
                self.declare_alias(scope, part, statement, link);
            }
            // import * as ns from "./foo"
            "namespace_import" => {
                if let Some(name) = find_child_by_kind(part, "identifier") {
                    let link = PendingLink {
                        target: AliasTarget::Module(module),
                        redirect: false,
                        site: None,
                    };
                    self.declare_alias(scope, name, statement, link);
                }
            }
            "named_imports" => {
                for spec in children_of_kind(part, "import_specifier") {
                    let Some(name_node) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let imported = string_literal_value(self.node_text(file, name_node));
                    let target = AliasTarget::Export {
                        module,
                        name: imported.clone(),
                    };
                    let site = Some((file, name_node.start_byte(), specifier.to_string()));

                    match spec.child_by_field_name("alias") {
                        Some(alias) => {
                            // `a` in `{ a as b }` refers to the exported symbol itself
                            self.files[file.0].handled.insert(name_node.start_byte());
                            self.pending_refs.push(PendingRef {
                                file,
                                start: name_node.start_byte(),
                                end: name_node.end_byte(),
                                target: target.clone(),
                            });
                            let link = PendingLink {
                                target,
                                redirect: false,
                                site,
                            };
                            self.declare_alias(scope, alias, spec, link);
                        }
                        None => {
                            if name_node.kind() != "identifier" {
                                continue;
                            }
                            let link = PendingLink {
                                target,
                                redirect: true,
                                site,
                            };
                            self.declare_alias(scope, name_node, spec, link);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    pub(super) fn declare_export(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let is_default = find_child_by_kind(node, "default").is_some();

        if let Some(declaration) = node.child_by_field_name("declaration") {
            self.visit(file, declaration, scope);
            for name in exported_declaration_names(declaration, self.text(file)) {
                if let Some(id) = self.lookup(scope, &name, meaning::ALL) {
                    self.symbols[id.0].exported = true;
                }
                let exported = if is_default { "default".to_string() } else { name.clone() };
                self.add_export(file, scope, exported, ExportEntry::Local(name));
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            self.declare_default_value(file, node, value, scope);
            return;
        }

        let source = node.child_by_field_name("source");
        let module_info = if source.is_some() {
            self.record_specifier(file, node)
        } else {
            None
        };
        let module = module_info.as_ref().and_then(|(module, _)| *module);
        let mut has_clause = false;

        for child in named_children(node) {
            match child.kind() {
                "export_clause" => {
                    has_clause = true;
                    for spec in children_of_kind(child, "export_specifier") {
                        self.declare_export_specifier(file, spec, scope, source.is_some(), module);
                    }
                }
                // export * as ns from "./mod"
                "namespace_export" => {
                    has_clause = true;
                    let Some(name) = named_children(child).into_iter().next() else {
                        continue;
                    };
                    let exported = string_literal_value(self.node_text(file, name));
                    let id = self.declare_synthetic(file, &exported, name, node, SymbolKind::Alias);
                    self.pending_links.insert(
                        id,
                        PendingLink {
                            target: AliasTarget::Module(module),
                            redirect: false,
                            site: None,
                        },
                    );
                    self.add_export(file, scope, exported, ExportEntry::Symbol(id));
                }
                "string" => {}
                // export = value
                _ => self.visit(file, child, scope),
            }
        }

        // export * from "./mod"
        if !has_clause && source.is_some() {
            self.files[file.0].star_exports.push(module);
        }
    }

    fn declare_export_specifier(
        &mut self,
        file: FileId,
        spec: Node<'p>,
        scope: ScopeId,
        has_source: bool,
        module: Option<FileId>,
    ) {
        let Some(name_node) = spec.child_by_field_name("name") else {
            return;
        };
        let local = string_literal_value(self.node_text(file, name_node));
        let target = if has_source {
            AliasTarget::Export {
                module,
                name: local.clone(),
            }
        } else {
            AliasTarget::Local {
                scope,
                name: local.clone(),
            }
        };

        self.files[file.0].handled.insert(name_node.start_byte());
        self.pending_refs.push(PendingRef {
            file,
            start: name_node.start_byte(),
            end: name_node.end_byte(),
            target: target.clone(),
        });

        match spec.child_by_field_name("alias") {
            Some(alias) => {
                let exported = string_literal_value(self.node_text(file, alias));
                let id = self.declare_synthetic(file, &exported, alias, spec, SymbolKind::Alias);
                self.pending_links.insert(
                    id,
                    PendingLink {
                        target,
                        redirect: false,
                        site: None,
                    },
                );
                self.add_export(file, scope, exported, ExportEntry::Symbol(id));
            }
            None if has_source => {
                self.add_export(
                    file,
                    scope,
                    local.clone(),
                    ExportEntry::ReExport {
                        module,
                        name: local,
                    },
                );
            }
            None => {
                if let Some(id) = self.lookup(scope, &local, meaning::ALL) {
                    self.symbols[id.0].exported = true;
                }
                self.add_export(file, scope, local.clone(), ExportEntry::Local(local));
            }
        }
    }

    /// `export default <expression>`
    fn declare_default_value(&mut self, file: FileId, statement: Node<'p>, value: Node<'p>, scope: ScopeId) {
        match value.kind() {
            "identifier" => {
                let name = self.node_text(file, value).to_string();
                if let Some(id) = self.lookup(scope, &name, meaning::ALL) {
                    self.symbols[id.0].exported = true;
                }
                self.add_export(file, scope, "default".to_string(), ExportEntry::Local(name));
            }
            "class" => {
                if let Some(id) = self.declare_class(file, value, scope) {
                    self.symbols[id.0].exported = true;
                    self.add_export(file, scope, "default".to_string(), ExportEntry::Symbol(id));
                }
            }
            "function_expression" | "function" | "generator_function" | "arrow_function" => {
                let keyword = find_child_by_kind(statement, "default").unwrap_or(value);
                let id = self.declare_synthetic(file, "default", keyword, value, SymbolKind::Function);
                self.symbols[id.0].exported = true;
                self.symbols[id.0].type_hint = self.hint_from_annotation(file, scope, value, "return_type");
                self.add_export(file, scope, "default".to_string(), ExportEntry::Symbol(id));
                self.bind_function_like(file, value, scope);
            }
            _ => {
                let keyword = find_child_by_kind(statement, "default").unwrap_or(value);
                let id = self.declare_synthetic(file, "default", keyword, value, SymbolKind::Variable);
                self.symbols[id.0].exported = true;
                self.symbols[id.0].type_hint = Some(Self::hint_from_expr(file, scope, value));
                self.add_export(file, scope, "default".to_string(), ExportEntry::Symbol(id));
                self.visit(file, value, scope);
            }
        }
    }

    /// Exports inside a namespace become statics of the namespace symbol
    fn add_export(&mut self, file: FileId, scope: ScopeId, name: String, entry: ExportEntry) {
        let s = &self.scopes[scope.0];
        if s.kind == ScopeKind::Namespace {
            let Some(owner) = s.owner else {
                return;
            };
            let member = match entry {
                ExportEntry::Symbol(id) => Some(id),
                ExportEntry::Local(local) => {
                    s.names.get(&local).and_then(|ids| ids.last().copied())
                }
                ExportEntry::ReExport { .. } => None,
            };
            if let Some(member) = member {
                self.symbols[member.0].exported = true;
                self.symbols[owner.0].statics.entry(name).or_insert(member);
            }
            return;
        }
        self.files[file.0].exports.entry(name).or_insert(entry);
    }

    // ------------------------------------------------------------------
    // Link pass
    // ------------------------------------------------------------------

    /// Follow a binding through not-yet-linked non-aliased imports
    fn resolve_pending(&self, id: SymbolId, depth: usize) -> SymbolId {
        let current = self.canonical(id);
        if depth > MAX_EXPORT_DEPTH {
            return current;
        }
        match self.pending_links.get(&current) {
            Some(link) if link.redirect => self
                .resolve_alias_target(&link.target, depth + 1)
                .unwrap_or(current),
            _ => current,
        }
    }

    fn resolve_alias_target(&self, target: &AliasTarget, depth: usize) -> Option<SymbolId> {
        match target {
            AliasTarget::Export {
                module: Some(module),
                name,
            } => self.exported_symbol_at(*module, name, depth),
            AliasTarget::Local { scope, name } => self
                .lookup(*scope, name, meaning::ALL)
                .map(|id| self.resolve_pending(id, depth + 1)),
            _ => None,
        }
    }

    /// The symbol a module exports under `name`, if any
    pub fn exported_symbol(&self, module: FileId, name: &str) -> Option<SymbolId> {
        self.exported_symbol_at(module, name, 0)
    }

    fn exported_symbol_at(&self, module: FileId, name: &str, depth: usize) -> Option<SymbolId> {
        if depth > MAX_EXPORT_DEPTH {
            return None;
        }
        let state = &self.files[module.0];
        match state.exports.get(name) {
            Some(ExportEntry::Symbol(id)) => Some(self.resolve_pending(*id, depth + 1)),
            Some(ExportEntry::Local(local)) => {
                let scope = state.module_scope?;
                let candidates = self.scopes[scope.0].names.get(local)?;
                candidates
                    .last()
                    .map(|id| self.resolve_pending(*id, depth + 1))
            }
            Some(ExportEntry::ReExport {
                module: Some(next),
                name: next_name,
            }) => self.exported_symbol_at(*next, next_name, depth + 1),
            Some(ExportEntry::ReExport { module: None, .. }) => None,
            None if name == "default" => None,
            None => state
                .star_exports
                .iter()
                .flatten()
                .find_map(|next| self.exported_symbol_at(*next, name, depth + 1)),
        }
    }

    /// Whether a module has any export table entry reachable for `name`
    fn module_exports_anything(&self, module: FileId) -> bool {
        let state = &self.files[module.0];
        !state.exports.is_empty() || !state.star_exports.is_empty() || state.is_module
    }

    /// Resolve every import/export alias, then every deferred name reference
    pub(super) fn link(&mut self) {
        let mut links: Vec<(SymbolId, PendingLink)> = self
            .pending_links
            .iter()
            .map(|(id, link)| (*id, link.clone()))
            .collect();
        links.sort_by_key(|(id, _)| *id);

        let resolved: Vec<(SymbolId, Option<SymbolId>)> = links
            .iter()
            .map(|(id, link)| (*id, self.resolve_alias_target(&link.target, 0)))
            .collect();

        let mut missing = Vec::new();
        for ((id, link), (_, target)) in links.iter().zip(resolved) {
            match (&link.target, target) {
                (AliasTarget::Module(module), _) => {
                    self.symbols[id.0].alias_module = *module;
                }
                (_, Some(target)) if target != *id => {
                    if link.redirect {
                        self.symbols[id.0].redirect = Some(target);
                    } else {
                        self.symbols[id.0].alias_of = Some(target);
                    }
                }
                (
                    AliasTarget::Export {
                        module: Some(module),
                        name,
                    },
                    _,
                ) => {
                    if let Some((file, start, specifier)) = &link.site {
                        if self.module_exports_anything(*module) && !self.project.is_dependency(*module) {
                            missing.push(BindIssue::MissingExport {
                                file: *file,
                                start: *start,
                                module: specifier.clone(),
                                name: name.clone(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        self.pending_links.clear();
        self.issues.extend(missing);

        let refs = std::mem::take(&mut self.pending_refs);
        for pending in refs {
            let Some(symbol) = self.resolve_alias_target(&pending.target, 0) else {
                continue;
            };
            self.occurrences.push(Occurrence {
                file: pending.file,
                start: pending.start,
                end: pending.end,
                symbol,
                is_definition: false,
                is_write: false,
                shorthand: Shorthand::Plain,
            });
        }
        debug!("Linked {} aliases", links.len());
    }

    /// Resolve a dotted name (`Base`, `ns.Base`) from `scope`
    pub fn resolve_path(&self, scope: ScopeId, path: &[String], mask: u8) -> Option<SymbolId> {
        let (first, rest) = path.split_first()?;
        let first_mask = if rest.is_empty() {
            mask
        } else {
            meaning::NAMESPACE | meaning::VALUE
        };
        let mut current = self.original(self.lookup(scope, first, first_mask)?);
        for segment in rest {
            current = self.original(self.static_member(current, segment)?);
        }
        Some(current)
    }

    /// A namespace export, class static, enum member or module export of `owner`
    pub fn static_member(&self, owner: SymbolId, name: &str) -> Option<SymbolId> {
        let original = self.original(owner);
        let symbol = &self.symbols[original.0];
        if let Some(module) = symbol.alias_module {
            return self.exported_symbol(module, name);
        }
        if let Some(found) = symbol.statics.get(name) {
            return Some(*found);
        }
        symbol
            .heritage
            .extends
            .iter()
            .filter(|base| **base != original)
            .find_map(|base| self.symbols[base.0].statics.get(name).copied())
    }

    /// Resolve `extends`/`implements` clauses to symbols
    pub(super) fn resolve_heritage(&mut self) {
        let pending = std::mem::take(&mut self.pending_heritage);
        for entry in pending {
            let mask = if entry.implements {
                meaning::TYPE
            } else {
                meaning::VALUE | meaning::TYPE
            };
            let Some(target) = self.resolve_path(entry.scope, &entry.path, mask) else {
                debug!(
                    "Unresolved heritage {} in file #{}",
                    entry.path.join("."),
                    entry.file.0
                );
                continue;
            };
            if target == entry.owner {
                continue;
            }
            let heritage = &mut self.symbols[entry.owner.0].heritage;
            let list = if entry.implements {
                &mut heritage.implements
            } else {
                &mut heritage.extends
            };
            if !list.contains(&target) {
                list.push(target);
            }
        }
    }
}

/// Names declared by an exported declaration (`export const a = 1, b = 2`)
fn exported_declaration_names(declaration: Node, text: &str) -> Vec<String> {
    let node_text = |n: Node| text[n.start_byte()..n.end_byte()].to_string();
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            children_of_kind(declaration, "variable_declarator")
                .into_iter()
                .filter_map(|d| d.child_by_field_name("name"))
                .flat_map(super::helpers::binding_identifiers)
                .map(node_text)
                .collect()
        }
        "ambient_declaration" => named_children(declaration)
            .into_iter()
            .flat_map(|inner| exported_declaration_names(inner, text))
            .collect(),
        "internal_module" | "module" => declaration
            .child_by_field_name("name")
            .map(|name| match name.kind() {
                "nested_identifier" => named_children(name)
                    .into_iter()
                    .next()
                    .map(node_text)
                    .into_iter()
                    .collect(),
                "identifier" => vec![node_text(name)],
                _ => Vec::new(),
            })
            .unwrap_or_default(),
        _ => declaration
            .child_by_field_name("name")
            .map(|name| vec![node_text(name)])
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use crate::semantic::types::BindIssue;
    use crate::semantic::SemanticModel;
    use crate::test_support::project_with;

    #[test]
    fn test_named_import_redirects_to_original() {
        let (_dir, mut project) = project_with(&[
            ("lib.ts", "export function greet() {}\n"),
            ("main.ts", "import { greet } from './lib';\ngreet();\n"),
        ]);
        let model = SemanticModel::build(&mut project);
        let greet: Vec<_> = model
            .symbols()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name == "greet" && s.redirect.is_none())
            .collect();
        assert_eq!(greet.len(), 1, "only the declaration is canonical");
        assert!(model.issues().is_empty());
    }

    #[test]
    fn test_reexport_chain_and_star_exports() {
        let (_dir, mut project) = project_with(&[
            ("a.ts", "export class Widget {}\n"),
            ("b.ts", "export * from './a';\n"),
            ("c.ts", "export { Widget as Gadget } from './b';\n"),
            ("main.ts", "import { Gadget } from './c';\nnew Gadget();\n"),
        ]);
        let model = SemanticModel::build(&mut project);
        let gadget = model
            .symbols()
            .iter()
            .find(|s| s.name == "Gadget" && s.alias_of.is_some())
            .expect("alias created by export { as }");
        let target = &model.symbols()[gadget.alias_of.unwrap().0];
        assert_eq!(target.name, "Widget");
        assert!(model.issues().is_empty());
    }

    #[test]
    fn test_missing_export_is_reported() {
        let (_dir, mut project) = project_with(&[
            ("lib.ts", "export const a = 1;\n"),
            ("main.ts", "import { b } from './lib';\n"),
        ]);
        let model = SemanticModel::build(&mut project);
        assert!(model
            .issues()
            .iter()
            .any(|i| matches!(i, BindIssue::MissingExport { name, .. } if name == "b")));
    }

    #[test]
    fn test_heritage_through_namespace_import() {
        let (_dir, mut project) = project_with(&[
            ("base.ts", "export abstract class Shape {}\n"),
            (
                "circle.ts",
                "import * as shapes from './base';\nexport class Circle extends shapes.Shape {}\n",
            ),
        ]);
        let model = SemanticModel::build(&mut project);
        let circle = model.symbols().iter().find(|s| s.name == "Circle").unwrap();
        assert_eq!(circle.heritage.extends.len(), 1);
        assert_eq!(model.symbols()[circle.heritage.extends[0].0].name, "Shape");
    }
}
