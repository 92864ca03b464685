//! Declaration pass - scopes and symbols for one file
//!
//! Walks a syntax tree once, opening scopes (module, function, block, class, namespace)
//! and declaring every name it binds. Declarations are merged the way TypeScript merges
//! them; non-mergeable redeclarations are recorded as issues. Identifier uses are bound
//! later, once every file has been declared and imports are linked.

use std::collections::{HashMap, HashSet};
use tracing::trace;
use tree_sitter::Node;

use super::helpers::{
    annotation_type, binding_identifiers, declaration_keyword, has_modifier, hint_path,
    is_function_like,
};
use super::types::{
    meaning, AliasTarget, BindIssue, Declaration, ExportEntry, HintKind, Occurrence, Scope,
    ScopeId, ScopeKind, Shorthand, Symbol, SymbolId, SymbolKind, TypeHint,
};
use crate::project::modules::ModuleResolution;
use crate::project::{FileId, Project, SourceFile};

/// A module specifier seen in an import/export statement
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub specifier: String,
    pub start: usize,
    pub end: usize,
    pub resolution: ModuleResolution,
    pub module: Option<FileId>,
}

/// Per-file binding state
#[derive(Debug, Default)]
pub(super) struct FileState {
    pub module_scope: Option<ScopeId>,
    pub is_module: bool,
    /// tree-sitter node id -> scope opened by that node
    pub node_scopes: HashMap<usize, ScopeId>,
    /// Start bytes of name nodes already bound (declarations, import/export names)
    pub handled: HashSet<usize>,
    /// class node id -> class symbol
    pub class_nodes: HashMap<usize, SymbolId>,
    pub exports: HashMap<String, ExportEntry>,
    pub star_exports: Vec<Option<FileId>>,
    pub imports: Vec<ImportRecord>,
}

/// A name occurrence whose target is only known after linking
#[derive(Debug, Clone)]
pub(super) struct PendingRef {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
    pub target: AliasTarget,
}

/// An import/export binding whose target is linked after all files are declared
#[derive(Debug, Clone)]
pub(super) struct PendingLink {
    pub target: AliasTarget,
    /// Non-aliased named import: the binding becomes the target itself
    pub redirect: bool,
    /// Where to report a missing export: file, name start, module specifier
    pub site: Option<(FileId, usize, String)>,
}

/// An `extends`/`implements` entry waiting for name resolution
#[derive(Debug, Clone)]
pub(super) struct PendingHeritage {
    pub owner: SymbolId,
    pub file: FileId,
    pub scope: ScopeId,
    pub path: Vec<String>,
    pub implements: bool,
}

pub(super) struct Binder<'p> {
    pub project: &'p Project,
    pub symbols: Vec<Symbol>,
    pub scopes: Vec<Scope>,
    pub files: Vec<FileState>,
    pub globals: HashMap<String, Vec<SymbolId>>,
    pub occurrences: Vec<Occurrence>,
    pub issues: Vec<BindIssue>,
    pub pending_links: HashMap<SymbolId, PendingLink>,
    pub pending_refs: Vec<PendingRef>,
    pub pending_heritage: Vec<PendingHeritage>,
    /// (file, name start) of constructor parameter properties -> property symbol
    pub param_properties: HashMap<(FileId, usize), SymbolId>,
}

impl<'p> Binder<'p> {
    pub fn new(project: &'p Project) -> Self {
        let files = (0..project.file_count()).map(|_| FileState::default()).collect();
        Self {
            project,
            symbols: Vec::new(),
            scopes: Vec::new(),
            files,
            globals: HashMap::new(),
            occurrences: Vec::new(),
            issues: Vec::new(),
            pending_links: HashMap::new(),
            pending_refs: Vec::new(),
            pending_heritage: Vec::new(),
            param_properties: HashMap::new(),
        }
    }

    pub fn source(&self, file: FileId) -> &'p SourceFile {
        let project: &'p Project = self.project;
        project.file(file)
    }

    pub fn text(&self, file: FileId) -> &'p str {
        self.source(file).text()
    }

    pub fn node_text(&self, file: FileId, node: Node) -> &'p str {
        &self.text(file)[node.start_byte()..node.end_byte()]
    }

    // ------------------------------------------------------------------
    // Scopes and symbols
    // ------------------------------------------------------------------

    pub fn new_scope(
        &mut self,
        file: FileId,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        node: Option<Node>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent,
            file,
            owner: None,
            names: HashMap::new(),
        });
        if let Some(node) = node {
            self.files[file.0].node_scopes.insert(node.id(), id);
        }
        id
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(symbol);
        id
    }

    pub fn declaration(file: FileId, name: Node, node: Node) -> Declaration {
        Declaration {
            file,
            name_start: name.start_byte(),
            name_end: name.end_byte(),
            node_start: node.start_byte(),
            node_end: node.end_byte(),
            node_kind: node.kind(),
        }
    }

    /// Record the defining occurrence of a name node
    pub fn record_definition(&mut self, file: FileId, name: Node, symbol: SymbolId) {
        self.files[file.0].handled.insert(name.start_byte());
        self.occurrences.push(Occurrence {
            file,
            start: name.start_byte(),
            end: name.end_byte(),
            symbol,
            is_definition: true,
            is_write: false,
            shorthand: if name.kind() == "shorthand_property_identifier_pattern" {
                Shorthand::Binding
            } else {
                Shorthand::Plain
            },
        });
    }

    /// Declare `name` in `scope`, merging with an existing compatible declaration
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name_node: Node,
        decl_node: Node,
        kind: SymbolKind,
        block_scoped: bool,
    ) -> SymbolId {
        let file = self.scopes[scope.0].file;
        let name = self.node_text(file, name_node).to_string();
        let declaration = Self::declaration(file, name_node, decl_node);
        let new_meaning = kind.meaning();

        let existing: Vec<SymbolId> = self.scopes[scope.0]
            .names
            .get(&name)
            .cloned()
            .unwrap_or_default();

        for candidate in existing {
            let current = &self.symbols[candidate.0];
            if current.meaning & new_meaning == 0 {
                continue;
            }
            if can_merge(current, kind, block_scoped) {
                let symbol = &mut self.symbols[candidate.0];
                symbol.declarations.push(declaration);
                symbol.meaning |= new_meaning;
                if merged_kind_wins(symbol.kind, kind) {
                    symbol.kind = kind;
                }
                self.record_definition(file, name_node, candidate);
                return candidate;
            }
            if !matches!(kind, SymbolKind::Label | SymbolKind::TypeParameter) {
                let either_block = block_scoped || current.block_scoped;
                let first = current.first_declaration().map(|d| (d.file, d.name_start));
                if let Some((first_file, first_start)) = first {
                    self.push_duplicate(first_file, first_start, &name, either_block);
                }
                self.push_duplicate(file, name_node.start_byte(), &name, either_block);
            }
            break;
        }

        let mut symbol = Symbol::new(name.clone(), kind);
        symbol.block_scoped = block_scoped;
        symbol.declarations.push(declaration);
        let id = self.add_symbol(symbol);
        self.scopes[scope.0]
            .names
            .entry(name.clone())
            .or_default()
            .push(id);
        self.record_definition(file, name_node, id);

        if self.is_global_scope(scope) {
            self.globals.entry(name).or_default().push(id);
        }
        trace!("declared {} {}", kind, self.symbols[id.0].name);
        id
    }

    fn push_duplicate(&mut self, file: FileId, start: usize, name: &str, block_scoped: bool) {
        let issue = BindIssue::Duplicate {
            file,
            start,
            name: name.to_string(),
            block_scoped,
        };
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    /// Put an existing symbol under another name in a scope (no new declaration)
    pub fn bind_existing(&mut self, scope: ScopeId, name: &str, symbol: SymbolId) {
        self.scopes[scope.0]
            .names
            .entry(name.to_string())
            .or_default()
            .push(symbol);
    }

    fn is_global_scope(&self, scope: ScopeId) -> bool {
        let s = &self.scopes[scope.0];
        match s.kind {
            ScopeKind::Global => true,
            ScopeKind::Module => !self.files[s.file.0].is_module,
            _ => false,
        }
    }

    /// Nearest scope `var` declarations hoist to
    pub fn hoist_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let s = &self.scopes[current.0];
            match (s.kind, s.parent) {
                (ScopeKind::Block, Some(parent)) | (ScopeKind::Class, Some(parent)) => {
                    current = parent
                }
                _ => return current,
            }
        }
    }

    /// Follow non-aliased import redirects to the symbol they stand for
    pub fn canonical(&self, mut id: SymbolId) -> SymbolId {
        for _ in 0..32 {
            match self.symbols[id.0].redirect {
                Some(next) if next != id => id = next,
                _ => break,
            }
        }
        id
    }

    /// Canonical symbol with aliases followed to their original declaration
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

    pub fn effective_meaning(&self, id: SymbolId) -> u8 {
        let original = self.original(id);
        let symbol = &self.symbols[original.0];
        if symbol.kind == SymbolKind::Alias {
            if symbol.alias_module.is_some() {
                return meaning::NAMESPACE | meaning::VALUE;
            }
            return meaning::ALL;
        }
        symbol.meaning
    }

    /// Resolve a name from `scope` outwards, then in the global table
    pub fn lookup(&self, scope: ScopeId, name: &str, mask: u8) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.0];
            if let Some(candidates) = s.names.get(name) {
                if let Some(found) = candidates
                    .iter()
                    .rev()
                    .find(|sym| self.effective_meaning(**sym) & mask != 0)
                {
                    return Some(*found);
                }
            }
            if s.kind == ScopeKind::Namespace {
                if let Some(owner) = s.owner {
                    if let Some(member) = self.symbols[owner.0].statics.get(name) {
                        if self.effective_meaning(*member) & mask != 0 {
                            return Some(*member);
                        }
                    }
                }
            }
            current = s.parent;
        }

        self.globals.get(name).and_then(|candidates| {
            candidates
                .iter()
                .find(|sym| self.effective_meaning(**sym) & mask != 0)
                .copied()
        })
    }

    /// Innermost scope registered for `node` or one of its ancestors
    pub fn scope_at(&self, file: FileId, node: Node) -> ScopeId {
        let state = &self.files[file.0];
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(scope) = state.node_scopes.get(&n.id()) {
                return *scope;
            }
            current = n.parent();
        }
        state
            .module_scope
            .unwrap_or(ScopeId(0))
    }

    pub fn hint_from_annotation(
        &self,
        file: FileId,
        scope: ScopeId,
        node: Node,
        field: &str,
    ) -> Option<TypeHint> {
        let type_node = annotation_type(node, field)?;
        let path = hint_path(type_node, self.text(file))?;
        Some(TypeHint {
            file,
            scope,
            kind: HintKind::Named(path),
        })
    }

    pub fn hint_from_expr(file: FileId, scope: ScopeId, expr: Node) -> TypeHint {
        TypeHint {
            file,
            scope,
            kind: HintKind::Expr {
                start: expr.start_byte(),
                end: expr.end_byte(),
            },
        }
    }

    // ------------------------------------------------------------------
    // Declaration pass
    // ------------------------------------------------------------------

    pub fn declare_file(&mut self, file: FileId) {
        let root = self.source(file).root();
        let is_module = {
            let mut cursor = root.walk();
            let found = root
                .named_children(&mut cursor)
                .any(|child| matches!(child.kind(), "import_statement" | "export_statement"));
            found
        };
        self.files[file.0].is_module = is_module;

        let scope = self.new_scope(file, ScopeKind::Module, None, Some(root));
        self.files[file.0].module_scope = Some(scope);
        self.visit_children(file, root, scope);
    }

    pub fn visit_children(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let mut cursor = node.walk();
        let children: Vec<Node<'p>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(file, child, scope);
        }
    }

    pub fn visit(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                self.declare_function(file, node, scope);
            }
            "function_expression" | "function" | "generator_function" | "arrow_function"
            | "method_definition" | "function_type" | "constructor_type" | "call_signature"
            | "construct_signature" | "method_signature" | "abstract_method_signature"
            | "index_signature" => {
                self.bind_function_like(file, node, scope);
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                self.declare_class(file, node, scope);
            }
            "interface_declaration" => self.declare_interface(file, node, scope),
            "type_alias_declaration" => self.declare_type_alias(file, node, scope),
            "enum_declaration" => self.declare_enum(file, node, scope),
            "internal_module" | "module" => self.declare_namespace(file, node, scope),
            "lexical_declaration" | "variable_declaration" => {
                self.declare_variables(file, node, scope);
            }
            "import_statement" => self.declare_import(file, node, scope),
            "export_statement" => self.declare_export(file, node, scope),
            "ambient_declaration" => {
                if has_modifier(node, "global") {
                    let global = self.new_scope(file, ScopeKind::Global, Some(scope), Some(node));
                    for block in super::tree_methods::children_of_kind(node, "statement_block") {
                        self.visit_children(file, block, global);
                    }
                } else {
                    self.visit_children(file, node, scope);
                }
            }
            "statement_block" => {
                let is_body = node
                    .parent()
                    .map(|parent| is_function_like(parent.kind()) || parent.kind() == "class_static_block")
                    .unwrap_or(false);
                if is_body {
                    self.visit_children(file, node, scope);
                } else {
                    let block = self.new_scope(file, ScopeKind::Block, Some(scope), Some(node));
                    self.visit_children(file, node, block);
                }
            }
            "for_statement" | "switch_body" => {
                let block = self.new_scope(file, ScopeKind::Block, Some(scope), Some(node));
                self.visit_children(file, node, block);
            }
            "for_in_statement" => self.declare_for_in(file, node, scope),
            "catch_clause" => {
                let block = self.new_scope(file, ScopeKind::Block, Some(scope), Some(node));
                if let Some(param) = node.child_by_field_name("parameter") {
                    for name in binding_identifiers(param) {
                        let id = self.declare(block, name, param, SymbolKind::Variable, false);
                        self.symbols[id.0].type_hint =
                            self.hint_from_annotation(file, block, node, "type");
                    }
                }
                self.visit_children(file, node, block);
            }
            "labeled_statement" => {
                let block = self.new_scope(file, ScopeKind::Block, Some(scope), Some(node));
                if let Some(label) = node.child_by_field_name("label") {
                    self.declare(block, label, node, SymbolKind::Label, false);
                }
                self.visit_children(file, node, block);
            }
            "class_static_block" => {
                let body = self.new_scope(file, ScopeKind::Function, Some(scope), Some(node));
                self.visit_children(file, node, body);
            }
            "mapped_type_clause" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(scope, name, node, SymbolKind::TypeParameter, false);
                }
                self.visit_children(file, node, scope);
            }
            "infer_type" => {
                if let Some(name) = super::tree_methods::find_child_by_kind(node, "type_identifier")
                {
                    self.declare(scope, name, node, SymbolKind::TypeParameter, false);
                }
            }
            _ => self.visit_children(file, node, scope),
        }
    }

    fn declare_function(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        if let Some(name) = node.child_by_field_name("name") {
            let id = self.declare(scope, name, node, SymbolKind::Function, false);
            if self.symbols[id.0].type_hint.is_none() {
                self.symbols[id.0].type_hint =
                    self.hint_from_annotation(file, scope, node, "return_type");
            }
        }
        self.bind_function_like(file, node, scope);
    }

    /// Open a function scope for `node`, declare its type parameters and parameters,
    /// and visit its body
    pub fn bind_function_like(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let function_scope = self.new_scope(file, ScopeKind::Function, Some(scope), Some(node));

        if matches!(node.kind(), "function_expression" | "function" | "generator_function") {
            if let Some(name) = node.child_by_field_name("name") {
                self.declare(function_scope, name, node, SymbolKind::Function, false);
            }
        }

        self.declare_type_parameters(node, function_scope);
        self.declare_parameters(file, node, function_scope);

        for child in super::tree_methods::named_children(node) {
            self.visit(file, child, function_scope);
        }
    }

    pub fn declare_type_parameters(&mut self, node: Node<'p>, scope: ScopeId) {
        let Some(params) = node.child_by_field_name("type_parameters") else {
            return;
        };
        for param in super::tree_methods::children_of_kind(params, "type_parameter") {
            if let Some(name) = param.child_by_field_name("name") {
                self.declare(scope, name, param, SymbolKind::TypeParameter, false);
            }
        }
    }

    fn declare_parameters(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        if node.kind() == "index_signature" {
            if let Some(name) = node.child_by_field_name("name") {
                if name.kind() == "identifier" {
                    self.declare(scope, name, node, SymbolKind::Parameter, false);
                }
            }
            return;
        }

        if let Some(single) = node.child_by_field_name("parameter") {
            if single.kind() == "identifier" {
                self.declare(scope, single, node, SymbolKind::Parameter, false);
            }
            return;
        }

        let Some(params) = node.child_by_field_name("parameters") else {
            return;
        };
        for param in super::tree_methods::named_children(params) {
            if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }
            let Some(pattern) = param.child_by_field_name("pattern") else {
                continue;
            };
            let simple = pattern.kind() == "identifier";
            for name in binding_identifiers(pattern) {
                if let Some(property) = self
                    .param_properties
                    .get(&(file, name.start_byte()))
                    .copied()
                {
                    let text = self.node_text(file, name).to_string();
                    self.bind_existing(scope, &text, property);
                    continue;
                }
                let id = self.declare(scope, name, param, SymbolKind::Parameter, false);
                if simple {
                    self.symbols[id.0].type_hint =
                        self.hint_from_annotation(file, scope, param, "type");
                }
            }
        }
    }

    fn declare_variables(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let keyword = declaration_keyword(node, self.text(file));
        let (kind, block_scoped) = match keyword {
            "const" => (SymbolKind::Constant, true),
            "let" | "using" => (SymbolKind::Variable, true),
            _ => (SymbolKind::Variable, false),
        };
        let target = if block_scoped {
            scope
        } else {
            self.hoist_scope(scope)
        };

        for declarator in super::tree_methods::children_of_kind(node, "variable_declarator") {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let simple = name_node.kind() == "identifier";
            for name in binding_identifiers(name_node) {
                let id = self.declare(target, name, declarator, kind, block_scoped);
                if simple && self.symbols[id.0].type_hint.is_none() {
                    let hint = self
                        .hint_from_annotation(file, scope, declarator, "type")
                        .or_else(|| {
                            declarator
                                .child_by_field_name("value")
                                .map(|value| Self::hint_from_expr(file, scope, value))
                        });
                    self.symbols[id.0].type_hint = hint;
                }
            }
            self.visit_children(file, declarator, scope);
        }
    }

    fn declare_for_in(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let block = self.new_scope(file, ScopeKind::Block, Some(scope), Some(node));
        if let Some(kind_node) = node.child_by_field_name("kind") {
            let keyword = self.node_text(file, kind_node);
            let (kind, block_scoped) = match keyword {
                "const" => (SymbolKind::Constant, true),
                "let" => (SymbolKind::Variable, true),
                _ => (SymbolKind::Variable, false),
            };
            let target = if block_scoped {
                block
            } else {
                self.hoist_scope(scope)
            };
            if let Some(left) = node.child_by_field_name("left") {
                for name in binding_identifiers(left) {
                    self.declare(target, name, node, kind, block_scoped);
                }
            }
        }
        self.visit_children(file, node, block);
    }

    /// Create an anonymous symbol (e.g. `export default function () {}`)
    pub fn declare_synthetic(
        &mut self,
        file: FileId,
        name: &str,
        name_node: Node,
        decl_node: Node,
        kind: SymbolKind,
    ) -> SymbolId {
        let mut symbol = Symbol::new(name, kind);
        symbol.declarations.push(Self::declaration(file, name_node, decl_node));
        let id = self.add_symbol(symbol);
        self.record_definition(file, name_node, id);
        id
    }
}

/// TypeScript declaration merging rules
fn can_merge(existing: &Symbol, kind: SymbolKind, block_scoped: bool) -> bool {
    use SymbolKind::*;
    match (existing.kind, kind) {
        (Interface, Interface) | (Interface, Class) | (Class, Interface) => true,
        (Namespace, Namespace | Class | Function | Enum)
        | (Class | Function | Enum, Namespace) => true,
        (Enum, Enum) | (Function, Function) => true,
        (Variable, Variable) | (Parameter, Variable) => {
            !existing.block_scoped && !block_scoped
        }
        _ => false,
    }
}

/// Whether the merged symbol should take the new declaration's kind
fn merged_kind_wins(existing: SymbolKind, new: SymbolKind) -> bool {
    use SymbolKind::*;
    matches!(
        (existing, new),
        (Interface, Class) | (Namespace, Class | Function | Enum)
    )
}
