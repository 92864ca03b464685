//! Lightweight receiver typing for member binding
//!
//! Only what member lookups need: which class, interface, enum, namespace or module an
//! expression denotes. Types come from declared annotations, `new C()` initializers,
//! declared return types and `this`/`super`. Anything else is unknown (`None`).

use tree_sitter::Node;

use super::binder::Binder;
use super::helpers::{has_modifier, hint_path};
use super::tree_methods::{find_ancestor, is_field_of, node_for_range};
use super::types::{meaning, HintKind, SymbolId, SymbolKind, TypeHint};
use crate::project::FileId;

const MAX_DEPTH: usize = 8;

/// What a receiver expression evaluates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    /// An instance of a class or interface
    Instance(SymbolId),
    /// The static side of a class, enum or namespace
    Static(SymbolId),
    /// A namespace import of a module
    Module(FileId),
}

impl<'p> Binder<'p> {
    pub fn expr_type(&self, file: FileId, node: Node, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        match node.kind() {
            "this" => {
                let (class, is_static) = self.enclosing_class(file, node)?;
                Some(if is_static {
                    Ty::Static(class)
                } else {
                    Ty::Instance(class)
                })
            }
            "super" => {
                let (class, is_static) = self.enclosing_class(file, node)?;
                let base = *self.symbols[class.0].heritage.extends.first()?;
                Some(if is_static {
                    Ty::Static(base)
                } else {
                    Ty::Instance(base)
                })
            }
            "identifier" => {
                let name = self.node_text(file, node);
                let scope = self.scope_at(file, node);
                let symbol = self.lookup(scope, name, meaning::VALUE | meaning::NAMESPACE)?;
                self.symbol_value_type(symbol, depth + 1)
            }
            "member_expression" => {
                let member = self.member_symbol(file, node, depth + 1)?;
                self.symbol_value_type(member, depth + 1)
            }
            "call_expression" => {
                let callee = node.child_by_field_name("function")?;
                let symbol = self.callee_symbol(file, callee, depth + 1)?;
                self.call_return_type(symbol, depth + 1)
            }
            "new_expression" => {
                let constructor = node.child_by_field_name("constructor")?;
                let class = self.callee_symbol(file, constructor, depth + 1)?;
                let class = self.original(class);
                matches!(self.symbols[class.0].kind, SymbolKind::Class).then_some(Ty::Instance(class))
            }
            "as_expression" | "satisfies_expression" | "type_assertion" => {
                let declared = node
                    .named_child(1)
                    .filter(|_| node.kind() == "as_expression")
                    .and_then(|ty| hint_path(ty, self.text(file)))
                    .and_then(|path| {
                        let hint = TypeHint {
                            file,
                            scope: self.scope_at(file, node),
                            kind: HintKind::Named(path),
                        };
                        self.resolve_hint(&hint, depth + 1)
                    });
                declared.or_else(|| self.expr_type(file, node.named_child(0)?, depth + 1))
            }
            "parenthesized_expression" | "non_null_expression" | "await_expression" => {
                self.expr_type(file, node.named_child(0)?, depth + 1)
            }
            _ => None,
        }
    }

    /// The class symbol a `this` refers to, and whether it is the static side
    fn enclosing_class(&self, file: FileId, node: Node) -> Option<(SymbolId, bool)> {
        let classes = &self.files[file.0].class_nodes;
        let mut is_static = false;
        let mut current = node.parent();
        while let Some(n) = current {
            match n.kind() {
                // `function` expressions rebind `this`
                "function_expression" | "function" | "function_declaration" => return None,
                "method_definition" | "public_field_definition" | "class_static_block" => {
                    is_static = has_modifier(n, "static") || n.kind() == "class_static_block";
                }
                _ => {}
            }
            if let Some(class) = classes.get(&n.id()) {
                return Some((*class, is_static));
            }
            current = n.parent();
        }
        None
    }

    /// The symbol denoted by a call/new target (`f`, `obj.m`, `ns.C`)
    pub fn callee_symbol(&self, file: FileId, node: Node, depth: usize) -> Option<SymbolId> {
        match node.kind() {
            "identifier" => {
                let scope = self.scope_at(file, node);
                self.lookup(scope, self.node_text(file, node), meaning::VALUE)
            }
            "member_expression" => self.member_symbol(file, node, depth),
            "parenthesized_expression" | "non_null_expression" => {
                self.callee_symbol(file, node.named_child(0)?, depth)
            }
            _ => None,
        }
    }

    /// Member symbol of `object.property`, when the object's type is known
    pub fn member_symbol(&self, file: FileId, node: Node, depth: usize) -> Option<SymbolId> {
        let object = node.child_by_field_name("object")?;
        let property = node.child_by_field_name("property")?;
        let receiver = self.expr_type(file, object, depth)?;
        self.lookup_member(receiver, self.node_text(file, property))
    }

    pub fn symbol_value_type(&self, symbol: SymbolId, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        let original = self.original(symbol);
        let s = &self.symbols[original.0];
        if let Some(module) = s.alias_module {
            return Some(Ty::Module(module));
        }
        match s.kind {
            SymbolKind::Class | SymbolKind::Enum | SymbolKind::Namespace => Some(Ty::Static(original)),
            SymbolKind::Variable
            | SymbolKind::Constant
            | SymbolKind::Parameter
            | SymbolKind::Property
            | SymbolKind::Getter => self.resolve_hint(s.type_hint.as_ref()?, depth + 1),
            _ => None,
        }
    }

    /// Declared return type of a function or method
    pub fn call_return_type(&self, symbol: SymbolId, depth: usize) -> Option<Ty> {
        let original = self.original(symbol);
        let s = &self.symbols[original.0];
        match s.kind {
            SymbolKind::Function | SymbolKind::Method => {
                self.resolve_hint(s.type_hint.as_ref()?, depth + 1)
            }
            _ => None,
        }
    }

    pub fn resolve_hint(&self, hint: &TypeHint, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        match &hint.kind {
            HintKind::Named(path) => {
                let symbol = self.resolve_path(hint.scope, path, meaning::TYPE)?;
                self.instance_type(symbol, depth + 1)
            }
            HintKind::Expr { start, end } => {
                let root = self.source(hint.file).root();
                let node = node_for_range(root, *start, *end)?;
                self.expr_type(hint.file, node, depth + 1)
            }
        }
    }

    /// Instance side of a named type, seeing through type aliases
    fn instance_type(&self, symbol: SymbolId, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        let original = self.original(symbol);
        let s = &self.symbols[original.0];
        match s.kind {
            SymbolKind::Class | SymbolKind::Interface => Some(Ty::Instance(original)),
            SymbolKind::TypeAlias => self.resolve_hint(s.type_hint.as_ref()?, depth + 1),
            _ => None,
        }
    }

    pub fn lookup_member(&self, receiver: Ty, name: &str) -> Option<SymbolId> {
        match receiver {
            Ty::Instance(owner) => self.instance_member(owner, name, 0),
            Ty::Static(owner) => self.static_member(owner, name),
            Ty::Module(module) => self.exported_symbol(module, name),
        }
    }

    /// Instance member of a class/interface, walking `extends` chains
    pub fn instance_member(&self, owner: SymbolId, name: &str, depth: usize) -> Option<SymbolId> {
        if depth > MAX_DEPTH * 4 {
            return None;
        }
        let symbol = &self.symbols[owner.0];
        if let Some(found) = symbol.members.get(name) {
            return Some(*found);
        }
        symbol
            .heritage
            .extends
            .iter()
            .chain(symbol.heritage.implements.iter())
            .filter(|base| **base != owner)
            .find_map(|base| self.instance_member(*base, name, depth + 1))
    }

    /// Whether `node` is the object literal initializer of a variable with a declared type
    pub fn object_literal_type(&self, file: FileId, object: Node) -> Option<Ty> {
        let declarator = find_ancestor(object, |n| n.kind() != "parenthesized_expression")?;
        if declarator.kind() != "variable_declarator" {
            return None;
        }
        let value = declarator.child_by_field_name("value")?;
        if value.id() != object.id() {
            return None;
        }
        let scope = self.scope_at(file, declarator);
        let hint = self.hint_from_annotation(file, scope, declarator, "type")?;
        self.resolve_hint(&hint, 0)
    }

    /// Type of the value an object destructuring pattern unpacks
    ///
    /// Known for annotated declarators and parameters, declarators and assignments
    /// whose right side has a known type, and patterns nested under a typed key.
    pub fn object_pattern_type(&self, file: FileId, pattern: Node, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        let owner = pattern.parent()?;
        let scope = self.scope_at(file, owner);
        match owner.kind() {
            "variable_declarator" if is_field_of(pattern, owner, "name") => self
                .hint_from_annotation(file, scope, owner, "type")
                .and_then(|hint| self.resolve_hint(&hint, depth + 1))
                .or_else(|| {
                    let value = owner.child_by_field_name("value")?;
                    self.expr_type(file, value, depth + 1)
                }),
            "required_parameter" | "optional_parameter" => {
                let hint = self.hint_from_annotation(file, scope, owner, "type")?;
                self.resolve_hint(&hint, depth + 1)
            }
            "assignment_expression" if is_field_of(pattern, owner, "left") => {
                let value = owner.child_by_field_name("right")?;
                self.expr_type(file, value, depth + 1)
            }
            // `{ inner: { name } }`
            "pair_pattern" if is_field_of(pattern, owner, "value") => {
                let key = owner.child_by_field_name("key")?;
                let outer = self.object_pattern_type(file, owner.parent()?, depth + 1)?;
                let member = self.lookup_member(outer, self.node_text(file, key))?;
                self.symbol_value_type(member, depth + 1)
            }
            _ => None,
        }
    }
}
