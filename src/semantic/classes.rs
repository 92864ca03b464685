//! Class, interface, enum, type alias and namespace declarations
//!
//! These declare a named type plus a member table. Members live on the owning symbol
//! (instance side in `members`, static side in `statics`), never in a lexical scope.

use tree_sitter::Node;

use super::binder::{Binder, PendingHeritage};
use super::helpers::{declaration_name, has_modifier, qualified_path};
use super::tree_methods::{children_of_kind, named_children};
use super::types::{ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind};
use crate::project::FileId;

impl<'p> Binder<'p> {
    pub(super) fn declare_class(
        &mut self,
        file: FileId,
        node: Node<'p>,
        scope: ScopeId,
    ) -> Option<SymbolId> {
        let class_scope = self.new_scope(file, ScopeKind::Class, Some(scope), Some(node));
        let name_node = node.child_by_field_name("name");

        let class = match name_node {
            // A class expression's name is only visible inside the class
            Some(name) if node.kind() == "class" => {
                Some(self.declare(class_scope, name, node, SymbolKind::Class, true))
            }
            Some(name) => Some(self.declare(scope, name, node, SymbolKind::Class, true)),
            None => self.anonymous_default(file, node, SymbolKind::Class),
        };

        let Some(class) = class else {
            self.visit_children(file, node, class_scope);
            return None;
        };

        self.scopes[class_scope.0].owner = Some(class);
        self.files[file.0].class_nodes.insert(node.id(), class);
        if node.kind() == "abstract_class_declaration" {
            self.symbols[class.0].is_abstract = true;
        }

        self.declare_type_parameters(node, class_scope);
        self.collect_class_heritage(file, node, class, class_scope);

        if let Some(body) = node.child_by_field_name("body") {
            self.declare_class_members(file, body, class, class_scope);
        }
        Some(class)
    }

    /// `export default class {}` / `export default function () {}`
    pub(super) fn anonymous_default(
        &mut self,
        file: FileId,
        node: Node<'p>,
        kind: SymbolKind,
    ) -> Option<SymbolId> {
        let parent = node.parent()?;
        if parent.kind() != "export_statement" {
            return None;
        }
        let keyword = super::tree_methods::find_child_by_kind(parent, "default")?;
        Some(self.declare_synthetic(file, "default", keyword, node, kind))
    }

    fn collect_class_heritage(
        &mut self,
        file: FileId,
        node: Node<'p>,
        class: SymbolId,
        scope: ScopeId,
    ) {
        let text = self.text(file);
        let Some(heritage) = super::tree_methods::find_child_by_kind(node, "class_heritage")
        else {
            return;
        };

        for clause in named_children(heritage) {
            let implements = match clause.kind() {
                "extends_clause" => false,
                "implements_clause" => true,
                _ => continue,
            };
            for target in named_children(clause) {
                if target.kind() == "type_arguments" {
                    continue;
                }
                if let Some(path) = qualified_path(target, text) {
                    self.pending_heritage.push(PendingHeritage {
                        owner: class,
                        file,
                        scope,
                        path,
                        implements,
                    });
                }
            }
        }
    }

    fn declare_class_members(
        &mut self,
        file: FileId,
        body: Node<'p>,
        class: SymbolId,
        scope: ScopeId,
    ) {
        let text = self.text(file);

        for member in named_children(body) {
            match member.kind() {
                "method_definition" | "method_signature" | "abstract_method_signature" => {
                    if let Some((name_node, name)) = declaration_name(member, text) {
                        let is_static = has_modifier(member, "static");
                        let kind = if name == "constructor" && member.kind() == "method_definition"
                        {
                            SymbolKind::Constructor
                        } else if has_modifier(member, "get") {
                            SymbolKind::Getter
                        } else if has_modifier(member, "set") {
                            SymbolKind::Setter
                        } else {
                            SymbolKind::Method
                        };

                        if kind == SymbolKind::Constructor {
                            self.declare_parameter_properties(file, member, class);
                        }
                        let id = self
                            .declare_member(file, class, &name, name_node, member, kind, is_static);
                        if member.kind() == "abstract_method_signature" {
                            self.symbols[id.0].is_abstract = true;
                        }
                        if self.symbols[id.0].type_hint.is_none() {
                            self.symbols[id.0].type_hint =
                                self.hint_from_annotation(file, scope, member, "return_type");
                        }
                    }
                    self.visit(file, member, scope);
                }
                "public_field_definition" | "property_signature" => {
                    if let Some((name_node, name)) = declaration_name(member, text) {
                        let is_static = has_modifier(member, "static");
                        let id = self.declare_member(
                            file,
                            class,
                            &name,
                            name_node,
                            member,
                            SymbolKind::Property,
                            is_static,
                        );
                        let hint = self.hint_from_annotation(file, scope, member, "type").or_else(
                            || {
                                member
                                    .child_by_field_name("value")
                                    .map(|value| Self::hint_from_expr(file, scope, value))
                            },
                        );
                        self.symbols[id.0].type_hint = hint;
                    }
                    self.visit_children(file, member, scope);
                }
                _ => self.visit(file, member, scope),
            }
        }
    }

    /// `constructor(private readonly repo: Repo)` declares a property `repo`
    fn declare_parameter_properties(&mut self, file: FileId, ctor: Node<'p>, class: SymbolId) {
        let Some(params) = ctor.child_by_field_name("parameters") else {
            return;
        };
        for param in named_children(params) {
            let is_property = has_modifier(param, "accessibility_modifier")
                || has_modifier(param, "readonly")
                || has_modifier(param, "override_modifier");
            if !is_property {
                continue;
            }
            let Some(pattern) = param.child_by_field_name("pattern") else {
                continue;
            };
            if pattern.kind() != "identifier" {
                continue;
            }
            let name = self.node_text(file, pattern).to_string();
            let id = self.declare_member(
                file,
                class,
                &name,
                pattern,
                param,
                SymbolKind::Property,
                false,
            );
            let ctor_scope = self.scope_at(file, ctor);
            self.symbols[id.0].type_hint = self.hint_from_annotation(file, ctor_scope, param, "type");
            self.param_properties.insert((file, pattern.start_byte()), id);
        }
    }

    /// Declare a member on `owner`, merging accessor pairs and overloads
    #[allow(clippy::too_many_arguments)]
    pub(super) fn declare_member(
        &mut self,
        file: FileId,
        owner: SymbolId,
        name: &str,
        name_node: Node,
        decl_node: Node,
        kind: SymbolKind,
        is_static: bool,
    ) -> SymbolId {
        let declaration = Self::declaration(file, name_node, decl_node);

        let table = if is_static {
            &self.symbols[owner.0].statics
        } else {
            &self.symbols[owner.0].members
        };

        if let Some(existing) = table.get(name).copied() {
            if kind != SymbolKind::Constructor {
                self.symbols[existing.0].declarations.push(declaration);
                self.record_definition(file, name_node, existing);
                return existing;
            }
        }

        let mut symbol = Symbol::new(name, kind);
        symbol.parent = Some(owner);
        symbol.is_static = is_static;
        symbol.declarations.push(declaration);
        let id = self.add_symbol(symbol);
        if kind != SymbolKind::Constructor {
            let owner_symbol = &mut self.symbols[owner.0];
            let table = if is_static {
                &mut owner_symbol.statics
            } else {
                &mut owner_symbol.members
            };
            table.insert(name.to_string(), id);
        }
        self.record_definition(file, name_node, id);
        id
    }

    pub(super) fn declare_interface(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let interface_scope = self.new_scope(file, ScopeKind::Class, Some(scope), Some(node));
        let Some(name) = node.child_by_field_name("name") else {
            self.visit_children(file, node, interface_scope);
            return;
        };
        let interface = self.declare(scope, name, node, SymbolKind::Interface, false);
        self.scopes[interface_scope.0].owner = Some(interface);
        self.declare_type_parameters(node, interface_scope);

        let text = self.text(file);
        for clause in children_of_kind(node, "extends_type_clause") {
            for target in named_children(clause) {
                if let Some(path) = qualified_path(target, text) {
                    self.pending_heritage.push(PendingHeritage {
                        owner: interface,
                        file,
                        scope: interface_scope,
                        path,
                        implements: false,
                    });
                }
            }
        }

        let body = node
            .child_by_field_name("body")
            .or_else(|| super::tree_methods::find_child_by_kind(node, "interface_body"))
            .or_else(|| super::tree_methods::find_child_by_kind(node, "object_type"));
        if let Some(body) = body {
            for member in named_children(body) {
                let kind = match member.kind() {
                    "property_signature" => SymbolKind::Property,
                    "method_signature" => SymbolKind::Method,
                    _ => {
                        self.visit(file, member, interface_scope);
                        continue;
                    }
                };
                if let Some((name_node, member_name)) = declaration_name(member, text) {
                    let id = self.declare_member(
                        file,
                        interface,
                        &member_name,
                        name_node,
                        member,
                        kind,
                        false,
                    );
                    let field = if kind == SymbolKind::Method {
                        "return_type"
                    } else {
                        "type"
                    };
                    if self.symbols[id.0].type_hint.is_none() {
                        self.symbols[id.0].type_hint =
                            self.hint_from_annotation(file, interface_scope, member, field);
                    }
                }
                if kind == SymbolKind::Method {
                    self.visit(file, member, interface_scope);
                } else {
                    self.visit_children(file, member, interface_scope);
                }
            }
        }
    }

    pub(super) fn declare_type_alias(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let alias_scope = self.new_scope(file, ScopeKind::Class, Some(scope), Some(node));
        if let Some(name) = node.child_by_field_name("name") {
            let id = self.declare(scope, name, node, SymbolKind::TypeAlias, false);
            // `type A = B` lets member lookups see through to B
            self.symbols[id.0].type_hint =
                self.hint_from_annotation(file, alias_scope, node, "value");
        }
        self.declare_type_parameters(node, alias_scope);
        if let Some(value) = node.child_by_field_name("value") {
            self.visit(file, value, alias_scope);
        }
    }

    pub(super) fn declare_enum(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let enum_symbol = self.declare(scope, name, node, SymbolKind::Enum, false);
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };

        // Initializers may refer to earlier members unqualified
        let body_scope = self.new_scope(file, ScopeKind::Block, Some(scope), Some(body));
        let text = self.text(file);
        for member in named_children(body) {
            let (name_node, value) = match member.kind() {
                "property_identifier" | "string" => (member, None),
                "enum_assignment" => match member.child_by_field_name("name") {
                    Some(name) => (name, member.child_by_field_name("value")),
                    None => continue,
                },
                _ => continue,
            };
            let raw = &text[name_node.start_byte()..name_node.end_byte()];
            let member_name = crate::project::modules::string_literal_value(raw);
            let id = self.declare_member(
                file,
                enum_symbol,
                &member_name,
                name_node,
                member,
                SymbolKind::EnumMember,
                true,
            );
            self.bind_existing(body_scope, &member_name, id);
            if let Some(value) = value {
                self.visit(file, value, body_scope);
            }
        }
    }

    /// `namespace A.B { ... }`; `declare module "x" { ... }` only opens a scope
    pub(super) fn declare_namespace(&mut self, file: FileId, node: Node<'p>, scope: ScopeId) {
        let body = node.child_by_field_name("body");
        let name = node.child_by_field_name("name");

        let owner = match name {
            Some(name) if name.kind() == "identifier" => {
                Some(self.declare(scope, name, node, SymbolKind::Namespace, false))
            }
            Some(name) if name.kind() == "nested_identifier" => {
                let mut segments = Vec::new();
                collect_nested_segments(name, &mut segments);
                let mut owner: Option<SymbolId> = None;
                for segment in segments {
                    let segment_name = self.node_text(file, segment).to_string();
                    owner = Some(match owner {
                        None => self.declare(scope, segment, node, SymbolKind::Namespace, false),
                        Some(parent) => self.declare_member(
                            file,
                            parent,
                            &segment_name,
                            segment,
                            node,
                            SymbolKind::Namespace,
                            true,
                        ),
                    });
                }
                owner
            }
            _ => None,
        };

        let namespace_scope = self.new_scope(file, ScopeKind::Namespace, Some(scope), Some(node));
        self.scopes[namespace_scope.0].owner = owner;
        if let Some(body) = body {
            self.visit_children(file, body, namespace_scope);
        }
    }
}

fn collect_nested_segments<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    match node.kind() {
        "nested_identifier" | "member_expression" => {
            for child in named_children(node) {
                collect_nested_segments(child, out);
            }
        }
        "identifier" | "property_identifier" => out.push(node),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::semantic::types::SymbolKind;
    use crate::semantic::SemanticModel;
    use crate::test_support::project_with;

    #[test]
    fn test_class_members_and_parameter_properties() {
        let (_dir, mut project) = project_with(&[(
            "a.ts",
            "class Repo {\n  static count = 0;\n  constructor(private readonly db: Db, name: string) {}\n  get size() { return 1; }\n  set size(v) {}\n  async load() {}\n}\ninterface Db {}",
        )]);
        let model = SemanticModel::build(&mut project);
        let repo = model.symbols().iter().find(|s| s.name == "Repo").unwrap();

        assert!(repo.statics.contains_key("count"));
        assert!(repo.members.contains_key("db"), "parameter property becomes a member");
        assert!(!repo.members.contains_key("name"));
        let size = &model.symbols()[repo.members["size"].0];
        assert_eq!(size.kind, SymbolKind::Getter);
        assert_eq!(size.declarations.len(), 2, "getter and setter share one symbol");
        assert_eq!(model.symbols()[repo.members["load"].0].kind, SymbolKind::Method);
    }

    #[test]
    fn test_enum_members_are_static() {
        let (_dir, mut project) = project_with(&[(
            "a.ts",
            "enum Color { Red = 1, Green = Red + 1, 'Blue' }",
        )]);
        let model = SemanticModel::build(&mut project);
        let color = model.symbols().iter().find(|s| s.name == "Color").unwrap();

        let mut names: Vec<&String> = color.statics.keys().collect();
        names.sort();
        assert_eq!(names, vec!["Blue", "Green", "Red"]);
        assert!(model.issues().is_empty(), "Red resolves inside the enum body");
    }

    #[test]
    fn test_nested_namespace_declares_members() {
        let (_dir, mut project) = project_with(&[(
            "a.ts",
            "namespace App.Models { export class User {} }",
        )]);
        let model = SemanticModel::build(&mut project);
        let app = model.symbols().iter().find(|s| s.name == "App").unwrap();
        let models = &model.symbols()[app.statics["Models"].0];
        assert!(models.statics.contains_key("User"));
    }
}
