//! Reference pass - bind every identifier use to a symbol
//!
//! Runs after all files are declared and linked. Names are looked up through the scope
//! chain with the meaning their position implies (type positions want types, expression
//! positions want values); property names are bound through the receiver's type.

use tree_sitter::Node;

use super::binder::Binder;
use super::helpers::qualified_path;
use super::tree_methods::{is_field_of, walk_tree};
use super::types::{meaning, BindIssue, Occurrence, Shorthand, SymbolId, SymbolKind};
use crate::project::FileId;

impl<'p> Binder<'p> {
    pub(super) fn resolve_references(&mut self) {
        for index in 0..self.files.len() {
            let file = FileId(index);
            let (occurrences, issues) = self.resolve_file(file);
            self.occurrences.extend(occurrences);
            self.issues.extend(issues);
        }
    }

    fn resolve_file(&self, file: FileId) -> (Vec<Occurrence>, Vec<BindIssue>) {
        let mut occurrences = Vec::new();
        let mut issues = Vec::new();
        let handled = &self.files[file.0].handled;

        walk_tree(self.source(file).root(), &mut |node| {
            if node.is_missing() {
                return;
            }
            if let Some(member) = self.shorthand_property(file, node) {
                occurrences.push(Occurrence {
                    file,
                    start: node.start_byte(),
                    end: node.end_byte(),
                    symbol: member,
                    is_definition: false,
                    is_write: false,
                    shorthand: Shorthand::Property,
                });
            }
            if handled.contains(&node.start_byte()) {
                return;
            }
            let Some(parent) = node.parent() else {
                return;
            };
            let resolved = match node.kind() {
                "identifier" => self.resolve_identifier(file, node, parent, &mut issues),
                "type_identifier" => self.resolve_type_identifier(file, node, parent, &mut issues),
                "property_identifier" | "private_property_identifier" => {
                    self.resolve_property(file, node, parent)
                }
                "shorthand_property_identifier" => {
                    let scope = self.scope_at(file, node);
                    let found = self.lookup(scope, self.node_text(file, node), meaning::VALUE);
                    if found.is_none() {
                        issues.push(self.unresolved(file, node));
                    }
                    found.map(|symbol| (symbol, true))
                }
                "statement_identifier" => {
                    let scope = self.scope_at(file, node);
                    self.lookup(scope, self.node_text(file, node), meaning::LABEL)
                        .map(|symbol| (symbol, false))
                }
                _ => None,
            };

            if let Some((symbol, shorthand)) = resolved {
                let is_write = is_write_position(node);
                if is_write && self.symbols[self.original(symbol).0].kind == SymbolKind::Constant {
                    issues.push(BindIssue::ConstAssignment {
                        file,
                        start: node.start_byte(),
                        name: self.node_text(file, node).to_string(),
                    });
                }
                occurrences.push(Occurrence {
                    file,
                    start: node.start_byte(),
                    end: node.end_byte(),
                    symbol,
                    is_definition: false,
                    is_write,
                    shorthand: if shorthand {
                        Shorthand::Binding
                    } else {
                        Shorthand::Plain
                    },
                });
            }
        });

        (occurrences, issues)
    }

    fn resolve_identifier(
        &self,
        file: FileId,
        node: Node,
        parent: Node,
        issues: &mut Vec<BindIssue>,
    ) -> Option<(SymbolId, bool)> {
        let name = self.node_text(file, node);
        match parent.kind() {
            "meta_property" => return None,
            "nested_identifier" | "nested_type_identifier" => {
                if let Some(found) = self.resolve_qualified_segment(file, node, parent) {
                    return Some((found, false));
                }
            }
            // `<div>` is an intrinsic element, `<Widget>` a component
            "jsx_opening_element" | "jsx_closing_element" | "jsx_self_closing_element"
                if name.starts_with(|c: char| c.is_ascii_lowercase()) =>
            {
                return None
            }
            _ => {}
        }

        let mask = match parent.kind() {
            "nested_identifier" | "nested_type_identifier" => meaning::NAMESPACE | meaning::VALUE,
            _ => meaning::VALUE,
        };
        let scope = self.scope_at(file, node);
        match self.lookup(scope, name, mask) {
            Some(symbol) => Some((symbol, false)),
            None => {
                if !parent.is_error() && !is_member_name_position(node, parent) {
                    issues.push(self.unresolved(file, node));
                }
                None
            }
        }
    }

    /// Later segments of `a.b.C` in namespace and type positions
    fn resolve_qualified_segment(&self, file: FileId, node: Node, parent: Node) -> Option<SymbolId> {
        let first = parent.named_child(0)?;
        if first.id() == node.id() {
            return None;
        }
        let prefix = qualified_path(first, self.text(file))?;
        let scope = self.scope_at(file, node);
        let owner = self.resolve_path(scope, &prefix, meaning::NAMESPACE | meaning::VALUE)?;
        self.static_member(owner, self.node_text(file, node))
    }

    fn resolve_type_identifier(
        &self,
        file: FileId,
        node: Node,
        parent: Node,
        issues: &mut Vec<BindIssue>,
    ) -> Option<(SymbolId, bool)> {
        if parent.kind() == "nested_type_identifier" && is_field_of(node, parent, "name") {
            return self
                .resolve_qualified_segment(file, node, parent)
                .map(|symbol| (symbol, false));
        }
        let scope = self.scope_at(file, node);
        match self.lookup(scope, self.node_text(file, node), meaning::TYPE) {
            Some(symbol) => Some((symbol, false)),
            None => {
                if !parent.is_error() {
                    issues.push(self.unresolved(file, node));
                }
                None
            }
        }
    }

    fn resolve_property(&self, file: FileId, node: Node, parent: Node) -> Option<(SymbolId, bool)> {
        match parent.kind() {
            "member_expression" if is_field_of(node, parent, "property") => {
                self.member_symbol(file, parent, 0).map(|symbol| (symbol, false))
            }
            // `{ key: value }` initializing a variable with a declared type
            "pair" if is_field_of(node, parent, "key") => {
                let object = parent.parent()?;
                let receiver = self.object_literal_type(file, object)?;
                self.lookup_member(receiver, self.node_text(file, node))
                    .map(|symbol| (symbol, false))
            }
            // `{ key: local }` destructuring a value of known type
            "pair_pattern" if is_field_of(node, parent, "key") => {
                let receiver = self.object_pattern_type(file, parent.parent()?, 0)?;
                self.lookup_member(receiver, self.node_text(file, node))
                    .map(|symbol| (symbol, false))
            }
            "nested_identifier" => self
                .resolve_qualified_segment(file, node, parent)
                .map(|symbol| (symbol, false)),
            _ => None,
        }
    }

    /// The property a `{ name }` shorthand stands for besides its local value: a
    /// member of the destructured type, or of a typed object literal's declared type
    fn shorthand_property(&self, file: FileId, node: Node) -> Option<SymbolId> {
        let receiver = match node.kind() {
            "shorthand_property_identifier_pattern" => {
                let mut pattern = node.parent()?;
                if pattern.kind() == "object_assignment_pattern" {
                    pattern = pattern.parent()?;
                }
                if pattern.kind() != "object_pattern" {
                    return None;
                }
                self.object_pattern_type(file, pattern, 0)?
            }
            "shorthand_property_identifier" => self.object_literal_type(file, node.parent()?)?,
            _ => return None,
        };
        self.lookup_member(receiver, self.node_text(file, node))
    }

    fn unresolved(&self, file: FileId, node: Node) -> BindIssue {
        BindIssue::Unresolved {
            file,
            start: node.start_byte(),
            name: self.node_text(file, node).to_string(),
        }
    }
}

/// Left side of an assignment, or the operand of `++`/`--`
fn is_write_position(node: Node) -> bool {
    let mut target = node;
    if let Some(parent) = node.parent() {
        if parent.kind() == "member_expression" && is_field_of(node, parent, "property") {
            target = parent;
        }
    }
    let Some(parent) = target.parent() else {
        return false;
    };
    match parent.kind() {
        "assignment_expression" | "augmented_assignment_expression" => {
            is_field_of(target, parent, "left")
        }
        "update_expression" => is_field_of(target, parent, "argument"),
        _ => false,
    }
}

/// Identifier positions that name something rather than refer to it
fn is_member_name_position(node: Node, parent: Node) -> bool {
    match parent.kind() {
        "labeled_statement" | "break_statement" | "continue_statement" => true,
        "pair" | "pair_pattern" => is_field_of(node, parent, "key"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::semantic::types::{BindIssue, Shorthand};
    use crate::semantic::SemanticModel;
    use crate::test_support::project_with;

    #[test]
    fn test_shadowing_resolves_to_innermost() {
        let src = "let x = 1;\nfunction f() { let x = 2; return x; }\nx;\n";
        let (_dir, mut project) = project_with(&[("a.ts", src)]);
        let model = SemanticModel::build(&mut project);
        let file = project.file_id(&project.root().join("a.ts")).unwrap();

        let inner_use = src.find("return x").unwrap() + "return ".len();
        let inner_decl = src.find("let x = 2").unwrap() + "let ".len();
        let a = model.occurrence_at(file, inner_use).unwrap();
        let b = model.occurrence_at(file, inner_decl).unwrap();
        assert_eq!(a.symbol, b.symbol);

        let outer_use = src.rfind("x;").unwrap();
        let outer = model.occurrence_at(file, outer_use).unwrap();
        assert_ne!(outer.symbol, a.symbol);
    }

    #[test]
    fn test_const_assignment_and_unresolved_names() {
        let (_dir, mut project) =
            project_with(&[("a.ts", "const limit = 1;\nlimit = 2;\nmissing();\n")]);
        let model = SemanticModel::build(&mut project);
        assert!(model
            .issues()
            .iter()
            .any(|i| matches!(i, BindIssue::ConstAssignment { name, .. } if name == "limit")));
        assert!(model
            .issues()
            .iter()
            .any(|i| matches!(i, BindIssue::Unresolved { name, .. } if name == "missing")));
    }

    #[test]
    fn test_write_flag_and_shorthand() {
        let src = "let count = 0;\ncount += 1;\nconst o = { count };\n";
        let (_dir, mut project) = project_with(&[("a.ts", src)]);
        let model = SemanticModel::build(&mut project);
        let file = project.file_id(&project.root().join("a.ts")).unwrap();

        let write = model.occurrence_at(file, src.find("count +=").unwrap()).unwrap();
        assert!(write.is_write);
        let short = model.occurrence_at(file, src.rfind("count").unwrap()).unwrap();
        assert_eq!(short.shorthand, Shorthand::Binding);
    }

    #[test]
    fn test_destructured_shorthand_binds_local_and_member() {
        let src = "interface User { name: string }
                   declare const u: User;
                   const { name } = u;
                   function show({ name: shown }: User) { return shown; }
";
        let (_dir, mut project) = project_with(&[("a.ts", src)]);
        let model = SemanticModel::build(&mut project);
        let file = project.file_id(&project.root().join("a.ts")).unwrap();
        let member = model
            .occurrence_at(file, src.find("name:").unwrap())
            .unwrap()
            .symbol;

        let site = src.find("{ name }").unwrap() + 2;
        let local = model.occurrence_at(file, site).unwrap();
        assert!(local.is_definition);
        assert_eq!(local.shorthand, Shorthand::Binding);
        assert_ne!(local.symbol, member);

        let uses = model.occurrences_of(&[member]);
        let starts: Vec<usize> = uses.iter().map(|o| o.start).collect();
        let key = src.find("name: shown").unwrap();
        assert_eq!(starts, vec![src.find("name:").unwrap(), site, key]);
        assert_eq!(uses[1].shorthand, Shorthand::Property);
        assert_eq!(uses[2].shorthand, Shorthand::Plain);
    }
}
