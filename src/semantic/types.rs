// Semantic model types
//
// Symbols, declarations, scopes and occurrences. Everything is addressed by file id and
// byte range so the model never borrows from the syntax trees it was built from.

use serde::Serialize;
use std::collections::HashMap;

use crate::project::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// Meaning bits: what kind of name lookup a symbol satisfies
pub mod meaning {
    pub const VALUE: u8 = 1;
    pub const TYPE: u8 = 2;
    pub const NAMESPACE: u8 = 4;
    pub const LABEL: u8 = 8;
    pub const ALL: u8 = VALUE | TYPE | NAMESPACE;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Variable,
    Constant,
    Function,
    Class,
    Interface,
    TypeAlias,
    Enum,
    EnumMember,
    Namespace,
    Parameter,
    TypeParameter,
    Property,
    Method,
    Constructor,
    Getter,
    Setter,
    /// Import or export binding that stands for another symbol
    Alias,
    Label,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum_member",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Parameter => "parameter",
            SymbolKind::TypeParameter => "type_parameter",
            SymbolKind::Property => "property",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Getter => "getter",
            SymbolKind::Setter => "setter",
            SymbolKind::Alias => "alias",
            SymbolKind::Label => "label",
        }
    }

    /// Default meaning bits for a freshly declared symbol of this kind
    pub fn meaning(self) -> u8 {
        use meaning::*;
        match self {
            SymbolKind::Class | SymbolKind::Enum => VALUE | TYPE,
            SymbolKind::Interface | SymbolKind::TypeAlias | SymbolKind::TypeParameter => TYPE,
            SymbolKind::Namespace => VALUE | NAMESPACE,
            SymbolKind::Alias => ALL,
            SymbolKind::Label => LABEL,
            _ => VALUE,
        }
    }

    /// Class/interface members (instance or static)
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Property
                | SymbolKind::Method
                | SymbolKind::Getter
                | SymbolKind::Setter
                | SymbolKind::Constructor
        )
    }

    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declaration site of a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub file: FileId,
    /// Byte range of the declared name
    pub name_start: usize,
    pub name_end: usize,
    /// Byte range of the whole declaring node
    pub node_start: usize,
    pub node_end: usize,
    pub node_kind: &'static str,
}

/// Where a type hint should be looked up
#[derive(Debug, Clone, PartialEq)]
pub enum HintKind {
    /// A type reference such as `Foo`, `ns.Foo` or `Promise<Foo>` (unwrapped)
    Named(Vec<String>),
    /// An initializer expression whose type is inferred on demand
    Expr { start: usize, end: usize },
}

/// Declared or inferred type of a value, or the return type of a function
#[derive(Debug, Clone, PartialEq)]
pub struct TypeHint {
    pub file: FileId,
    pub scope: ScopeId,
    pub kind: HintKind,
}

/// What an alias stands for, before linking
#[derive(Debug, Clone, PartialEq)]
pub enum AliasTarget {
    /// `name` exported by a module (`None` when the module did not resolve to a file)
    Export {
        module: Option<FileId>,
        name: String,
    },
    /// The whole module (`import * as ns`, `export * as ns`)
    Module(Option<FileId>),
    /// A local name (`export { a as b }`)
    Local { scope: ScopeId, name: String },
}

/// Resolved base types of a class or interface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heritage {
    pub extends: Vec<SymbolId>,
    pub implements: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub meaning: u8,
    pub declarations: Vec<Declaration>,
    /// Owning class/interface/enum/namespace for members
    pub parent: Option<SymbolId>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub block_scoped: bool,
    pub exported: bool,
    /// Instance-side members (classes, interfaces)
    pub members: HashMap<String, SymbolId>,
    /// Static side: class statics, enum members, namespace exports
    pub statics: HashMap<String, SymbolId>,
    pub heritage: Heritage,
    pub type_hint: Option<TypeHint>,
    /// For non-aliased imports: the symbol this binding stands for
    pub redirect: Option<SymbolId>,
    /// For aliases: the linked target symbol
    pub alias_of: Option<SymbolId>,
    /// For namespace aliases: the linked module
    pub alias_module: Option<FileId>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            meaning: kind.meaning(),
            declarations: Vec::new(),
            parent: None,
            is_static: false,
            is_abstract: false,
            block_scoped: false,
            exported: false,
            members: HashMap::new(),
            statics: HashMap::new(),
            heritage: Heritage::default(),
            type_hint: None,
            redirect: None,
            alias_of: None,
            alias_module: None,
        }
    }

    pub fn first_declaration(&self) -> Option<&Declaration> {
        self.declarations.first()
    }
}

/// A bound identifier occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
    pub symbol: SymbolId,
    pub is_definition: bool,
    pub is_write: bool,
    pub shorthand: Shorthand,
}

/// Which side of a `{ name }` shorthand an occurrence stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
    Plain,
    /// The local binding or value; renaming expands to `name: newName`
    Binding,
    /// The property of the destructured or initialized type; renaming expands to
    /// `newName: name`
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
    Class,
    Namespace,
    /// `declare global { ... }` bodies
    Global,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub file: FileId,
    /// Namespace or class symbol that owns this scope
    pub owner: Option<SymbolId>,
    pub names: HashMap<String, Vec<SymbolId>>,
}

/// One entry in a module's export table
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEntry {
    Symbol(SymbolId),
    /// Resolved against the module scope at link time
    Local(String),
    ReExport {
        module: Option<FileId>,
        name: String,
    },
}

/// Problems found while binding, reported by the diagnostics collector
#[derive(Debug, Clone, PartialEq)]
pub enum BindIssue {
    /// Non-mergeable redeclaration
    Duplicate {
        file: FileId,
        start: usize,
        name: String,
        block_scoped: bool,
    },
    /// Name that resolves to no declaration
    Unresolved {
        file: FileId,
        start: usize,
        name: String,
    },
    /// Named import the target module does not export
    MissingExport {
        file: FileId,
        start: usize,
        module: String,
        name: String,
    },
    /// Write to a `const` binding
    ConstAssignment {
        file: FileId,
        start: usize,
        name: String,
    },
}
