//! Capability interface over an externally produced syntax tree.
//!
//! The renaming core never sees concrete node types. A front end walks its own
//! tree and reports scopes, declarations and references to a [`SyntaxVisitor`];
//! renames are pushed back through [`SyntaxTree::rename`] by node id.

pub mod document;

use serde::{Deserialize, Serialize};

/// Opaque handle to a name-bearing node, assigned by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Source range in the current pipeline stage's coordinates.
///
/// Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl LineRange {
    #[must_use]
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            start_column: 0,
            end_line,
            end_column: 0,
        }
    }
}

/// Kind of lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    Block,
}

/// What a declared or referenced name is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameCategory {
    Identifier,
    Property,
    EnumMember,
    StringProperty,
    FilePath,
}

impl NameCategory {
    /// Property-like names are renamed program-wide through one table.
    #[must_use]
    pub fn is_property_like(self) -> bool {
        matches!(self, Self::Property | Self::EnumMember | Self::StringProperty)
    }
}

/// Facts about a declaration the front end knows and the core cannot infer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclFlags {
    /// Declared with `export` (or a member of the export surface).
    pub exported: bool,
    /// Import binding whose local name equals the imported name.
    pub imported: bool,
    /// Names a function, method or class; its body scope follows.
    pub function_like: bool,
    /// Member required by the UI framework (struct decorators and the like).
    pub struct_member: bool,
    /// Declared in an ambient context (`declare`, declaration files).
    pub ambient: bool,
    /// `var`-style declaration hoisted to the nearest function scope.
    pub hoisted: bool,
}

/// One declaration reported during a walk.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    pub name: &'a str,
    pub category: NameCategory,
    pub range: LineRange,
    pub flags: DeclFlags,
}

/// Receives the walk of one file.
pub trait SyntaxVisitor {
    fn enter_scope(&mut self, kind: ScopeKind, name: Option<&str>, range: LineRange);
    fn leave_scope(&mut self);
    fn declare(&mut self, node: NodeId, decl: &Declaration<'_>);
    fn reference(&mut self, node: NodeId, category: NameCategory, name: &str);
}

/// A mutable tree the core can enumerate and rename.
pub trait SyntaxTree {
    /// Walk the whole file. The module scope is entered first and left last.
    fn walk(&self, visitor: &mut dyn SyntaxVisitor);

    /// Replace the name carried by `node`.
    fn rename(&mut self, node: NodeId, new_name: &str);
}
