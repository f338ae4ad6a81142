//! JSON reference tree.
//!
//! Front ends that cannot link against the core directly dump their
//! declarations in this shape; the CLI loads it, renames it and writes it
//! back for the printer.
//!
//! ```json
//! { "path": "src/Demo.ts", "body": [
//!   { "type": "declare", "id": 1, "name": "Demo", "category": "identifier",
//!     "flags": { "functionLike": true } },
//!   { "type": "scope", "kind": "class", "name": "Demo", "body": [] }
//! ] }
//! ```

use super::{
    DeclFlags, Declaration, LineRange, NameCategory, NodeId, ScopeKind, SyntaxTree,
    SyntaxVisitor,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocNode {
    Scope {
        kind: ScopeKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        range: LineRange,
        #[serde(default)]
        body: Vec<DocNode>,
    },
    Declare {
        id: NodeId,
        name: String,
        category: NameCategory,
        #[serde(default)]
        range: LineRange,
        #[serde(default)]
        flags: DeclFlags,
    },
    Reference {
        id: NodeId,
        name: String,
        category: NameCategory,
    },
}

/// One source file's declarations and references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: String,
    #[serde(default)]
    pub body: Vec<DocNode>,
}

impl SourceDocument {
    #[must_use]
    pub fn new(path: impl Into<String>, body: Vec<DocNode>) -> Self {
        Self {
            path: path.into(),
            body,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::other(format!("invalid syntax document: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::other(format!("failed to serialize syntax document: {e}")))
    }

    /// Current name of `node`, if present.
    #[must_use]
    pub fn name_of(&self, node: NodeId) -> Option<&str> {
        find(&self.body, node)
    }
}

fn find(nodes: &[DocNode], target: NodeId) -> Option<&str> {
    for node in nodes {
        match node {
            DocNode::Scope { body, .. } => {
                if let Some(name) = find(body, target) {
                    return Some(name);
                }
            }
            DocNode::Declare { id, name, .. } | DocNode::Reference { id, name, .. } => {
                if *id == target {
                    return Some(name.as_str());
                }
            }
        }
    }
    None
}

fn rename_in(nodes: &mut [DocNode], target: NodeId, new_name: &str) -> bool {
    for node in nodes {
        match node {
            DocNode::Scope { body, .. } => {
                if rename_in(body, target, new_name) {
                    return true;
                }
            }
            DocNode::Declare { id, name, .. } | DocNode::Reference { id, name, .. } => {
                if *id == target {
                    *name = new_name.to_string();
                    return true;
                }
            }
        }
    }
    false
}

fn walk_nodes(nodes: &[DocNode], visitor: &mut dyn SyntaxVisitor) {
    for node in nodes {
        match node {
            DocNode::Scope {
                kind,
                name,
                range,
                body,
            } => {
                visitor.enter_scope(*kind, name.as_deref(), *range);
                walk_nodes(body, visitor);
                visitor.leave_scope();
            }
            DocNode::Declare {
                id,
                name,
                category,
                range,
                flags,
            } => visitor.declare(
                *id,
                &Declaration {
                    name,
                    category: *category,
                    range: *range,
                    flags: *flags,
                },
            ),
            DocNode::Reference { id, name, category } => {
                visitor.reference(*id, *category, name);
            }
        }
    }
}

impl SyntaxTree for SourceDocument {
    fn walk(&self, visitor: &mut dyn SyntaxVisitor) {
        visitor.enter_scope(ScopeKind::Module, None, LineRange::default());
        walk_nodes(&self.body, visitor);
        visitor.leave_scope();
    }

    fn rename(&mut self, node: NodeId, new_name: &str) {
        if !rename_in(&mut self.body, node, new_name) {
            tracing::debug!(node = node.0, path = %self.path, "rename target not found");
        }
    }
}

/// Small constructors used by tests and front-end adapters.
pub mod build {
    use super::{DeclFlags, DocNode, LineRange, NameCategory, NodeId, ScopeKind};

    #[must_use]
    pub fn scope(kind: ScopeKind, name: Option<&str>, range: LineRange, body: Vec<DocNode>) -> DocNode {
        DocNode::Scope {
            kind,
            name: name.map(str::to_string),
            range,
            body,
        }
    }

    #[must_use]
    pub fn declare(id: u32, name: &str, category: NameCategory) -> DocNode {
        declare_with(id, name, category, LineRange::default(), DeclFlags::default())
    }

    #[must_use]
    pub fn declare_with(
        id: u32,
        name: &str,
        category: NameCategory,
        range: LineRange,
        flags: DeclFlags,
    ) -> DocNode {
        DocNode::Declare {
            id: NodeId(id),
            name: name.to_string(),
            category,
            range,
            flags,
        }
    }

    #[must_use]
    pub fn ident(id: u32, name: &str) -> DocNode {
        declare(id, name, NameCategory::Identifier)
    }

    #[must_use]
    pub fn reference(id: u32, name: &str, category: NameCategory) -> DocNode {
        DocNode::Reference {
            id: NodeId(id),
            name: name.to_string(),
            category,
        }
    }

    #[must_use]
    pub fn ident_ref(id: u32, name: &str) -> DocNode {
        reference(id, name, NameCategory::Identifier)
    }

    #[must_use]
    pub fn prop_ref(id: u32, name: &str) -> DocNode {
        reference(id, name, NameCategory::Property)
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    struct Recorder(Vec<String>);

    impl SyntaxVisitor for Recorder {
        fn enter_scope(&mut self, kind: ScopeKind, name: Option<&str>, _range: LineRange) {
            self.0.push(format!("enter {kind:?} {}", name.unwrap_or("-")));
        }
        fn leave_scope(&mut self) {
            self.0.push("leave".into());
        }
        fn declare(&mut self, node: NodeId, decl: &Declaration<'_>) {
            self.0.push(format!("decl {} {}", node.0, decl.name));
        }
        fn reference(&mut self, node: NodeId, _category: NameCategory, name: &str) {
            self.0.push(format!("ref {} {name}", node.0));
        }
    }

    #[test]
    fn test_walk_order_wraps_module_scope() {
        let doc = SourceDocument::new(
            "a.ts",
            vec![
                ident(1, "foo"),
                scope(ScopeKind::Function, Some("foo"), LineRange::lines(1, 3), vec![ident_ref(2, "foo")]),
            ],
        );
        let mut rec = Recorder(Vec::new());
        doc.walk(&mut rec);
        assert_eq!(
            rec.0,
            vec![
                "enter Module -",
                "decl 1 foo",
                "enter Function foo",
                "ref 2 foo",
                "leave",
                "leave"
            ]
        );
    }

    #[test]
    fn test_rename_nested_node() {
        let mut doc = SourceDocument::new(
            "a.ts",
            vec![scope(ScopeKind::Block, None, LineRange::default(), vec![ident(7, "value")])],
        );
        doc.rename(NodeId(7), "a");
        assert_eq!(doc.name_of(NodeId(7)), Some("a"));
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "path": "src/Demo.ts",
            "body": [
                { "type": "declare", "id": 1, "name": "Demo", "category": "identifier",
                  "range": { "startLine": 1, "startColumn": 0, "endLine": 4, "endColumn": 1 },
                  "flags": { "functionLike": true, "exported": true } },
                { "type": "scope", "kind": "class", "name": "Demo", "body": [
                    { "type": "declare", "id": 2, "name": "title", "category": "property" }
                ] },
                { "type": "reference", "id": 3, "name": "./utils", "category": "filePath" }
            ]
        }"#;
        let doc = SourceDocument::from_json(json).unwrap();
        assert_eq!(doc.body.len(), 3);
        match &doc.body[0] {
            DocNode::Declare { flags, range, .. } => {
                assert!(flags.function_like && flags.exported && !flags.ambient);
                assert_eq!(range.end_line, 4);
            }
            other => panic!("unexpected node {other:?}"),
        }
        let round = SourceDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(round, doc);
    }
}
