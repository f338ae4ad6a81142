//! Scope tree and bindings for one file.
//!
//! Built in a single walk over a [`SyntaxTree`](crate::tree::SyntaxTree):
//! scopes are pushed and popped as the front end reports them, every
//! declaration becomes (or joins) a [`Binding`], and every reference is kept
//! with the scope it occurred in so renames can be resolved afterwards.

use crate::tree::{DeclFlags, Declaration, LineRange, NameCategory, NodeId, ScopeKind, SyntaxVisitor};
use std::collections::{BTreeSet, HashMap, HashSet};

pub type ScopeId = usize;

/// Root scope of every tree.
pub const ROOT_SCOPE: ScopeId = 0;

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: Option<String>,
    pub range: LineRange,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Identifier names introduced directly here, in declaration order.
    pub declared: Vec<String>,
    /// Original name -> mangled name, filled in by the renaming engine.
    pub renames: HashMap<String, String>,
}

impl Scope {
    fn new(kind: ScopeKind, name: Option<String>, range: LineRange, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            name,
            range,
            parent,
            children: Vec::new(),
            declared: Vec::new(),
            renames: HashMap::new(),
        }
    }

    /// Label used in scope paths.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => match self.kind {
                ScopeKind::Module => String::new(),
                ScopeKind::Function => "<function>".to_string(),
                ScopeKind::Class => "<class>".to_string(),
                ScopeKind::Block => "<block>".to_string(),
            },
        }
    }
}

/// Arena of scopes. Parents own children by index; `parent` is a lookup link.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Module, None, LineRange::default(), None)],
        }
    }

    pub fn add_scope(
        &mut self,
        kind: ScopeKind,
        name: Option<String>,
        range: LineRange,
        parent: ScopeId,
    ) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(kind, name, range, Some(parent)));
        self.scopes[parent].children.push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scope ids in creation order, which is parent-before-child.
    pub fn ids(&self) -> impl Iterator<Item = ScopeId> {
        0..self.scopes.len()
    }

    /// Record `name` as declared directly in `scope`. Returns false if it
    /// already was.
    pub fn declare(&mut self, scope: ScopeId, name: &str) -> bool {
        let s = &mut self.scopes[scope];
        if s.declared.iter().any(|n| n == name) {
            return false;
        }
        s.declared.push(name.to_string());
        true
    }

    /// Nearest function or module scope, for `var` hoisting.
    #[must_use]
    pub fn hoist_target(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let s = &self.scopes[current];
            if matches!(s.kind, ScopeKind::Function | ScopeKind::Module) {
                return current;
            }
            match s.parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    /// Labels from the root down to `scope`.
    #[must_use]
    pub fn scope_path(&self, scope: ScopeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if id != ROOT_SCOPE {
                path.push(self.scopes[id].label());
            }
            current = self.scopes[id].parent;
        }
        path.reverse();
        path
    }

    /// Names declared in `scope` or any ancestor.
    #[must_use]
    pub fn visible_names(&self, scope: ScopeId) -> HashSet<&str> {
        let mut names = HashSet::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            names.extend(self.scopes[id].declared.iter().map(String::as_str));
            current = self.scopes[id].parent;
        }
        names
    }

    /// Scope that declares `name` as seen from `scope`.
    #[must_use]
    pub fn declaring_scope(&self, name: &str, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id].declared.iter().any(|n| n == name) {
                return Some(id);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Names already taken in the ancestors of `scope`: their mangled names
    /// and any original names left as they were.
    #[must_use]
    pub fn ancestor_names(&self, scope: ScopeId) -> HashSet<String> {
        let mut names = HashSet::new();
        let mut current = self.scopes[scope].parent;
        while let Some(id) = current {
            let s = &self.scopes[id];
            names.extend(s.renames.values().cloned());
            for original in &s.declared {
                if !s.renames.contains_key(original) {
                    names.insert(original.clone());
                }
            }
            current = s.parent;
        }
        names
    }

    /// Mangled name for `name` referenced from `scope`, walking up the chain.
    /// `None` when the name is free or declared but kept.
    #[must_use]
    pub fn resolve(&self, name: &str, scope: ScopeId) -> Option<&str> {
        let id = self.declaring_scope(name, scope)?;
        self.scopes[id].renames.get(name).map(String::as_str)
    }
}

/// One declared name occurrence, merged across redeclarations.
#[derive(Debug, Clone)]
pub struct Binding {
    pub category: NameCategory,
    pub original_name: String,
    pub scope: ScopeId,
    pub scope_path: Vec<String>,
    pub range: LineRange,
    pub flags: DeclFlags,
    /// Every node that declares this binding.
    pub nodes: Vec<NodeId>,
    pub mangled_name: Option<String>,
}

impl Binding {
    /// Key in the name cache: `name:startLine:endLine` for function-like
    /// declarations, `outer#inner#name` for other nested bindings, the bare
    /// name at module level.
    #[must_use]
    pub fn cache_key(&self) -> String {
        if self.flags.function_like {
            format!(
                "{}:{}:{}",
                self.original_name, self.range.start_line, self.range.end_line
            )
        } else if self.scope_path.is_empty() {
            self.original_name.clone()
        } else {
            format!("{}#{}", self.scope_path.join("#"), self.original_name)
        }
    }

    /// Whether this binding lives directly in the module scope.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.scope == ROOT_SCOPE
    }
}

/// A name use reported by the walk.
#[derive(Debug, Clone)]
pub struct Reference {
    pub node: NodeId,
    pub category: NameCategory,
    pub name: String,
    pub scope: ScopeId,
}

/// Scopes, bindings and references of one file.
#[derive(Debug, Clone, Default)]
pub struct FileScopes {
    pub tree: ScopeTree,
    pub bindings: Vec<Binding>,
    pub references: Vec<Reference>,
}

impl FileScopes {
    /// Identifier names referenced but declared nowhere in the file.
    #[must_use]
    pub fn unresolved_names(&self) -> BTreeSet<String> {
        self.references
            .iter()
            .filter(|r| r.category == NameCategory::Identifier)
            .filter(|r| self.tree.declaring_scope(&r.name, r.scope).is_none())
            .map(|r| r.name.clone())
            .collect()
    }

    /// Every property-like name declared or referenced.
    #[must_use]
    pub fn property_names(&self) -> BTreeSet<String> {
        let declared = self
            .bindings
            .iter()
            .filter(|b| b.category.is_property_like())
            .map(|b| b.original_name.clone());
        let referenced = self
            .references
            .iter()
            .filter(|r| r.category.is_property_like())
            .map(|r| r.name.clone());
        declared.chain(referenced).collect()
    }
}

/// [`SyntaxVisitor`] that builds [`FileScopes`].
#[derive(Debug, Default)]
pub struct ScopeBuilder {
    out: FileScopes,
    stack: Vec<ScopeId>,
    /// (scope, name) -> binding index, for identifiers.
    identifiers: HashMap<(ScopeId, String), usize>,
    /// (category, cache key) -> binding index, for everything else.
    members: HashMap<(NameCategory, String), usize>,
}

impl ScopeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn finish(self) -> FileScopes {
        self.out
    }

    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ROOT_SCOPE)
    }

    fn push_binding(&mut self, node: NodeId, decl: &Declaration<'_>, scope: ScopeId) -> usize {
        let idx = self.out.bindings.len();
        self.out.bindings.push(Binding {
            category: decl.category,
            original_name: decl.name.to_string(),
            scope,
            scope_path: self.out.tree.scope_path(scope),
            range: decl.range,
            flags: decl.flags,
            nodes: vec![node],
            mangled_name: None,
        });
        idx
    }
}

impl SyntaxVisitor for ScopeBuilder {
    fn enter_scope(&mut self, kind: ScopeKind, name: Option<&str>, range: LineRange) {
        if self.stack.is_empty() && kind == ScopeKind::Module {
            let root = self.out.tree.get_mut(ROOT_SCOPE);
            root.name = name.map(str::to_string);
            root.range = range;
            self.stack.push(ROOT_SCOPE);
            return;
        }
        let parent = self.current();
        let id = self
            .out
            .tree
            .add_scope(kind, name.map(str::to_string), range, parent);
        self.stack.push(id);
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }

    fn declare(&mut self, node: NodeId, decl: &Declaration<'_>) {
        let current = self.current();

        if decl.category != NameCategory::Identifier {
            let key = if decl.flags.function_like {
                format!("{}:{}:{}", decl.name, decl.range.start_line, decl.range.end_line)
            } else {
                decl.name.to_string()
            };
            match self.members.get(&(decl.category, key.clone())) {
                Some(&idx) => self.out.bindings[idx].nodes.push(node),
                None => {
                    let idx = self.push_binding(node, decl, current);
                    self.members.insert((decl.category, key), idx);
                }
            }
            return;
        }

        let scope = if decl.flags.hoisted {
            self.out.tree.hoist_target(current)
        } else {
            current
        };
        // A parameter that is declared again in the same scope stays one binding.
        if let Some(&idx) = self.identifiers.get(&(scope, decl.name.to_string())) {
            let binding = &mut self.out.bindings[idx];
            binding.nodes.push(node);
            binding.flags.exported |= decl.flags.exported;
            binding.flags.function_like |= decl.flags.function_like;
            return;
        }
        self.out.tree.declare(scope, decl.name);
        let idx = self.push_binding(node, decl, scope);
        self.identifiers.insert((scope, decl.name.to_string()), idx);
    }

    fn reference(&mut self, node: NodeId, category: NameCategory, name: &str) {
        let scope = self.current();
        self.out.references.push(Reference {
            node,
            category,
            name: name.to_string(),
            scope,
        });
    }
}

/// Walk `tree` and build its scopes.
pub fn collect(tree: &dyn crate::tree::SyntaxTree) -> FileScopes {
    let mut builder = ScopeBuilder::new();
    tree.walk(&mut builder);
    builder.finish()
}
