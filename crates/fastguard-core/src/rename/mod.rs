//! Renaming engine.
//!
//! One file at a time: collect its scopes, decide for every binding whether it
//! is kept, renamed per scope, or renamed through a program-wide table, then
//! push the new names into the tree.
//!
//! Scope renaming walks parents before children. Within a scope a fresh
//! generator produces candidates; a candidate is rejected when an ancestor
//! already uses it, when another binding of the same scope is called that,
//! when the file or program references it as a free global, or when the
//! whitelist reserves it. Together these keep every renamed reference
//! resolving to the same binding it resolved to before.

pub mod tables;

use crate::context::ObfuscationContext;
use crate::name_cache::FileCache;
use crate::namegen::{is_identifier, NameGenerator};
use crate::scope::{self, Binding, FileScopes, ScopeId, ROOT_SCOPE};
use crate::tree::{NameCategory, SyntaxTree};
use crate::whitelist::ReservedKind;
use std::collections::HashSet;

/// The file being renamed.
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    /// Project-relative path, used as the name cache key.
    pub path: &'a str,
    /// Matched by `-keep`; nothing in it is renamed.
    pub kept: bool,
}

/// What happened to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub renamed: usize,
    pub kept: usize,
    /// New path when file names are obfuscated.
    pub obf_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Keep,
    Scope,
    Table,
}

/// Feed one file's names into the whitelist and the free-name set.
///
/// Every file of the compilation goes through here before any is renamed, so
/// export surfaces and string-literal properties seen late still protect
/// earlier files.
pub fn register_file(ctx: &mut ObfuscationContext, file: &FileContext<'_>, scopes: &FileScopes) {
    ctx.free_names.extend(scopes.unresolved_names());
    let mode = ctx.settings.mode;

    for binding in &scopes.bindings {
        let name = binding.original_name.as_str();
        if file.kept && binding.category != NameCategory::FilePath {
            ctx.whitelist.add_kept_file_name(name);
        }
        if binding.category == NameCategory::Identifier && binding.is_top_level() {
            let surface = binding.flags.exported || binding.flags.imported;
            if !mode.toplevel && !(surface && mode.export) {
                ctx.pinned_names.insert(name.to_string());
            }
        }
        if binding.flags.struct_member {
            ctx.whitelist.add_struct_member(name);
        }
        match binding.category {
            NameCategory::Identifier if binding.flags.exported || binding.flags.imported => {
                ctx.whitelist.add_exported_name(name);
            }
            NameCategory::Property if binding.flags.exported => {
                ctx.whitelist.add_exported_property(name);
            }
            NameCategory::EnumMember if binding.flags.ambient => {
                ctx.whitelist.add_enum_member(name);
            }
            NameCategory::StringProperty => ctx.whitelist.add_string_property(name),
            _ => {}
        }
    }

    for reference in &scopes.references {
        if reference.category == NameCategory::StringProperty {
            ctx.whitelist.add_string_property(&reference.name);
        }
    }
}

/// Rename one file in place and record its names in the context.
pub fn rename_file(
    ctx: &mut ObfuscationContext,
    file: &FileContext<'_>,
    tree: &mut dyn SyntaxTree,
) -> FileOutcome {
    let scopes = scope::collect(tree);
    if !ctx.settings.enabled || file.kept {
        tracing::debug!(path = file.path, kept = file.kept, "file left as-is");
        return FileOutcome {
            kept: scopes.bindings.len(),
            ..FileOutcome::default()
        };
    }

    let history = ctx.file_history.get(file.path).cloned().unwrap_or_default();
    let mut renamer = FileRenamer {
        ctx,
        history,
        forbidden: scopes.unresolved_names().into_iter().collect(),
        record: FileCache::default(),
        outcome: FileOutcome::default(),
    };
    let mut scopes = scopes;
    renamer.run(file, &mut scopes, tree);

    let FileRenamer {
        ctx,
        record,
        outcome,
        ..
    } = renamer;
    tracing::debug!(
        path = file.path,
        renamed = outcome.renamed,
        kept = outcome.kept,
        "renamed file"
    );
    ctx.file_results.insert(file.path.to_string(), record);
    outcome
}

/// Obfuscated form of a relative path. Each segment keeps everything from its
/// first `.` on; `.`, `..` and empty segments pass through.
pub fn obfuscate_path(ctx: &mut ObfuscationContext, path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.is_empty() || segment == "." || segment == ".." {
                return segment.to_string();
            }
            let (stem, rest) = match segment.find('.') {
                Some(0) | None => (segment, ""),
                Some(i) => segment.split_at(i),
            };
            let reasons = ctx.whitelist.reasons(ReservedKind::FileName, stem);
            if !reasons.is_empty() {
                if ctx.settings.record_kept {
                    ctx.kept.record(ReservedKind::FileName, stem, &reasons);
                }
                return segment.to_string();
            }
            let whitelist = &ctx.whitelist;
            let mangled = ctx
                .file_names
                .assign(stem, &|c| whitelist.is_reserved(ReservedKind::FileName, c));
            format!("{mangled}{rest}")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Program-wide name for a property or exported top-level identifier. The
/// name may land in any file's module scope, so it must not be one that any
/// file leaves unrenamed there.
fn assign_in_table(ctx: &mut ObfuscationContext, forbidden: &HashSet<String>, name: &str) -> String {
    let ObfuscationContext {
        whitelist,
        free_names,
        pinned_names,
        properties,
        ..
    } = ctx;
    properties.assign(name, &|c: &str| {
        whitelist.is_reserved(ReservedKind::Property, c)
            || whitelist.is_reserved(ReservedKind::TopLevel, c)
            || whitelist.is_reserved(ReservedKind::Local, c)
            || free_names.contains(c)
            || pinned_names.contains(c)
            || forbidden.contains(c)
    })
}

struct FileRenamer<'c> {
    ctx: &'c mut ObfuscationContext,
    history: FileCache,
    /// Free identifiers of this file plus the originals of kept bindings.
    forbidden: HashSet<String>,
    record: FileCache,
    outcome: FileOutcome,
}

impl FileRenamer<'_> {
    fn run(&mut self, file: &FileContext<'_>, scopes: &mut FileScopes, tree: &mut dyn SyntaxTree) {
        let routes: Vec<Route> = scopes.bindings.iter().map(|b| self.route(b)).collect();
        for (binding, route) in scopes.bindings.iter().zip(&routes) {
            if *route != Route::Keep || binding.category == NameCategory::FilePath {
                continue;
            }
            self.outcome.kept += 1;
            if binding.category == NameCategory::Identifier {
                self.forbidden.insert(binding.original_name.clone());
            }
        }

        self.assign_tables(scopes, &routes);
        self.assign_scopes(scopes, &routes);
        self.apply(scopes, &routes, tree);

        if self.ctx.settings.filename {
            let obf = obfuscate_path(self.ctx, file.path);
            self.record.obf_name = Some(obf.clone());
            self.outcome.obf_path = Some(obf);
        }
    }

    fn keep(&mut self, kind: ReservedKind, name: &str) -> Route {
        if self.ctx.settings.record_kept {
            let reasons = self.ctx.whitelist.reasons(kind, name);
            self.ctx.kept.record(kind, name, &reasons);
        }
        Route::Keep
    }

    fn route(&mut self, binding: &Binding) -> Route {
        let mode = self.ctx.settings.mode;
        let name = binding.original_name.as_str();
        match binding.category {
            NameCategory::Identifier if binding.is_top_level() => {
                let surface = binding.flags.exported || binding.flags.imported;
                if surface && mode.export {
                    if self.ctx.whitelist.is_reserved(ReservedKind::TopLevel, name) {
                        self.keep(ReservedKind::TopLevel, name)
                    } else {
                        Route::Table
                    }
                } else if !mode.toplevel {
                    Route::Keep
                } else if self.ctx.whitelist.is_reserved(ReservedKind::TopLevel, name) {
                    self.keep(ReservedKind::TopLevel, name)
                } else if mode.toplevel_collapses_into_property() {
                    Route::Table
                } else {
                    Route::Scope
                }
            }
            NameCategory::Identifier => {
                if self.ctx.whitelist.is_reserved(ReservedKind::Local, name) {
                    self.keep(ReservedKind::Local, name)
                } else {
                    Route::Scope
                }
            }
            NameCategory::FilePath => Route::Keep,
            category => self.property_route(category, name),
        }
    }

    fn property_route(&mut self, category: NameCategory, name: &str) -> Route {
        let mode = self.ctx.settings.mode;
        if !mode.property || (category == NameCategory::StringProperty && !mode.string_property) {
            return Route::Keep;
        }
        if self.ctx.whitelist.is_reserved(ReservedKind::Property, name) {
            return self.keep(ReservedKind::Property, name);
        }
        Route::Table
    }

    /// Property-like names and top-level identifiers that go through the
    /// program-wide table. Identifiers land in the root scope's renames so
    /// references resolve like any other.
    fn assign_tables(&mut self, scopes: &mut FileScopes, routes: &[Route]) {
        for (binding, route) in scopes.bindings.iter().zip(routes) {
            if *route != Route::Table {
                continue;
            }
            let name = binding.original_name.as_str();
            let mangled = assign_in_table(self.ctx, &self.forbidden, name);
            if binding.category == NameCategory::Identifier {
                scopes
                    .tree
                    .get_mut(ROOT_SCOPE)
                    .renames
                    .insert(name.to_string(), mangled.clone());
                self.record.identifiers.insert(binding.cache_key(), mangled);
            } else if binding.flags.function_like {
                self.record.members.insert(binding.cache_key(), mangled);
            }
        }

        for reference in &scopes.references {
            if !reference.category.is_property_like() {
                continue;
            }
            if self.property_route(reference.category, &reference.name) == Route::Table {
                assign_in_table(self.ctx, &self.forbidden, &reference.name);
            }
        }
    }

    fn assign_scopes(&mut self, scopes: &mut FileScopes, routes: &[Route]) {
        // Keys shared by several bindings (same-named locals in sibling
        // anonymous blocks) cannot say which binding a cached name belongs to.
        let mut seen = HashSet::new();
        let ambiguous: HashSet<String> = scopes
            .bindings
            .iter()
            .zip(routes)
            .filter(|(b, r)| **r == Route::Scope && b.category == NameCategory::Identifier)
            .map(|(b, _)| b.cache_key())
            .filter(|key| !seen.insert(key.clone()))
            .collect();

        let ids: Vec<ScopeId> = scopes.tree.ids().collect();
        for id in ids {
            let declared = scopes.tree.get(id).declared.clone();
            if declared.is_empty() {
                continue;
            }
            let used = scopes.tree.ancestor_names(id);
            let mut taken: HashSet<String> = scopes.tree.get(id).renames.values().cloned().collect();
            let kind = if id == ROOT_SCOPE {
                ReservedKind::TopLevel
            } else {
                ReservedKind::Local
            };
            let mut generator = NameGenerator::new(self.ctx.settings.strategy.clone());

            for name in &declared {
                let Some(idx) = scopes
                    .bindings
                    .iter()
                    .position(|b| b.scope == id && b.category == NameCategory::Identifier && &b.original_name == name)
                else {
                    continue;
                };
                if routes[idx] != Route::Scope {
                    continue;
                }

                let acceptable = |c: &str| {
                    is_identifier(c)
                        && !used.contains(c)
                        && !taken.contains(c)
                        && !declared.iter().any(|d| d != name && d == c)
                        && !self.forbidden.contains(c)
                        && !self.ctx.free_names.contains(c)
                        && !self.ctx.whitelist.is_reserved(kind, c)
                };
                let key = scopes.bindings[idx].cache_key();
                let shared = ambiguous.contains(&key);
                let cached = if shared { None } else { self.history.identifiers.get(&key) };
                let mangled = match cached.filter(|h| acceptable(h.as_str())) {
                    Some(cached) => cached.clone(),
                    None => loop {
                        let candidate = generator.next_name();
                        if acceptable(&candidate) {
                            break candidate;
                        }
                    },
                };

                tracing::trace!(name = %name, mangled = %mangled, scope = id, "renamed binding");
                taken.insert(mangled.clone());
                scopes.tree.get_mut(id).renames.insert(name.clone(), mangled.clone());
                if !shared {
                    self.record.identifiers.insert(key, mangled);
                }
            }
        }
    }

    fn apply(&mut self, scopes: &mut FileScopes, routes: &[Route], tree: &mut dyn SyntaxTree) {
        for (binding, route) in scopes.bindings.iter_mut().zip(routes) {
            if *route == Route::Keep {
                continue;
            }
            let mangled = match binding.category {
                NameCategory::Identifier => scopes
                    .tree
                    .get(binding.scope)
                    .renames
                    .get(&binding.original_name)
                    .cloned(),
                NameCategory::FilePath => None,
                _ => self
                    .ctx
                    .properties
                    .get(&binding.original_name)
                    .map(str::to_string),
            };
            if let Some(mangled) = mangled {
                for node in &binding.nodes {
                    tree.rename(*node, &mangled);
                }
                binding.mangled_name = Some(mangled);
                self.outcome.renamed += 1;
            }
        }

        for reference in &scopes.references {
            let mangled = match reference.category {
                NameCategory::Identifier => scopes
                    .tree
                    .resolve(&reference.name, reference.scope)
                    .map(str::to_string),
                NameCategory::FilePath => (self.ctx.settings.filename
                    && reference.name.starts_with('.'))
                .then(|| obfuscate_path(self.ctx, &reference.name)),
                category => (self.property_route(category, &reference.name) == Route::Table)
                    .then(|| self.ctx.properties.get(&reference.name).map(str::to_string))
                    .flatten(),
            };
            if let Some(mangled) = mangled {
                tree.rename(reference.node, &mangled);
            }
        }
    }
}
