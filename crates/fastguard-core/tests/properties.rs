//! Invariants that must hold for any input, checked over hand-built trees.

use fastguard_core::config::{MergedConfig, ObfuscationOptions, RuleSet};
use fastguard_core::context::ObfuscationContext;
use fastguard_core::rename::{self, FileContext};
use fastguard_core::scope::{self, FileScopes, ScopeId};
use fastguard_core::tree::document::{build::*, DocNode, SourceDocument};
use fastguard_core::tree::{LineRange, NameCategory, NodeId, ScopeKind};
use fastguard_core::wildcard::{WildcardMode, WildcardPattern};
use fastguard_core::{NameCache, NameStrategy, ReservedKind};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

fn config(rules: &str) -> MergedConfig {
    MergedConfig::from_rules(RuleSet::parse(rules, Path::new("/proj"), Path::new("rules.txt")))
}

fn obfuscate(ctx: &mut ObfuscationContext, doc: &mut SourceDocument) {
    let path = doc.path.clone();
    let file = FileContext {
        path: &path,
        kept: false,
    };
    rename::register_file(ctx, &file, &scope::collect(doc));
    rename::rename_file(ctx, &file, doc);
}

fn block(body: Vec<DocNode>) -> DocNode {
    scope(ScopeKind::Block, None, LineRange::default(), body)
}

/// Heavy shadowing, globals named like generated names, and uses at every
/// depth.
fn tangled() -> SourceDocument {
    SourceDocument::new(
        "src/tangled.ts",
        vec![
            ident(1, "alpha"),
            ident(2, "beta"),
            ident_ref(3, "b"),
            scope(
                ScopeKind::Function,
                Some("outer"),
                LineRange::lines(1, 20),
                vec![
                    ident(4, "alpha"),
                    ident(5, "gamma"),
                    ident_ref(6, "beta"),
                    block(vec![
                        ident(7, "delta"),
                        ident_ref(8, "alpha"),
                        ident_ref(9, "gamma"),
                        block(vec![
                            ident(10, "gamma"),
                            ident_ref(11, "gamma"),
                            ident_ref(12, "delta"),
                            ident_ref(13, "beta"),
                            ident_ref(14, "c"),
                        ]),
                    ]),
                    ident_ref(15, "alpha"),
                ],
            ),
            scope(
                ScopeKind::Function,
                Some("sibling"),
                LineRange::lines(21, 30),
                vec![ident(16, "gamma"), ident_ref(17, "alpha"), ident_ref(18, "gamma")],
            ),
            ident_ref(19, "alpha"),
        ],
    )
}

/// Binding declared in `scope` under `name`, as first-node id.
fn binding_node(scopes: &FileScopes, scope: ScopeId, name: &str) -> Option<NodeId> {
    scopes
        .bindings
        .iter()
        .find(|b| b.scope == scope && b.category == NameCategory::Identifier && b.original_name == name)
        .map(|b| b.nodes[0])
}

#[test]
fn test_references_resolve_to_the_same_binding_after_renaming() {
    let mut doc = tangled();
    let before = scope::collect(&doc);
    let mut ctx = ObfuscationContext::new(&config("-enable-toplevel-obfuscation"), None, NameStrategy::Ordered);
    obfuscate(&mut ctx, &mut doc);

    for reference in before.references.iter().filter(|r| r.category == NameCategory::Identifier) {
        let renamed = doc.name_of(reference.node).unwrap();
        match before.tree.declaring_scope(&reference.name, reference.scope) {
            Some(declaring) => {
                let target = binding_node(&before, declaring, &reference.name).unwrap();
                assert_eq!(renamed, doc.name_of(target).unwrap(), "reference to {}", reference.name);
            }
            None => assert_eq!(renamed, reference.name, "free name {} changed", reference.name),
        }
    }
}

#[test]
fn test_visible_bindings_have_distinct_names() {
    let mut doc = tangled();
    let before = scope::collect(&doc);
    let mut ctx = ObfuscationContext::new(&config("-enable-toplevel-obfuscation"), None, NameStrategy::Ordered);
    obfuscate(&mut ctx, &mut doc);

    for id in before.tree.ids() {
        // Walk outwards; inner declarations shadow outer ones of the same name.
        let mut shadowed = HashSet::new();
        let mut visible = Vec::new();
        let mut current = Some(id);
        while let Some(s) = current {
            for name in &before.tree.get(s).declared {
                if shadowed.insert(name.clone()) {
                    let node = binding_node(&before, s, name).unwrap();
                    visible.push(doc.name_of(node).unwrap().to_string());
                }
            }
            current = before.tree.get(s).parent;
        }
        let unique: HashSet<&String> = visible.iter().collect();
        assert_eq!(unique.len(), visible.len(), "collision in scope {id}: {visible:?}");
    }

    // Free globals keep their meaning.
    assert_eq!(doc.name_of(NodeId(3)), Some("b"));
    assert_eq!(doc.name_of(NodeId(14)), Some("c"));
}

/// Same-named locals in sibling functions, one of which also declares a
/// name that takes the first generated candidate.
fn siblings() -> SourceDocument {
    SourceDocument::new(
        "src/siblings.ts",
        vec![
            scope(ScopeKind::Function, Some("f"), LineRange::lines(1, 3), vec![ident(1, "i"), ident_ref(2, "i")]),
            scope(
                ScopeKind::Function,
                Some("g"),
                LineRange::lines(4, 7),
                vec![ident(3, "j"), ident(4, "i"), ident_ref(5, "i"), ident_ref(6, "j")],
            ),
            block(vec![ident(7, "k")]),
            block(vec![ident(8, "k")]),
        ],
    )
}

fn build_with_history(history: Option<&NameCache>) -> (SourceDocument, NameCache) {
    let mut ctx = ObfuscationContext::new(&config(""), None, NameStrategy::Ordered);
    if let Some(cache) = history {
        ctx.apply_history(cache);
    }
    let mut doc = siblings();
    obfuscate(&mut ctx, &mut doc);

    let mut cache = history.cloned().unwrap_or_default();
    cache.update(
        ctx.file_results.clone(),
        ctx.properties.merged_for_save(),
        ctx.file_names.merged_for_save(),
    );
    (doc, cache)
}

#[test]
fn test_rebuild_with_printed_cache_keeps_every_local_name() {
    let (first, cache) = build_with_history(None);
    assert_eq!(first.name_of(NodeId(1)), Some("a"));
    assert_eq!(first.name_of(NodeId(3)), Some("a"));
    assert_eq!(first.name_of(NodeId(4)), Some("b"));

    let printed = cache.to_json();
    let reloaded = NameCache::from_json(&printed).unwrap();
    let (second, recache) = build_with_history(Some(&reloaded));

    assert_eq!(second, first);
    assert_eq!(recache.to_json(), printed);
}

#[test]
fn test_renaming_is_deterministic() {
    let rules = "-enable-toplevel-obfuscation -enable-property-obfuscation";
    let run = || {
        let mut doc = tangled();
        let mut ctx = ObfuscationContext::new(&config(rules), None, NameStrategy::Ordered);
        obfuscate(&mut ctx, &mut doc);
        (doc.to_json().unwrap(), ctx.file_results)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_dictionary_strategy_draws_from_words() {
    let words = vec!["apple".to_string(), "pear".to_string(), "plum".to_string()];
    let mut doc = SourceDocument::new(
        "a.ts",
        vec![scope(
            ScopeKind::Function,
            Some("f"),
            LineRange::lines(1, 3),
            vec![ident(1, "first"), ident(2, "second")],
        )],
    );
    let mut ctx = ObfuscationContext::new(&config(""), None, NameStrategy::Dictionary(words));
    obfuscate(&mut ctx, &mut doc);
    assert_eq!(doc.name_of(NodeId(1)), Some("apple"));
    assert_eq!(doc.name_of(NodeId(2)), Some("pear"));
}

fn property_doc() -> SourceDocument {
    SourceDocument::new(
        "a.ts",
        vec![
            declare(1, "title", NameCategory::Property),
            declare(2, "subtitle", NameCategory::Property),
            prop_ref(3, "width"),
            prop_ref(4, "height"),
            prop_ref(5, "length"),
        ],
    )
}

#[test]
fn test_reserving_more_names_never_renames_more() {
    let base = "-enable-property-obfuscation -print-kept-names -keep-property-name width";
    let mut small_doc = property_doc();
    let mut small = ObfuscationContext::new(&config(base), None, NameStrategy::Ordered);
    obfuscate(&mut small, &mut small_doc);

    let mut large_doc = property_doc();
    let mut large = ObfuscationContext::new(
        &config(&format!("{base} -keep-property-name title sub*")),
        None,
        NameStrategy::Ordered,
    );
    obfuscate(&mut large, &mut large_doc);

    for id in 1..=5 {
        let original = property_doc().name_of(NodeId(id)).map(str::to_string);
        if small_doc.name_of(NodeId(id)).map(str::to_string) == original {
            assert_eq!(large_doc.name_of(NodeId(id)).map(str::to_string), original);
        }
    }
    for (name, reasons) in &small.kept.property {
        let wider = large.kept.reasons(ReservedKind::Property, name).unwrap();
        assert!(reasons.is_subset(wider));
    }
    assert_eq!(large_doc.name_of(NodeId(2)), Some("subtitle"));
}

fn options(rules: &str) -> ObfuscationOptions {
    config(rules).options()
}

#[test]
fn test_option_merge_is_associative_and_commutative() {
    let a = options("-enable-property-obfuscation -compact");
    let b = options("-enable-toplevel-obfuscation");
    let c = options("-disable-obfuscation -enable-property-obfuscation -remove-log");

    assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
    assert_eq!(a.merge(b), b.merge(a));
}

#[test]
fn test_list_merge_is_commutative_after_normalizing() {
    let parse = |text: &str| RuleSet::parse(text, Path::new("/proj"), Path::new("rules.txt"));
    let a = parse("-keep-global-name zeta alpha -keep-property-name shared");
    let b = parse("-keep-global-name alpha beta -keep-property-name shared other");

    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);
    assert_eq!(ab.normalized().lists, ba.normalized().lists);
}

#[test]
fn test_wildcard_patterns_match_their_instances() {
    let cases: &[(&str, WildcardMode, &[&str], &[&str])] = &[
        ("prop?", WildcardMode::Name, &["propA", "prop1"], &["prop", "propAB", "proqA"]),
        ("a*", WildcardMode::Name, &["a", "abc", "a.b"], &["ba", "Abc"]),
        ("get*Value", WildcardMode::Name, &["getValue", "getUserValue"], &["getValues", "setValue"]),
        ("src/*.ts", WildcardMode::Path, &["src/a.ts", "src/index.ts"], &["src/a/b.ts", "src/a.tsx"]),
        ("lib/**/*.js", WildcardMode::Path, &["lib/x/y.js", "lib/x/y/z.js"], &["lib/x/y.ts", "app/x/y.js"]),
        ("a.b", WildcardMode::Name, &["a.b"], &["axb"]),
    ];
    for (literal, mode, matching, rejected) in cases {
        let pattern = WildcardPattern::compile(literal, *mode).unwrap();
        for s in *matching {
            assert!(pattern.is_match(s), "{literal} should match {s}");
        }
        for s in *rejected {
            assert!(!pattern.is_match(s), "{literal} should not match {s}");
        }
    }
}

#[test]
fn test_unrecognized_tokens_are_dropped() {
    let rules = RuleSet::parse(
        "-enable-property-obfuscation -enable-everything # trailing comment\n-keep-global-name kept",
        Path::new("/proj"),
        Path::new("rules.txt"),
    );
    assert!(rules.options.enable_property_obfuscation);
    assert_eq!(rules.lists.global_names, vec!["kept".to_string()]);
}

#[test]
fn test_reset_isolates_compilations() {
    let mut ctx = ObfuscationContext::new(&config("-enable-property-obfuscation"), None, NameStrategy::Ordered);
    let mut first = SourceDocument::new("a.ts", vec![prop_ref(1, "first"), prop_ref(2, "second")]);
    obfuscate(&mut ctx, &mut first);
    ctx.reset();

    let mut second = SourceDocument::new("a.ts", vec![prop_ref(1, "second")]);
    obfuscate(&mut ctx, &mut second);
    assert_eq!(second.name_of(NodeId(1)), Some("a"));

    let names: BTreeSet<&String> = ctx.properties.entries().keys().collect();
    assert_eq!(names.into_iter().cloned().collect::<Vec<_>>(), vec!["second".to_string()]);
}
