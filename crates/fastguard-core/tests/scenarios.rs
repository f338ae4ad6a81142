//! End-to-end runs through the public API: rule files on disk, project
//! resolution, renaming of reference documents, name cache round trips.

use fastguard_core::config::{ModuleEntry, ModuleKind};
use fastguard_core::source_map::Mapping;
use fastguard_core::tree::document::{build::*, SourceDocument};
use fastguard_core::tree::{DeclFlags, LineRange, NameCategory, NodeId, ScopeKind};
use fastguard_core::whitelist::sdk::ApiSurface;
use fastguard_core::{
    DeclarationScanner, MergedConfig, NameCache, NameStrategy, Obfuscator, ProjectFile, Resolution,
    Resolver, RuleSet, SourceMap,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(dir: &Path, file: &str, text: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, text).unwrap();
    path
}

fn resolution_from(dir: &Path, rules: &str) -> Resolution {
    let path = write(dir, "obfuscation-rules.txt", rules);
    Resolution {
        module: "entry".into(),
        merged: MergedConfig::from_rules(RuleSet::load(&path).unwrap()),
        consumer_export: None,
        sdk: None,
        sdk_version: None,
        keep_dts: ApiSurface::default(),
        fingerprint: String::new(),
    }
}

fn function_like(start: u32, end: u32) -> (LineRange, DeclFlags) {
    (
        LineRange::lines(start, end),
        DeclFlags {
            function_like: true,
            ..DeclFlags::default()
        },
    )
}

/// `class Demo { constructor(public title: string, public mark: number) { log("title") } }`
fn demo_class() -> SourceDocument {
    let (class_range, class_flags) = function_like(1, 6);
    let (ctor_range, ctor_flags) = function_like(2, 5);
    SourceDocument::new(
        "src/Demo.ts",
        vec![
            declare_with(1, "Demo", NameCategory::Identifier, class_range, class_flags),
            scope(
                ScopeKind::Class,
                Some("Demo"),
                class_range,
                vec![
                    declare_with(2, "constructor", NameCategory::Property, ctor_range, ctor_flags),
                    declare(3, "title", NameCategory::Property),
                    declare(4, "mark", NameCategory::Property),
                    scope(
                        ScopeKind::Function,
                        Some("constructor"),
                        ctor_range,
                        vec![
                            ident(5, "title"),
                            ident(6, "mark"),
                            ident_ref(7, "log"),
                            reference(8, "title", NameCategory::StringProperty),
                            ident_ref(9, "mark"),
                        ],
                    ),
                ],
            ),
        ],
    )
}

#[test]
fn test_class_members_renamed_and_string_literal_untouched() {
    let dir = tempdir().unwrap();
    let res = resolution_from(
        dir.path(),
        "-enable-toplevel-obfuscation\n-enable-property-obfuscation\n-keep-property-name\ntitle\n",
    );
    let mut docs = vec![demo_class()];
    let mut obf = Obfuscator::new(&res, NameStrategy::Ordered);
    obf.obfuscate_documents(&mut docs, &BTreeMap::new()).unwrap();
    let doc = &docs[0];

    assert_ne!(doc.name_of(NodeId(1)), Some("Demo"));
    assert_eq!(doc.name_of(NodeId(2)), Some("constructor"));
    assert_eq!(doc.name_of(NodeId(3)), Some("title"));
    assert_ne!(doc.name_of(NodeId(4)), Some("mark"));
    // Parameters are renamed in their own scope and their uses follow.
    assert_ne!(doc.name_of(NodeId(6)), Some("mark"));
    assert_eq!(doc.name_of(NodeId(6)), doc.name_of(NodeId(9)));
    assert_eq!(doc.name_of(NodeId(7)), Some("log"));
    assert_eq!(doc.name_of(NodeId(8)), Some("title"));
}

#[test]
fn test_rule_file_splits_exact_and_wildcard_names() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "rules.txt",
        "-keep-global-name\nfunc2\na*\n-keep-property-name\nprop\nprop?",
    );
    let merged = MergedConfig::from_rules(RuleSet::load(&path).unwrap());

    assert!(merged.reserved_global_names.exact().contains("func2"));
    assert_eq!(merged.reserved_global_names.patterns().len(), 1);
    assert_eq!(merged.reserved_global_names.patterns()[0].literal(), "a*");
    assert!(merged.reserved_property_names.exact().contains("prop"));
    assert_eq!(merged.reserved_property_names.patterns().len(), 1);
    assert_eq!(merged.reserved_property_names.patterns()[0].literal(), "prop?");
}

#[test]
fn test_shared_package_consumer_rules_reach_application() {
    let dir = tempdir().unwrap();
    let project_json = r#"{
        "entry": "app",
        "modules": [
            { "name": "app", "kind": "application", "dependencies": ["hsp"] },
            { "name": "hsp", "kind": "shared-package",
              "selfRules": ["hsp-rules.txt"],
              "consumerRules": ["hsp-consumer.txt"] }
        ]
    }"#;
    write(dir.path(), "hsp-rules.txt", "-enable-property-obfuscation");
    write(dir.path(), "hsp-consumer.txt", "-keep-global-name LocalHspClass");
    let project_path = write(dir.path(), "project.json", project_json);

    let project = ProjectFile::load(&project_path).unwrap();
    let scanner = DeclarationScanner::new();
    let resolution = Resolver::new(&project, &scanner).resolve_entry().unwrap();
    let options = resolution.merged.options();

    assert!(resolution.merged.reserved_global_names.contains("LocalHspClass"));
    assert!(options.enable_export_obfuscation);
    assert!(!options.enable_toplevel_obfuscation);
    assert!(!options.enable_property_obfuscation);
}

#[test]
fn test_cache_keys_follow_previous_stage_map() {
    let dir = tempdir().unwrap();
    let cache_path = write(
        dir.path(),
        "previous.json",
        r#"{ "src/a.ts": { "IdentifierCache": { "Foo:2:2": "q" }, "MemberMethodCache": {} } }"#,
    );
    let res = resolution_from(
        dir.path(),
        &format!("-enable-toplevel-obfuscation -apply-namecache {}", cache_path.display()),
    );

    // Original line 2 is generated line 5 after the earlier stage.
    let map = SourceMap::from_mappings(
        vec!["a.ts".into()],
        Vec::new(),
        vec![Mapping {
            generated_line: 4,
            generated_column: 0,
            source: Some(0),
            original_line: 1,
            original_column: 0,
            name: None,
        }],
    );
    let maps: BTreeMap<String, SourceMap> = [("src/a.ts".to_string(), map)].into();

    let (range, flags) = function_like(5, 5);
    let mut docs = vec![SourceDocument::new(
        "src/a.ts",
        vec![
            declare_with(1, "Foo", NameCategory::Identifier, range, flags),
            ident_ref(2, "Foo"),
        ],
    )];
    let mut obf = Obfuscator::new(&res, NameStrategy::Ordered);
    let (_, cache) = obf.obfuscate_documents(&mut docs, &maps).unwrap();

    assert_eq!(docs[0].name_of(NodeId(1)), Some("q"));
    assert_eq!(docs[0].name_of(NodeId(2)), Some("q"));
    assert_eq!(
        cache.files["src/a.ts"].identifiers.get("Foo:5:5").map(String::as_str),
        Some("q")
    );
}

fn project_sources() -> Vec<SourceDocument> {
    let (f_range, f_flags) = function_like(1, 8);
    vec![
        SourceDocument::new(
            "src/util.ts",
            vec![
                declare_with(1, "format", NameCategory::Identifier, f_range, f_flags),
                scope(
                    ScopeKind::Function,
                    Some("format"),
                    f_range,
                    vec![
                        ident(2, "input"),
                        ident(3, "result"),
                        prop_ref(4, "title"),
                        ident_ref(5, "input"),
                        scope(
                            ScopeKind::Block,
                            None,
                            LineRange::lines(3, 6),
                            vec![ident(6, "index"), ident_ref(7, "result"), prop_ref(8, "length")],
                        ),
                    ],
                ),
                ident(9, "counter"),
            ],
        ),
        SourceDocument::new(
            "src/main.ts",
            vec![
                reference(10, "./util", NameCategory::FilePath),
                ident(11, "page"),
                declare(12, "title", NameCategory::Property),
                ident_ref(13, "console"),
                prop_ref(14, "log"),
            ],
        ),
    ]
}

fn run_with_cache(dir: &Path, apply: Option<&Path>, out: &str) -> (Vec<SourceDocument>, String) {
    let mut rules = format!(
        "-enable-toplevel-obfuscation -enable-property-obfuscation -enable-filename-obfuscation \
         -print-namecache {out}"
    );
    if let Some(apply) = apply {
        rules.push_str(&format!(" -apply-namecache {}", apply.display()));
    }
    let res = resolution_from(dir, &rules);
    let mut docs = project_sources();
    let mut obf = Obfuscator::new(&res, NameStrategy::Ordered);
    obf.obfuscate_documents(&mut docs, &BTreeMap::new()).unwrap();
    let cache_text = std::fs::read_to_string(dir.join(out)).unwrap();
    (docs, cache_text)
}

#[test]
fn test_rerun_with_same_cache_is_byte_identical() {
    let dir = tempdir().unwrap();
    let (first_docs, _) = run_with_cache(dir.path(), None, "first.json");
    let first_cache = dir.path().join("first.json");

    let (a_docs, a_cache) = run_with_cache(dir.path(), Some(&first_cache), "a.json");
    let (b_docs, b_cache) = run_with_cache(dir.path(), Some(&first_cache), "b.json");

    assert_eq!(a_cache, b_cache);
    for ((a, b), first) in a_docs.iter().zip(&b_docs).zip(&first_docs) {
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(a.to_json().unwrap(), first.to_json().unwrap());
    }

    let cache = NameCache::from_json(&a_cache).unwrap();
    assert!(cache.files.contains_key("src/util.ts"));
    assert!(cache.file_names.contains_key("util"));
    assert!(cache.properties.contains_key("title"));
}

#[test]
fn test_missing_applied_cache_is_fatal() {
    let dir = tempdir().unwrap();
    let res = resolution_from(dir.path(), "-apply-namecache does-not-exist.json");
    let mut obf = Obfuscator::new(&res, NameStrategy::Ordered);
    let err = obf.apply_name_cache(&BTreeMap::new()).unwrap_err();
    assert_eq!(err.code(), fastguard_core::error::codes::OBF_NAMECACHE_MISSING);
}

#[test]
fn test_consumer_file_written_for_library() {
    let dir = tempdir().unwrap();
    let lib = ModuleEntry {
        name: "lib".into(),
        kind: ModuleKind::Library,
        self_rules: vec![write(dir.path(), "lib.txt", "-disable-obfuscation")],
        consumer_rules: vec![write(dir.path(), "consumer.txt", "-keep-global-name Api -enable-property-obfuscation")],
        exported_consumer_file: None,
        consumer_output: Some(dir.path().join("out/obfuscation.txt")),
        dependencies: Vec::new(),
    };
    let project = ProjectFile {
        entry: "lib".into(),
        modules: vec![lib],
        sdk: None,
    };
    let scanner = DeclarationScanner::new();
    let mut resolver = Resolver::new(&project, &scanner);
    let resolution = resolver.resolve_entry().unwrap();
    let written = resolver.emit_consumer_file(&resolution).unwrap().unwrap();
    let text = std::fs::read_to_string(written).unwrap();
    assert!(text.contains("-enable-property-obfuscation"));
    assert!(text.contains("-keep-global-name\nApi\n"));
}
