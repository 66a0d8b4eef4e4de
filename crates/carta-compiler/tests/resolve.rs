//! End-to-end resolution tests: JSON declaration documents → resolved Api,
//! including header resolution on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use carta_common::schema::DataType;
use carta_compiler::error::{AssembleError, ResolveError};
use carta_compiler::parser::{DocumentParser, JsonParser};
use carta_compiler::semantic::Resolver;

fn resolve_source(source: &str) -> carta_common::schema::Api {
    let parser = JsonParser;
    let declarations = parser.parse(source).expect("documents in tests are valid");
    let mut resolver = Resolver::new("0.1", &parser);
    resolver
        .add_document(Path::new("test.carta"), declarations)
        .expect("document resolves");
    resolver.into_api()
}

#[test]
fn files_document_resolves() {
    let api = resolve_source(
        r#"[
            {"kind": "namespace", "name": "files"},
            {"kind": "type_def", "name": "Metadata", "composite": "struct",
             "doc": "File metadata.",
             "fields": [
                {"kind": "typed", "name": "size", "type_name": "UInt64"},
                {"kind": "typed", "name": "path", "type_name": "String",
                 "attrs": [{"name": "min_length", "value": {"literal": 1}}]}
             ],
             "examples": [
                {"label": "small", "text": "A small file.",
                 "values": {"size": 4, "path": "/tmp/a"}}
             ]},
            {"kind": "route_def", "name": "GetMetadata",
             "request": "Metadata", "response": "Metadata", "error": "Empty"}
        ]"#,
    );

    let ns = api.namespace("files").unwrap();
    let metadata = ns.data_type("Metadata").unwrap();
    match &**metadata {
        DataType::Struct(c) => {
            assert_eq!(c.doc, "File metadata.");
            assert_eq!(c.fields.len(), 2);
            assert_eq!(c.examples["small"].values["size"], serde_json::json!(4));
        }
        other => panic!("expected a struct, got {}", other.name()),
    }

    let route = ns.route("GetMetadata").unwrap();
    assert_eq!(route.path, "getmetadata");
    assert!(Arc::ptr_eq(route.request.as_ref().unwrap(), metadata));
}

#[test]
fn included_header_types_are_visible_but_not_registered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("common.cartah"),
        r#"[
            {"kind": "type_def", "name": "Shared", "composite": "struct",
             "fields": [{"kind": "typed", "name": "id", "type_name": "UInt64"}]}
        ]"#,
    )
    .unwrap();

    let document_path = dir.path().join("files.carta");
    let source = r#"[
        {"kind": "namespace", "name": "files"},
        {"kind": "include", "target": "common"},
        {"kind": "type_def", "name": "Wrapper", "composite": "struct",
         "fields": [{"kind": "typed", "name": "inner", "type_name": "Shared"}]}
    ]"#;

    let parser = JsonParser;
    let declarations = parser.parse(source).unwrap();
    let mut resolver = Resolver::new("0.1", &parser);
    resolver.add_document(&document_path, declarations).unwrap();
    let api = resolver.into_api();

    let ns = api.namespace("files").unwrap();
    // Only the document's own type is registered; the header's type is in
    // scope but not part of the namespace.
    assert_eq!(ns.types.len(), 1);
    assert!(ns.data_type("Shared").is_none());
    match &**ns.data_type("Wrapper").unwrap() {
        DataType::Struct(c) => match &c.fields[0] {
            carta_common::schema::Field::Typed { data_type, .. } => {
                assert_eq!(data_type.declared_name(), Some("Shared"));
            }
            _ => panic!("expected a typed field"),
        },
        _ => panic!("expected a struct"),
    }
}

#[test]
fn nested_includes_bind_all_levels() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("base.cartah"),
        r#"[
            {"kind": "type_def", "name": "Base", "composite": "struct", "fields": []}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("middle.cartah"),
        r#"[
            {"kind": "include", "target": "base"},
            {"kind": "alias", "name": "BaseAlias", "type_name": "Base"}
        ]"#,
    )
    .unwrap();

    let source = r#"[
        {"kind": "namespace", "name": "files"},
        {"kind": "include", "target": "middle"},
        {"kind": "type_def", "name": "Holder", "composite": "struct",
         "fields": [
            {"kind": "typed", "name": "a", "type_name": "Base"},
            {"kind": "typed", "name": "b", "type_name": "BaseAlias"}
         ]}
    ]"#;

    let parser = JsonParser;
    let declarations = parser.parse(source).unwrap();
    let mut resolver = Resolver::new("0.1", &parser);
    resolver
        .add_document(&dir.path().join("files.carta"), declarations)
        .unwrap();
    let api = resolver.into_api();

    match &**api.namespace("files").unwrap().data_type("Holder").unwrap() {
        DataType::Struct(c) => match (&c.fields[0], &c.fields[1]) {
            (
                carta_common::schema::Field::Typed { data_type: a, .. },
                carta_common::schema::Field::Typed { data_type: b, .. },
            ) => {
                // The alias shares the included type's instance.
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected typed fields"),
        },
        _ => panic!("expected a struct"),
    }
}

#[test]
fn missing_header_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = r#"[
        {"kind": "namespace", "name": "files"},
        {"kind": "include", "target": "nowhere"}
    ]"#;

    let parser = JsonParser;
    let declarations = parser.parse(source).unwrap();
    let mut resolver = Resolver::new("0.1", &parser);
    let err = resolver
        .add_document(&dir.path().join("files.carta"), declarations)
        .unwrap_err();
    match err {
        AssembleError::Resolve(ResolveError::HeaderNotFound(path)) => {
            assert!(path.ends_with("nowhere.cartah"));
        }
        other => panic!("expected HeaderNotFound, got {:?}", other),
    }
}

#[test]
fn routes_are_not_allowed_in_headers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("common.cartah"),
        r#"[
            {"kind": "route_def", "name": "ping"}
        ]"#,
    )
    .unwrap();

    let source = r#"[
        {"kind": "namespace", "name": "files"},
        {"kind": "include", "target": "common"}
    ]"#;

    let parser = JsonParser;
    let declarations = parser.parse(source).unwrap();
    let mut resolver = Resolver::new("0.1", &parser);
    let err = resolver
        .add_document(&dir.path().join("files.carta"), declarations)
        .unwrap_err();
    assert!(matches!(
        err,
        AssembleError::Resolve(ResolveError::UnknownDeclaration {
            kind: "route_def",
            ..
        })
    ));
}

#[test]
fn failed_document_leaves_the_namespace_untouched() {
    let parser = JsonParser;
    let mut resolver = Resolver::new("0.1", &parser);

    let good = parser
        .parse(
            r#"[
                {"kind": "namespace", "name": "files"},
                {"kind": "type_def", "name": "Kept", "composite": "struct", "fields": []}
            ]"#,
        )
        .unwrap();
    resolver.add_document(Path::new("good.carta"), good).unwrap();

    let bad = parser
        .parse(
            r#"[
                {"kind": "namespace", "name": "files"},
                {"kind": "type_def", "name": "First", "composite": "struct", "fields": []},
                {"kind": "type_def", "name": "Broken", "composite": "struct",
                 "fields": [{"kind": "typed", "name": "x", "type_name": "Missing"}]}
            ]"#,
        )
        .unwrap();
    assert!(resolver.add_document(Path::new("bad.carta"), bad).is_err());

    let api = resolver.into_api();
    let ns = api.namespace("files").unwrap();
    assert_eq!(ns.types.len(), 1);
    assert!(ns.data_type("Kept").is_some());
    assert!(ns.data_type("First").is_none());
}

#[test]
fn parsing_twice_yields_identical_schemas() {
    let source = r#"[
        {"kind": "namespace", "name": "files"},
        {"kind": "alias", "name": "Path", "type_name": "String"},
        {"kind": "type_def", "name": "Metadata", "composite": "struct",
         "fields": [{"kind": "typed", "name": "path", "type_name": "Path"}]},
        {"kind": "route_def", "name": "get_metadata", "response": "Metadata"}
    ]"#;
    assert_eq!(resolve_source(source), resolve_source(source));
}

#[test]
fn manifest_driven_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Carta.toml"),
        r#"
        [project]
        name = "files-api"
        version = "2.0"

        documents = ["files.carta"]
        "#,
    )
    .unwrap();
    fs::write(
        dir.path().join("files.carta"),
        r#"[
            {"kind": "namespace", "name": "files"},
            {"kind": "type_def", "name": "Metadata", "composite": "struct", "fields": []}
        ]"#,
    )
    .unwrap();

    let manifest = carta_common::manifest::find_and_load_manifest(dir.path()).unwrap();
    let parser = JsonParser;
    let mut resolver = Resolver::new(manifest.project.version.clone(), &parser);
    for document in &manifest.documents {
        let source = fs::read_to_string(document).unwrap();
        let declarations = parser.parse(&source).unwrap();
        resolver.add_document(document, declarations).unwrap();
    }
    let api = resolver.into_api();
    assert_eq!(api.version, "2.0");
    assert!(api.namespace("files").is_some());
}
