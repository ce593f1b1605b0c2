//! Integration tests for source map resolution against on-disk fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use tempfile::TempDir;
use trace_lens::source_map::SourceMapResolver;

/// A project tree with a compiled chunk under the build-output directory.
struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    compiled: PathBuf,
}

impl Fixture {
    /// Lay out `<root>/.next/server/chunks/page.js` with the given content.
    fn new(compiled_content: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().to_path_buf();
        let chunks = root.join(".next/server/chunks");
        fs::create_dir_all(&chunks).expect("chunks dir");
        let compiled = chunks.join("page.js");
        fs::write(&compiled, compiled_content).expect("compiled file");
        Self {
            _dir: dir,
            root,
            compiled,
        }
    }

    fn write_map(&self, name: &str, json: &serde_json::Value) {
        let path = self.compiled.parent().unwrap().join(name);
        fs::write(path, json.to_string()).expect("map file");
    }
}

/// A map whose single segment points line 1 / column ≥1 of the generated
/// file at line 10, column 5 of `source`.
fn map_to_line_10(source: &str) -> serde_json::Value {
    // "AASI": generated column 0 → source 0, line 9, column 4 (0-based).
    serde_json::json!({
        "version": 3,
        "sources": [source],
        "names": [],
        "mappings": "AASI",
    })
}

#[test]
fn test_external_map_resolves_position() {
    let fx = Fixture::new("const x = fn();\n//# sourceMappingURL=page.js.map\n");
    fx.write_map("page.js.map", &map_to_line_10("[project]/app/page.tsx"));

    let resolver = SourceMapResolver::default();
    let mapped = resolver
        .resolve_position(&fx.compiled, 1, 20, &fx.root)
        .expect("mapped position");

    assert_eq!(mapped.file, fx.root.join("app/page.tsx"));
    assert_eq!(mapped.line, 10);
    assert_eq!(mapped.column, 5);
}

#[test]
fn test_last_directive_wins() {
    let fx = Fixture::new(
        "var a=1;\n//# sourceMappingURL=old.map\nvar b=2;\n//# sourceMappingURL=final.map\n",
    );
    fx.write_map("old.map", &map_to_line_10("[project]/old.tsx"));
    fx.write_map("final.map", &map_to_line_10("[project]/final.tsx"));

    let resolver = SourceMapResolver::default();
    let mapped = resolver
        .resolve_position(&fx.compiled, 1, 1, &fx.root)
        .expect("mapped position");

    assert_eq!(mapped.file, fx.root.join("final.tsx"));
}

#[test]
fn test_inline_base64_map() {
    let json = map_to_line_10("[project]/src/inline.ts").to_string();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&json);
    let fx = Fixture::new(&format!(
        "fn();\n//# sourceMappingURL=data:application/json;base64,{encoded}\n"
    ));

    let resolver = SourceMapResolver::default();
    let mapped = resolver
        .resolve_position(&fx.compiled, 1, 3, &fx.root)
        .expect("mapped position");

    assert_eq!(mapped.file, fx.root.join("src/inline.ts"));
    assert_eq!(mapped.line, 10);
}

#[test]
fn test_inline_percent_encoded_map() {
    let json = map_to_line_10("[project]/src/encoded.ts").to_string();
    let encoded =
        percent_encoding::utf8_percent_encode(&json, percent_encoding::NON_ALPHANUMERIC)
            .to_string();
    let fx = Fixture::new(&format!(
        "fn();\n//# sourceMappingURL=data:application/json,{encoded}\n"
    ));

    let resolver = SourceMapResolver::default();
    let mapped = resolver
        .resolve_position(&fx.compiled, 1, 3, &fx.root)
        .expect("mapped position");

    assert_eq!(mapped.file, fx.root.join("src/encoded.ts"));
}

#[test]
fn test_url_encoded_external_reference() {
    // The directive percent-encodes the map name; the decoded candidate is
    // tried first and matches the real file.
    let fx = Fixture::new("fn();\n//# sourceMappingURL=page%2Ejs.map\n");
    fx.write_map("page.js.map", &map_to_line_10("[project]/src/x.ts"));

    let resolver = SourceMapResolver::default();
    let mapped = resolver
        .resolve_position(&fx.compiled, 1, 1, &fx.root)
        .expect("mapped position");
    assert_eq!(mapped.file, fx.root.join("src/x.ts"));
}

#[test]
fn test_repeat_resolution_is_cached() {
    let fx = Fixture::new("const x = fn();\n//# sourceMappingURL=page.js.map\n");
    fx.write_map("page.js.map", &map_to_line_10("[project]/app/page.tsx"));

    let resolver = SourceMapResolver::default();
    let first = resolver.resolve_position(&fx.compiled, 1, 20, &fx.root);
    let reads_after_first = resolver.file_reads();
    let second = resolver.resolve_position(&fx.compiled, 1, 20, &fx.root);

    // Identical result both times, and no further file I/O.
    assert_eq!(first, second);
    assert!(first.is_some());
    assert_eq!(resolver.file_reads(), reads_after_first);
    assert_eq!(resolver.position_stats().hit_count, 1);
}

#[test]
fn test_malformed_map_degrades_to_miss() {
    let fx = Fixture::new("fn();\n//# sourceMappingURL=page.js.map\n");
    fs::write(
        fx.compiled.parent().unwrap().join("page.js.map"),
        "not json at all",
    )
    .expect("map file");

    let resolver = SourceMapResolver::default();
    assert!(
        resolver
            .resolve_position(&fx.compiled, 1, 1, &fx.root)
            .is_none()
    );

    // The miss is cached: no additional reads on retry.
    let reads = resolver.file_reads();
    assert!(
        resolver
            .resolve_position(&fx.compiled, 1, 1, &fx.root)
            .is_none()
    );
    assert_eq!(resolver.file_reads(), reads);
}

#[test]
fn test_missing_directive_degrades_to_miss() {
    let fx = Fixture::new("plain compiled output with no directive\n");
    let resolver = SourceMapResolver::default();
    assert!(
        resolver
            .resolve_position(&fx.compiled, 1, 1, &fx.root)
            .is_none()
    );
}

#[test]
fn test_non_artifact_path_never_read() {
    let dir = TempDir::new().expect("temp dir");
    let original = dir.path().join("src/app.ts");
    fs::create_dir_all(original.parent().unwrap()).expect("src dir");
    fs::write(&original, "let x = 1;\n").expect("source file");

    let resolver = SourceMapResolver::default();
    assert!(
        resolver
            .resolve_position(&original, 1, 1, dir.path())
            .is_none()
    );
    assert_eq!(resolver.file_reads(), 0);
}

#[test]
fn test_unmapped_position_degrades_to_miss() {
    // The map only covers generated line 1; line 3 has no mapping.
    let fx = Fixture::new("a();\nb();\nc();\n//# sourceMappingURL=page.js.map\n");
    fx.write_map("page.js.map", &map_to_line_10("[project]/app/page.tsx"));

    let resolver = SourceMapResolver::default();
    assert!(
        resolver
            .resolve_position(&fx.compiled, 3, 1, &fx.root)
            .is_none()
    );
}

#[test]
fn test_sources_content_recovered() {
    let fx = Fixture::new("fn();\n//# sourceMappingURL=page.js.map\n");
    let map = serde_json::json!({
        "version": 3,
        "sources": ["[project]/app/generated-only.tsx"],
        "names": [],
        "mappings": "AASI",
        "sourcesContent": ["l1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nl9\nconst answer = 42;\nl11\n"],
    });
    fx.write_map("page.js.map", &map);

    let resolver = SourceMapResolver::default();
    let mapped = resolver
        .resolve_position(&fx.compiled, 1, 1, &fx.root)
        .expect("mapped position");

    let content = resolver
        .original_content(&mapped.file)
        .expect("embedded content");
    assert!(content.contains("const answer = 42;"));
    // The original file itself never existed on disk.
    assert!(!Path::new(&mapped.file).exists());
}

#[test]
fn test_clear_drops_cached_state() {
    let fx = Fixture::new("fn();\n//# sourceMappingURL=page.js.map\n");
    fx.write_map("page.js.map", &map_to_line_10("[project]/app/page.tsx"));

    let resolver = SourceMapResolver::default();
    resolver.resolve_position(&fx.compiled, 1, 1, &fx.root);
    let reads = resolver.file_reads();
    resolver.clear();
    resolver.resolve_position(&fx.compiled, 1, 1, &fx.root);
    assert!(resolver.file_reads() > reads);
}
