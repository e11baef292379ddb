//! End-to-end parser-stage tests over on-disk fixture projects using the
//! built-in syntactic loader.

use srcgraph_core::{ParserConfig, SrcGraphError, TypeKind};
use srcgraph_parser::{SourceParser, SyntacticLoader};
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn fixture_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "go.mod", "module example.com/app\n\ngo 1.22\n");
    write(
        dir.path(),
        "main.go",
        r#"package main

import (
	"fmt"

	"example.com/app/store"
)

func main() {
	w := store.NewFileWriter()
	n, err := w.Write([]byte("hello"))
	fmt.Println(n, err)
}

func factorial(n int) int {
	if n <= 1 {
		return 1
	}
	return n * factorial(n-1)
}
"#,
    );
    write(
        dir.path(),
        "store/writer.go",
        r#"package store

const DefaultMode = 0644

type Writer interface {
	Write(p []byte) (int, error)
}

type FileWriter struct {
	Path string `json:"path"`
}

func NewFileWriter() *FileWriter {
	return &FileWriter{}
}

func (w *FileWriter) Write(p []byte) (int, error) {
	return len(p), nil
}
"#,
    );
    dir
}

fn parser() -> SourceParser<SyntacticLoader> {
    SourceParser::new(SyntacticLoader::new())
}

#[tokio::test]
async fn parses_packages_files_and_declarations() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = fixture_project();

    let result = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.packages.len(), 2);
    assert_eq!(result.packages[0].import_path, "example.com/app");
    assert_eq!(result.packages[1].import_path, "example.com/app/store");

    let main_pkg = &result.packages[0];
    assert_eq!(main_pkg.short_name, "main");
    assert_eq!(main_pkg.files.len(), 1);
    assert_eq!(
        main_pkg.files[0].dependencies,
        vec!["fmt".to_string(), "example.com/app/store".to_string()]
    );

    let store = &result.packages[1];
    assert_eq!(store.constants.len(), 1);
    assert_eq!(store.constants[0].name, "DefaultMode");
    assert_eq!(store.types.len(), 2);

    let file_writer = store
        .types
        .iter()
        .find(|t| t.name == "FileWriter")
        .unwrap();
    assert_eq!(file_writer.kind, TypeKind::Struct);
    assert_eq!(file_writer.fields.len(), 1);
    assert_eq!(file_writer.fields[0].tag.as_deref(), Some(r#"json:"path""#));
}

#[tokio::test]
async fn methods_attach_to_their_receiver_type() {
    let dir = fixture_project();
    let result = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let store = &result.packages[1];
    let file_writer = store
        .types
        .iter()
        .find(|t| t.name == "FileWriter")
        .unwrap();
    assert_eq!(
        file_writer.methods,
        vec!["example.com/app/store.FileWriter.Write".to_string()]
    );

    let write = store.functions.iter().find(|f| f.name == "Write").unwrap();
    let receiver = write.receiver.as_ref().unwrap();
    assert_eq!(receiver.text, "*FileWriter");
    assert_eq!(receiver.base_name, "FileWriter");
    assert_eq!(
        receiver.type_key.as_deref(),
        Some("example.com/app/store.FileWriter")
    );
}

#[tokio::test]
async fn discovers_complete_implementations_syntactically() {
    let dir = fixture_project();
    let result = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let writer = result
        .interfaces
        .iter()
        .find(|i| i.name == "Writer")
        .unwrap();
    assert_eq!(writer.implementations.len(), 1);
    let implementation = &writer.implementations[0];
    assert!(implementation.is_complete);
    assert_eq!(implementation.ty.name, "FileWriter");
    assert!(implementation.missing_methods.is_empty());
    assert_eq!(
        implementation.matched_methods.get("Write").map(String::as_str),
        Some("example.com/app/store.FileWriter.Write")
    );

    let store = &result.packages[1];
    let file_writer = store
        .types
        .iter()
        .find(|t| t.name == "FileWriter")
        .unwrap();
    assert_eq!(
        file_writer.implemented_interfaces,
        vec!["example.com/app/store.Writer".to_string()]
    );
}

#[tokio::test]
async fn records_partial_implementations_with_missing_methods() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "go.mod", "module example.com/rw\n");
    write(
        dir.path(),
        "rw.go",
        r#"package rw

type ReadWriter interface {
	Read(p []byte) (int, error)
	Write(p []byte) (int, error)
}

type PartialImpl struct{}

func (p *PartialImpl) Write(b []byte) (int, error) {
	return len(b), nil
}
"#,
    );

    let result = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let rw = result
        .interfaces
        .iter()
        .find(|i| i.name == "ReadWriter")
        .unwrap();
    assert_eq!(rw.implementations.len(), 1);
    let implementation = &rw.implementations[0];
    assert!(!implementation.is_complete);
    assert_eq!(implementation.ty.name, "PartialImpl");
    assert_eq!(implementation.missing_methods, vec!["Read".to_string()]);
    assert_eq!(implementation.matched_methods.len(), 1);
}

#[tokio::test]
async fn empty_interface_is_implemented_by_every_struct() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "go.mod", "module example.com/any\n");
    write(
        dir.path(),
        "any.go",
        r#"package any

type Any interface{}

type Thing struct{}
"#,
    );

    let result = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let any = result.interfaces.iter().find(|i| i.name == "Any").unwrap();
    assert_eq!(any.implementations.len(), 1);
    assert!(any.implementations[0].is_complete);
    assert_eq!(any.implementations[0].ty.name, "Thing");
}

#[tokio::test]
async fn embedded_interfaces_flatten_into_method_sets() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "go.mod", "module example.com/emb\n");
    write(
        dir.path(),
        "emb.go",
        r#"package emb

type Closer interface {
	Close() error
}

type WriteCloser interface {
	Closer
	Write(p []byte) (int, error)
}
"#,
    );

    let result = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let wc = result
        .interfaces
        .iter()
        .find(|i| i.name == "WriteCloser")
        .unwrap();
    let mut names: Vec<_> = wc.methods.iter().map(|m| m.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Close", "Write"]);
}

#[tokio::test]
async fn load_errors_are_fatal() {
    let dir = fixture_project();
    write(dir.path(), "broken.go", "package main\n\nfunc nope( {\n");

    let err = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SrcGraphError::LoadFailed(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("broken.go"));
        }
        other => panic!("expected LoadFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn single_file_mode_returns_parse_errors_directly() {
    let dir = fixture_project();
    write(dir.path(), "broken.go", "package main\n\nfunc nope( {\n");

    let err = parser()
        .parse_file(dir.path(), &dir.path().join("broken.go"))
        .await
        .unwrap_err();
    assert!(matches!(err, SrcGraphError::ParseFailed { .. }));

    let package = parser()
        .parse_file(dir.path(), &dir.path().join("store/writer.go"))
        .await
        .unwrap();
    assert_eq!(package.short_name, "store");
    assert_eq!(package.functions.len(), 2);
}

#[tokio::test]
async fn performance_stats_are_populated_when_enabled() {
    let dir = fixture_project();
    let config = ParserConfig {
        enable_performance_stats: true,
        ..ParserConfig::default()
    };
    let result = SourceParser::new(SyntacticLoader::new())
        .with_config(config)
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let stats = result.stats.expect("stats enabled");
    assert!(stats.files_per_second > 0.0);
    assert!(stats.lines_per_second > 0.0);
}

#[tokio::test]
async fn two_runs_produce_identical_structure() {
    let dir = fixture_project();

    let a = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();
    let b = parser()
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();

    let shape = |r: &srcgraph_core::ParseResult| {
        r.packages
            .iter()
            .map(|p| {
                (
                    p.import_path.clone(),
                    p.files.iter().map(|f| f.path.clone()).collect::<Vec<_>>(),
                    p.functions.iter().map(|f| f.key()).collect::<Vec<_>>(),
                    p.types.iter().map(|t| t.key()).collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&a), shape(&b));
}
