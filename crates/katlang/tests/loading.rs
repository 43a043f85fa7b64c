//! `open`, `load` and `join` against files and in-memory libraries.

use std::collections::HashMap;
use std::fs;

use katlang::{parse, parse_with, EngineOptions, ErrorKind, FileLoader};
use tempfile::TempDir;

const LIBRARY_ADDRESS: &str = "https://example.org/algorithm.kat";
const LIBRARY_SOURCE: &str = "X = 20\n9 + 11";

fn library_options() -> EngineOptions {
    let library: HashMap<&'static str, &'static str> =
        [(LIBRARY_ADDRESS, LIBRARY_SOURCE), ("broken.kat", ";")]
            .into_iter()
            .collect();
    EngineOptions::new().with_loader(move |address: &str| {
        library
            .get(address)
            .map(|source| source.to_string())
            .ok_or_else(|| format!("no program at '{}'", address))
    })
}

/// Write `algorithm.kat` into a fresh directory and point `open` at it.
fn open_fixture(contents: &str) -> (TempDir, EngineOptions) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("algorithm.kat"), contents).unwrap();
    let options = EngineOptions::new().with_open_root(dir.path());
    (dir, options)
}

fn eval_with(source: &str, options: &EngineOptions) -> String {
    let outcome = parse_with(source, options);
    assert!(
        outcome.is_ok(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        outcome.diagnostics
    );
    outcome.render()
}

// ============================================================================
// open
// ============================================================================

#[test]
fn test_open_value() {
    let (_dir, options) = open_fixture("9+11");
    let source = "A=open('algorithm.kat')\nB=10\nA+B";
    assert_eq!(eval_with(source, &options), "30");
}

#[test]
fn test_open_with_properties() {
    let (_dir, options) = open_fixture("X=5 9+11");
    assert_eq!(
        eval_with("A=open('algorithm.kat')\nB=10\nA+B", &options),
        "30"
    );
    assert_eq!(eval_with("A=open('algorithm.kat')\nA.X+10", &options), "15");
}

#[test]
fn test_open_selection() {
    let (_dir, options) = open_fixture("X=5 9+11 10 12");
    assert_eq!(eval_with("A=open('algorithm.kat')\nA:1", &options), "10");
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let options = EngineOptions::new().with_open_root(dir.path());
    let outcome = parse_with("A=open('absent.kat')\nA", &options);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, ErrorKind::LoadFailed);
}

// ============================================================================
// load and join
// ============================================================================

#[test]
fn test_load_property_access() {
    let source = format!("A=load('{LIBRARY_ADDRESS}')\nA.X+5");
    assert_eq!(eval_with(&source, &library_options()), "25");
}

#[test]
fn test_join_address() {
    let source = format!("join('{LIBRARY_ADDRESS}')\nX+5");
    assert_eq!(eval_with(&source, &library_options()), "25");
}

#[test]
fn test_join_loaded_property() {
    let source = format!("A=load('{LIBRARY_ADDRESS}')\njoin(A)\nX+5");
    assert_eq!(eval_with(&source, &library_options()), "25");
}

#[test]
fn test_file_loader_serves_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.kat"), LIBRARY_SOURCE).unwrap();
    let options = EngineOptions::new().with_loader(FileLoader::new(dir.path()));
    assert_eq!(eval_with("A=load('lib.kat')\nA.X+5", &options), "25");
}

#[test]
fn test_unknown_address_is_one_error() {
    let options = library_options();
    for source in ["A=load('nonExistent.kat') A", "join('nonExistent.kat')"] {
        let outcome = parse_with(source, &options);
        assert_eq!(outcome.diagnostics.len(), 1, "{source}");
        assert_eq!(outcome.diagnostics[0].kind, ErrorKind::LoadFailed);
    }
}

#[test]
fn test_invalid_program_is_one_error() {
    let options = library_options();
    for source in ["A=load('broken.kat') A", "join('broken.kat')"] {
        let outcome = parse_with(source, &options);
        assert_eq!(outcome.diagnostics.len(), 1, "{source}");
        assert_eq!(outcome.diagnostics[0].kind, ErrorKind::InvalidProgram);
    }
}

#[test]
fn test_load_without_loader() {
    let outcome = parse("A=load('lib.kat') A");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, ErrorKind::LoadFailed);
    assert!(outcome.diagnostics[0].message.contains("no source loader"));
}

#[test]
fn test_misspelled_loader_name() {
    let outcome = parse_with("A=load2('http')\nA.X+5", &library_options());
    assert_eq!(outcome.diagnostics.len(), 1);
}
