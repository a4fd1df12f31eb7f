//! Integration tests for the JSON document store
//!
//! Each test works inside its own temporary directory.

use std::fs;

use intent_gate::error::StorageError;
use intent_gate::forest::{Forest, Tree};
use intent_gate::guide::Guide;
use intent_gate::storage::{recover_tmp_files, tmp_path, DocumentStore, JsonFileStore};
use intent_gate::tfidf::Corpus;
use intent_gate::text::tokenize;
use tempfile::TempDir;

#[test]
fn test_load_missing_returns_default() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new();

    let forest: Forest = store.load(&dir.path().join("intent.json")).unwrap();
    assert!(forest.is_empty());
    let guide: Guide = store.load(&dir.path().join("guide.json")).unwrap();
    assert_eq!(guide.max_size, 15);
}

#[test]
fn test_load_corrupt_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.json");
    fs::write(&path, "{\"docFreq\": [").unwrap();

    let store = JsonFileStore::new();
    let err = store.load::<Corpus>(&path).unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }));
    assert_eq!(err.path(), path.as_path());

    // Callers that prefer to carry on get the default instead.
    let corpus: Corpus = store.load_or_default(&path);
    assert!(corpus.is_empty());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("data").join("intent.json");
    let store = JsonFileStore::new();

    let mut forest = Forest::new();
    let mut tree = Tree::new("add JWT authentication", "p0");
    let root_id = tree.root_id.clone();
    tree.add_child(&root_id, "fix token expiry", "p1");
    forest.add_tree(tree);
    forest.meta.total_prompts = 2;

    store.save(&path, &forest).unwrap();
    assert!(path.exists());
    assert!(!tmp_path(&path).exists());

    let loaded: Forest = store.load(&path).unwrap();
    assert_eq!(loaded, forest);

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"totalPrompts\": 2"));
}

#[test]
fn test_save_overwrites_existing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.json");
    let store = JsonFileStore::new();

    let mut corpus = Corpus::new();
    corpus.add_document(&tokenize("database migration"));
    store.save(&path, &corpus).unwrap();

    corpus.add_document(&tokenize("database index"));
    store.save(&path, &corpus).unwrap();

    let loaded: Corpus = store.load(&path).unwrap();
    assert_eq!(loaded.total_docs, 2);
    assert_eq!(loaded.doc_freq.get("database").copied(), Some(2));
}

#[test]
fn test_recover_orphan_tmp_is_promoted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("guide.json");
    let store = JsonFileStore::new();

    let mut guide = Guide::new(3);
    guide.add("Added the login form", "", Vec::new());
    store.save(&path, &guide).unwrap();
    fs::rename(&path, tmp_path(&path)).unwrap();

    recover_tmp_files(&[&path]);

    assert!(path.exists());
    assert!(!tmp_path(&path).exists());
    let loaded: Guide = store.load(&path).unwrap();
    assert_eq!(loaded.len(), 1);
}

#[test]
fn test_recover_stale_tmp_is_removed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("markov.json");
    fs::write(&path, "{}").unwrap();
    fs::write(tmp_path(&path), "partial").unwrap();

    recover_tmp_files(&[&path]);

    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    assert!(!tmp_path(&path).exists());
}

#[test]
fn test_remove_missing_is_ok() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("intent.json");
    let store = JsonFileStore::new();

    store.remove(&path).unwrap();
    fs::write(&path, "{}").unwrap();
    store.remove(&path).unwrap();
    assert!(!path.exists());
}
