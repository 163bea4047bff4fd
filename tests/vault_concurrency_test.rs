//! Concurrency: first-writer-wins upserts and stable results across workers

use std::sync::Arc;
use tempfile::TempDir;
use veil::config::{secret_string, VeilConfig};
use veil::domain::{DataType, MappingEntry};
use veil::engine::Engine;
use veil::vault::{UpsertOutcome, Vault};

#[test]
fn test_concurrent_anonymize_same_cell_converges() {
    let dir = TempDir::new().unwrap();
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    config.vault.path = Some(dir.path().join("mappings.vault"));
    config.vault.password = Some(secret_string("pw".to_string()));
    let engine = Arc::new(Engine::new(config).unwrap());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            (0..25)
                .map(|_| engine.anonymize("email", "shared@corp.com").unwrap())
                .collect::<Vec<String>>()
        }));
    }

    let mut results: Vec<String> = Vec::new();
    for handle in handles {
        results.extend(handle.join().unwrap());
    }
    let first = &results[0];
    assert!(results.iter().all(|r| r == first));

    // Exactly one mapping was created for the cell
    let stats = engine.vault_statistics().unwrap().unwrap();
    assert_eq!(stats.total_mappings, 1);
    assert_eq!(stats.by_column["email"], 1);
}

#[test]
fn test_concurrent_distinct_cells() {
    let dir = TempDir::new().unwrap();
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    config.vault.path = Some(dir.path().join("mappings.vault"));
    config.vault.password = Some(secret_string("pw".to_string()));
    let engine = Arc::new(Engine::new(config).unwrap());

    let mut handles = Vec::new();
    for worker in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            for i in 0..20 {
                let value = format!("user{worker}.{i}@corp.com");
                engine.anonymize("email", &value).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.vault_statistics().unwrap().unwrap();
    assert_eq!(stats.total_mappings, 80);
}

#[test]
fn test_raw_upsert_race_first_writer_wins() {
    let dir = TempDir::new().unwrap();
    let vault = Arc::new(Vault::open(dir.path().join("v"), [7u8; 32], Some(b"pw".as_slice())).unwrap());

    let mut handles = Vec::new();
    for worker in 0..8 {
        let vault = Arc::clone(&vault);
        handles.push(std::thread::spawn(move || {
            let entry = MappingEntry::new(
                "col",
                "original",
                format!("candidate-{worker}"),
                DataType::FreeText,
            );
            match vault.upsert(entry).unwrap() {
                UpsertOutcome::Inserted => format!("candidate-{worker}"),
                UpsertOutcome::AlreadyExists(stored) => stored,
            }
        }));
    }

    let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &results[0];
    assert!(results.iter().all(|r| r == first));
    assert_eq!(
        vault.get_forward("col", "original").unwrap().as_deref(),
        Some(first.as_str())
    );
}
