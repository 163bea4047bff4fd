//! Engine behavior across configuration surface: profiles, key files,
//! column selection, statistics

use tempfile::TempDir;
use veil::config::{profile, secret_string, VeilConfig};
use veil::domain::{DataType, Mode, VeilError};
use veil::engine::Engine;

#[test]
fn test_profiles_build_working_engines() {
    for name in veil::config::PROFILE_NAMES {
        let mut config = profile(name).unwrap();
        if config.engine.seed.is_none() {
            config.engine.seed = Some(secret_string("example".to_string()));
        }
        let engine = Engine::new(config).unwrap();
        let out = engine.anonymize("name", "John Smith").unwrap();
        assert_ne!(out, "John Smith", "profile {name} left the value intact");
    }
}

#[test]
fn test_generated_key_file_reopens_vault() {
    let dir = TempDir::new().unwrap();
    let vault_path = dir.path().join("mappings.vault");

    let make_config = || {
        let mut config = VeilConfig::default();
        config.engine.seed = Some(secret_string("example".to_string()));
        config.vault.path = Some(vault_path.clone());
        // No password: the engine generates and exports a key file
        config
    };

    let first = {
        let engine = Engine::new(make_config()).unwrap();
        let out = engine.anonymize("name", "John Smith").unwrap();
        engine.flush().unwrap();
        out
    };
    assert!(vault_path.with_extension("key.json").exists());

    // Second engine finds the key file and reads the same mappings
    let engine = Engine::new(make_config()).unwrap();
    assert_eq!(engine.anonymize("name", "John Smith").unwrap(), first);
    assert_eq!(
        engine.deanonymize("name", &first).unwrap().as_deref(),
        Some("John Smith")
    );
}

#[test]
fn test_wrong_vault_password_is_auth_error() {
    let dir = TempDir::new().unwrap();
    let vault_path = dir.path().join("mappings.vault");

    let make_config = |password: &str| {
        let mut config = VeilConfig::default();
        config.engine.seed = Some(secret_string("example".to_string()));
        config.vault.path = Some(vault_path.clone());
        config.vault.password = Some(secret_string(password.to_string()));
        config
    };

    {
        let engine = Engine::new(make_config("pw")).unwrap();
        engine.anonymize("name", "John Smith").unwrap();
        engine.flush().unwrap();
    }
    let err = Engine::new(make_config("not-pw")).unwrap_err();
    assert!(matches!(err, VeilError::VaultAuth(_)), "got {err:?}");
}

#[test]
fn test_fully_synthetic_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    config.engine.fully_synthetic = true;
    config.vault.path = Some(dir.path().join("mappings.vault"));
    let engine = Engine::new(config).unwrap();

    let out = engine.anonymize("name", "John Smith").unwrap();
    assert_ne!(out, "John Smith");
    // Vault was never opened, so nothing is reversible
    assert_eq!(engine.deanonymize("name", &out).unwrap(), None);
    assert!(engine.vault_statistics().unwrap().is_none());
    assert!(!dir.path().join("mappings.vault").exists());
}

#[test]
fn test_column_selection_and_overrides() {
    let dir = TempDir::new().unwrap();
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    config.engine.columns = Some(vec!["ssn".to_string()]);
    config
        .engine
        .type_overrides
        .insert("ssn".to_string(), "numeric_id".to_string());
    config.vault.path = Some(dir.path().join("mappings.vault"));
    config.vault.password = Some(secret_string("pw".to_string()));
    let engine = Engine::new(config).unwrap();

    // Outside the anonymize set: untouched
    assert_eq!(engine.anonymize("notes", "hello").unwrap(), "hello");

    let out = engine.anonymize("ssn", "123456789").unwrap();
    assert_ne!(out, "123456789");
    assert_eq!(out.len(), 9);
    assert!(out.bytes().all(|b| b.is_ascii_digit()));

    let params = engine.run_parameters();
    let column = params.columns.iter().find(|c| c.name == "ssn").unwrap();
    assert_eq!(column.data_type, DataType::NumericId);
    assert_eq!(column.confidence, 1.0);
}

#[test]
fn test_vault_statistics_by_type_and_column() {
    let dir = TempDir::new().unwrap();
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    config.vault.path = Some(dir.path().join("mappings.vault"));
    config.vault.password = Some(secret_string("pw".to_string()));
    let engine = Engine::new(config).unwrap();

    engine.anonymize("email", "a@b.com").unwrap();
    engine.anonymize("email", "c@d.net").unwrap();
    engine.anonymize("name", "John Smith").unwrap();

    let stats = engine.vault_statistics().unwrap().unwrap();
    assert_eq!(stats.total_mappings, 3);
    assert_eq!(stats.by_column["email"], 2);
    assert_eq!(stats.by_column["name"], 1);
    assert_eq!(stats.by_type["email"], 2);
    assert_eq!(stats.by_type["name"], 1);
}

#[test]
fn test_idempotent_repeat_calls_hit_vault() {
    let dir = TempDir::new().unwrap();
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    config.vault.path = Some(dir.path().join("mappings.vault"));
    config.vault.password = Some(secret_string("pw".to_string()));
    let engine = Engine::new(config).unwrap();

    let first = engine.anonymize("email", "a@b.com").unwrap();
    for _ in 0..5 {
        assert_eq!(engine.anonymize("email", "a@b.com").unwrap(), first);
    }
    let stats = engine.vault_statistics().unwrap().unwrap();
    assert_eq!(stats.total_mappings, 1);
}

#[test]
fn test_set_mode_switches_strategy() {
    let mut config = VeilConfig::default();
    config.engine.seed = Some(secret_string("example".to_string()));
    let mut engine = Engine::new(config).unwrap();

    assert_eq!(engine.mode(), Mode::Hybrid);
    let hybrid = engine.anonymize("name", "John Smith").unwrap();

    engine.set_mode(Mode::Hmac);
    let hashed = engine.anonymize("name", "John Smith").unwrap();
    assert_eq!(engine.mode(), Mode::Hmac);
    assert_ne!(hybrid, hashed);
}
