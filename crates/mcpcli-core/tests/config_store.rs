use std::collections::BTreeMap;

use tempfile::TempDir;

use mcpcli_core::ErrorKind;
use mcpcli_core::config::{ConfigPaths, ConfigRoot, ConfigStore, legacy_config_path};
use mcpcli_core::context::AppContext;
use mcpcli_core::registry::ServerRegistry;

const LEGACY: &str = r#"{
  "mcpServers": {
    "legacy": { "command": "node", "args": ["server.js"] }
  }
}"#;

fn root_store(temp: &TempDir) -> ConfigStore {
    let root = ConfigRoot::new(temp.path().join("root"));
    ConfigStore::new(ConfigPaths::for_root(&root, Some(&temp.path().join("home"))))
}

fn write_legacy(temp: &TempDir, content: &str) {
    let legacy = legacy_config_path(&temp.path().join("home"));
    std::fs::create_dir_all(legacy.parent().unwrap()).unwrap();
    std::fs::write(legacy, content).unwrap();
}

#[test]
fn legacy_file_is_migrated_once() {
    let temp = TempDir::new().unwrap();
    write_legacy(&temp, LEGACY);
    let store = root_store(&temp);

    let config = store.load().unwrap();
    assert_eq!(config.names(), vec!["legacy"]);
    assert!(store.config_path().exists());

    // Later edits to the legacy file are not re-applied.
    write_legacy(&temp, r#"{"mcpServers": {}}"#);
    let registry = ServerRegistry::new(store.clone());
    registry.add("fresh", "uvx", vec![], None).unwrap();

    assert_eq!(store.load().unwrap().names(), vec!["fresh", "legacy"]);
}

#[test]
fn malformed_legacy_falls_back_to_empty() {
    let temp = TempDir::new().unwrap();
    write_legacy(&temp, "{ not json");
    let store = root_store(&temp);

    let config = store.load().unwrap();

    assert!(config.is_empty());
    assert!(store.config_path().exists());
}

#[test]
fn export_is_byte_stable() {
    let temp = TempDir::new().unwrap();
    let registry = ServerRegistry::new(root_store(&temp));
    let env = BTreeMap::from([("TOKEN".to_string(), "abc".to_string())]);
    registry
        .add("b", "npx", vec!["-y".to_string(), "pkg".to_string()], Some(env))
        .unwrap();
    registry.add("a", "uvx", vec![], None).unwrap();

    let first = temp.path().join("first.json");
    let second = temp.path().join("second.json");
    registry.export_to(&first).unwrap();
    registry.import_from(&first).unwrap();
    registry.export_to(&second).unwrap();

    let first = std::fs::read(&first).unwrap();
    assert_eq!(first, std::fs::read(&second).unwrap());
    assert_eq!(first, std::fs::read(registry.config_store().config_path()).unwrap());
}

#[test]
fn empty_configuration_round_trips() {
    let temp = TempDir::new().unwrap();
    let registry = ServerRegistry::new(root_store(&temp));

    let first = temp.path().join("first.json");
    let second = temp.path().join("second.json");
    registry.export_to(&first).unwrap();
    assert_eq!(registry.import_from(&first).unwrap(), 0);
    registry.export_to(&second).unwrap();

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    let exported: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&second).unwrap()).unwrap();
    assert_eq!(exported, serde_json::json!({"mcpServers": {}}));
}

#[test]
fn empty_env_survives_import_and_export() {
    let temp = TempDir::new().unwrap();
    let registry = ServerRegistry::new(root_store(&temp));
    let source = temp.path().join("source.json");
    std::fs::write(
        &source,
        r#"{"mcpServers":{"a":{"command":"x","args":[],"env":{}}}}"#,
    )
    .unwrap();

    assert_eq!(registry.import_from(&source).unwrap(), 1);
    let exported = temp.path().join("exported.json");
    registry.export_to(&exported).unwrap();

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&exported).unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"mcpServers": {"a": {"command": "x", "args": [], "env": {}}}})
    );
}

#[test]
fn import_replaces_configuration() {
    let temp = TempDir::new().unwrap();
    let registry = ServerRegistry::new(root_store(&temp));
    registry.add("old", "node", vec![], None).unwrap();

    let source = temp.path().join("import.json");
    std::fs::write(&source, LEGACY).unwrap();

    assert_eq!(registry.import_from(&source).unwrap(), 1);
    assert_eq!(registry.names().unwrap(), vec!["legacy"]);
    assert_eq!(registry.get("old").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn context_reads_settings_from_root() {
    let temp = TempDir::new().unwrap();
    let root = ConfigRoot::new(temp.path().join("root"));
    std::fs::create_dir_all(root.path()).unwrap();
    std::fs::write(root.settings_file(), "default_model = \"gpt-4o\"\nmax_steps = 5\n").unwrap();

    let context = AppContext::new(root, None).unwrap();

    assert_eq!(context.settings().default_model, "gpt-4o");
    assert_eq!(context.settings().max_steps, 5);
    assert!(context.registry().list().unwrap().is_empty());
}

#[test]
fn context_rejects_malformed_settings() {
    let temp = TempDir::new().unwrap();
    let root = ConfigRoot::new(temp.path().join("root"));
    std::fs::create_dir_all(root.path()).unwrap();
    std::fs::write(root.settings_file(), "max_steps = \"many\"").unwrap();

    let err = AppContext::new(root, None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedConfig);
}
