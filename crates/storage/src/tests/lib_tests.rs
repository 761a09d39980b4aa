use anyhow::anyhow;

use super::*;

/// Backend where every call fails.
struct UnavailableKeyValueStore;

#[async_trait]
impl KeyValueStore for UnavailableKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable reading '{key}'"))
    }

    async fn set(&self, key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage unavailable writing '{key}'"))
    }
}

/// Backend whose reads return a fixed raw value.
struct FixedValueStore(String);

#[async_trait]
impl KeyValueStore for FixedValueStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn sqlite_store_overwrites_existing_key() {
    let store = SqliteKeyValueStore::new("sqlite::memory:").await.expect("db");
    store.set("k", "first").await.expect("set");
    store.set("k", "second").await.expect("overwrite");
    assert_eq!(store.get("k").await.expect("get"), Some("second".to_string()));
    assert_eq!(store.get("missing").await.expect("get"), None);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = SqliteKeyValueStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let db_path = temp_root.path().join("nested").join("selection.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = SqliteKeyValueStore::new(&database_url).await.expect("db");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn selection_round_trips_through_memory_backend() {
    let store = SelectionStore::in_memory();
    let path = SelectionPath::new(["US", "New York", "Kings"]).expect("path");
    store.save(&path).await;
    assert_eq!(store.load().await, path);
}

#[tokio::test]
async fn missing_selection_loads_as_empty() {
    let store = SelectionStore::in_memory();
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn unavailable_backend_is_swallowed() {
    let store = SelectionStore::new(Arc::new(UnavailableKeyValueStore));
    store
        .save(&SelectionPath::new(["Alpha"]).expect("path"))
        .await;
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn unparsable_selection_loads_as_empty() {
    let store = SelectionStore::new(Arc::new(FixedValueStore("{not json".into())));
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn selection_with_undefined_levels_keeps_prefix() {
    let store = SelectionStore::new(Arc::new(FixedValueStore(r#"["X",null,null]"#.into())));
    assert_eq!(store.load().await.segments(), ["X"]);
}

#[test]
fn sqlite_path_skips_memory_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/selection.db?mode=rwc"),
        Some(PathBuf::from("./data/selection.db"))
    );
}
