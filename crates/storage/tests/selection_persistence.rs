use std::sync::Arc;

use shared::domain::SelectionPath;
use storage::{KeyValueStore, SelectionStore, SqliteKeyValueStore, SELECTION_KEY};

#[tokio::test]
async fn selection_survives_reopening_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!(
        "sqlite://{}",
        dir.path()
            .join("selection.db")
            .to_string_lossy()
            .replace('\\', "/")
    );
    let path = SelectionPath::new(["Canada", "Ontario"]).expect("path");

    {
        let backend = SqliteKeyValueStore::new(&url).await.expect("db");
        SelectionStore::new(Arc::new(backend)).save(&path).await;
    }

    let backend = Arc::new(SqliteKeyValueStore::new(&url).await.expect("reopen db"));
    assert_eq!(
        backend.get(SELECTION_KEY).await.expect("raw value"),
        Some(r#"["Canada","Ontario"]"#.to_string())
    );
    assert_eq!(SelectionStore::new(backend).load().await, path);
}
