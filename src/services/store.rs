use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;

/// Durable byte storage, namespaced by key prefix.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    async fn list_keys(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let db = self.db.lock().unwrap();
        queries::kv_get(&db, key)
    }

    async fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let db = self.db.lock().unwrap();
        queries::kv_set(&db, key, value)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let db = self.db.lock().unwrap();
        queries::kv_delete(&db, key)?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        queries::kv_list_keys(&db, prefix)
    }
}

/// Process-local store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn exercise(store: &dyn KeyValueStore) {
        store.set("booking:1", b"first").await.unwrap();
        store.set("booking:2", b"second").await.unwrap();
        store.set("other:1", b"x").await.unwrap();

        assert_eq!(store.get("booking:1").await.unwrap().unwrap(), b"first");
        assert_eq!(
            store.list_keys("booking:").await.unwrap(),
            vec!["booking:1", "booking:2"]
        );

        store.delete("booking:1").await.unwrap();
        assert!(store.get("booking:1").await.unwrap().is_none());
        // deleting an absent key is not an error
        store.delete("booking:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        let conn = db::init_db(":memory:").unwrap();
        let store = SqliteStore::new(Arc::new(Mutex::new(conn)));
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise(&MemoryStore::new()).await;
    }
}
