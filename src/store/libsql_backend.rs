//! libSQL backend — async `ProfileStore` implementation.
//!
//! One `profiles` table keyed by user id, each row holding the whole
//! `UserProfile` as a JSON blob. Whole-object read, whole-object write.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::coach::model::UserProfile;
use crate::error::StorageError;
use crate::store::traits::ProfileStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// libSQL profile store.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and ensure the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Profile database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute(SCHEMA, ())
            .await
            .map_err(|e| StorageError::Query(format!("Failed to create schema: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for LibSqlStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let data: String = row
                    .get(0)
                    .map_err(|e| StorageError::Query(e.to_string()))?;
                let profile = serde_json::from_str(&data)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, user_id: &str, profile: &UserProfile) -> Result<(), StorageError> {
        let data = serde_json::to_string(profile)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO profiles (user_id, data, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                     data = excluded.data,
                     updated_at = excluded.updated_at",
                params![user_id, data, now],
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM profiles WHERE user_id = ?1", params![user_id])
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::model::MealEntry;
    use crate::llm::ChatMessage;

    fn sample_profile() -> UserProfile {
        let mut profile = UserProfile::default();
        profile.apply_setup(1800, 120, 200, 60, "Lea");
        profile.push_message(ChatMessage::user("Salut"));
        profile.apply_meal(
            "2026-08-30",
            MealEntry {
                name: "Salade".to_string(),
                calories: 450,
                protein: 20,
                carbs: 30,
                fat: 25,
            },
        );
        profile
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let profile = sample_profile();

        store.save("whatsapp:+33612345678", &profile).await.unwrap();
        let loaded = store
            .load("whatsapp:+33612345678")
            .await
            .unwrap()
            .expect("profile should exist");

        assert!(loaded.setup_done);
        assert_eq!(loaded.first_name, "Lea");
        assert_eq!(loaded.conversation.len(), 1);
        assert_eq!(loaded.days["2026-08-30"].calories_consumed, 450);
    }

    #[tokio::test]
    async fn load_absent_user_is_none() {
        let store = LibSqlStore::new_memory().await.unwrap();
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_whole_object() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let mut profile = sample_profile();
        store.save("u1", &profile).await.unwrap();

        profile.apply_meal(
            "2026-08-30",
            MealEntry {
                name: "Yaourt".to_string(),
                calories: 150,
                protein: 8,
                carbs: 12,
                fat: 6,
            },
        );
        store.save("u1", &profile).await.unwrap();

        let loaded = store.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.days["2026-08-30"].meals.len(), 2);
        assert_eq!(loaded.days["2026-08-30"].calories_consumed, 600);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store.save("u1", &sample_profile()).await.unwrap();

        assert!(store.delete("u1").await.unwrap());
        assert!(store.load("u1").await.unwrap().is_none());
        // Deleting an absent user is not an error
        assert!(!store.delete("u1").await.unwrap());
    }

    #[tokio::test]
    async fn on_disk_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mika.db");

        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            store.save("u1", &sample_profile()).await.unwrap();
        }

        let store = LibSqlStore::new_local(&path).await.unwrap();
        let loaded = store.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.first_name, "Lea");
    }
}
