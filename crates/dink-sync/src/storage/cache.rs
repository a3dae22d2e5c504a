//! Generic local-first entity cache.
//!
//! One instance per entity type over the shared database. Entities are
//! JSON documents in the `entities` table; `upsert` does field-level
//! merge of a partial document, `sync_from_remote` merges the remote
//! set with remote-wins-per-id semantics while preserving local-only
//! rows, and `push_pending` uploads rows created or edited offline.

use std::marker::PhantomData;

use serde_json::Value;
use tracing::debug;

use dink_core::db::unix_timestamp_ms;

use crate::error::SyncError;
use crate::model::{Entity, Venue};
use crate::remote::{RemoteStore, SyncScope};

use super::db::{Database, StorageError};

/// Local cache for one entity type.
#[derive(Clone)]
pub struct EntityCache<E: Entity> {
    db: Database,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityCache<E> {
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    /// List the full local cache in storage (insertion) order.
    pub async fn list(&self) -> Result<Vec<E>, StorageError> {
        let bodies: Vec<String> =
            sqlx::query_scalar("SELECT body FROM entities WHERE kind = ? ORDER BY rowid")
                .bind(E::KIND)
                .fetch_all(self.db.pool())
                .await?;

        bodies.iter().map(|raw| decode::<E>(raw)).collect()
    }

    /// Local-only lookup; never touches the remote store.
    pub async fn get(&self, id: &str) -> Result<Option<E>, StorageError> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM entities WHERE kind = ? AND id = ?")
                .bind(E::KIND)
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        body.as_deref().map(decode::<E>).transpose()
    }

    /// Merge a partial JSON document into the cache.
    ///
    /// When the patch carries a known `id`, its fields overwrite the
    /// existing document field-by-field (shallow, not deep). Without an
    /// `id` a new local id is generated. The result is always marked
    /// `synced = false`; nothing is pushed to the remote here.
    pub async fn upsert(&self, patch: Value) -> Result<E, StorageError> {
        let Value::Object(patch) = patch else {
            return Err(StorageError::Corrupt(
                "upsert patch must be a JSON object".to_string(),
            ));
        };

        let id = patch
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string);

        let existing: Option<String> =
            sqlx::query_scalar("SELECT body FROM entities WHERE kind = ? AND id = ?")
                .bind(E::KIND)
                .bind(&id)
                .fetch_optional(self.db.pool())
                .await?;

        let mut body = match existing {
            Some(raw) => serde_json::from_str::<Value>(&raw)
                .map_err(|e| StorageError::Corrupt(format!("{} {id}: {e}", E::KIND)))?,
            None => Value::Object(serde_json::Map::new()),
        };

        if let Some(obj) = body.as_object_mut() {
            for (key, value) in patch {
                obj.insert(key, value);
            }
            obj.insert("id".to_string(), Value::String(id.clone()));
            obj.insert("synced".to_string(), Value::Bool(false));
        }

        let entity: E = serde_json::from_value(body)
            .map_err(|e| StorageError::Corrupt(format!("{} {id}: {e}", E::KIND)))?;
        self.put(&entity).await?;
        Ok(entity)
    }

    /// Write a full entity, overwriting any existing document.
    ///
    /// The `synced` column mirrors the entity's own flag so pending
    /// pushes stay queryable by index.
    pub async fn put(&self, entity: &E) -> Result<(), StorageError> {
        let body = serde_json::to_string(entity)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", E::KIND)))?;

        sqlx::query(
            "INSERT OR REPLACE INTO entities (kind, id, body, synced, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(E::KIND)
        .bind(entity.id())
        .bind(body)
        .bind(i64::from(entity.synced()))
        .bind(unix_timestamp_ms())
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Remove from the local cache only. Remote deletion is a separate,
    /// explicit remote call.
    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM entities WHERE kind = ? AND id = ?")
            .bind(E::KIND)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Rows created or edited locally that have not been pushed yet.
    pub async fn list_unsynced(&self) -> Result<Vec<E>, StorageError> {
        let bodies: Vec<String> = sqlx::query_scalar(
            "SELECT body FROM entities WHERE kind = ? AND synced = 0 ORDER BY rowid",
        )
        .bind(E::KIND)
        .fetch_all(self.db.pool())
        .await?;

        bodies.iter().map(|raw| decode::<E>(raw)).collect()
    }

    /// Pull the remote set and merge it into the local cache.
    ///
    /// Remote wins per id; local-only rows (offline creations not yet
    /// pushed) are never deleted. A remote fetch failure leaves the
    /// cache untouched and propagates to the caller.
    pub async fn sync_from_remote<R: RemoteStore<E>>(
        &self,
        remote: &R,
        scope: &SyncScope,
    ) -> Result<usize, SyncError> {
        let records = remote.fetch_all(scope).await?;
        let merged = records.len();

        for mut record in records {
            record.set_synced(true);
            self.put(&record).await?;
        }

        debug!(kind = E::KIND, merged, "Merged remote records");
        Ok(merged)
    }

    /// Push every unsynced local row to the remote store.
    ///
    /// Rows pushed before a failure stay marked synced; the failure
    /// propagates and the remainder is retried on the next pass.
    pub async fn push_pending<R: RemoteStore<E>>(
        &self,
        remote: &R,
        _scope: &SyncScope,
    ) -> Result<usize, SyncError> {
        let pending = self.list_unsynced().await?;
        let pushed = pending.len();

        for mut entity in pending {
            remote.upsert(&entity).await?;
            entity.set_synced(true);
            self.put(&entity).await?;
        }

        if pushed > 0 {
            debug!(kind = E::KIND, pushed, "Pushed pending local records");
        }
        Ok(pushed)
    }
}

impl EntityCache<Venue> {
    /// Case-insensitive substring search on venue names.
    pub async fn search(&self, query: &str) -> Result<Vec<Venue>, StorageError> {
        let bodies: Vec<String> = sqlx::query_scalar(
            "SELECT body FROM entities WHERE kind = ? \
             AND lower(json_extract(body, '$.name')) LIKE '%' || lower(?) || '%' \
             ORDER BY rowid",
        )
        .bind(Venue::KIND)
        .bind(query)
        .fetch_all(self.db.pool())
        .await?;

        bodies.iter().map(|raw| decode::<Venue>(raw)).collect()
    }
}

fn decode<E: Entity>(raw: &str) -> Result<E, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt(format!("{}: {e}", E::KIND)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::model::Profile;

    use super::*;

    async fn profile_cache() -> EntityCache<Profile> {
        let db = Database::open_in_memory().await.unwrap();
        EntityCache::new(db)
    }

    #[tokio::test]
    async fn upsert_without_id_generates_one() {
        let cache = profile_cache().await;

        let p = cache
            .upsert(json!({"display_name": "Ada", "is_placeholder": true}))
            .await
            .unwrap();

        assert!(!p.id.is_empty());
        assert!(p.is_placeholder);
        assert!(!p.synced);
        assert_eq!(cache.get(&p.id).await.unwrap().unwrap(), p);
    }

    #[tokio::test]
    async fn upsert_merges_fields_into_existing() {
        let cache = profile_cache().await;

        let p = cache
            .upsert(json!({"display_name": "Ada", "dupr_id": "D-1"}))
            .await
            .unwrap();
        let updated = cache
            .upsert(json!({"id": p.id, "display_name": "Ada L."}))
            .await
            .unwrap();

        // Overwritten field changes, untouched field survives.
        assert_eq!(updated.display_name, "Ada L.");
        assert_eq!(updated.dupr_id.as_deref(), Some("D-1"));
    }

    #[tokio::test]
    async fn upsert_marks_synced_false() {
        let cache = profile_cache().await;

        let mut p = Profile::placeholder("Ada");
        p.synced = true;
        cache.put(&p).await.unwrap();

        let edited = cache
            .upsert(json!({"id": p.id, "display_name": "Ada L."}))
            .await
            .unwrap();
        assert!(!edited.synced);
        assert_eq!(cache.list_unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_rejects_non_object_patch() {
        let cache = profile_cache().await;
        let err = cache.upsert(json!("nope")).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let cache = profile_cache().await;

        for name in ["one", "two", "three"] {
            cache.upsert(json!({"display_name": name})).await.unwrap();
        }

        let names: Vec<String> = cache
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn delete_is_local_only() {
        let cache = profile_cache().await;
        let p = cache.upsert(json!({"display_name": "Ada"})).await.unwrap();

        cache.delete(&p.id).await.unwrap();
        assert!(cache.get(&p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let cache = profile_cache().await;
        assert!(cache.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn venue_search_is_case_insensitive_substring() {
        let db = Database::open_in_memory().await.unwrap();
        let cache: EntityCache<Venue> = EntityCache::new(db);

        for name in ["Sunset Park Courts", "Riverside Rec", "Park Slope PB"] {
            cache.upsert(json!({"name": name})).await.unwrap();
        }

        let hits = cache.search("pArK").await.unwrap();
        let names: Vec<String> = hits.into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Sunset Park Courts", "Park Slope PB"]);
        assert!(cache.search("tennis").await.unwrap().is_empty());
    }
}
