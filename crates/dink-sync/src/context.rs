//! Process-scoped wiring of the sync engine.
//!
//! No ambient singletons: every component is constructed here, caches
//! before the orchestrator that drives them, and handed to callers as
//! fields of one context value.

use crate::model::{Match, Profile, Venue};
use crate::remote::RemoteStore;
use crate::storage::{Database, DeviceLinkStore, EntityCache, db::StorageError};
use crate::sync::{SyncOrchestrator, SyncTrigger};

/// All sync-engine components for one device process.
pub struct SyncContext<R> {
    pub profiles: EntityCache<Profile>,
    pub matches: EntityCache<Match>,
    pub venues: EntityCache<Venue>,
    pub links: DeviceLinkStore,
    pub trigger: SyncTrigger<R>,
}

impl<R> SyncContext<R>
where
    R: RemoteStore<Profile> + RemoteStore<Match> + RemoteStore<Venue>,
{
    /// Wire the engine over an already-open database.
    pub fn new(db: &Database, remote: R, sync_throttle_ms: i64, activity_throttle_ms: i64) -> Self {
        let profiles = EntityCache::new(db.clone());
        let matches = EntityCache::new(db.clone());
        let venues = EntityCache::new(db.clone());
        let links = DeviceLinkStore::new(db.clone());

        let orchestrator = SyncOrchestrator::new(
            profiles.clone(),
            matches.clone(),
            venues.clone(),
            remote,
            sync_throttle_ms,
        );

        Self {
            profiles,
            matches,
            venues,
            links,
            trigger: SyncTrigger::new(orchestrator, activity_throttle_ms),
        }
    }

    /// Open the database at `path` and wire the engine over it.
    pub async fn open(
        path: &std::path::Path,
        remote: R,
        sync_throttle_ms: i64,
        activity_throttle_ms: i64,
    ) -> Result<Self, StorageError> {
        let db = Database::open(path).await?;
        Ok(Self::new(&db, remote, sync_throttle_ms, activity_throttle_ms))
    }
}

#[cfg(test)]
mod tests {
    use crate::remote::InMemoryRemote;

    use super::*;

    #[tokio::test]
    async fn context_components_share_one_database() {
        let db = Database::open_in_memory().await.unwrap();
        let ctx = SyncContext::new(&db, InMemoryRemote::new(), 20_000, 86_400_000);

        let p = ctx
            .profiles
            .upsert(serde_json::json!({"display_name": "Guest"}))
            .await
            .unwrap();
        ctx.links.ensure_link_for_device(&p.id).await.unwrap();

        // The link store sees the same database the caches write to.
        let link = ctx.links.load_link().await.unwrap().unwrap();
        assert_eq!(link.profile_id, p.id);
        assert!(ctx.profiles.get(&link.profile_id).await.unwrap().is_some());
    }
}
