//! In-memory remote store double for tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::model::{Entity, Match, Profile, Venue};

use super::{ProfileDirectory, RemoteError, RemoteStore, SyncScope};

/// Deterministic remote store backed by in-process maps.
///
/// `fail_unavailable` / `fail_unauthorized` switch every call into the
/// corresponding error; `fetch_count` observes whether a sync pass
/// actually reached the remote (throttle and single-flight tests).
#[derive(Default)]
pub struct InMemoryRemote {
    profiles: Mutex<BTreeMap<String, Profile>>,
    matches: Mutex<BTreeMap<String, Match>>,
    venues: Mutex<BTreeMap<String, Venue>>,
    fail_unavailable: AtomicBool,
    fail_unauthorized: AtomicBool,
    fail_kinds: Mutex<HashSet<String>>,
    fetch_calls: AtomicUsize,
    fetch_log: Mutex<Vec<&'static str>>,
    gate: Mutex<Option<std::sync::Arc<tokio::sync::Semaphore>>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly into the remote set.
    pub fn seed_profile(&self, profile: Profile) {
        lock(&self.profiles).insert(profile.id.clone(), profile);
    }

    pub fn seed_match(&self, m: Match) {
        lock(&self.matches).insert(m.id.clone(), m);
    }

    pub fn seed_venue(&self, venue: Venue) {
        lock(&self.venues).insert(venue.id.clone(), venue);
    }

    pub fn set_unavailable(&self, failing: bool) {
        self.fail_unavailable.store(failing, Ordering::SeqCst);
    }

    pub fn set_unauthorized(&self, failing: bool) {
        self.fail_unauthorized.store(failing, Ordering::SeqCst);
    }

    /// Fail calls for one entity kind only.
    pub fn set_unavailable_for(&self, kind: &str) {
        lock(&self.fail_kinds).insert(kind.to_string());
    }

    /// Number of `fetch_all` calls served (across all entity kinds).
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Entity kinds in the order their `fetch_all` calls were served.
    pub fn fetch_kinds(&self) -> Vec<&'static str> {
        lock(&self.fetch_log).clone()
    }

    /// Gate every `fetch_all` behind a semaphore permit, letting tests
    /// hold a sync pass in flight until permits are added.
    pub fn set_gate(&self, gate: std::sync::Arc<tokio::sync::Semaphore>) {
        *lock(&self.gate) = Some(gate);
    }

    async fn pass_gate(&self) -> Result<(), RemoteError> {
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| RemoteError::Unavailable("gate closed".into()))?;
            permit.forget();
        }
        Ok(())
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        lock(&self.profiles).get(id).cloned()
    }

    pub fn venue(&self, id: &str) -> Option<Venue> {
        lock(&self.venues).get(id).cloned()
    }

    fn check(&self, kind: &str) -> Result<(), RemoteError> {
        if self.fail_unauthorized.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized);
        }
        if self.fail_unavailable.load(Ordering::SeqCst) || lock(&self.fail_kinds).contains(kind) {
            return Err(RemoteError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

macro_rules! impl_remote_store {
    ($entity:ty, $table:ident) => {
        impl RemoteStore<$entity> for InMemoryRemote {
            async fn fetch_all(&self, _scope: &SyncScope) -> Result<Vec<$entity>, RemoteError> {
                self.pass_gate().await?;
                self.check(<$entity as Entity>::KIND)?;
                self.fetch_calls.fetch_add(1, Ordering::SeqCst);
                lock(&self.fetch_log).push(<$entity as Entity>::KIND);
                Ok(lock(&self.$table).values().cloned().collect())
            }

            async fn upsert(&self, entity: &$entity) -> Result<$entity, RemoteError> {
                self.check(<$entity as Entity>::KIND)?;
                let mut stored = entity.clone();
                stored.set_synced(true);
                lock(&self.$table).insert(entity.id().to_string(), stored.clone());
                Ok(stored)
            }

            async fn delete(&self, id: &str) -> Result<(), RemoteError> {
                self.check(<$entity as Entity>::KIND)?;
                lock(&self.$table).remove(id);
                Ok(())
            }
        }
    };
}

impl_remote_store!(Profile, profiles);
impl_remote_store!(Match, matches);
impl_remote_store!(Venue, venues);

impl ProfileDirectory for InMemoryRemote {
    async fn fetch_by_owner(&self, owner_id: &str) -> Result<Option<Profile>, RemoteError> {
        self.check(Profile::KIND)?;
        Ok(lock(&self.profiles).get(owner_id).cloned())
    }
}
