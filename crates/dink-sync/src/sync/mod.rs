//! Sync orchestration: the throttled, single-flight driver of all
//! entity cache remote synchronization.
//!
//! A foreground trigger (app resume, periodic tick, or the CLI `sync`
//! command) funnels into [`SyncTrigger::fire`], which fans out to the
//! orchestrator and the independent activity-ping throttle. Background
//! sync is best-effort: failures are logged and the next trigger
//! retries.

use std::sync::Mutex;

use tracing::{debug, info, warn};

use dink_core::db::unix_timestamp_ms;

use crate::error::SyncError;
use crate::model::{AuthSession, Entity, Match, Profile, Venue};
use crate::remote::{RemoteStore, SyncScope};
use crate::storage::EntityCache;


/// Explicit rate limiter with an injected clock.
///
/// Owns the last-accepted timestamp; a trigger inside the window is
/// rejected even when nothing is running.
#[derive(Debug)]
pub struct RateLimiter {
    interval_ms: i64,
    last_accepted_ms: Option<i64>,
}

impl RateLimiter {
    pub const fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            last_accepted_ms: None,
        }
    }

    /// Accept `now_ms` if the window since the last acceptance has
    /// elapsed, consuming the window on acceptance.
    pub fn try_acquire(&mut self, now_ms: i64) -> bool {
        let accepted = self
            .last_accepted_ms
            .is_none_or(|last| now_ms - last >= self.interval_ms);
        if accepted {
            self.last_accepted_ms = Some(now_ms);
        }
        accepted
    }
}

/// What a sync trigger turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran to the end of the fixed entity order.
    /// `failures` counts entity types whose sync failed.
    Completed { failures: usize },
    /// Dropped: a sync was already in flight.
    InFlight,
    /// Dropped: inside the throttle window.
    Throttled,
}

/// Drives push/pull for all entity caches against one remote store.
///
/// Entity types sync in fixed dependency order - profiles before
/// matches before venues - so match participant ids resolve against
/// already-refreshed profiles. At most one pass is in flight per
/// process; concurrent triggers are dropped, not queued.
pub struct SyncOrchestrator<R> {
    profiles: EntityCache<Profile>,
    matches: EntityCache<Match>,
    venues: EntityCache<Venue>,
    remote: R,
    limiter: Mutex<RateLimiter>,
    in_flight: tokio::sync::Mutex<()>,
}

impl<R> SyncOrchestrator<R>
where
    R: RemoteStore<Profile> + RemoteStore<Match> + RemoteStore<Venue>,
{
    pub fn new(
        profiles: EntityCache<Profile>,
        matches: EntityCache<Match>,
        venues: EntityCache<Venue>,
        remote: R,
        throttle_ms: i64,
    ) -> Self {
        Self {
            profiles,
            matches,
            venues,
            remote,
            limiter: Mutex::new(RateLimiter::new(throttle_ms)),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Run one sync pass scoped to the session's user, with the system
    /// clock.
    pub async fn sync_all(&self, session: &AuthSession) -> SyncOutcome {
        self.sync_all_at(session, unix_timestamp_ms()).await
    }

    /// Run one sync pass at an explicit clock reading.
    pub async fn sync_all_at(&self, session: &AuthSession, now_ms: i64) -> SyncOutcome {
        // Single-flight first: a concurrent trigger is dropped without
        // consuming the throttle window.
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Sync already in flight, trigger dropped");
            return SyncOutcome::InFlight;
        };

        if !lock(&self.limiter).try_acquire(now_ms) {
            debug!("Sync trigger inside throttle window, ignored");
            return SyncOutcome::Throttled;
        }

        let scope = SyncScope::new(session.user_id.clone());
        let mut failures = 0;

        // Each entity type is an independent unit of failure; a failed
        // pull never corrupts the local cache, so the pass continues.
        if let Err(e) = sync_entity(&self.profiles, &self.remote, &scope).await {
            warn!(kind = Profile::KIND, error = %e, "Entity sync failed");
            failures += 1;
        }
        if let Err(e) = sync_entity(&self.matches, &self.remote, &scope).await {
            warn!(kind = Match::KIND, error = %e, "Entity sync failed");
            failures += 1;
        }
        if let Err(e) = sync_entity(&self.venues, &self.remote, &scope).await {
            warn!(kind = Venue::KIND, error = %e, "Entity sync failed");
            failures += 1;
        }

        info!(user_id = %session.user_id, failures, "Sync pass finished");
        SyncOutcome::Completed { failures }
    }
}

/// One entity type's sync unit: push pending local rows, then pull the
/// remote set. Pushing first keeps this device's unsynced edits from
/// being clobbered by the remote-wins pull in the same pass.
async fn sync_entity<E: Entity, R: RemoteStore<E>>(
    cache: &EntityCache<E>,
    remote: &R,
    scope: &SyncScope,
) -> Result<(), SyncError> {
    cache.push_pending(remote, scope).await?;
    cache.sync_from_remote(remote, scope).await?;
    Ok(())
}

/// Fan-out for the external foreground trigger.
///
/// The sync throttle (20 s) and the activity-ping throttle (24 h) are
/// independent domains: the activity hook can fire on a trigger that
/// the orchestrator drops, and vice versa.
pub struct SyncTrigger<R> {
    orchestrator: SyncOrchestrator<R>,
    activity: Mutex<RateLimiter>,
    on_activity: Box<dyn Fn() + Send + Sync>,
}

impl<R> SyncTrigger<R>
where
    R: RemoteStore<Profile> + RemoteStore<Match> + RemoteStore<Venue>,
{
    pub fn new(orchestrator: SyncOrchestrator<R>, activity_interval_ms: i64) -> Self {
        Self {
            orchestrator,
            activity: Mutex::new(RateLimiter::new(activity_interval_ms)),
            on_activity: Box::new(|| info!("Daily activity ping")),
        }
    }

    /// Replace the activity hook (telemetry emission is external).
    pub fn with_activity_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_activity = Box::new(hook);
        self
    }

    pub const fn orchestrator(&self) -> &SyncOrchestrator<R> {
        &self.orchestrator
    }

    /// Handle a foreground/activity trigger with the system clock.
    pub async fn fire(&self, session: Option<&AuthSession>) -> Option<SyncOutcome> {
        self.fire_at(session, unix_timestamp_ms()).await
    }

    /// Handle a trigger at an explicit clock reading.
    ///
    /// Returns the sync outcome, or `None` when there is no session to
    /// scope a remote pass to (offline-guest mode).
    pub async fn fire_at(&self, session: Option<&AuthSession>, now_ms: i64) -> Option<SyncOutcome> {
        if lock(&self.activity).try_acquire(now_ms) {
            (self.on_activity)();
        }

        match session {
            Some(session) => Some(self.orchestrator.sync_all_at(session, now_ms).await),
            None => None,
        }
    }
}

fn lock(limiter: &Mutex<RateLimiter>) -> std::sync::MutexGuard<'_, RateLimiter> {
    limiter
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
