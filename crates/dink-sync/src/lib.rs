//! Dink Sync Engine
//!
//! Local-first synchronization layer for recorded pickleball matches:
//! - Per-entity local caches (profiles, matches, venues) over `SQLite`,
//!   merged against a remote store under intermittent connectivity
//! - The device -> profile identity link and guest-claim flows
//! - Expiring claim tokens for out-of-band identity transfer
//! - Match verification state machine
//! - Throttled, single-flight sync orchestration

pub mod claim;
pub mod context;
pub mod error;
pub mod identity;
pub mod matches;
pub mod model;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod verify;

pub use context::SyncContext;
pub use error::{IdentityError, MatchError, SyncError};
pub use model::{AuthSession, DeviceLink, Entity, Match, Profile, Venue};
pub use storage::{Database, DeviceLinkStore, EntityCache};
pub use sync::{RateLimiter, SyncOrchestrator, SyncOutcome, SyncTrigger};
pub use verify::{MatchStatus, match_status};
