//! Error types for the sync engine.
//!
//! Claim-token parse errors live in [`crate::claim`] next to the
//! protocol they describe.

use thiserror::Error;

use dink_core::db::StorageError;

use crate::remote::RemoteError;

/// A cache synchronization failure: either the local store or the
/// remote store side of a pull/push.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Match mutation failures.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("match not found: {0}")]
    NotFound(String),

    #[error("match is fully verified and locked")]
    Locked,

    #[error("profile {0} is not a participant in this match")]
    NotAParticipant(String),

    #[error("unknown participant profile: {0}")]
    UnknownParticipant(String),
}

/// Identity flow failures (bootstrap, claim application, account link).
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("claim token asserts a placeholder; only a real profile can claim")]
    PlaceholderClaim,

    #[error("profile {0} is not a placeholder")]
    NotAPlaceholder(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),
}
