//! Remote store contract.
//!
//! The backend is an opaque, authorization-scoped store reachable by
//! entity-scoped calls. The sync layer only assumes last-writer-wins
//! at the remote; row-level security is the backend's concern.

use thiserror::Error;

use crate::model::{Entity, Profile};

pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use http::HttpRemoteStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryRemote;

/// Authorization scope for remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncScope {
    /// Authenticated backend account id.
    pub user_id: String,
}

impl SyncScope {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Remote store failures.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("unauthorized")]
    Unauthorized,
}

/// Entity-scoped remote store operations.
///
/// Instantiated per entity type, mirroring the local cache split.
#[allow(async_fn_in_trait)]
pub trait RemoteStore<E: Entity>: Send + Sync {
    /// Fetch the full remote set the store is willing to disclose to
    /// this scope.
    async fn fetch_all(&self, scope: &SyncScope) -> Result<Vec<E>, RemoteError>;

    /// Create or overwrite one record.
    async fn upsert(&self, entity: &E) -> Result<E, RemoteError>;

    /// Delete one record remotely. Local cache deletion is separate.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

/// Profile discovery by backend account id.
///
/// A non-placeholder profile's id equals its account id, so this is
/// how a signed-in device finds "its" remote profile.
#[allow(async_fn_in_trait)]
pub trait ProfileDirectory: Send + Sync {
    async fn fetch_by_owner(&self, owner_id: &str) -> Result<Option<Profile>, RemoteError>;
}
