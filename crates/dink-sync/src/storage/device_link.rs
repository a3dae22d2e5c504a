//! The device identity link: the single binding from this device to
//! the profile id it currently acts as.

use dink_core::db::unix_timestamp_ms;

use crate::model::DeviceLink;

use super::db::{Database, StorageError};

/// Fixed key: one device process owns one database, so the link table
/// never holds more than this single row.
const DEVICE_KEY: &str = "this-device";

/// Reads and writes the device -> profile binding.
#[derive(Clone)]
pub struct DeviceLinkStore {
    db: Database,
}

impl DeviceLinkStore {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// The current link, or `None` when no profile has ever been chosen.
    pub async fn load_link(&self) -> Result<Option<DeviceLink>, StorageError> {
        let link = sqlx::query_as::<_, DeviceLink>(
            "SELECT device_key, profile_id, updated_at FROM device_link WHERE device_key = ?",
        )
        .bind(DEVICE_KEY)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(link)
    }

    /// Idempotently point the device at `profile_id`.
    ///
    /// A repeat call with the same id returns the stored row unchanged
    /// (including its timestamp); a different id overwrites the single
    /// row, never appends.
    pub async fn ensure_link_for_device(
        &self,
        profile_id: &str,
    ) -> Result<DeviceLink, StorageError> {
        if let Some(existing) = self.load_link().await? {
            if existing.profile_id == profile_id {
                return Ok(existing);
            }
        }

        let link = DeviceLink {
            device_key: DEVICE_KEY.to_string(),
            profile_id: profile_id.to_string(),
            updated_at: unix_timestamp_ms(),
        };

        sqlx::query(
            "INSERT OR REPLACE INTO device_link (device_key, profile_id, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&link.device_key)
        .bind(&link.profile_id)
        .bind(link.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(link)
    }

    /// Explicit profile switch. Same semantics as
    /// [`ensure_link_for_device`](Self::ensure_link_for_device).
    pub async fn set_profile_for_device(
        &self,
        profile_id: &str,
    ) -> Result<DeviceLink, StorageError> {
        self.ensure_link_for_device(profile_id).await
    }
}
