//! The local store service object.

use chrono::Utc;
use tokio::sync::{broadcast, OnceCell};
use vigil_core::group::validate_group_fields;
use vigil_core::types::EntityId;
use vigil_core::{Monitor, MonitorGroup, NewMonitorGroup};

use crate::changes::{GroupChange, CHANGE_FEED_CAPACITY};
use crate::error::StoreError;
use crate::repositories::{DeviceRepo, GroupRepo};
use crate::DbPool;

/// Where the store keeps its data.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite://vigil-cache.db` or `sqlite::memory:`.
    ///
    /// `None` means no persistence backend exists in this execution
    /// context; every operation then degrades to a logged no-op.
    pub database_url: Option<String>,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: Some(database_url.into()),
        }
    }

    /// A configuration with no backend.
    pub fn unavailable() -> Self {
        Self { database_url: None }
    }
}

/// Durable client-side cache of monitors and groups.
///
/// Create one per process and share it via `Arc<LocalStore>`. The backend
/// is opened lazily by [`initialize`](Self::initialize), which every
/// operation calls implicitly, so writes issued before start-up finishes
/// wait for it instead of being dropped.
pub struct LocalStore {
    config: StoreConfig,
    /// `Some(None)` once initialisation found no backend.
    pool: OnceCell<Option<DbPool>>,
    changes: broadcast::Sender<GroupChange>,
}

impl LocalStore {
    pub fn new(config: StoreConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            config,
            pool: OnceCell::new(),
            changes,
        }
    }

    /// Open the backend and apply migrations.
    ///
    /// Idempotent. Concurrent callers await the same in-flight
    /// initialisation. A failed attempt leaves the store uninitialised so
    /// the next call retries.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    /// Whether a persistence backend is configured.
    pub fn is_available(&self) -> bool {
        self.config.database_url.is_some()
    }

    /// Subscribe to locally-originated group mutations.
    pub fn changes(&self) -> broadcast::Receiver<GroupChange> {
        self.changes.subscribe()
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    /// Create a group with a fresh id and timestamps, then publish
    /// [`GroupChange::Created`]. Returns the new id.
    pub async fn add_group(&self, new: NewMonitorGroup) -> Result<EntityId, StoreError> {
        validate_group_fields(&new.name, new.description.as_deref())?;

        let now = Utc::now();
        let group = MonitorGroup {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            device_ids: new.device_ids,
            created_at: now,
            updated_at: now,
        };

        let Some(pool) = self.pool().await? else {
            tracing::warn!(group_id = %group.id, "Local storage unavailable, group not persisted");
            return Ok(group.id);
        };

        GroupRepo::insert(pool, &group).await?;
        tracing::debug!(group_id = %group.id, name = %group.name, "Group created");

        let id = group.id.clone();
        self.publish(GroupChange::Created(group));
        Ok(id)
    }

    /// Replace a group wholesale with a refreshed `updated_at`, then publish
    /// [`GroupChange::Updated`]. The stored `created_at` is kept whatever
    /// the caller passes. Returns the stored record.
    pub async fn update_group(&self, group: MonitorGroup) -> Result<MonitorGroup, StoreError> {
        validate_group_fields(&group.name, group.description.as_deref())?;

        let mut group = group;
        let now = Utc::now();
        // Keep updated_at strictly increasing even if the caller's clock
        // value is ahead of ours.
        group.updated_at = if now > group.updated_at {
            now
        } else {
            group.updated_at + chrono::Duration::milliseconds(1)
        };

        let Some(pool) = self.pool().await? else {
            tracing::warn!(group_id = %group.id, "Local storage unavailable, group update dropped");
            return Ok(group);
        };

        if let Some(stored) = GroupRepo::find_by_id(pool, &group.id).await? {
            group.created_at = stored.created_at;
        }
        GroupRepo::upsert(pool, &group).await?;
        tracing::debug!(group_id = %group.id, "Group updated");

        self.publish(GroupChange::Updated(group.clone()));
        Ok(group)
    }

    pub async fn get_group(&self, id: &str) -> Result<Option<MonitorGroup>, StoreError> {
        match self.pool().await? {
            Some(pool) => Ok(GroupRepo::find_by_id(pool, id).await?),
            None => Ok(None),
        }
    }

    /// All groups, in insertion order.
    pub async fn get_all_groups(&self) -> Result<Vec<MonitorGroup>, StoreError> {
        match self.pool().await? {
            Some(pool) => Ok(GroupRepo::list_all(pool).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Delete a group and publish [`GroupChange::Deleted`].
    ///
    /// Deleting an unknown id is a no-op: nothing is removed or published.
    pub async fn delete_group(&self, id: &str) -> Result<(), StoreError> {
        let Some(pool) = self.pool().await? else {
            tracing::warn!(group_id = %id, "Local storage unavailable, group delete dropped");
            return Ok(());
        };

        if GroupRepo::delete(pool, id).await? {
            tracing::debug!(group_id = %id, "Group deleted");
            self.publish(GroupChange::Deleted(id.to_string()));
        } else {
            tracing::debug!(group_id = %id, "Delete of unknown group ignored");
        }
        Ok(())
    }

    /// Write through a group received from another client.
    ///
    /// Does not publish. Skips the write when the stored copy is newer or
    /// identical; returns whether the store changed.
    pub async fn apply_remote_group(&self, group: &MonitorGroup) -> Result<bool, StoreError> {
        let Some(pool) = self.pool().await? else {
            return Ok(false);
        };

        if let Some(existing) = GroupRepo::find_by_id(pool, &group.id).await? {
            if existing.is_newer_than(group) {
                tracing::debug!(group_id = %group.id, "Ignoring stale remote group update");
                return Ok(false);
            }
            if &existing == group {
                return Ok(false);
            }
        }

        GroupRepo::upsert(pool, group).await?;
        Ok(true)
    }

    /// Write through a deletion received from another client. Does not
    /// publish. Returns whether a group was removed.
    pub async fn apply_remote_group_delete(&self, id: &str) -> Result<bool, StoreError> {
        match self.pool().await? {
            Some(pool) => Ok(GroupRepo::delete(pool, id).await?),
            None => Ok(false),
        }
    }

    /// Replace the stored groups with a bootstrap snapshot (upsert; groups
    /// absent from the snapshot are kept). Does not publish.
    pub async fn put_groups(&self, groups: &[MonitorGroup]) -> Result<(), StoreError> {
        let Some(pool) = self.pool().await? else {
            tracing::warn!(count = groups.len(), "Local storage unavailable, skipping groups");
            return Ok(());
        };
        GroupRepo::bulk_upsert(pool, groups).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    /// Bulk upsert monitors in one transaction. Each record replaces any
    /// stored record with the same id; there is no field-level merge.
    pub async fn add_devices(&self, devices: &[Monitor]) -> Result<(), StoreError> {
        let Some(pool) = self.pool().await? else {
            tracing::warn!(count = devices.len(), "Local storage unavailable, skipping add_devices");
            return Ok(());
        };

        DeviceRepo::bulk_upsert(pool, devices).await?;
        tracing::debug!(count = devices.len(), "Devices stored");
        Ok(())
    }

    /// Replace a single monitor record.
    pub async fn put_device(&self, device: &Monitor) -> Result<(), StoreError> {
        let Some(pool) = self.pool().await? else {
            tracing::warn!(monitor_id = %device.system_monitor_id, "Local storage unavailable, skipping device");
            return Ok(());
        };
        DeviceRepo::upsert(pool, device).await?;
        Ok(())
    }

    /// All monitors, in insertion order.
    pub async fn get_all_devices(&self) -> Result<Vec<Monitor>, StoreError> {
        match self.pool().await? {
            Some(pool) => Ok(DeviceRepo::list_all(pool).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Monitors for the given ids, in request order.
    ///
    /// Ids with no stored record are skipped, so the result may be shorter
    /// than the input.
    pub async fn get_devices_by_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Vec<Monitor>, StoreError> {
        let Some(pool) = self.pool().await? else {
            return Ok(Vec::new());
        };

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(device) = DeviceRepo::find_by_id(pool, id.as_ref()).await? {
                devices.push(device);
            }
        }
        Ok(devices)
    }

    /// Number of cached monitors.
    pub async fn device_count(&self) -> Result<u64, StoreError> {
        match self.pool().await? {
            Some(pool) => Ok(DeviceRepo::count(pool).await?.max(0) as u64),
            None => Ok(0),
        }
    }

    /// Wipe every cached monitor. Groups are left untouched.
    pub async fn remove_devices(&self) -> Result<(), StoreError> {
        let Some(pool) = self.pool().await? else {
            return Ok(());
        };
        let removed = DeviceRepo::delete_all(pool).await?;
        tracing::info!(removed, "Cleared cached devices");
        Ok(())
    }

    // ---- private helpers ----

    /// Lazily open the backend. `None` when no backend is configured.
    async fn pool(&self) -> Result<Option<&DbPool>, StoreError> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                let Some(url) = self.config.database_url.as_deref() else {
                    tracing::warn!("Local storage not available in this environment");
                    return Ok::<_, StoreError>(None);
                };

                let pool = crate::create_pool(url).await?;
                crate::run_migrations(&pool).await?;
                tracing::info!(url = %url, "Local store initialised");
                Ok(Some(pool))
            })
            .await?;
        Ok(pool.as_ref())
    }

    fn publish(&self, change: GroupChange) {
        // Ignore the SendError; it only means nobody is relaying changes.
        let _ = self.changes.send(change);
    }
}
