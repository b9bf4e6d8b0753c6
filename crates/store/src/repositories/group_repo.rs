//! Repository for the `groups` table.

use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};
use vigil_core::types::{EntityId, Timestamp};
use vigil_core::MonitorGroup;

/// Column list for `groups` queries.
const COLUMNS: &str = "id, name, description, device_ids, created_at, updated_at";

/// A row from the `groups` table.
#[derive(Debug, FromRow)]
struct GroupRow {
    id: EntityId,
    name: String,
    description: Option<String>,
    device_ids: Json<Vec<EntityId>>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<GroupRow> for MonitorGroup {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            device_ids: row.device_ids.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const UPSERT: &str = "\
    INSERT INTO groups (id, name, description, device_ids, created_at, updated_at) \
    VALUES (?, ?, ?, ?, ?, ?) \
    ON CONFLICT (id) DO UPDATE SET \
        name = excluded.name, \
        description = excluded.description, \
        device_ids = excluded.device_ids, \
        updated_at = excluded.updated_at";

/// Provides CRUD operations for monitor groups.
pub struct GroupRepo;

impl GroupRepo {
    /// Insert a new group. Fails on a duplicate id.
    pub async fn insert(pool: &SqlitePool, group: &MonitorGroup) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO groups (id, name, description, device_ids, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(group.description.as_deref())
        .bind(Json(&group.device_ids))
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a group. `created_at` of an existing row is never
    /// changed, and insertion order is preserved.
    pub async fn upsert(pool: &SqlitePool, group: &MonitorGroup) -> Result<(), sqlx::Error> {
        sqlx::query(UPSERT)
            .bind(&group.id)
            .bind(&group.name)
            .bind(group.description.as_deref())
            .bind(Json(&group.device_ids))
            .bind(group.created_at)
            .bind(group.updated_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Upsert many groups within a single transaction.
    pub async fn bulk_upsert(pool: &SqlitePool, groups: &[MonitorGroup]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for group in groups {
            sqlx::query(UPSERT)
                .bind(&group.id)
                .bind(&group.name)
                .bind(group.description.as_deref())
                .bind(Json(&group.device_ids))
                .bind(group.created_at)
                .bind(group.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    /// Find a group by its id.
    pub async fn find_by_id(
        pool: &SqlitePool,
        id: &str,
    ) -> Result<Option<MonitorGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM groups WHERE id = ?");
        let row = sqlx::query_as::<_, GroupRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(MonitorGroup::from))
    }

    /// List all groups in insertion order.
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<MonitorGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM groups ORDER BY rowid");
        let rows = sqlx::query_as::<_, GroupRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(MonitorGroup::from).collect())
    }

    /// Delete a group by id.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
