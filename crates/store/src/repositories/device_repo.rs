//! Repository for the `devices` table.
//!
//! Monitors are stored as whole JSON documents keyed by
//! `SystemMonitorId`; every write replaces the full record.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use vigil_core::Monitor;

const UPSERT: &str = "\
    INSERT INTO devices (system_monitor_id, record, stored_at) \
    VALUES (?, ?, ?) \
    ON CONFLICT (system_monitor_id) DO UPDATE SET \
        record = excluded.record, \
        stored_at = excluded.stored_at";

/// Provides CRUD operations for cached monitor records.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Insert or fully replace one monitor.
    pub async fn upsert(pool: &SqlitePool, monitor: &Monitor) -> Result<(), sqlx::Error> {
        sqlx::query(UPSERT)
            .bind(&monitor.system_monitor_id)
            .bind(Json(monitor))
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Upsert many monitors within a single transaction.
    ///
    /// Either every record in the batch is written or none is.
    pub async fn bulk_upsert(pool: &SqlitePool, monitors: &[Monitor]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let stored_at = Utc::now();

        for monitor in monitors {
            sqlx::query(UPSERT)
                .bind(&monitor.system_monitor_id)
                .bind(Json(monitor))
                .bind(stored_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }

    /// Find a monitor by its `SystemMonitorId`.
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Monitor>, sqlx::Error> {
        let record = sqlx::query_scalar::<_, Json<Monitor>>(
            "SELECT record FROM devices WHERE system_monitor_id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(record.map(|Json(m)| m))
    }

    /// List all monitors in insertion order.
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Monitor>, sqlx::Error> {
        let records =
            sqlx::query_scalar::<_, Json<Monitor>>("SELECT record FROM devices ORDER BY rowid")
                .fetch_all(pool)
                .await?;
        Ok(records.into_iter().map(|Json(m)| m).collect())
    }

    /// Count cached monitors.
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM devices")
            .fetch_one(pool)
            .await
    }

    /// Remove every cached monitor. Returns the number of rows removed.
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM devices").execute(pool).await?;
        Ok(result.rows_affected())
    }
}
