use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::error::{DeviceError, DeviceResult};
use crate::models::*;

use super::row_helpers::{map_device_row, map_device_rows};

const SELECT_DEVICE: &str = r#"
    SELECT id, name, brand, state, version, created_at, updated_at
    FROM devices
"#;

/// Device database operations
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_DEVICE))
            .fetch_all(pool)
            .await?;

        map_device_rows(&rows)
    }

    pub async fn list_by_brand(pool: &Pool<Sqlite>, brand: &str) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "{} WHERE lower(brand) = lower(?) ORDER BY id",
            SELECT_DEVICE
        ))
        .bind(brand)
        .fetch_all(pool)
        .await?;

        map_device_rows(&rows)
    }

    pub async fn list_by_state(pool: &Pool<Sqlite>, state: DeviceState) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} WHERE state = ? ORDER BY id", SELECT_DEVICE))
            .bind(state.label())
            .fetch_all(pool)
            .await?;

        map_device_rows(&rows)
    }

    pub async fn list_by_brand_and_state(
        pool: &Pool<Sqlite>,
        brand: &str,
        state: DeviceState,
    ) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!(
            "{} WHERE lower(brand) = lower(?) AND state = ? ORDER BY id",
            SELECT_DEVICE
        ))
        .bind(brand)
        .bind(state.label())
        .fetch_all(pool)
        .await?;

        map_device_rows(&rows)
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_DEVICE))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.as_ref().map(map_device_row).transpose()
    }

    async fn exists(pool: &Pool<Sqlite>, id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    /// Pick the error for a versioned write that touched no rows
    async fn stale_write_error(pool: &Pool<Sqlite>, id: i64, version: i64) -> DeviceError {
        match Self::exists(pool, id).await {
            Ok(true) => DeviceError::VersionConflict { id, version },
            Ok(false) => DeviceError::NotFound(id),
            Err(e) => e.into(),
        }
    }

    pub async fn create(pool: &Pool<Sqlite>, device: &Device) -> DeviceResult<Device> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, brand, state, version, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&device.name)
        .bind(&device.brand)
        .bind(device.state.label())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        let created = Self::get(pool, id)
            .await?
            .context("Device not found after creation")?;
        Ok(created)
    }

    /// Compare-and-swap update: only commits if the stored version still matches
    pub async fn update(pool: &Pool<Sqlite>, id: i64, device: &Device) -> DeviceResult<Device> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE devices SET name = ?, brand = ?, state = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&device.name)
        .bind(&device.brand)
        .bind(device.state.label())
        .bind(now)
        .bind(id)
        .bind(device.version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::stale_write_error(pool, id, device.version).await);
        }

        let updated = Self::get(pool, id)
            .await?
            .context("Device not found after update")?;
        Ok(updated)
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64, version: i64) -> DeviceResult<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ? AND version = ?")
            .bind(id)
            .bind(version)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::stale_write_error(pool, id, version).await);
        }
        Ok(())
    }
}
