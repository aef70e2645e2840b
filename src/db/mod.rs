mod devices;
pub(crate) mod row_helpers;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
#[cfg(test)]
use std::time::Duration;

use crate::error::{DeviceError, DeviceResult};
use crate::models::*;
use crate::services::DeviceRepository;

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Single-connection in-memory store, used by tests.
    /// The connection is never reaped; closing it would drop the database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::debug!("Database migrations applied");
        Ok(())
    }

    // ========== Device Operations ==========

    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        devices::DeviceRepo::list(&self.pool).await
    }

    pub async fn list_devices_by_brand(&self, brand: &str) -> Result<Vec<Device>> {
        devices::DeviceRepo::list_by_brand(&self.pool, brand).await
    }

    pub async fn list_devices_by_state(&self, state: DeviceState) -> Result<Vec<Device>> {
        devices::DeviceRepo::list_by_state(&self.pool, state).await
    }

    pub async fn list_devices_by_brand_and_state(
        &self,
        brand: &str,
        state: DeviceState,
    ) -> Result<Vec<Device>> {
        devices::DeviceRepo::list_by_brand_and_state(&self.pool, brand, state).await
    }

    pub async fn get_device(&self, id: i64) -> Result<Option<Device>> {
        devices::DeviceRepo::get(&self.pool, id).await
    }

    pub async fn create_device(&self, device: &Device) -> DeviceResult<Device> {
        devices::DeviceRepo::create(&self.pool, device).await
    }

    pub async fn update_device(&self, id: i64, device: &Device) -> DeviceResult<Device> {
        devices::DeviceRepo::update(&self.pool, id, device).await
    }

    pub async fn delete_device(&self, id: i64, version: i64) -> DeviceResult<()> {
        devices::DeviceRepo::delete(&self.pool, id, version).await
    }
}

#[async_trait]
impl DeviceRepository for Store {
    async fn find_by_id(&self, id: i64) -> DeviceResult<Option<Device>> {
        Ok(self.get_device(id).await?)
    }

    async fn find_all(&self) -> DeviceResult<Vec<Device>> {
        Ok(self.list_devices().await?)
    }

    async fn find_by_brand(&self, brand: &str) -> DeviceResult<Vec<Device>> {
        Ok(self.list_devices_by_brand(brand).await?)
    }

    async fn find_by_state(&self, state: DeviceState) -> DeviceResult<Vec<Device>> {
        Ok(self.list_devices_by_state(state).await?)
    }

    async fn find_by_brand_and_state(
        &self,
        brand: &str,
        state: DeviceState,
    ) -> DeviceResult<Vec<Device>> {
        Ok(self.list_devices_by_brand_and_state(brand, state).await?)
    }

    async fn save(&self, device: Device) -> DeviceResult<Device> {
        match device.id {
            None => self.create_device(&device).await,
            Some(id) => self.update_device(id, &device).await,
        }
    }

    async fn delete(&self, device: &Device) -> DeviceResult<()> {
        let id = device
            .id
            .ok_or_else(|| DeviceError::Repository(anyhow::anyhow!("cannot delete an unsaved device")))?;
        self.delete_device(id, device.version).await
    }
}
