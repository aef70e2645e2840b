use async_trait::async_trait;

use crate::error::DeviceResult;
use crate::models::{Device, DeviceState};

/// Persistence operations the lifecycle service depends on.
/// The SQLite `Store` implements this; tests use the generated mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> DeviceResult<Option<Device>>;

    async fn find_all(&self) -> DeviceResult<Vec<Device>>;

    /// Case-insensitive exact match on brand
    async fn find_by_brand(&self, brand: &str) -> DeviceResult<Vec<Device>>;

    async fn find_by_state(&self, state: DeviceState) -> DeviceResult<Vec<Device>>;

    /// Both predicates must hold
    async fn find_by_brand_and_state(
        &self,
        brand: &str,
        state: DeviceState,
    ) -> DeviceResult<Vec<Device>>;

    /// Insert when `device.id` is `None`, otherwise compare-and-swap on `version`.
    /// Returns the stored record with its new version and timestamps.
    async fn save(&self, device: Device) -> DeviceResult<Device>;

    /// Remove the record, guarded by the same version check as `save`
    async fn delete(&self, device: &Device) -> DeviceResult<()>;
}
