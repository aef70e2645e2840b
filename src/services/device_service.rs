use std::sync::Arc;

use crate::error::{DeviceError, DeviceResult};
use crate::models::{Device, DeviceFilter, UpdateDeviceRequest};

use super::repository::DeviceRepository;

/// Device lifecycle rules: the in-use guard, filter selection, and
/// optimistic writes. Conflicts are returned to the caller, never retried.
pub struct DeviceService {
    repository: Arc<dyn DeviceRepository>,
}

impl DeviceService {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self { repository }
    }

    /// Create a device. The initial state is always `Available`.
    pub async fn create(&self, name: &str, brand: &str) -> DeviceResult<Device> {
        self.repository.save(Device::new(name, brand)).await
    }

    pub async fn get_by_id(&self, id: i64) -> DeviceResult<Device> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(DeviceError::NotFound(id))
    }

    /// List devices, pushing whichever filters are present down to the repository
    pub async fn list(&self, filter: &DeviceFilter) -> DeviceResult<Vec<Device>> {
        match (filter.brand.as_deref(), filter.state) {
            (Some(brand), Some(state)) => {
                self.repository.find_by_brand_and_state(brand, state).await
            }
            (Some(brand), None) => self.repository.find_by_brand(brand).await,
            (None, Some(state)) => self.repository.find_by_state(state).await,
            (None, None) => self.repository.find_all().await,
        }
    }

    /// Apply the fields present in `req`. Full and partial updates both land here.
    pub async fn update(&self, id: i64, req: UpdateDeviceRequest) -> DeviceResult<Device> {
        let mut device = self.get_by_id(id).await?;
        if device.is_in_use() {
            return Err(DeviceError::InvalidTransition(
                "cannot modify a device while in use".to_string(),
            ));
        }

        device.apply(req);
        self.repository.save(device).await
    }

    pub async fn delete(&self, id: i64) -> DeviceResult<()> {
        let device = self.get_by_id(id).await?;
        if device.is_in_use() {
            return Err(DeviceError::InvalidTransition(
                "cannot delete a device while in use".to_string(),
            ));
        }

        self.repository.delete(&device).await
    }
}
