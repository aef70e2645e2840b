pub mod device_service;
pub mod repository;

pub use device_service::DeviceService;
pub use repository::DeviceRepository;
