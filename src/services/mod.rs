pub mod items;
pub mod manager;
pub mod metrics_service;

pub use items::ItemsService;
pub use manager::ServiceManager;
pub use metrics_service::MetricsService;
