pub mod interceptor;
pub mod service;

pub mod proto {
    tonic::include_proto!("glitchd.tenant");
}

pub use interceptor::StoreExtractor;
pub use service::TenantService;
