pub mod http;
pub mod rpc;

use std::time::Duration;

use async_trait::async_trait;

/// Shared lifecycle contract for both listener planes (C8) and, via
/// `crate::services`, for services too (§9 design note: "two capability
/// sets... use tagged variants / dynamic dispatch as native to the
/// target"). `stop(None)` is a forceful stop; `stop(Some(deadline))` is
/// graceful, bounded by the caller-supplied duration.
#[async_trait]
pub trait Runnable: Send + Sync {
    async fn start(&self) -> anyhow::Result<()>;
    async fn stop(&self, deadline: Option<Duration>);
    fn kind(&self) -> &'static str;
}

pub use http::HttpInterface;
pub use rpc::RpcInterface;
