//! Bootstrap/start/stop orchestration; owns the tick scheduler; registers
//! interfaces and services (C9).
//!
//! Bootstrap-time registration (routes, interceptors, tick subscribers)
//! happens before a `ServiceManager` is constructed — see `main.rs` and
//! `services::items`/`services::metrics_service`. This keeps registration
//! strictly one-way, per the "cyclic registration" design note: interfaces
//! and the tick scheduler never hold a back-reference to the manager.
//!
//! Services are kept as a named member list alongside interfaces (mirroring
//! the original's `Manager{interfaces []Interface; services []Service}`),
//! even though every service's `start`/`stop` is currently a no-op — both
//! are started/stopped the same way interfaces are, so a future service
//! with real runtime state only needs to implement `Runnable`, not change
//! the manager.

use std::sync::Arc;
use std::time::Duration;

use crate::interfaces::Runnable;
use crate::tick::TickScheduler;

pub struct ServiceManager {
    interfaces: Vec<Arc<dyn Runnable>>,
    services: Vec<Arc<dyn Runnable>>,
    tick: Arc<TickScheduler>,
}

impl ServiceManager {
    pub fn new(interfaces: Vec<Arc<dyn Runnable>>, services: Vec<Arc<dyn Runnable>>, tick: Arc<TickScheduler>) -> Self {
        Self { interfaces, services, tick }
    }

    /// Starts every interface and every service, then installs the 1 Hz ticker.
    pub async fn run(&self) -> anyhow::Result<()> {
        for iface in &self.interfaces {
            iface.start().await?;
        }
        for service in &self.services {
            service.start().await?;
        }
        self.tick.start().await;
        Ok(())
    }

    /// Stops the ticker, then fans `stop(deadline)` out to every interface
    /// and service concurrently and waits for all of them to return.
    pub async fn stop(&self, grace_period: Option<Duration>) {
        self.tick.stop().await;

        let mut handles = Vec::with_capacity(self.interfaces.len() + self.services.len());
        for iface in self.interfaces.iter().chain(self.services.iter()).cloned() {
            handles.push(tokio::spawn(async move {
                iface.stop(grace_period).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}
