//! HTTPS admin listener: binds one TCP address, terminates TLS, serves the
//! admin router. `stop(None)` force-closes; `stop(Some(deadline))` drains
//! gracefully bounded by the deadline (C8).

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::normalize_addr;
use crate::interfaces::Runnable;

pub struct HttpInterface {
    addr: String,
    tls: RustlsConfig,
    router: Mutex<Option<Router>>,
    handle: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpInterface {
    pub fn new(addr: &str, tls: RustlsConfig, router: Router) -> Self {
        Self {
            addr: normalize_addr(addr),
            tls,
            router: Mutex::new(Some(router)),
            handle: Handle::new(),
            task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Runnable for HttpInterface {
    async fn start(&self) -> anyhow::Result<()> {
        let router = self.router.lock().await.take().expect("HttpInterface::start called more than once");
        let addr: SocketAddr = self.addr.parse()?;
        let tls = self.tls.clone();
        let handle = self.handle.clone();

        let task = tokio::spawn(async move {
            if let Err(e) = axum_server::bind_rustls(addr, tls).handle(handle).serve(router.into_make_service()).await {
                tracing::error!(error = %e, "https listener exited");
            }
        });
        *self.task.lock().await = Some(task);

        tracing::info!(addr = %self.addr, "https listener started");
        Ok(())
    }

    async fn stop(&self, deadline: Option<Duration>) {
        match deadline {
            Some(d) => self.handle.graceful_shutdown(Some(d)),
            None => self.handle.shutdown(),
        }
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
    }

    fn kind(&self) -> &'static str {
        "https"
    }
}
