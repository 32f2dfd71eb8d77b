//! Wires the global `/metrics` route, the per-store metrics route, the
//! request-counting wrapper (prepended on both planes so it observes every
//! call), and the repository's tick subscription (C9 service, grounded in
//! the original's `MetricsService`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tower::{Layer, Service};

use crate::interfaces::Runnable;
use crate::metrics::GlobalAggregator;

/// A named member of the manager's service list (see `services::items`'s
/// `ItemsService` doc comment for why `start`/`stop` are no-ops — this
/// mirrors the original's `MetricsService`, which likewise only registers
/// middleware/routes/interceptors at bootstrap and never runs its own loop).
#[derive(Default)]
pub struct MetricsService;

#[async_trait]
impl Runnable for MetricsService {
    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self, _deadline: Option<Duration>) {}

    fn kind(&self) -> &'static str {
        "metrics"
    }
}

/// A tower layer that brackets every inbound call with
/// `begin_request`/`end_request` on the global aggregator. Applied at the
/// outermost layer of both the admin router and the RPC server so it wraps
/// every call, including ones auth later rejects (mirrors the original's
/// `grpcRequestWrapper`/`httpRequestWrapper`, always prepended).
#[derive(Clone)]
pub struct RequestCountLayer {
    global: Arc<GlobalAggregator>,
}

impl RequestCountLayer {
    pub fn new(global: Arc<GlobalAggregator>) -> Self {
        Self { global }
    }
}

impl<S> Layer<S> for RequestCountLayer {
    type Service = RequestCountService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestCountService { inner, global: self.global.clone() }
    }
}

#[derive(Clone)]
pub struct RequestCountService<S> {
    inner: S,
    global: Arc<GlobalAggregator>,
}

impl<S, Req> Service<Req> for RequestCountService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let global = self.global.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            global.begin_request();
            let result = inner.call(req).await;
            global.end_request();
            result
        })
    }
}

/// Subscribes the global aggregator to the tick scheduler's three windows.
pub async fn register_ticks(tick: &crate::tick::TickScheduler, global: Arc<GlobalAggregator>) {
    let g = global.clone();
    tick.on_second(Arc::new(move |t| g.on_tick_second(t))).await;
    let g = global.clone();
    tick.on_minute(Arc::new(move |t| g.on_tick_minute(t))).await;
    let g = global.clone();
    tick.on_hour(Arc::new(move |t| g.on_tick_hour(t))).await;
}
