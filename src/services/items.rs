//! Wires the store repository into the admin routes, the tenant RPC
//! service, and the tick scheduler's per-store decay (grounded in the
//! original's `ItemsService`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::interfaces::Runnable;
use crate::store::StoreRepository;
use crate::tick::TickScheduler;

/// A named member of the manager's service list, matching the original's
/// `[]Service` lifecycle contract (`Service.GetName`/`Start`/`Stop`). All of
/// this service's actual work happens once, at bootstrap, via
/// `register_ticks` below — `start`/`stop` are no-ops here exactly as they
/// are on the original's `ItemsService`, which only ever registers with the
/// global interfaces and ticker and never runs its own loop.
#[derive(Default)]
pub struct ItemsService;

#[async_trait]
impl Runnable for ItemsService {
    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self, _deadline: Option<Duration>) {}

    fn kind(&self) -> &'static str {
        "items"
    }
}

/// The repository is registered as a *single* subscriber per period; it
/// fans out internally to its own stores, which keeps removal trivial
/// (drop the store, the next tick simply skips it) — see design notes.
pub async fn register_ticks(tick: &TickScheduler, repository: Arc<StoreRepository>) {
    let repo = repository.clone();
    tick.on_second(Arc::new(move |t| {
        for store in repo.all_stores() {
            store.metrics().on_tick_second(t);
        }
    }))
    .await;

    let repo = repository.clone();
    tick.on_minute(Arc::new(move |t| {
        for store in repo.all_stores() {
            store.metrics().on_tick_minute(t);
        }
    }))
    .await;

    let repo = repository;
    tick.on_hour(Arc::new(move |t| {
        for store in repo.all_stores() {
            store.metrics().on_tick_hour(t);
        }
    }))
    .await;
}
