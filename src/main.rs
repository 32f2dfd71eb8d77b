//! glitchd — multi-tenant key-value daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use glitchd::admin;
use glitchd::config::{normalize_addr, Config, LogFormat};
use glitchd::interfaces::{HttpInterface, Runnable, RpcInterface};
use glitchd::metrics::GlobalAggregator;
use glitchd::services::{items, metrics_service, ItemsService, MetricsService, ServiceManager};
use glitchd::store::StoreRepository;
use glitchd::tick::TickScheduler;
use glitchd::tls::TlsMaterial;
use glitchd::AppState;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const GRACE_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    init_logging(config.log_format);

    info!(
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
        worker_threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        "starting glitchd",
    );

    let repository = Arc::new(StoreRepository::load(&config.db_path).unwrap_or_else(|e| {
        error!(error = %e, "failed to open backing storage");
        std::process::exit(1);
    }));
    let global = Arc::new(GlobalAggregator::new());
    let tick = Arc::new(TickScheduler::new());

    // Bootstrap: register tick subscribers before the manager starts anything.
    items::register_ticks(&tick, repository.clone()).await;
    metrics_service::register_ticks(&tick, global.clone()).await;

    let state = AppState::new(repository.clone(), global.clone(), config.admin_key.clone());
    let admin_router = admin::router(state).layer(axum::middleware::from_fn_with_state(
        global.clone(),
        request_count_http_middleware,
    ));

    let tls = TlsMaterial::load(&config.tls_cert, &config.tls_key).unwrap_or_else(|e| {
        error!(error = %e, "failed to load TLS material");
        std::process::exit(1);
    });
    let https_tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(&config.tls_cert, &config.tls_key)
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "failed to load HTTPS TLS config");
            std::process::exit(1);
        });
    let rpc_tls = tls.rpc_tls_config().unwrap_or_else(|e| {
        error!(error = %e, "failed to load RPC TLS config");
        std::process::exit(1);
    });

    let https = Arc::new(HttpInterface::new(&normalize_addr(&config.https_addr), https_tls, admin_router));
    let rpc = Arc::new(RpcInterface::new(&normalize_addr(&config.rpc_addr), rpc_tls, repository, global));

    let interfaces: Vec<Arc<dyn Runnable>> = vec![https, rpc];
    let services: Vec<Arc<dyn Runnable>> = vec![Arc::new(ItemsService), Arc::new(MetricsService)];
    let manager = ServiceManager::new(interfaces, services, tick);

    if let Err(e) = manager.run().await {
        error!(error = %e, "failed to start listeners");
        std::process::exit(1);
    }
    info!(https_addr = %config.https_addr, rpc_addr = %config.rpc_addr, "glitchd started");

    wait_for_signals().await;

    info!("shutting down, grace period {:?}", GRACE_PERIOD);
    manager.stop(Some(GRACE_PERIOD)).await;
    info!("shutdown complete");
    Ok(())
}

/// SIGINT/SIGTERM begin a 30s graceful shutdown; a second signal during
/// shutdown is a hard exit (§6).
async fn wait_for_signals() {
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    info!("received shutdown signal");

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        error!("second signal received during shutdown, exiting immediately");
        std::process::exit(1);
    });
}

fn init_logging(format: LogFormat) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "glitchd=info,warn".into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().json()).init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().compact()).init();
        }
    }
}

/// Wraps every HTTP request with `begin_request`/`end_request`, applied as
/// an axum layer the way the original's `httpRequestWrapper` middleware is
/// installed ahead of the route handlers (prepended, sees every call).
async fn request_count_http_middleware(
    axum::extract::State(global): axum::extract::State<Arc<GlobalAggregator>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    global.begin_request();
    let resp = next.run(req).await;
    global.end_request();
    resp
}
