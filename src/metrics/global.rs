//! Process-wide request counters and runtime/memory snapshot (C3).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Rolling request counters. Unlike `StoreAggregator`, windows here are
/// per-period rates, not cumulative roll-ups: each `on_tick_*` simply resets
/// its window to zero (see design notes, Open Question (a)).
#[derive(Default)]
struct RequestsAggregator {
    second: AtomicU64,
    minute: AtomicU64,
    hour: AtomicU64,
    total: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestsSnapshot {
    pub second: u64,
    pub minute: u64,
    pub hour: u64,
    pub total: u64,
}

impl RequestsAggregator {
    fn begin(&self) {
        self.second.fetch_add(1, Ordering::Relaxed);
        self.minute.fetch_add(1, Ordering::Relaxed);
        self.hour.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    fn on_tick_second(&self) {
        self.second.store(0, Ordering::Relaxed);
    }

    fn on_tick_minute(&self) {
        self.minute.store(0, Ordering::Relaxed);
    }

    fn on_tick_hour(&self) {
        self.hour.store(0, Ordering::Relaxed);
    }

    fn collect(&self) -> RequestsSnapshot {
        RequestsSnapshot {
            second: self.second.load(Ordering::Relaxed),
            minute: self.minute.load(Ordering::Relaxed),
            hour: self.hour.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    #[serde(rename = "allocBytes")]
    pub alloc_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalSnapshot {
    pub pid: u32,
    pub version: &'static str,
    pub hostname: String,
    pub runtime: String,
    pub memory: MemorySnapshot,
    pub now: u64,
    #[serde(rename = "uptimeSecs")]
    pub uptime_secs: u64,
    pub requests: RequestsSnapshot,
}

pub struct GlobalAggregator {
    pid: u32,
    hostname: String,
    start: Instant,
    requests: RequestsAggregator,
}

impl GlobalAggregator {
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            hostname: hostname(),
            start: Instant::now(),
            requests: RequestsAggregator::default(),
        }
    }

    pub fn begin_request(&self) {
        self.requests.begin();
    }

    /// Reserved for a future in-flight gauge; currently a no-op.
    pub fn end_request(&self) {}

    pub fn on_tick_second(&self, _t: SystemTime) {
        self.requests.on_tick_second();
    }

    pub fn on_tick_minute(&self, _t: SystemTime) {
        self.requests.on_tick_minute();
    }

    pub fn on_tick_hour(&self, _t: SystemTime) {
        self.requests.on_tick_hour();
    }

    pub fn collect(&self) -> GlobalSnapshot {
        GlobalSnapshot {
            pid: self.pid,
            version: env!("CARGO_PKG_VERSION"),
            hostname: self.hostname.clone(),
            runtime: format!("rustc/tokio worker_threads={}", num_cpus_hint()),
            memory: MemorySnapshot { alloc_bytes: allocated_bytes_hint() },
            now: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
            uptime_secs: self.start.elapsed().as_secs(),
            requests: self.requests.collect(),
        }
    }
}

impl Default for GlobalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn num_cpus_hint() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Resident set size, read fresh from procfs on every call (the Rust
/// equivalent of the original's live `runtime.ReadMemStats` snapshot).
/// Returns 0 off Linux or if `/proc/self/status` is unreadable.
fn allocated_bytes_hint() -> u64 {
    read_resident_set_bytes().unwrap_or(0)
}

fn read_resident_set_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb: u64 = line.trim_start_matches("VmRSS:").trim().split_whitespace().next()?.parse().ok()?;
    Some(kb * 1024)
}
