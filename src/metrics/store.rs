//! Per-store read/write counters and size/length totals (C2).

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::SystemTime;

use serde::Serialize;

/// Atomic per-store metrics. Windows accumulate (the hour window is "this
/// hour so far"); values are raw counts, not rates.
#[derive(Default)]
pub struct StoreAggregator {
    reads_sec: AtomicU32,
    reads_min: AtomicU32,
    reads_hr: AtomicU32,
    writes_sec: AtomicU32,
    writes_min: AtomicU32,
    writes_hr: AtomicU32,
    length: AtomicU64,
    size: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    #[serde(rename = "readsSec")]
    pub reads_sec: u32,
    #[serde(rename = "readsMin")]
    pub reads_min: u32,
    #[serde(rename = "readsHr")]
    pub reads_hr: u32,
    #[serde(rename = "writesSec")]
    pub writes_sec: u32,
    #[serde(rename = "writesMin")]
    pub writes_min: u32,
    #[serde(rename = "writesHr")]
    pub writes_hr: u32,
    pub length: u64,
    pub size: u64,
}

impl StoreAggregator {
    pub fn new(length: u64, size: u64) -> Self {
        Self {
            length: AtomicU64::new(length),
            size: AtomicU64::new(size),
            ..Default::default()
        }
    }

    pub fn inc_reads(&self) {
        self.reads_sec.fetch_add(1, Ordering::Relaxed);
    }

    /// `len_delta`/`size_delta` are modular-unsigned: a negative delta (e.g.
    /// a delete) is passed as its two's-complement wraparound, matching the
    /// wire encoding the backing transaction computed it in.
    pub fn inc_writes(&self, len_delta: u64, size_delta: u64) {
        self.writes_sec.fetch_add(1, Ordering::Relaxed);
        if len_delta != 0 {
            self.length.fetch_add(len_delta, Ordering::Relaxed);
        }
        if size_delta != 0 {
            self.size.fetch_add(size_delta, Ordering::Relaxed);
        }
    }

    pub fn on_tick_second(&self, _t: SystemTime) {
        let reads = self.reads_sec.swap(0, Ordering::Relaxed);
        if reads != 0 {
            self.reads_min.fetch_add(reads, Ordering::Relaxed);
        }
        let writes = self.writes_sec.swap(0, Ordering::Relaxed);
        if writes != 0 {
            self.writes_min.fetch_add(writes, Ordering::Relaxed);
        }
    }

    pub fn on_tick_minute(&self, _t: SystemTime) {
        let reads = self.reads_min.swap(0, Ordering::Relaxed);
        self.reads_hr.fetch_add(reads, Ordering::Relaxed);
        let writes = self.writes_min.swap(0, Ordering::Relaxed);
        self.writes_hr.fetch_add(writes, Ordering::Relaxed);
    }

    pub fn on_tick_hour(&self, _t: SystemTime) {
        self.reads_hr.store(0, Ordering::Relaxed);
        self.writes_hr.store(0, Ordering::Relaxed);
    }

    pub fn collect(&self) -> StoreSnapshot {
        StoreSnapshot {
            reads_sec: self.reads_sec.load(Ordering::Relaxed),
            reads_min: self.reads_min.load(Ordering::Relaxed),
            reads_hr: self.reads_hr.load(Ordering::Relaxed),
            writes_sec: self.writes_sec.load(Ordering::Relaxed),
            writes_min: self.writes_min.load(Ordering::Relaxed),
            writes_hr: self.writes_hr.load(Ordering::Relaxed),
            length: self.length.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_writes_accumulate_into_snapshot() {
        let agg = StoreAggregator::new(0, 0);
        agg.inc_reads();
        agg.inc_reads();
        agg.inc_writes(1, 4);
        let snap = agg.collect();
        assert_eq!(snap.reads_sec, 2);
        assert_eq!(snap.writes_sec, 1);
        assert_eq!(snap.length, 1);
        assert_eq!(snap.size, 4);
    }

    #[test]
    fn tick_second_rolls_into_minute_and_zeros_second() {
        let agg = StoreAggregator::new(0, 0);
        agg.inc_reads();
        agg.inc_writes(1, 2);
        agg.on_tick_second(SystemTime::now());
        let snap = agg.collect();
        assert_eq!(snap.reads_sec, 0);
        assert_eq!(snap.reads_min, 1);
        assert_eq!(snap.writes_sec, 0);
        assert_eq!(snap.writes_min, 1);
    }

    #[test]
    fn tick_hour_zeros_hour_window_only() {
        let agg = StoreAggregator::new(0, 0);
        agg.inc_writes(1, 1);
        agg.on_tick_second(SystemTime::now());
        agg.on_tick_minute(SystemTime::now());
        agg.on_tick_hour(SystemTime::now());
        let snap = agg.collect();
        assert_eq!(snap.writes_hr, 0);
        // totals are untouched by tick decay
        assert_eq!(snap.length, 1);
        assert_eq!(snap.size, 1);
    }

    #[test]
    fn negative_delta_wraps_and_subtracts() {
        let agg = StoreAggregator::new(5, 20);
        // delete: len_delta = -1, size_delta = -7, encoded as modular wraparound
        let len_delta = 1u64.wrapping_neg();
        let size_delta = 7u64.wrapping_neg();
        agg.inc_writes(len_delta, size_delta);
        let snap = agg.collect();
        assert_eq!(snap.length, 4);
        assert_eq!(snap.size, 13);
    }
}
