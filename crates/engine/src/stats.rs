//! Process-wide pipeline counters.
//!
//! Provides counters for:
//! - events_processed / events_matched / events_filtered / errors
//! - per-destination delivery ok/fail tallies

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

static STATS: once_cell::sync::Lazy<EngineStats> = once_cell::sync::Lazy::new(EngineStats::new);

/// Get the global stats instance.
pub fn stats() -> &'static EngineStats {
    &STATS
}

struct DestCounter {
    ok: AtomicU64,
    fail: AtomicU64,
}

pub struct EngineStats {
    events_processed: AtomicU64,
    events_matched: AtomicU64,
    events_filtered: AtomicU64,
    errors: AtomicU64,
    destinations: RwLock<HashMap<&'static str, DestCounter>>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub events_processed: u64,
    pub events_matched: u64,
    pub events_filtered: u64,
    pub errors: u64,
    /// (destination tag, ok, fail)
    pub destinations: Vec<(String, u64, u64)>,
}

impl EngineStats {
    fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            events_matched: AtomicU64::new(0),
            events_filtered: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            destinations: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_event_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_matched(&self) {
        self.events_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_filtered(&self) {
        self.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_destination(&self, tag: &'static str, success: bool) {
        {
            let map = self.destinations.read().unwrap();
            if let Some(counter) = map.get(tag) {
                let field = if success { &counter.ok } else { &counter.fail };
                field.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        // Tag not seen yet, acquire write lock.
        let mut map = self.destinations.write().unwrap();
        let counter = map.entry(tag).or_insert_with(|| DestCounter {
            ok: AtomicU64::new(0),
            fail: AtomicU64::new(0),
        });
        let field = if success { &counter.ok } else { &counter.fail };
        field.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mut destinations: Vec<(String, u64, u64)> = self
            .destinations
            .read()
            .unwrap()
            .iter()
            .map(|(tag, counter)| {
                (
                    tag.to_string(),
                    counter.ok.load(Ordering::Relaxed),
                    counter.fail.load(Ordering::Relaxed),
                )
            })
            .collect();
        destinations.sort();

        StatsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_matched: self.events_matched.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            destinations,
        }
    }

    /// One-line summary for the periodic log.
    pub fn summary(&self) -> String {
        let snap = self.snapshot();
        let mut line = format!(
            "events_processed={} matched={} filtered={} errors={}",
            snap.events_processed, snap.events_matched, snap.events_filtered, snap.errors
        );
        for (tag, ok, fail) in &snap.destinations {
            line.push_str(&format!(" {tag}_ok={ok} {tag}_fail={fail}"));
        }
        line
    }
}
