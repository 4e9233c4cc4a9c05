//! Bounded in-memory event journal.
//!
//! Each adapter slot owns one. Trampolines push a record per call when
//! tracing is on; install outcomes and calls into an uninstalled slot are
//! always recorded. When full, the oldest record is dropped.

use parking_lot::{Mutex, const_mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use sizedalloc_core::log::render_jsonl;
use sizedalloc_core::{AdapterLogLevel, AdapterLogRecord, Outcome};

/// Records kept per slot before the oldest are evicted.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

/// One event before it is stamped with a sequence id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalEvent {
    pub level: AdapterLogLevel,
    pub symbol: &'static str,
    pub tracking: &'static str,
    pub ptr: Option<usize>,
    pub size: Option<usize>,
    pub outcome: Outcome,
}

impl JournalEvent {
    /// Level follows the outcome: `trace` on success, `warn` on refusals,
    /// `error` on failures.
    #[must_use]
    pub const fn new(symbol: &'static str, tracking: &'static str, outcome: Outcome) -> Self {
        let level = match outcome {
            Outcome::Ok => AdapterLogLevel::Trace,
            Outcome::Exhausted | Outcome::NotInstalled | Outcome::Rejected => {
                AdapterLogLevel::Warn
            }
            Outcome::Failed => AdapterLogLevel::Error,
        };
        Self {
            level,
            symbol,
            tracking,
            ptr: None,
            size: None,
            outcome,
        }
    }

    #[must_use]
    pub const fn with_level(mut self, level: AdapterLogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub const fn with_ptr(mut self, ptr: usize) -> Self {
        self.ptr = Some(ptr);
        self
    }

    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

pub struct EventJournal {
    capacity: usize,
    next_seq: AtomicU64,
    dropped: AtomicU64,
    entries: Mutex<VecDeque<AdapterLogRecord>>,
}

impl EventJournal {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }

    /// A zero capacity journal counts events but keeps none.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            next_seq: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
            entries: const_mutex(VecDeque::new()),
        }
    }

    /// Stamp and store an event, returning its sequence id.
    pub fn record(&self, event: JournalEvent) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let record = AdapterLogRecord {
            seq,
            level: event.level,
            symbol: event.symbol,
            tracking: event.tracking,
            ptr: event.ptr,
            size: event.size,
            outcome: event.outcome,
        };
        let mut entries = self.entries.lock();
        if self.capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return seq;
        }
        while entries.len() >= self.capacity {
            entries.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(record);
        seq
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Records evicted (or never kept) so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<AdapterLogRecord> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn drain(&self) -> Vec<AdapterLogRecord> {
        self.entries.lock().drain(..).collect()
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        render_jsonl(&self.snapshot())
    }
}

impl Default for EventJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventJournal")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malloc_ok(size: usize) -> JournalEvent {
        JournalEvent::new("xMalloc", "header", Outcome::Ok)
            .with_ptr(0x1000)
            .with_size(size)
    }

    #[test]
    fn sequence_ids_are_monotonic() {
        let journal = EventJournal::new();
        let a = journal.record(malloc_ok(1));
        let b = journal.record(malloc_ok(2));
        assert!(b > a);
        let records = journal.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].size, Some(1));
        assert_eq!(records[1].seq, b);
    }

    #[test]
    fn oldest_records_are_evicted() {
        let journal = EventJournal::with_capacity(3);
        for size in 0..5 {
            journal.record(malloc_ok(size));
        }
        assert_eq!(journal.len(), 3);
        assert_eq!(journal.dropped(), 2);
        let sizes: Vec<_> = journal.snapshot().iter().map(|r| r.size).collect();
        assert_eq!(sizes, vec![Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let journal = EventJournal::with_capacity(0);
        journal.record(malloc_ok(8));
        assert!(journal.is_empty());
        assert_eq!(journal.dropped(), 1);
    }

    #[test]
    fn levels_follow_outcome() {
        assert_eq!(malloc_ok(1).level, AdapterLogLevel::Trace);
        let refused = JournalEvent::new("xMalloc", "header", Outcome::Exhausted);
        assert_eq!(refused.level, AdapterLogLevel::Warn);
        let failed = JournalEvent::new("install", "header", Outcome::Failed);
        assert_eq!(failed.level, AdapterLogLevel::Error);
    }

    #[test]
    fn drain_empties_and_jsonl_renders() {
        let journal = EventJournal::new();
        journal.record(malloc_ok(100));
        let text = journal.to_jsonl().unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["symbol"], "xMalloc");
        assert_eq!(value["size"], 100);
        assert_eq!(journal.drain().len(), 1);
        assert!(journal.is_empty());
    }
}
