//! Runtime counters and tracing span names.
//!
//! Counters are lock-free `AtomicU64`s incremented on the hot path and read
//! when exporting. A [`MnemoCounters`] is owned by the manager and shared with
//! the stores through an `Arc`; there is no process-global instance.

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Atomic counters for engine events.
#[derive(Debug)]
pub struct MnemoCounters {
    /// Texts passed to the embedding provider.
    pub texts_embedded: AtomicU64,
    /// Category indexes built or rebuilt.
    pub indexes_built: AtomicU64,
    /// Nearest-neighbour searches executed.
    pub searches: AtomicU64,
    /// Episodic memories admitted.
    pub episodic_added: AtomicU64,
    /// Episodic memories evicted by pruning.
    pub episodic_evicted: AtomicU64,
    /// Decay passes completed.
    pub decay_passes: AtomicU64,
    /// Snapshots restored successfully.
    pub snapshots_restored: AtomicU64,
    /// Restores that fell back to a fresh memory.
    pub snapshots_reset: AtomicU64,
}

impl MnemoCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            texts_embedded: AtomicU64::new(0),
            indexes_built: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            episodic_added: AtomicU64::new(0),
            episodic_evicted: AtomicU64::new(0),
            decay_passes: AtomicU64::new(0),
            snapshots_restored: AtomicU64::new(0),
            snapshots_reset: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment a counter by one.
    pub fn incr(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            texts_embedded: self.texts_embedded.load(Ordering::Relaxed),
            indexes_built: self.indexes_built.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            episodic_added: self.episodic_added.load(Ordering::Relaxed),
            episodic_evicted: self.episodic_evicted.load(Ordering::Relaxed),
            decay_passes: self.decay_passes.load(Ordering::Relaxed),
            snapshots_restored: self.snapshots_restored.load(Ordering::Relaxed),
            snapshots_reset: self.snapshots_reset.load(Ordering::Relaxed),
        }
    }
}

impl Default for MnemoCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Texts embedded.
    pub texts_embedded: u64,
    /// Indexes built.
    pub indexes_built: u64,
    /// Searches executed.
    pub searches: u64,
    /// Episodic memories admitted.
    pub episodic_added: u64,
    /// Episodic memories evicted.
    pub episodic_evicted: u64,
    /// Decay passes.
    pub decay_passes: u64,
    /// Successful restores.
    pub snapshots_restored: u64,
    /// Restores reset to empty.
    pub snapshots_reset: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 8] = [
            ("texts_embedded", "Texts embedded by the provider", self.texts_embedded),
            ("indexes_built", "Category indexes built or rebuilt", self.indexes_built),
            ("searches", "Nearest-neighbour searches", self.searches),
            ("episodic_added", "Episodic memories admitted", self.episodic_added),
            ("episodic_evicted", "Episodic memories evicted", self.episodic_evicted),
            ("decay_passes", "Decay passes completed", self.decay_passes),
            ("snapshots_restored", "Snapshots restored", self.snapshots_restored),
            ("snapshots_reset", "Restores that fell back to empty memory", self.snapshots_reset),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP mnemo_{name}_total {help}\n\
                 # TYPE mnemo_{name}_total counter\n\
                 mnemo_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tracing span names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// Building a category index from scratch.
    pub const INDEX_BUILD: &str = "mnemo::index::build";
    /// Appending to an existing category index.
    pub const INDEX_UPDATE: &str = "mnemo::index::update";
    /// Nearest-neighbour search.
    pub const INDEX_SEARCH: &str = "mnemo::index::search";
    /// Episodic admission.
    pub const EPISODIC_ADD: &str = "mnemo::episodic::add";
    /// Episodic retrieval.
    pub const EPISODIC_RETRIEVE: &str = "mnemo::episodic::retrieve";
    /// Episodic decay pass.
    pub const DECAY_PASS: &str = "mnemo::episodic::decay";
    /// Capacity-bounded eviction.
    pub const PRUNE: &str = "mnemo::episodic::prune";
    /// Combined retrieval across memory kinds.
    pub const RETRIEVE: &str = "mnemo::retrieve";
    /// Snapshot save.
    pub const PERSIST_SAVE: &str = "mnemo::persist::save";
    /// Snapshot load.
    pub const PERSIST_LOAD: &str = "mnemo::persist::load";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let counters = MnemoCounters::new();
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn counters_increment() {
        let counters = MnemoCounters::new();
        MnemoCounters::incr(&counters.episodic_added);
        MnemoCounters::add(&counters.texts_embedded, 5);
        let snap = counters.snapshot();
        assert_eq!(snap.episodic_added, 1);
        assert_eq!(snap.texts_embedded, 5);
    }

    #[test]
    fn prometheus_export_lists_every_counter() {
        let counters = MnemoCounters::new();
        MnemoCounters::incr(&counters.searches);
        let text = counters.snapshot().to_prometheus();
        assert!(text.contains("# TYPE mnemo_searches_total counter"));
        assert!(text.contains("mnemo_searches_total 1"));
        assert!(text.contains("mnemo_snapshots_reset_total 0"));
        assert_eq!(text.matches("# HELP").count(), 8);
    }
}
