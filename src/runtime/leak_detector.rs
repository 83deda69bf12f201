use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide allocation and protection counters.
///
/// Every heap in the process feeds the same counters, so tests compare
/// deltas rather than absolute values.
#[derive(Debug, Clone, Copy)]
pub struct LeakStats {
    pub gc_allocs: usize,
    pub protects: usize,
    pub releases: usize,
}

impl LeakStats {
    /// Tokens handed out but not yet given back.
    pub fn outstanding_tokens(&self) -> usize {
        self.protects.saturating_sub(self.releases)
    }
}

static GC_ALLOCS: AtomicUsize = AtomicUsize::new(0);
static PROTECTS: AtomicUsize = AtomicUsize::new(0);
static RELEASES: AtomicUsize = AtomicUsize::new(0);

pub fn record_gc_alloc() {
    GC_ALLOCS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_protect() {
    PROTECTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_release() {
    RELEASES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> LeakStats {
    LeakStats {
        gc_allocs: GC_ALLOCS.load(Ordering::Relaxed),
        protects: PROTECTS.load(Ordering::Relaxed),
        releases: RELEASES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_move_forward() {
        let before = snapshot();
        record_gc_alloc();
        record_protect();
        record_release();
        let after = snapshot();
        assert!(after.gc_allocs > before.gc_allocs);
        assert!(after.protects > before.protects);
        assert!(after.releases > before.releases);
    }
}
