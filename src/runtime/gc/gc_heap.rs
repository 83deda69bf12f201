use std::rc::Rc;

use crate::runtime::{
    config::HeapConfig,
    error::HostError,
    gc::{
        gc_handle::{GcHandle, ProtectToken},
        heap_entry::HeapEntry,
        heap_object::HeapObject,
    },
    leak_detector,
};

const MIN_GC_THRESHOLD: usize = 1024;
const MAX_GC_THRESHOLD: usize = 1_000_000;

/// Slot of the absence sentinel.
pub const NIL: GcHandle = GcHandle(0);
/// Slot of the NA string.
pub const NA_STRING: GcHandle = GcHandle(1);
const PERMANENT_SLOTS: u32 = 2;

/// Stop-the-world mark-and-sweep garbage collector heap.
///
/// Roots are the permanent objects (nil and the NA string) plus every object
/// registered through [`GcHeap::protect`]. Anything else may be reclaimed by
/// the collection an allocation triggers.
pub struct GcHeap {
    entries: Vec<Option<HeapEntry>>,
    free_list: Vec<u32>,
    precious: Vec<Option<GcHandle>>,
    precious_free: Vec<u32>,
    allocation_count: usize,
    gc_threshold: usize,
    gc_enabled: bool,
    torture: bool,
    fail_in: Option<usize>,
    total_collections: usize,
    total_allocations: usize,
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl GcHeap {
    /// Creates a new GC heap with default collection settings.
    ///
    /// Defaults:
    /// - threshold: `10_000` allocations
    /// - GC enabled: `true`
    /// - torture: `false`
    pub fn new() -> Self {
        Self::with_config(&HeapConfig::default())
    }

    /// Creates a heap from explicit settings. The threshold is not clamped.
    pub fn with_config(config: &HeapConfig) -> Self {
        let mut entries = Vec::with_capacity(64);
        entries.push(Some(HeapEntry {
            object: HeapObject::Nil,
            names: None,
            marked: false,
        }));
        entries.push(Some(HeapEntry {
            object: HeapObject::Char(None),
            names: None,
            marked: false,
        }));

        Self {
            entries,
            free_list: Vec::new(),
            precious: Vec::new(),
            precious_free: Vec::new(),
            allocation_count: 0,
            gc_threshold: config.gc_threshold,
            gc_enabled: config.gc_enabled,
            torture: config.torture,
            fail_in: None,
            total_collections: 0,
            total_allocations: 0,
        }
    }

    /// Creates a new heap with a custom GC allocation threshold.
    ///
    /// Unlike [`Self::set_threshold`], this does not clamp to `MIN_GC_THRESHOLD`.
    pub fn with_threshold(threshold: usize) -> Self {
        let mut heap = Self::new();
        heap.gc_threshold = threshold;
        heap
    }

    /// Enables or disables automatic collection checks.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled
    }

    /// Sets the allocation threshold that triggers collection.
    ///
    /// Values below `MIN_GC_THRESHOLD` are clamped upward.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold.max(MIN_GC_THRESHOLD)
    }

    /// Collect before every allocation when `true`.
    pub fn set_torture(&mut self, torture: bool) {
        self.torture = torture
    }

    /// Makes the `n`-th following allocation fail with [`HostError::Unwind`].
    ///
    /// `n == 0` behaves like `n == 1`.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_in = Some(n.max(1));
    }

    /// Returns `true` when the next allocation will run a collection first.
    pub fn should_collect(&self) -> bool {
        self.gc_enabled && (self.torture || self.allocation_count >= self.gc_threshold)
    }

    /// Allocates a new heap object and returns a handle to it.
    ///
    /// May run a full collection before allocating, so every handle the
    /// caller still needs must be reachable from a root. The new object
    /// itself is not protected.
    pub fn alloc(&mut self, object: HeapObject) -> Result<GcHandle, HostError> {
        if let Some(remaining) = self.fail_in {
            if remaining <= 1 {
                self.fail_in = None;
                return Err(HostError::Unwind {
                    reason: format!("allocation of {} failed", object.tag()),
                });
            }
            self.fail_in = Some(remaining - 1);
        }

        if self.should_collect() {
            self.collect();
        }

        leak_detector::record_gc_alloc();
        self.allocation_count += 1;
        self.total_allocations += 1;

        let entry = HeapEntry {
            object,
            names: None,
            marked: false,
        };

        if let Some(idx) = self.free_list.pop() {
            self.entries[idx as usize] = Some(entry);
            Ok(GcHandle(idx))
        } else {
            let idx = self.entries.len() as u32;
            self.entries.push(Some(entry));
            Ok(GcHandle(idx))
        }
    }

    fn entry(&self, handle: GcHandle) -> &HeapEntry {
        self.entries
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .expect("GcHeap::get: invalid or free handle")
    }

    fn entry_mut(&mut self, handle: GcHandle) -> &mut HeapEntry {
        self.entries
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
            .expect("GcHeap::get: invalid or free handle")
    }

    /// Returns an immutable reference to a live object by handle.
    ///
    /// Panics if the handle points to a free slot or is out of bounds.
    pub fn get(&self, handle: GcHandle) -> &HeapObject {
        &self.entry(handle).object
    }

    /// Returns a mutable reference to a live object by handle.
    ///
    /// Panics if the handle points to a free slot or is out of bounds.
    pub fn get_mut(&mut self, handle: GcHandle) -> &mut HeapObject {
        &mut self.entry_mut(handle).object
    }

    /// Returns `true` if `handle` still designates a live object.
    pub fn is_live(&self, handle: GcHandle) -> bool {
        matches!(self.entries.get(handle.0 as usize), Some(Some(_)))
    }

    /// Returns the `names` attribute of a live object.
    pub fn names(&self, handle: GcHandle) -> Option<GcHandle> {
        self.entry(handle).names
    }

    /// Replaces the `names` attribute of a live object.
    pub fn set_names(&mut self, handle: GcHandle, names: Option<GcHandle>) {
        self.entry_mut(handle).names = names;
    }

    /// Registers `handle` as a root until the token is released.
    pub fn protect(&mut self, handle: GcHandle) -> ProtectToken {
        leak_detector::record_protect();
        if let Some(idx) = self.precious_free.pop() {
            self.precious[idx as usize] = Some(handle);
            ProtectToken(idx)
        } else {
            let idx = self.precious.len() as u32;
            self.precious.push(Some(handle));
            ProtectToken(idx)
        }
    }

    /// Releases a protection token. Returns `false` for an unknown token.
    pub fn release(&mut self, token: ProtectToken) -> bool {
        let Some(slot) = self.precious.get_mut(token.0 as usize) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }
        self.precious_free.push(token.0);
        leak_detector::record_release();
        true
    }

    /// Returns the number of currently live heap entries, permanent ones included.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    /// Returns the number of protection tokens not yet released.
    pub fn live_tokens(&self) -> usize {
        self.precious.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns the total number of allocations performed by this heap.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    /// Returns the total number of completed GC cycles.
    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    /// Runs a full stop-the-world mark-and-sweep collection.
    pub fn collect(&mut self) {
        let mut worklist = Vec::with_capacity(16);
        worklist.push(NIL);
        worklist.push(NA_STRING);
        worklist.extend(self.precious.iter().flatten().copied());
        let roots = worklist.len();

        while let Some(handle) = worklist.pop() {
            self.mark_handle(handle, &mut worklist);
        }

        let live_before = self.live_count();
        self.sweep();
        let live_after = self.live_count();
        let collected = live_before.saturating_sub(live_after);

        self.total_collections += 1;
        self.allocation_count = 0;

        tracing::debug!(
            cycle = self.total_collections,
            roots,
            live_before,
            live_after,
            "gc cycle finished"
        );

        if !self.torture {
            self.adapt_threshold(collected, live_before);
        }
    }

    fn mark_handle(&mut self, handle: GcHandle, worklist: &mut Vec<GcHandle>) {
        // Mark first so shared nodes are visited once.
        let entry = match self.entries.get_mut(handle.0 as usize) {
            Some(Some(entry)) => entry,
            _ => return,
        };
        if entry.marked {
            return;
        }
        entry.marked = true;

        if let Some(names) = entry.names {
            worklist.push(names);
        }
        match &entry.object {
            HeapObject::List(elements) | HeapObject::Strings(elements) => {
                worklist.extend(elements.iter().copied());
            }
            HeapObject::Nil
            | HeapObject::Char(_)
            | HeapObject::Doubles(_)
            | HeapObject::Integers(_) => {}
        }
    }

    fn sweep(&mut self) {
        let len = self.entries.len();
        for i in 0..len {
            if let Some(entry) = &mut self.entries[i] {
                if entry.marked {
                    entry.marked = false;
                } else if i as u32 >= PERMANENT_SLOTS {
                    self.entries[i] = None;
                    self.free_list.push(i as u32);
                }
            }
        }
    }

    fn adapt_threshold(&mut self, collected: usize, total_before: usize) {
        if total_before == 0 {
            return;
        }

        let ratio = collected as f64 / total_before as f64;
        if ratio < 0.25 {
            self.gc_threshold = (self.gc_threshold * 2).min(MAX_GC_THRESHOLD);
        } else if ratio > 0.75 {
            self.gc_threshold = (self.gc_threshold / 2).max(MIN_GC_THRESHOLD)
        }
    }

    /// Allocates a `Char` holding `text`.
    pub fn mk_char(&mut self, text: &str) -> Result<GcHandle, HostError> {
        self.alloc(HeapObject::Char(Some(Rc::from(text))))
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        config::HeapConfig,
        gc::{
            gc_heap::{GcHeap, MIN_GC_THRESHOLD, NA_STRING, NIL},
            heap_object::HeapObject,
        },
        host::SexpType,
    };

    fn doubles(values: &[f64]) -> HeapObject {
        HeapObject::Doubles(values.to_vec())
    }

    #[test]
    fn test_alloc_and_get() {
        let mut heap = GcHeap::new();
        let h = heap.alloc(doubles(&[1.5])).unwrap();
        match heap.get(h) {
            HeapObject::Doubles(values) => assert_eq!(values, &vec![1.5]),
            other => panic!("expected Doubles, got {:?}", other),
        }
        // nil + NA string + the new object
        assert_eq!(heap.live_count(), 3);
    }

    #[test]
    fn test_permanent_objects_survive_collection() {
        let mut heap = GcHeap::new();
        heap.collect();
        assert_eq!(heap.get(NIL).tag(), SexpType::Nil);
        assert_eq!(heap.get(NA_STRING).tag(), SexpType::Char);
        assert_eq!(heap.live_count(), 2);
    }

    #[test]
    fn test_collect_frees_unprotected() {
        let mut heap = GcHeap::new();
        for i in 0..100 {
            heap.alloc(doubles(&[i as f64])).unwrap();
        }
        assert_eq!(heap.live_count(), 102);

        heap.collect();
        assert_eq!(heap.live_count(), 2);
        assert_eq!(heap.free_list.len(), 100);
    }

    #[test]
    fn test_collect_preserves_protected_and_children() {
        let mut heap = GcHeap::new();
        let leaf = heap.alloc(doubles(&[42.0])).unwrap();
        let name = heap.mk_char("a").unwrap();
        let names = heap.alloc(HeapObject::Strings(vec![name])).unwrap();
        let list = heap.alloc(HeapObject::List(vec![leaf])).unwrap();
        heap.set_names(list, Some(names));

        for i in 0..50 {
            heap.alloc(doubles(&[i as f64])).unwrap();
        }

        let token = heap.protect(list);
        heap.collect();
        assert!(heap.is_live(list));
        assert!(heap.is_live(leaf));
        assert!(heap.is_live(names));
        assert!(heap.is_live(name));
        assert_eq!(heap.live_count(), 6);

        assert!(heap.release(token));
        heap.collect();
        assert!(!heap.is_live(list));
        assert!(!heap.is_live(leaf));
    }

    #[test]
    fn test_release_unknown_token_is_reported() {
        let mut heap = GcHeap::new();
        let h = heap.alloc(doubles(&[])).unwrap();
        let token = heap.protect(h);
        let stale = super::ProtectToken(token.index());
        assert!(heap.release(token));
        assert!(!heap.release(stale));
        assert_eq!(heap.live_tokens(), 0);
    }

    #[test]
    fn test_protect_reuses_token_slots() {
        let mut heap = GcHeap::new();
        let h = heap.alloc(doubles(&[])).unwrap();
        let first = heap.protect(h);
        let index = first.index();
        heap.release(first);
        let second = heap.protect(h);
        assert_eq!(second.index(), index);
        assert_eq!(heap.live_tokens(), 1);
    }

    #[test]
    fn test_free_list_reuse() {
        let mut heap = GcHeap::new();
        heap.alloc(doubles(&[])).unwrap();
        heap.collect();
        assert_eq!(heap.free_list.len(), 1);

        let h = heap.alloc(doubles(&[2.0])).unwrap();
        assert_eq!(h.index(), 2);
        assert!(heap.free_list.is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid or free handle")]
    fn test_reading_reclaimed_handle_panics() {
        let mut heap = GcHeap::new();
        let h = heap.alloc(doubles(&[1.0])).unwrap();
        heap.collect();
        heap.get(h);
    }

    #[test]
    fn test_threshold_triggers_collection_on_alloc() {
        let mut heap = GcHeap::with_threshold(3);
        for _ in 0..3 {
            heap.alloc(doubles(&[])).unwrap();
        }
        assert_eq!(heap.total_collections(), 0);
        heap.alloc(doubles(&[])).unwrap();
        assert_eq!(heap.total_collections(), 1);
    }

    #[test]
    fn test_torture_collects_before_every_alloc() {
        let mut heap = GcHeap::with_config(&HeapConfig::torture());
        for _ in 0..5 {
            heap.alloc(doubles(&[])).unwrap();
        }
        assert_eq!(heap.total_collections(), 5);
        assert_eq!(heap.live_count(), 3);
    }

    #[test]
    fn test_gc_disabled() {
        let mut heap = GcHeap::with_threshold(1);
        heap.set_enabled(false);
        for _ in 0..10 {
            heap.alloc(doubles(&[])).unwrap();
        }
        assert_eq!(heap.total_collections(), 0);
        assert_eq!(heap.live_count(), 12);
    }

    #[test]
    fn test_set_threshold_clamps() {
        let mut heap = GcHeap::new();
        heap.set_threshold(1);
        assert_eq!(heap.gc_threshold, MIN_GC_THRESHOLD);
    }

    #[test]
    fn test_fail_after_counts_allocations() {
        let mut heap = GcHeap::new();
        heap.fail_after(2);
        assert!(heap.alloc(doubles(&[])).is_ok());
        assert!(heap.alloc(doubles(&[])).is_err());
        assert!(heap.alloc(doubles(&[])).is_ok());
    }

    #[test]
    fn test_total_allocations() {
        let mut heap = GcHeap::new();
        heap.alloc(doubles(&[])).unwrap();
        heap.mk_char("x").unwrap();
        assert_eq!(heap.total_allocations(), 2);
    }
}
