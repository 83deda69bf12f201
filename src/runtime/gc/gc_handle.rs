/// Handle into the GC heap.
///
/// A `GcHandle` is a lightweight, copyable index that refers to an object
/// owned by the heap. Copying a handle does not keep its object alive: only
/// the heap's roots (permanent objects and live protection tokens) and the
/// objects reachable from them survive a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcHandle(pub(crate) u32);

impl GcHandle {
    /// Returns the raw heap slot index backing this handle.
    pub fn index(self) -> u32 {
        self.0
    }

    #[cfg(test)]
    pub fn new_for_test(index: u32) -> Self {
        Self(index)
    }
}

/// Opaque token proving that one object is registered as a collection root.
///
/// Tokens are handed out by [`GcHeap::protect`](super::GcHeap::protect) and
/// must be given back to [`GcHeap::release`](super::GcHeap::release) exactly
/// once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProtectToken(pub(crate) u32);

impl ProtectToken {
    /// Returns the raw precious-set slot backing this token.
    pub fn index(&self) -> u32 {
        self.0
    }
}
