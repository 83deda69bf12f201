use std::{fmt, marker::PhantomData};

use crate::runtime::{gc::GcHandle, host::Host, vector::kind::ElementKind};

/// Read/write view onto one slot of a container's backing store.
///
/// A proxy mutably borrows the container it came from, so the container
/// cannot grow, shrink or reallocate while the proxy is alive. Writes go
/// straight into the already protected store.
pub struct Proxy<'a, H: Host + ?Sized, K: ElementKind> {
    host: &'a H,
    data: GcHandle,
    index: usize,
    _kind: PhantomData<(&'a mut (), K)>,
}

impl<'a, H: Host + ?Sized, K: ElementKind> Proxy<'a, H, K> {
    pub(crate) fn new(host: &'a H, data: GcHandle, index: usize) -> Self {
        Self {
            host,
            data,
            index,
            _kind: PhantomData,
        }
    }

    /// Slot position this proxy is bound to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the value currently stored in the slot.
    pub fn get(&self) -> K::Elem {
        K::read(self.host, self.data, self.index)
    }

    /// Replaces the value stored in the slot.
    ///
    /// For handle kinds, `value` must be reachable until this call returns;
    /// afterwards the container's protection covers it.
    pub fn set(&mut self, value: K::Elem) -> &mut Self {
        K::write(self.host, self.data, self.index, value);
        self
    }
}

impl<H: Host + ?Sized, K: ElementKind> fmt::Debug for Proxy<'_, H, K>
where
    K::Elem: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("index", &self.index)
            .field("value", &self.get())
            .finish()
    }
}
