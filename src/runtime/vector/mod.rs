//! Growable containers over host-owned vectors.
//!
//! # Protection Invariant
//! A [`Vector`] whose backing store is not nil holds exactly one protection
//! token for it. Every operation that reallocates the store protects the
//! replacement before the superseded store's token is released, and every
//! host call that can allocate happens while all handles the container still
//! needs are reachable from a protected object.
//!
//! # Caller contract
//! Handles passed in (`push_back`, `insert`, `set`, proxies) are not
//! protected by the container until they are stored. If the call can
//! allocate, the caller must keep them reachable for its duration.

use std::{cmp::Ordering, fmt, marker::PhantomData};

use crate::runtime::{
    error::VectorError,
    gc::GcHandle,
    host::{Host, SexpType},
    protect::{Protect, safe},
};

pub mod iter;
pub mod kind;
pub mod list;
pub mod proxy;

pub use iter::Iter;
pub use kind::ElementKind;
pub use list::{List, ListKind};
pub use proxy::Proxy;

/// Growable sequence stored in one host vector of kind `K`.
///
/// `length` counts logical elements; the backing store has `capacity`
/// slots and slots at `length..capacity` are allocated but logically absent.
pub struct Vector<'h, H: Host + ?Sized, K: ElementKind> {
    host: &'h H,
    data: GcHandle,
    protect: Option<Protect<'h, H>>,
    length: usize,
    capacity: usize,
    _kind: PhantomData<K>,
}

impl<'h, H: Host + ?Sized, K: ElementKind> Vector<'h, H, K> {
    /// Empty container; no backing store is allocated until the first growth.
    pub fn new(host: &'h H) -> Self {
        Self {
            host,
            data: host.nil(),
            protect: None,
            length: 0,
            capacity: 0,
            _kind: PhantomData,
        }
    }

    /// Empty container with `capacity` allocated slots.
    pub fn with_capacity(host: &'h H, capacity: usize) -> Result<Self, VectorError> {
        let mut vector = Self::new(host);
        vector.reserve(capacity)?;
        Ok(vector)
    }

    /// Wraps an existing host vector after checking its tag.
    pub fn from_sexp(host: &'h H, candidate: GcHandle) -> Result<Self, VectorError> {
        let data = K::validate(host, candidate)?;
        let length = host.xlength(data);
        Ok(Self {
            host,
            data,
            protect: Some(Protect::new(host, data)),
            length,
            capacity: length,
            _kind: PhantomData,
        })
    }

    /// Assembles a container around a store the caller already protected.
    pub(crate) fn from_protected(guard: Protect<'h, H>, length: usize) -> Self {
        let host = guard.host();
        let data = guard.sexp();
        Self {
            host,
            data,
            protect: Some(guard),
            length,
            capacity: length,
            _kind: PhantomData,
        }
    }

    pub fn host(&self) -> &'h H {
        self.host
    }

    /// Current backing store; nil before the first allocation.
    ///
    /// The handle changes whenever the container reallocates.
    pub fn data(&self) -> GcHandle {
        self.data
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn out_of_range(&self, index: usize) -> VectorError {
        VectorError::OutOfRange {
            kind: K::TYPE,
            index,
            length: self.length,
        }
    }

    /// Bounds-checked read.
    pub fn at(&self, position: usize) -> Result<K::Elem, VectorError> {
        if position >= self.length {
            return Err(self.out_of_range(position));
        }
        Ok(K::read(self.host, self.data, position))
    }

    /// Unchecked read.
    ///
    /// `position` must be below [`Self::len`]. Only debug builds check it;
    /// in release builds positions up to the capacity read stale slots and
    /// anything beyond is up to the host. Use [`Self::at`] for a checked read.
    pub fn get(&self, position: usize) -> K::Elem {
        debug_assert!(
            position < self.length,
            "position {} out of range for length {}",
            position,
            self.length
        );
        K::read(self.host, self.data, position)
    }

    /// Bounds-checked write.
    pub fn set(&mut self, position: usize, value: K::Elem) -> Result<(), VectorError> {
        self.proxy(position)?.set(value);
        Ok(())
    }

    /// Read/write view onto slot `position`, bounds-checked.
    pub fn proxy(&mut self, position: usize) -> Result<Proxy<'_, H, K>, VectorError> {
        if position >= self.length {
            return Err(self.out_of_range(position));
        }
        Ok(Proxy::new(self.host, self.data, position))
    }

    /// Read/write view onto slot `position` without a bounds check.
    ///
    /// Same contract as [`Self::get`].
    pub fn proxy_unchecked(&mut self, position: usize) -> Proxy<'_, H, K> {
        debug_assert!(position < self.length);
        Proxy::new(self.host, self.data, position)
    }

    pub fn iter(&self) -> Iter<'_, 'h, H, K> {
        Iter::new(self)
    }

    /// Resizes the backing store to exactly `new_capacity` slots.
    ///
    /// Elements below `min(capacity, new_capacity)` are kept; shrinking
    /// below the current length truncates it. A `names` attribute is resized
    /// along with the store.
    pub fn reserve(&mut self, new_capacity: usize) -> Result<(), VectorError> {
        let host = self.host;
        let nil = host.nil();

        let data = if self.data == nil {
            safe(host.alloc_vector(K::TYPE, new_capacity))?
        } else {
            safe(host.resize_vector(self.data, new_capacity))?
        };
        let guard = Protect::new(host, data);

        // The old names stay reachable through the old store, which keeps
        // its token until the assignment below.
        let old_names = host.names(self.data);
        if old_names != nil {
            let names = safe(host.resize_vector(old_names, new_capacity))?;
            host.set_names(data, names);
        }

        tracing::debug!(
            kind = K::TYPE.type_name(),
            old_capacity = self.capacity,
            new_capacity,
            length = self.length,
            "reserve"
        );

        self.protect = Some(guard);
        self.data = data;
        self.capacity = new_capacity;
        self.length = self.length.min(new_capacity);
        Ok(())
    }

    /// Doubles the capacity (`0` grows to `1`).
    pub(crate) fn grow(&mut self) -> Result<(), VectorError> {
        let next = if self.capacity == 0 {
            1
        } else {
            self.capacity * 2
        };
        tracing::trace!(from = self.capacity, to = next, "grow");
        self.reserve(next)
    }

    /// Appends `value`, growing geometrically when the store is full.
    pub fn push_back(&mut self, value: K::Elem) -> Result<(), VectorError> {
        if self.length >= self.capacity {
            self.grow()?;
        }
        K::write(self.host, self.data, self.length, value);
        self.length += 1;
        Ok(())
    }

    /// Removes and returns the last element.
    ///
    /// The returned handle is no longer kept alive by the container once the
    /// slot is overwritten.
    pub fn pop_back(&mut self) -> Option<K::Elem> {
        if self.length == 0 {
            return None;
        }
        self.length -= 1;
        Some(K::read(self.host, self.data, self.length))
    }

    /// Drops every element; capacity is kept.
    pub fn clear(&mut self) {
        self.length = 0;
    }

    /// Shortens the container to at most `length` elements.
    pub fn truncate(&mut self, length: usize) {
        self.length = self.length.min(length);
    }

    /// Sets the length to `new_length`, filling new slots with the kind's
    /// empty value (and an empty name when the container is named).
    pub fn resize(&mut self, new_length: usize) -> Result<(), VectorError> {
        if new_length > self.capacity {
            self.reserve(new_length)?;
        }
        let host = self.host;
        let names = host.names(self.data);
        for i in self.length..new_length {
            K::write(host, self.data, i, K::empty(host));
            if names != host.nil() {
                safe(host.set_string_elt(names, i, ""))?;
            }
        }
        self.length = new_length;
        Ok(())
    }

    /// Inserts `value` at `position`, shifting later elements right.
    ///
    /// `position == len()` appends.
    pub fn insert(&mut self, position: usize, value: K::Elem) -> Result<(), VectorError> {
        if position > self.length {
            return Err(self.out_of_range(position));
        }
        if self.length >= self.capacity {
            self.grow()?;
        }
        self.remap_names(self.length + 1, |j| match j.cmp(&position) {
            Ordering::Less => Some(j),
            Ordering::Equal => None,
            Ordering::Greater => Some(j - 1),
        })?;

        let (host, data) = (self.host, self.data);
        for i in (position..self.length).rev() {
            K::write(host, data, i + 1, K::read(host, data, i));
        }
        K::write(host, data, position, value);
        self.length += 1;
        Ok(())
    }

    /// Removes the element at `position`, shifting later elements left.
    pub fn erase(&mut self, position: usize) -> Result<K::Elem, VectorError> {
        if position >= self.length {
            return Err(self.out_of_range(position));
        }
        self.remap_names(self.length - 1, |j| {
            Some(if j < position { j } else { j + 1 })
        })?;

        let (host, data) = (self.host, self.data);
        let removed = K::read(host, data, position);
        for i in position..self.length - 1 {
            K::write(host, data, i, K::read(host, data, i + 1));
        }
        self.length -= 1;
        Ok(removed)
    }

    /// Rebuilds the names aggregate so that name `j` of the result is old
    /// name `source(j)`, or empty for `None`.
    ///
    /// The replacement is attached only once fully built, so a failing host
    /// call leaves the current names untouched.
    fn remap_names(
        &mut self,
        new_length: usize,
        source: impl Fn(usize) -> Option<usize>,
    ) -> Result<(), VectorError> {
        let host = self.host;
        let old = host.names(self.data);
        if old == host.nil() {
            return Ok(());
        }

        let names = safe(host.alloc_vector(SexpType::String, self.capacity))?;
        let _guard = Protect::new(host, names);
        for j in 0..new_length {
            match source(j) {
                Some(i) => {
                    if let Some(text) = host.string_elt(old, i) {
                        safe(host.set_string_elt(names, j, &text))?;
                    }
                }
                None => safe(host.set_string_elt(names, j, ""))?,
            }
        }
        host.set_names(self.data, names);
        Ok(())
    }

    /// Position of the first element whose name equals `key`.
    ///
    /// Names are compared in store order; NA names never match.
    pub fn find(&self, key: &str) -> Option<usize> {
        let names = self.host.names(self.data);
        if names == self.host.nil() {
            return None;
        }
        let size = self.host.xlength(names).min(self.length);
        (0..size).find(|&pos| self.host.string_elt(names, pos).as_deref() == Some(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Decoded names of the logical elements, or `None` when unnamed.
    pub fn names(&self) -> Option<Vec<Option<String>>> {
        let names = self.host.names(self.data);
        if names == self.host.nil() {
            return None;
        }
        let size = self.host.xlength(names).min(self.length);
        Some(
            (0..size)
                .map(|pos| self.host.string_elt(names, pos).map(|name| name.to_string()))
                .collect(),
        )
    }

    /// Creates the names aggregate if missing, giving existing elements
    /// empty names, and returns it.
    pub(crate) fn ensure_names(&mut self) -> Result<GcHandle, VectorError> {
        let host = self.host;
        let names = host.names(self.data);
        if names != host.nil() {
            return Ok(names);
        }

        let names = safe(host.alloc_vector(SexpType::String, self.capacity))?;
        host.set_names(self.data, names);
        for i in 0..self.length {
            safe(host.set_string_elt(names, i, ""))?;
        }
        Ok(names)
    }

    /// Finalizes the container into a host vector of exactly `len()` slots.
    ///
    /// The returned guard owns the only protection token of the result.
    pub fn into_protected(mut self) -> Result<Protect<'h, H>, VectorError> {
        if self.protect.is_none() || self.capacity != self.length {
            self.reserve(self.length)?;
        }
        let (host, data) = (self.host, self.data);
        Ok(self
            .protect
            .take()
            .unwrap_or_else(|| Protect::new(host, data)))
    }
}

impl<H: Host + ?Sized, K: ElementKind> fmt::Debug for Vector<'_, H, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("kind", &K::TYPE)
            .field("data", &self.data)
            .field("length", &self.length)
            .field("capacity", &self.capacity)
            .finish()
    }
}
