use std::{cell::RefCell, rc::Rc};

use crate::runtime::{
    config::HeapConfig,
    error::HostError,
    gc::{
        GcHandle, GcHeap, HeapObject, ProtectToken,
        gc_heap::{NA_STRING, NIL},
    },
    host::{Host, SexpType},
};

/// In-process embedding runtime backed by a [`GcHeap`].
///
/// The heap sits behind a `RefCell` so containers can share one runtime by
/// reference. Every fallible method may run a collection before it
/// allocates.
pub struct HeapRuntime {
    heap: RefCell<GcHeap>,
}

impl Default for HeapRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapRuntime {
    pub fn new() -> Self {
        Self::with_config(&HeapConfig::default())
    }

    pub fn with_config(config: &HeapConfig) -> Self {
        Self {
            heap: RefCell::new(GcHeap::with_config(config)),
        }
    }

    /// Runtime that collects before every allocation.
    pub fn torture() -> Self {
        Self::with_config(&HeapConfig::torture())
    }

    /// Makes the `n`-th following allocation unwind.
    pub fn fail_after(&self, n: usize) {
        self.heap.borrow_mut().fail_after(n);
    }

    pub fn set_torture(&self, torture: bool) {
        self.heap.borrow_mut().set_torture(torture);
    }

    /// Runs a full collection now.
    pub fn collect(&self) {
        self.heap.borrow_mut().collect();
    }

    pub fn is_live(&self, handle: GcHandle) -> bool {
        self.heap.borrow().is_live(handle)
    }

    pub fn live_count(&self) -> usize {
        self.heap.borrow().live_count()
    }

    pub fn live_tokens(&self) -> usize {
        self.heap.borrow().live_tokens()
    }

    pub fn total_allocations(&self) -> usize {
        self.heap.borrow().total_allocations()
    }

    pub fn total_collections(&self) -> usize {
        self.heap.borrow().total_collections()
    }

    /// Allocates a character scalar.
    pub fn mk_char(&self, text: &str) -> Result<GcHandle, HostError> {
        self.heap.borrow_mut().mk_char(text)
    }

    /// Allocates a length-one double vector.
    pub fn scalar_real(&self, value: f64) -> Result<GcHandle, HostError> {
        self.heap.borrow_mut().alloc(HeapObject::Doubles(vec![value]))
    }

    /// Reads the first element of a double vector.
    pub fn real_value(&self, x: GcHandle) -> Option<f64> {
        match self.heap.borrow().get(x) {
            HeapObject::Doubles(values) => values.first().copied(),
            _ => None,
        }
    }

    fn cannot(verb: &str, tag: SexpType) -> HostError {
        HostError::Unwind {
            reason: format!("cannot {} vector of type '{}'", verb, tag),
        }
    }
}

impl Host for HeapRuntime {
    fn nil(&self) -> GcHandle {
        NIL
    }

    fn type_of(&self, x: GcHandle) -> SexpType {
        self.heap.borrow().get(x).tag()
    }

    fn xlength(&self, x: GcHandle) -> usize {
        self.heap.borrow().get(x).len()
    }

    fn alloc_vector(&self, tag: SexpType, count: usize) -> Result<GcHandle, HostError> {
        let object = match tag {
            SexpType::Nil => return Ok(NIL),
            SexpType::Char => return Err(Self::cannot("allocate", tag)),
            SexpType::String => HeapObject::Strings(vec![NA_STRING; count]),
            SexpType::Real => HeapObject::Doubles(vec![0.0; count]),
            SexpType::Integer => HeapObject::Integers(vec![0; count]),
            SexpType::List => HeapObject::List(vec![NIL; count]),
        };
        self.heap.borrow_mut().alloc(object)
    }

    fn resize_vector(&self, x: GcHandle, count: usize) -> Result<GcHandle, HostError> {
        let mut heap = self.heap.borrow_mut();
        let object = match heap.get(x) {
            HeapObject::List(elements) => HeapObject::List(resized(elements, count, NIL)),
            HeapObject::Strings(elements) => {
                HeapObject::Strings(resized(elements, count, NA_STRING))
            }
            HeapObject::Doubles(values) => HeapObject::Doubles(resized(values, count, 0.0)),
            HeapObject::Integers(values) => HeapObject::Integers(resized(values, count, 0)),
            other => return Err(Self::cannot("resize", other.tag())),
        };
        heap.alloc(object)
    }

    fn protect(&self, x: GcHandle) -> ProtectToken {
        let token = self.heap.borrow_mut().protect(x);
        tracing::trace!(handle = x.index(), token = token.index(), "protect");
        token
    }

    fn release(&self, token: ProtectToken) {
        let index = token.index();
        if self.heap.borrow_mut().release(token) {
            tracing::trace!(token = index, "release");
        } else {
            tracing::warn!(token = index, "release of unknown protection token");
        }
    }

    fn vector_elt(&self, x: GcHandle, index: usize) -> GcHandle {
        match self.heap.borrow().get(x) {
            HeapObject::List(elements) => elements[index],
            other => panic!("vector_elt: expected 'list' got '{}'", other.tag()),
        }
    }

    fn set_vector_elt(&self, x: GcHandle, index: usize, value: GcHandle) {
        match self.heap.borrow_mut().get_mut(x) {
            HeapObject::List(elements) => elements[index] = value,
            other => panic!("set_vector_elt: expected 'list' got '{}'", other.tag()),
        }
    }

    fn string_elt(&self, x: GcHandle, index: usize) -> Option<Rc<str>> {
        let heap = self.heap.borrow();
        let element = match heap.get(x) {
            HeapObject::Strings(elements) => elements[index],
            other => panic!("string_elt: expected 'character' got '{}'", other.tag()),
        };
        match heap.get(element) {
            HeapObject::Char(text) => text.clone(),
            other => panic!("string_elt: expected 'char' got '{}'", other.tag()),
        }
    }

    fn set_string_elt(&self, x: GcHandle, index: usize, text: &str) -> Result<(), HostError> {
        let mut heap = self.heap.borrow_mut();
        let element = heap.mk_char(text)?;
        match heap.get_mut(x) {
            HeapObject::Strings(elements) => elements[index] = element,
            other => panic!("set_string_elt: expected 'character' got '{}'", other.tag()),
        }
        Ok(())
    }

    fn names(&self, x: GcHandle) -> GcHandle {
        self.heap.borrow().names(x).unwrap_or(NIL)
    }

    fn set_names(&self, x: GcHandle, names: GcHandle) {
        let names = (names != NIL).then_some(names);
        self.heap.borrow_mut().set_names(x, names);
    }
}

fn resized<T: Copy>(values: &[T], count: usize, fill: T) -> Vec<T> {
    let keep = values.len().min(count);
    let mut out = Vec::with_capacity(count);
    out.extend_from_slice(&values[..keep]);
    out.resize(count, fill);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_list_is_filled_with_nil() {
        let rt = HeapRuntime::new();
        let list = rt.alloc_vector(SexpType::List, 3).unwrap();
        assert_eq!(rt.type_of(list), SexpType::List);
        assert_eq!(rt.xlength(list), 3);
        assert!((0..3).all(|i| rt.vector_elt(list, i) == rt.nil()));
    }

    #[test]
    fn alloc_strings_is_filled_with_na() {
        let rt = HeapRuntime::new();
        let strings = rt.alloc_vector(SexpType::String, 2).unwrap();
        assert_eq!(rt.string_elt(strings, 0), None);
        assert_eq!(rt.string_elt(strings, 1), None);
    }

    #[test]
    fn torture_toggle_controls_collection() {
        let rt = HeapRuntime::new();
        let permanent = rt.live_count();
        let _garbage = rt.scalar_real(1.0).unwrap();
        let kept = rt.scalar_real(2.0).unwrap();
        let token = rt.protect(kept);
        assert_eq!(rt.live_count(), permanent + 2);

        rt.set_torture(true);
        let fresh = rt.scalar_real(3.0).unwrap();
        assert_eq!(rt.total_collections(), 1);
        assert_eq!(rt.live_count(), permanent + 2);
        assert_eq!(rt.real_value(kept), Some(2.0));
        assert_eq!(rt.real_value(fresh), Some(3.0));

        rt.set_torture(false);
        rt.scalar_real(4.0).unwrap();
        assert_eq!(rt.total_collections(), 1);
        assert_eq!(rt.live_count(), permanent + 3);
        rt.release(token);
    }

    #[test]
    fn alloc_char_is_rejected() {
        let rt = HeapRuntime::new();
        assert!(rt.alloc_vector(SexpType::Char, 1).is_err());
    }

    #[test]
    fn resize_preserves_prefix_and_drops_names() {
        let rt = HeapRuntime::new();
        let list = rt.alloc_vector(SexpType::List, 2).unwrap();
        let _token = rt.protect(list);
        let value = rt.scalar_real(1.0).unwrap();
        rt.set_vector_elt(list, 0, value);
        let names = rt.alloc_vector(SexpType::String, 2).unwrap();
        rt.set_names(list, names);

        let grown = rt.resize_vector(list, 4).unwrap();
        assert_ne!(grown, list);
        assert_eq!(rt.xlength(grown), 4);
        assert_eq!(rt.vector_elt(grown, 0), value);
        assert_eq!(rt.vector_elt(grown, 3), rt.nil());
        assert_eq!(rt.names(grown), rt.nil());

        let shrunk = rt.resize_vector(list, 1).unwrap();
        assert_eq!(rt.xlength(shrunk), 1);
        assert_eq!(rt.vector_elt(shrunk, 0), value);
    }

    #[test]
    fn resize_nil_is_rejected() {
        let rt = HeapRuntime::new();
        let err = rt.resize_vector(rt.nil(), 2).unwrap_err();
        assert_eq!(err.to_string(), "host runtime unwound: cannot resize vector of type 'NULL'");
    }

    #[test]
    fn string_elements_round_trip_through_chars() {
        let rt = HeapRuntime::torture();
        let strings = rt.alloc_vector(SexpType::String, 2).unwrap();
        let token = rt.protect(strings);
        rt.set_string_elt(strings, 1, "beta").unwrap();
        rt.set_string_elt(strings, 0, "alpha").unwrap();
        assert_eq!(rt.string_elt(strings, 0).as_deref(), Some("alpha"));
        assert_eq!(rt.string_elt(strings, 1).as_deref(), Some("beta"));
        rt.release(token);
    }

    #[test]
    fn set_names_with_nil_clears_attribute() {
        let rt = HeapRuntime::new();
        let list = rt.alloc_vector(SexpType::List, 1).unwrap();
        let names = rt.alloc_vector(SexpType::String, 1).unwrap();
        rt.set_names(list, names);
        assert_eq!(rt.names(list), names);
        rt.set_names(list, rt.nil());
        assert_eq!(rt.names(list), rt.nil());
    }

    #[test]
    fn unprotected_objects_are_reclaimed() {
        let rt = HeapRuntime::new();
        let kept = rt.scalar_real(1.0).unwrap();
        let dropped = rt.scalar_real(2.0).unwrap();
        let token = rt.protect(kept);
        rt.collect();
        assert!(rt.is_live(kept));
        assert!(!rt.is_live(dropped));
        assert_eq!(rt.real_value(kept), Some(1.0));
        rt.release(token);
        assert_eq!(rt.live_tokens(), 0);
    }
}
