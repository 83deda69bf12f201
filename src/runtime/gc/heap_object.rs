use std::rc::Rc;

use crate::runtime::{gc::gc_handle::GcHandle, host::SexpType};

/// Objects that live on the GC-managed heap.
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// The absence sentinel.
    Nil,
    /// Character scalar; `None` is the NA string.
    Char(Option<Rc<str>>),
    /// String vector whose elements are `Char` handles.
    Strings(Vec<GcHandle>),
    /// Double-precision numeric vector.
    Doubles(Vec<f64>),
    /// Integer vector.
    Integers(Vec<i32>),
    /// Generic list whose elements are arbitrary handles.
    List(Vec<GcHandle>),
}

impl HeapObject {
    /// Returns the runtime tag reported for this object.
    pub fn tag(&self) -> SexpType {
        match self {
            HeapObject::Nil => SexpType::Nil,
            HeapObject::Char(_) => SexpType::Char,
            HeapObject::Strings(_) => SexpType::String,
            HeapObject::Doubles(_) => SexpType::Real,
            HeapObject::Integers(_) => SexpType::Integer,
            HeapObject::List(_) => SexpType::List,
        }
    }

    /// Vector length; scalars report `1` and nil reports `0`.
    pub fn len(&self) -> usize {
        match self {
            HeapObject::Nil => 0,
            HeapObject::Char(_) => 1,
            HeapObject::Strings(elements) | HeapObject::List(elements) => elements.len(),
            HeapObject::Doubles(values) => values.len(),
            HeapObject::Integers(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
