use crate::runtime::gc::{gc_handle::GcHandle, heap_object::HeapObject};

pub struct HeapEntry {
    pub(crate) object: HeapObject,
    /// `names` attribute; `None` when the object carries no names.
    pub(crate) names: Option<GcHandle>,
    pub(crate) marked: bool,
}
