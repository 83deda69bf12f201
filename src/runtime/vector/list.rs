use crate::runtime::{
    error::VectorError,
    gc::GcHandle,
    host::{Host, SexpType},
    named_arg::NamedArg,
    protect::{Protect, safe},
    vector::{Vector, kind::ElementKind},
};

/// Generic list kind: slots hold arbitrary handles.
///
/// Reads and writes pass handles through unchanged, so iteration needs no
/// decode buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListKind;

impl ElementKind for ListKind {
    type Elem = GcHandle;

    const TYPE: SexpType = SexpType::List;

    fn read<H: Host + ?Sized>(host: &H, data: GcHandle, index: usize) -> GcHandle {
        host.vector_elt(data, index)
    }

    fn write<H: Host + ?Sized>(host: &H, data: GcHandle, index: usize, value: GcHandle) {
        host.set_vector_elt(data, index, value);
    }

    fn empty<H: Host + ?Sized>(host: &H) -> GcHandle {
        host.nil()
    }
}

/// Growable list of host handles.
pub type List<'h, H> = Vector<'h, H, ListKind>;

impl<'h, H: Host + ?Sized> Vector<'h, H, ListKind> {
    /// Builds a list holding `handles` in order; `len() == capacity()`.
    pub fn from_handles(host: &'h H, handles: &[GcHandle]) -> Result<Self, VectorError> {
        let data = safe(host.alloc_vector(SexpType::List, handles.len()))?;
        let guard = Protect::new(host, data);
        for (i, handle) in handles.iter().enumerate() {
            host.set_vector_elt(data, i, *handle);
        }
        Ok(Self::from_protected(guard, handles.len()))
    }

    /// Builds a named list from `(key, handle)` pairs.
    ///
    /// Values are stored before any key is encoded, so they are protected by
    /// the list while the keys allocate. If encoding a key fails the
    /// partially built list is released before the error is returned.
    pub fn from_named(host: &'h H, args: &[NamedArg]) -> Result<Self, VectorError> {
        let count = args.len();
        let data = safe(host.alloc_vector(SexpType::List, count))?;
        let guard = Protect::new(host, data);
        for (i, arg) in args.iter().enumerate() {
            host.set_vector_elt(data, i, arg.value());
        }

        let names = safe(host.alloc_vector(SexpType::String, count))?;
        host.set_names(data, names);
        for (i, arg) in args.iter().enumerate() {
            if let Err(err) = safe(host.set_string_elt(names, i, arg.name())) {
                tracing::debug!(key = arg.name(), position = i, "named list construction torn down");
                return Err(err);
            }
        }

        Ok(Self::from_protected(guard, count))
    }

    /// Value paired with the first name equal to `key`, or nil.
    pub fn by_name(&self, key: &str) -> GcHandle {
        match self.find(key) {
            Some(pos) => self.get(pos),
            None => self.host().nil(),
        }
    }

    /// Appends `arg.value()` under the name `arg.name()`.
    ///
    /// The first named push on an unnamed list gives the earlier elements
    /// empty names. On failure the list keeps its previous length.
    pub fn push_back_named(&mut self, arg: &NamedArg) -> Result<(), VectorError> {
        if self.len() >= self.capacity() {
            self.grow()?;
        }
        // Park the value in the spare slot so the protected store keeps it
        // alive while the key is encoded.
        let host = self.host();
        ListKind::write(host, self.data(), self.len(), arg.value());
        let names = self.ensure_names()?;
        safe(host.set_string_elt(names, self.len(), arg.name()))?;
        self.push_back(arg.value())
    }
}
