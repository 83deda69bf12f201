use crate::runtime::{
    error::VectorError,
    gc::GcHandle,
    host::{Host, SexpType},
};

/// Capability set a host vector type provides to [`Vector`](super::Vector).
///
/// `read` and `write` address one slot of the backing store. `fill_buf`
/// lets kinds whose slots need decoding batch that work for iteration; a
/// kind that leaves `buf` empty is read slot by slot through `read`.
pub trait ElementKind {
    /// Value handed out for one slot.
    type Elem: Copy;

    /// Host tag every backing store of this kind carries.
    const TYPE: SexpType;

    /// Accepts `candidate` only if the host reports [`Self::TYPE`] for it.
    fn validate<H: Host + ?Sized>(host: &H, candidate: GcHandle) -> Result<GcHandle, VectorError> {
        let actual = host.type_of(candidate);
        if actual != Self::TYPE {
            return Err(VectorError::TypeMismatch {
                expected: Self::TYPE,
                actual,
            });
        }
        Ok(candidate)
    }

    fn read<H: Host + ?Sized>(host: &H, data: GcHandle, index: usize) -> Self::Elem;

    fn write<H: Host + ?Sized>(host: &H, data: GcHandle, index: usize, value: Self::Elem);

    /// Value stored in slots that are allocated but hold nothing yet.
    fn empty<H: Host + ?Sized>(host: &H) -> Self::Elem;

    /// Decodes slots `pos..end` (or a prefix of them) into `buf`.
    fn fill_buf<H: Host + ?Sized>(
        _host: &H,
        _data: GcHandle,
        _pos: usize,
        _end: usize,
        _buf: &mut Vec<Self::Elem>,
    ) {
    }
}
