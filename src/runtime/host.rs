//! Primitives consumed from the embedding runtime.
//!
//! Everything in [`crate::runtime::vector`] talks to the host through the
//! [`Host`] trait only. [`HeapRuntime`](crate::runtime::heap_runtime::HeapRuntime)
//! is the in-process implementation used by the tests and benchmarks.
//!
//! # Allocation discipline
//! Any method returning `Result<_, HostError>` may allocate, and any
//! allocation may run a collection cycle first. Callers must hold a
//! protection token (directly or through a protected parent) for every handle
//! they still need before calling one of them.

use std::{fmt, rc::Rc};

use crate::runtime::{
    error::HostError,
    gc::{GcHandle, ProtectToken},
};

/// Dynamic tag reported by the host for a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SexpType {
    Nil,
    Char,
    String,
    Real,
    Integer,
    List,
}

impl SexpType {
    /// Returns the user-facing type label used in error messages.
    ///
    /// These labels are user-visible and are expected to remain stable.
    pub fn type_name(self) -> &'static str {
        match self {
            SexpType::Nil => "NULL",
            SexpType::Char => "char",
            SexpType::String => "character",
            SexpType::Real => "double",
            SexpType::Integer => "integer",
            SexpType::List => "list",
        }
    }
}

impl fmt::Display for SexpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The collaborator interface of an embedding, garbage-collected runtime.
///
/// Methods take `&self`: the host is a shared, single-threaded service and
/// handles interior mutability itself.
pub trait Host {
    /// The absence sentinel.
    fn nil(&self) -> GcHandle;

    /// Returns the dynamic tag of `x`.
    fn type_of(&self, x: GcHandle) -> SexpType;

    /// Returns the vector length of `x` (`0` for nil).
    fn xlength(&self, x: GcHandle) -> usize;

    /// Allocates a fresh vector of `count` slots.
    fn alloc_vector(&self, tag: SexpType, count: usize) -> Result<GcHandle, HostError>;

    /// Returns a new vector of `count` slots holding the first
    /// `min(xlength(x), count)` elements of `x`. Attributes are not copied.
    fn resize_vector(&self, x: GcHandle, count: usize) -> Result<GcHandle, HostError>;

    /// Registers `x` as reachable until the returned token is released.
    fn protect(&self, x: GcHandle) -> ProtectToken;

    /// Releases a token obtained from [`Host::protect`].
    fn release(&self, token: ProtectToken);

    /// Reads slot `index` of the list `x`.
    fn vector_elt(&self, x: GcHandle, index: usize) -> GcHandle;

    /// Writes slot `index` of the list `x`.
    fn set_vector_elt(&self, x: GcHandle, index: usize, value: GcHandle);

    /// Decodes slot `index` of the string vector `x` as UTF-8; `None` is NA.
    fn string_elt(&self, x: GcHandle, index: usize) -> Option<Rc<str>>;

    /// Encodes `text` and stores it at slot `index` of the string vector `x`.
    fn set_string_elt(&self, x: GcHandle, index: usize, text: &str) -> Result<(), HostError>;

    /// Returns the `names` attribute of `x`, or nil when absent.
    fn names(&self, x: GcHandle) -> GcHandle;

    /// Sets (or, with nil, removes) the `names` attribute of `x`.
    fn set_names(&self, x: GcHandle, names: GcHandle);
}
