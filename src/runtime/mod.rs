//! Host runtime interop core.
//!
//! # Ownership Model
//! Objects are owned by the host's collector, never by Rust. Rust code holds
//! [`gc::GcHandle`]s, which are plain indices; an object stays alive only
//! while it is reachable from a protected root. [`protect::Protect`] is the
//! only way this crate registers such a root, and containers in [`vector`]
//! hold one guard for their backing store.
//!
//! [`heap_runtime::HeapRuntime`] is the in-process host used by tests and
//! benchmarks; other embeddings implement [`host::Host`].

pub mod config;
pub mod error;
pub mod gc;
pub mod heap_runtime;
pub mod host;
pub mod leak_detector;
pub mod named_arg;
pub mod protect;
pub mod vector;
