pub mod runtime;

pub use runtime::{
    config::HeapConfig,
    error::{ConfigError, HostError, VectorError},
    gc::GcHandle,
    heap_runtime::HeapRuntime,
    host::{Host, SexpType},
    named_arg::NamedArg,
    protect::{Protect, safe},
    vector::{ElementKind, Iter, List, ListKind, Proxy, Vector},
};
