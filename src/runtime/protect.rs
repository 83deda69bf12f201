//! Scoped protection of host objects.
//!
//! A [`Protect`] owns exactly one protection token and gives it back when it
//! is dropped, on every exit path including `?` early returns. Replacing a
//! guard stored in a field (`self.protect = Protect::new(..)`) therefore
//! acquires the new token before the old one is released.

use std::fmt;

use crate::runtime::{
    error::{HostError, VectorError},
    gc::{GcHandle, ProtectToken},
    host::Host,
};

/// Keeps one host object reachable for as long as the guard lives.
pub struct Protect<'h, H: Host + ?Sized> {
    host: &'h H,
    sexp: GcHandle,
    token: Option<ProtectToken>,
}

impl<'h, H: Host + ?Sized> Protect<'h, H> {
    /// Registers `sexp` with the host collector.
    pub fn new(host: &'h H, sexp: GcHandle) -> Self {
        let token = host.protect(sexp);
        Self {
            host,
            sexp,
            token: Some(token),
        }
    }

    /// The protected object.
    pub fn sexp(&self) -> GcHandle {
        self.sexp
    }

    pub fn host(&self) -> &'h H {
        self.host
    }
}

impl<H: Host + ?Sized> Drop for Protect<'_, H> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.host.release(token);
        }
    }
}

impl<H: Host + ?Sized> fmt::Debug for Protect<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protect")
            .field("sexp", &self.sexp)
            .field("token", &self.token)
            .finish()
    }
}

/// Unwind boundary around one host allocation call.
///
/// Converts the host's control-flow signal into a [`VectorError`] so it
/// propagates with `?`; guards held by the caller are released as the error
/// travels up.
pub fn safe<T>(call: Result<T, HostError>) -> Result<T, VectorError> {
    call.map_err(|err| {
        tracing::debug!(error = %err, "host call unwound");
        VectorError::Host(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{heap_runtime::HeapRuntime, host::SexpType};

    #[test]
    fn guard_releases_on_drop() {
        let rt = HeapRuntime::new();
        let x = rt.scalar_real(1.0).unwrap();
        {
            let guard = Protect::new(&rt, x);
            assert_eq!(guard.sexp(), x);
            assert_eq!(rt.live_tokens(), 1);
            rt.collect();
            assert!(rt.is_live(x));
        }
        assert_eq!(rt.live_tokens(), 0);
        rt.collect();
        assert!(!rt.is_live(x));
    }

    #[test]
    fn replacing_a_guard_keeps_one_token() {
        let rt = HeapRuntime::new();
        let a = rt.scalar_real(1.0).unwrap();
        let mut guard = Protect::new(&rt, a);
        assert_eq!(guard.sexp(), a);
        let b = rt.scalar_real(2.0).unwrap();
        guard = Protect::new(&rt, b);
        assert_eq!(rt.live_tokens(), 1);
        rt.collect();
        assert!(rt.is_live(guard.sexp()));
        assert!(!rt.is_live(a));
    }

    #[test]
    fn guard_released_on_early_return() {
        fn build(rt: &HeapRuntime) -> Result<GcHandle, VectorError> {
            let list = safe(rt.alloc_vector(SexpType::List, 1))?;
            let _guard = Protect::new(rt, list);
            safe(rt.alloc_vector(SexpType::String, 1))?;
            Ok(list)
        }

        let rt = HeapRuntime::new();
        rt.fail_after(2);
        let err = build(&rt).unwrap_err();
        assert!(matches!(err, VectorError::Host(HostError::Unwind { .. })));
        assert_eq!(rt.live_tokens(), 0);
    }
}
