//! Scoped ownership of native handles.

use crate::error::{NativeError, check_status};
use crate::ffi::{ErrorControlBlock, ReleaseFn};
use std::fmt;
use std::mem;
use std::ptr;
use tracing::{debug, trace};

/// A value the engine uses to identify one of its objects.
///
/// `EMPTY` (zero or null) means "no object".
pub trait RawHandle: Copy + PartialEq + fmt::Debug {
    const EMPTY: Self;

    fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

macro_rules! integer_handles {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RawHandle for $ty {
                const EMPTY: Self = 0;
            }
        )*
    };
}

integer_handles!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T> RawHandle for *mut T {
    const EMPTY: Self = ptr::null_mut();

    fn is_empty(&self) -> bool {
        self.is_null()
    }
}

impl<T> RawHandle for *const T {
    const EMPTY: Self = ptr::null();

    fn is_empty(&self) -> bool {
        self.is_null()
    }
}

/// How a handle gets handed back to the engine.
pub trait Release<H> {
    fn release(&mut self, handle: H) -> Result<(), NativeError>;
}

impl<H, F> Release<H> for F
where
    F: FnMut(H) -> Result<(), NativeError>,
{
    fn release(&mut self, handle: H) -> Result<(), NativeError> {
        self(handle)
    }
}

/// Releases through a native entry point such as `IGR_Close_File`.
#[derive(Clone, Copy)]
pub struct NativeRelease<H> {
    func: ReleaseFn<H>,
    name: &'static str,
}

impl<H> NativeRelease<H> {
    /// # Safety
    ///
    /// `func` must accept every non-empty handle the guard will own, and
    /// `name` should be the native symbol so failures can be traced back.
    pub const unsafe fn new(func: ReleaseFn<H>, name: &'static str) -> Self {
        Self { func, name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<H: RawHandle> Release<H> for NativeRelease<H> {
    fn release(&mut self, handle: H) -> Result<(), NativeError> {
        let mut ecb = ErrorControlBlock::new();
        trace!(function = self.name, ?handle, "releasing native handle");
        // SAFETY: the constructor's contract covers every non-empty handle.
        let code = unsafe { (self.func)(handle, &mut ecb) };
        check_status(code, &ecb, self.name).map(drop)
    }
}

impl<H> fmt::Debug for NativeRelease<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeRelease").field(&self.name).finish()
    }
}

/// Owns one native handle and releases it when dropped.
///
/// A released handle is replaced by [`RawHandle::EMPTY`] before the release
/// runs, so a handle is handed back at most once even when the release
/// itself fails.
pub struct HandleGuard<H: RawHandle, R: Release<H> = NativeRelease<H>> {
    handle: H,
    release: R,
}

impl<H: RawHandle, R: Release<H>> HandleGuard<H, R> {
    pub fn new(handle: H, release: R) -> Self {
        Self { handle, release }
    }

    pub fn empty(release: R) -> Self {
        Self::new(H::EMPTY, release)
    }

    pub fn get(&self) -> H {
        self.handle
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn releaser(&self) -> &R {
        &self.release
    }

    /// Gives up ownership without releasing.
    pub fn steal(&mut self) -> H {
        mem::replace(&mut self.handle, H::EMPTY)
    }

    /// Releases the current handle, if any, and takes ownership of `handle`.
    ///
    /// Resetting to the handle already owned is a no-op.
    pub fn reset(&mut self, handle: H) -> Result<(), NativeError> {
        if handle == self.handle {
            return Ok(());
        }
        let previous = mem::replace(&mut self.handle, handle);
        if previous.is_empty() {
            return Ok(());
        }
        self.release.release(previous)
    }

    pub fn reset_empty(&mut self) -> Result<(), NativeError> {
        self.reset(H::EMPTY)
    }

    /// Empties the guard and exposes the slot so a native "create" call can
    /// write a new handle into it.
    pub fn attach(&mut self) -> Result<&mut H, NativeError> {
        self.reset_empty()?;
        Ok(&mut self.handle)
    }
}

impl<H: RawHandle, R: Release<H>> Drop for HandleGuard<H, R> {
    fn drop(&mut self) {
        let handle = self.handle;
        if let Err(err) = self.reset_empty() {
            debug!(?handle, error = %err, "ignoring failure while releasing native handle");
        }
    }
}

impl<H: RawHandle, R: Release<H>> fmt::Debug for HandleGuard<H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleGuard")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
