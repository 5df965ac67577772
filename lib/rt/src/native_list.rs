//! Enumerables backed by a native create / next / close triple.

use crate::enumerate::{Enumerable, Enumerator};
use crate::error::{Error, NativeError, Result, check_status};
use crate::ffi::{CreateEnumeratorFn, ErrorControlBlock, NextItemFn, ReleaseFn, ReturnCode};
use crate::handle::{HandleGuard, RawHandle, Release};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The three native operations behind one kind of list.
///
/// The owner (document, page, ...) is captured by the implementation.
pub trait ListSource {
    type Handle: RawHandle;
    type Item;

    fn create(&self) -> Result<Self::Handle, NativeError>;

    /// `Ok(None)` is ordinary exhaustion.
    fn next(&self, handle: Self::Handle) -> Result<Option<Self::Item>, NativeError>;

    fn close(&self, handle: Self::Handle) -> Result<(), NativeError>;
}

fn fetch_item<T: Default>(
    function: &'static str,
    call: impl FnOnce(&mut T, &mut ErrorControlBlock) -> ReturnCode,
) -> Result<Option<T>, NativeError> {
    let mut ecb = ErrorControlBlock::new();
    let mut item = T::default();
    let code = check_status(call(&mut item, &mut ecb), &ecb, function)?;
    Ok(if code.is_no_more() { None } else { Some(item) })
}

/// A [`ListSource`] made of closures shaped like the native entry points.
pub struct FnListSource<H, T, C, N, X> {
    create: C,
    next: N,
    close: X,
    _marker: std::marker::PhantomData<fn(H) -> T>,
}

impl<H, T, C, N, X> FnListSource<H, T, C, N, X>
where
    H: RawHandle,
    T: Default,
    C: Fn(&mut H, &mut ErrorControlBlock) -> ReturnCode,
    N: Fn(H, &mut T, &mut ErrorControlBlock) -> ReturnCode,
    X: Fn(H, &mut ErrorControlBlock) -> ReturnCode,
{
    pub fn new(create: C, next: N, close: X) -> Self {
        Self {
            create,
            next,
            close,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<H, T, C, N, X> ListSource for FnListSource<H, T, C, N, X>
where
    H: RawHandle,
    T: Default,
    C: Fn(&mut H, &mut ErrorControlBlock) -> ReturnCode,
    N: Fn(H, &mut T, &mut ErrorControlBlock) -> ReturnCode,
    X: Fn(H, &mut ErrorControlBlock) -> ReturnCode,
{
    type Handle = H;
    type Item = T;

    fn create(&self) -> Result<H, NativeError> {
        let mut ecb = ErrorControlBlock::new();
        let mut handle = H::EMPTY;
        check_status((self.create)(&mut handle, &mut ecb), &ecb, "create")?;
        Ok(handle)
    }

    fn next(&self, handle: H) -> Result<Option<T>, NativeError> {
        fetch_item("next", |item, ecb| (self.next)(handle, item, ecb))
    }

    fn close(&self, handle: H) -> Result<(), NativeError> {
        let mut ecb = ErrorControlBlock::new();
        check_status((self.close)(handle, &mut ecb), &ecb, "close").map(drop)
    }
}

/// A [`ListSource`] calling raw engine entry points, such as the
/// `IGR_Subfiles_*` family.
pub struct NativeListFns<O, H, T> {
    owner: O,
    create: CreateEnumeratorFn<O, H>,
    next: NextItemFn<H, T>,
    close: ReleaseFn<H>,
    names: [&'static str; 3],
}

impl<O: Copy, H: RawHandle, T: Default> NativeListFns<O, H, T> {
    /// # Safety
    ///
    /// The three functions must belong together, accept `owner` and the
    /// handles produced by `create`, and fully initialize the item when
    /// `next` returns OK.
    pub unsafe fn new(
        owner: O,
        create: CreateEnumeratorFn<O, H>,
        next: NextItemFn<H, T>,
        close: ReleaseFn<H>,
    ) -> Self {
        Self {
            owner,
            create,
            next,
            close,
            names: ["create", "next", "close"],
        }
    }

    /// Native symbol names used in error messages, in create / next / close order.
    pub fn with_names(mut self, create: &'static str, next: &'static str, close: &'static str) -> Self {
        self.names = [create, next, close];
        self
    }
}

impl<O: Copy, H: RawHandle, T: Default> ListSource for NativeListFns<O, H, T> {
    type Handle = H;
    type Item = T;

    fn create(&self) -> Result<H, NativeError> {
        let mut ecb = ErrorControlBlock::new();
        let mut handle = H::EMPTY;
        trace!(function = self.names[0], "opening native enumerator");
        // SAFETY: covered by the constructor's contract.
        let code = unsafe { (self.create)(self.owner, &mut handle, &mut ecb) };
        check_status(code, &ecb, self.names[0])?;
        Ok(handle)
    }

    fn next(&self, handle: H) -> Result<Option<T>, NativeError> {
        fetch_item(self.names[1], |item, ecb| {
            // SAFETY: covered by the constructor's contract.
            unsafe { (self.next)(handle, item, ecb) }
        })
    }

    fn close(&self, handle: H) -> Result<(), NativeError> {
        let mut ecb = ErrorControlBlock::new();
        trace!(function = self.names[2], ?handle, "closing native enumerator");
        // SAFETY: covered by the constructor's contract.
        let code = unsafe { (self.close)(handle, &mut ecb) };
        check_status(code, &ecb, self.names[2]).map(drop)
    }
}

/// Closes a native enumerator handle through its source.
pub struct CloseWith<S>(Arc<S>);

impl<S: ListSource> Release<S::Handle> for CloseWith<S> {
    fn release(&mut self, handle: S::Handle) -> Result<(), NativeError> {
        self.0.close(handle)
    }
}

/// The [`Enumerable`] face of a [`ListSource`].
pub struct NativeListEnumerable<S> {
    source: Arc<S>,
}

impl<S: ListSource> NativeListEnumerable<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S> fmt::Debug for NativeListEnumerable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeListEnumerable").finish_non_exhaustive()
    }
}

impl<S> Enumerable for NativeListEnumerable<S>
where
    S: ListSource,
    S::Item: Clone,
{
    type Item = S::Item;
    type Enumerator<'a>
        = NativeListEnumerator<S>
    where
        Self: 'a;

    fn enumerator(&self) -> Result<Self::Enumerator<'_>> {
        let handle = self.source.create()?;
        trace!(?handle, "native enumerator opened");
        Ok(NativeListEnumerator {
            guard: HandleGuard::new(handle, CloseWith(Arc::clone(&self.source))),
            current: None,
            exhausted: handle.is_empty(),
        })
    }
}

/// Cursor over one open native enumerator.
///
/// Once the engine reports NO_MORE the cursor never calls `next` again.
/// The native handle is closed exactly once, when the cursor is dropped.
pub struct NativeListEnumerator<S: ListSource> {
    guard: HandleGuard<S::Handle, CloseWith<S>>,
    current: Option<S::Item>,
    exhausted: bool,
}

impl<S: ListSource> NativeListEnumerator<S> {
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl<S> Enumerator for NativeListEnumerator<S>
where
    S: ListSource,
    S::Item: Clone,
{
    type Item = S::Item;

    fn advance(&mut self) -> Result<bool> {
        self.current = None;
        if self.exhausted {
            return Ok(false);
        }
        let handle = self.guard.get();
        match self.guard.releaser().0.next(handle)? {
            Some(item) => {
                self.current = Some(item);
                Ok(true)
            }
            None => {
                trace!(?handle, "native enumerator exhausted");
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn current(&self) -> Result<S::Item> {
        self.current.clone().ok_or(Error::NotPositioned)
    }
}

impl<S: ListSource> fmt::Debug for NativeListEnumerator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeListEnumerator")
            .field("guard", &self.guard)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}
