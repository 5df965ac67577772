//! The native stream callback table and the bindings that fill it.
//!
//! A [`StreamBinding`] allocates two things: the table itself, and a
//! context block holding the bridged stream. The table's `context`
//! pointer refers to that block, and every callback is a trampoline
//! monomorphized for the stream type, so no dynamic dispatch happens on the
//! read/write path.
//!
//! The engine calls `close` when it is done with the stream. Whether that
//! drops the stream depends on [`Ownership`]: an owned stream is dropped,
//! a borrowed one is left to its owner. A binding still held by Rust closes
//! itself on drop. [`StreamBinding::into_raw`] hands the whole allocation
//! to the engine, whose `close` then frees it.

use crate::error::{BridgeError, update_last_error};
use crate::stream::BridgeStream;
use libc::c_void;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ptr::NonNull;
use tracing::trace;

/// Flag telling the engine's make-stream call that the callbacks use the
/// C calling convention.
pub const MAKE_STREAM_USECDECL: i32 = 0x1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// `extern "system"`, the engine's default.
    #[default]
    System,
    /// `extern "C"`.
    Cdecl,
}

impl CallingConvention {
    /// Flags for the engine's make-stream call.
    pub const fn make_stream_flags(self) -> i32 {
        match self {
            Self::System => 0,
            Self::Cdecl => MAKE_STREAM_USECDECL,
        }
    }
}

/// Whether closing the binding also drops the bridged stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    Owned,
    Borrowed,
}

/// Calls through a table without knowing its layout.
pub trait RawStreamTable {
    /// # Safety
    ///
    /// The table and its context must still be live.
    unsafe fn call_open(&self) -> u32;

    /// # Safety
    ///
    /// As for [`call_open`](Self::call_open); `buffer` must be valid for
    /// `size` bytes of writes.
    unsafe fn call_read(&self, buffer: *mut c_void, size: u32) -> u32;

    /// # Safety
    ///
    /// As for [`call_open`](Self::call_open).
    unsafe fn call_seek(&self, offset: i64, origin: u32) -> i64;

    /// # Safety
    ///
    /// As for [`call_open`](Self::call_open); `buffer` must be valid for
    /// `size` bytes of reads.
    unsafe fn call_write(&self, buffer: *const c_void, size: u32) -> u32;

    /// # Safety
    ///
    /// As for [`call_open`](Self::call_open). The table may be freed by this
    /// call and must not be used afterwards.
    unsafe fn call_close(&self);
}

declare_stream_table!(
    /// Stream table with `extern "system"` callbacks.
    RawStream,
    system,
    "system"
);

declare_stream_table!(
    /// Stream table with `extern "C"` callbacks.
    RawStreamCdecl,
    cdecl,
    "C"
);

enum Slot<S> {
    Owned(Box<S>),
    Borrowed(NonNull<S>),
    Closed,
}

/// A table that was handed to the engine and must be freed by `close`.
struct DetachedTable {
    table: *mut c_void,
    free: unsafe fn(*mut c_void),
}

/// What the table's `context` points at.
struct BridgeState<S> {
    slot: Slot<S>,
    detached: Option<DetachedTable>,
}

impl<S> BridgeState<S> {
    fn stream_mut(&mut self) -> io::Result<&mut S> {
        match &mut self.slot {
            Slot::Owned(stream) => Ok(&mut **stream),
            // SAFETY: the binding's lifetime keeps the borrow alive and
            // exclusive while the slot is not closed.
            Slot::Borrowed(stream) => Ok(unsafe { stream.as_mut() }),
            Slot::Closed => Err(BridgeError::Closed.into()),
        }
    }
}

unsafe fn free_boxed<T>(ptr: *mut c_void) {
    drop(unsafe { Box::from_raw(ptr.cast::<T>()) });
}

mod trampoline {
    use super::{BridgeState, Slot};
    use crate::error::{BridgeError, update_last_error};
    use crate::stream::{BridgeStream, SeekOrigin};
    use docfilters_rt::ReturnCode;
    use libc::c_void;
    use std::io;
    use std::mem;
    use std::panic::{self, AssertUnwindSafe};
    use std::slice;
    use tracing::{error, trace, warn};

    unsafe fn state<'s, S>(context: *mut c_void) -> Option<&'s mut BridgeState<S>> {
        unsafe { context.cast::<BridgeState<S>>().as_mut() }
    }

    /// Runs a stream call without letting a panic cross the boundary.
    fn guarded<R>(op: &'static str, failed: R, call: impl FnOnce() -> io::Result<R>) -> R {
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(Ok(value)) => value,
            Ok(Err(source)) => {
                warn!(op, error = %source, "bridged stream call failed");
                update_last_error(BridgeError::Io { op, source });
                failed
            }
            Err(_) => {
                error!(op, "bridged stream panicked");
                update_last_error(BridgeError::Panicked(op));
                failed
            }
        }
    }

    fn status(code: ReturnCode) -> u32 {
        code.0 as u32
    }

    pub(super) unsafe fn open<S: BridgeStream>(context: *mut c_void) -> u32 {
        let Some(state) = (unsafe { state::<S>(context) }) else {
            return status(ReturnCode::INVALID_POINTER);
        };
        trace!("bridge open");
        guarded("open", status(ReturnCode::OPEN_ERROR), || {
            state.stream_mut()?.open()?;
            Ok(status(ReturnCode::OK))
        })
    }

    pub(super) unsafe fn read<S: BridgeStream>(
        context: *mut c_void,
        buffer: *mut c_void,
        size: u32,
    ) -> u32 {
        let Some(state) = (unsafe { state::<S>(context) }) else {
            return 0;
        };
        if buffer.is_null() || size == 0 {
            return 0;
        }
        let buf = unsafe { slice::from_raw_parts_mut(buffer.cast::<u8>(), size as usize) };
        let read = guarded("read", 0, || {
            let read = state.stream_mut()?.read(buf)?;
            Ok(read.min(size as usize) as u32)
        });
        trace!(size, read, "bridge read");
        read
    }

    pub(super) unsafe fn seek<S: BridgeStream>(
        context: *mut c_void,
        offset: i64,
        origin: u32,
    ) -> i64 {
        let Some(state) = (unsafe { state::<S>(context) }) else {
            return -1;
        };
        let Some(origin) = SeekOrigin::from_raw(origin) else {
            warn!(origin, "unknown seek origin");
            update_last_error(BridgeError::InvalidOrigin(origin));
            return -1;
        };
        let position = guarded("seek", -1, || {
            let position = state.stream_mut()?.seek(offset, origin)?;
            i64::try_from(position)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "position exceeds i64"))
        });
        trace!(offset, ?origin, position, "bridge seek");
        position
    }

    pub(super) unsafe fn write<S: BridgeStream>(
        context: *mut c_void,
        buffer: *const c_void,
        size: u32,
    ) -> u32 {
        let Some(state) = (unsafe { state::<S>(context) }) else {
            return 0;
        };
        if buffer.is_null() || size == 0 {
            return 0;
        }
        let buf = unsafe { slice::from_raw_parts(buffer.cast::<u8>(), size as usize) };
        let written = guarded("write", 0, || {
            let written = state.stream_mut()?.write(buf)?;
            Ok(written.min(size as usize) as u32)
        });
        trace!(size, written, "bridge write");
        written
    }

    pub(super) unsafe fn close<S: BridgeStream>(context: *mut c_void) {
        let Some(state) = (unsafe { state::<S>(context) }) else {
            return;
        };
        match mem::replace(&mut state.slot, Slot::Closed) {
            Slot::Owned(stream) => {
                trace!("bridge close, dropping owned stream");
                guarded("close", (), move || {
                    drop(stream);
                    Ok(())
                });
            }
            Slot::Borrowed(_) => trace!("bridge close, stream stays with its owner"),
            Slot::Closed => {}
        }
        if let Some(detached) = state.detached.take() {
            trace!("freeing detached stream binding");
            // SAFETY: a detached binding gave up both allocations to us, and
            // nothing refers to them once `close` has been called.
            unsafe {
                drop(Box::from_raw(context.cast::<BridgeState<S>>()));
                (detached.free)(detached.table);
            }
        }
    }
}

/// Configuration shared by the bindings it creates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    calling_convention: CallingConvention,
}

impl BridgeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calling_convention(&mut self, calling_convention: CallingConvention) -> &mut Self {
        self.calling_convention = calling_convention;
        self
    }

    /// Binds `stream`, dropping it when the engine closes the table.
    pub fn bind_owned<'a, S: BridgeStream + 'a>(&self, stream: S) -> StreamBinding<'a, S> {
        StreamBinding::new(
            Slot::Owned(Box::new(stream)),
            Ownership::Owned,
            self.calling_convention,
        )
    }

    /// Binds `stream` for as long as the borrow lasts; closing leaves it
    /// untouched.
    pub fn bind_borrowed<'a, S: BridgeStream>(&self, stream: &'a mut S) -> StreamBinding<'a, S> {
        StreamBinding::new(
            Slot::Borrowed(NonNull::from(stream)),
            Ownership::Borrowed,
            self.calling_convention,
        )
    }
}

/// A local stream exposed through the native stream table.
pub struct StreamBinding<'a, S: BridgeStream> {
    table: NonNull<c_void>,
    state: NonNull<BridgeState<S>>,
    calling_convention: CallingConvention,
    ownership: Ownership,
    _stream: PhantomData<&'a mut S>,
}

impl<'a, S: BridgeStream + 'a> StreamBinding<'a, S> {
    /// [`BridgeOptions::bind_owned`] with default options.
    pub fn owned(stream: S) -> Self {
        BridgeOptions::new().bind_owned(stream)
    }

    /// [`BridgeOptions::bind_borrowed`] with default options.
    pub fn borrowed(stream: &'a mut S) -> Self {
        BridgeOptions::new().bind_borrowed(stream)
    }

    fn new(slot: Slot<S>, ownership: Ownership, calling_convention: CallingConvention) -> Self {
        let state = NonNull::from(Box::leak(Box::new(BridgeState {
            slot,
            detached: None,
        })));
        let context = state.as_ptr().cast::<c_void>();
        let table = match calling_convention {
            CallingConvention::System => {
                NonNull::from(Box::leak(Box::new(RawStream::for_stream::<S>(context)))).cast()
            }
            CallingConvention::Cdecl => {
                NonNull::from(Box::leak(Box::new(RawStreamCdecl::for_stream::<S>(context)))).cast()
            }
        };
        trace!(?calling_convention, ?ownership, "stream bound");
        Self {
            table,
            state,
            calling_convention,
            ownership,
            _stream: PhantomData,
        }
    }

    /// Pointer to the table, for the engine's make-stream call.
    pub fn as_ptr(&self) -> *mut c_void {
        self.table.as_ptr()
    }

    /// The table as a [`RawStream`], when it uses that layout.
    pub fn system_table(&self) -> Option<&RawStream> {
        match self.calling_convention {
            // SAFETY: the layout follows the calling convention.
            CallingConvention::System => Some(unsafe { self.table.cast::<RawStream>().as_ref() }),
            CallingConvention::Cdecl => None,
        }
    }

    /// The table as a [`RawStreamCdecl`], when it uses that layout.
    pub fn cdecl_table(&self) -> Option<&RawStreamCdecl> {
        match self.calling_convention {
            CallingConvention::Cdecl => {
                // SAFETY: the layout follows the calling convention.
                Some(unsafe { self.table.cast::<RawStreamCdecl>().as_ref() })
            }
            CallingConvention::System => None,
        }
    }

    pub fn table(&self) -> &dyn RawStreamTable {
        // SAFETY: the layout follows the calling convention.
        match self.calling_convention {
            CallingConvention::System => {
                unsafe { self.table.cast::<RawStream>().as_ref() as &dyn RawStreamTable }
            }
            CallingConvention::Cdecl => unsafe { self.table.cast::<RawStreamCdecl>().as_ref() },
        }
    }

    pub fn calling_convention(&self) -> CallingConvention {
        self.calling_convention
    }

    /// Flags for the engine's make-stream call.
    pub fn flags(&self) -> i32 {
        self.calling_convention.make_stream_flags()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether `close` has already run.
    pub fn is_closed(&self) -> bool {
        // SAFETY: the state outlives the binding unless it was detached,
        // which consumes the binding.
        matches!(unsafe { &self.state.as_ref().slot }, Slot::Closed)
    }

    /// Runs `close` from the Rust side.
    pub fn close(&mut self) {
        // SAFETY: the state is live; closing twice is a no-op.
        unsafe { trampoline::close::<S>(self.state.as_ptr().cast()) }
    }

    /// Takes an owned stream back, unless the engine already closed it.
    pub fn into_inner(self) -> Option<S> {
        // SAFETY: the state is live until `self` is dropped below.
        let slot = unsafe { &mut (*self.state.as_ptr()).slot };
        match mem::replace(slot, Slot::Closed) {
            Slot::Owned(stream) => Some(*stream),
            Slot::Borrowed(_) | Slot::Closed => None,
        }
    }

    fn free_table(&self) -> unsafe fn(*mut c_void) {
        match self.calling_convention {
            CallingConvention::System => free_boxed::<RawStream>,
            CallingConvention::Cdecl => free_boxed::<RawStreamCdecl>,
        }
    }
}

impl<S: BridgeStream + 'static> StreamBinding<'static, S> {
    /// Hands the table, the context and the stream over to the engine.
    ///
    /// The engine's call to `close` frees everything; until then the
    /// returned pointer stays valid.
    pub fn into_raw(self) -> *mut c_void {
        let this = ManuallyDrop::new(self);
        let detached = DetachedTable {
            table: this.table.as_ptr(),
            free: this.free_table(),
        };
        // SAFETY: the state is live and, with `this` never dropped, now
        // only reachable through the table.
        unsafe { (*this.state.as_ptr()).detached = Some(detached) };
        trace!("stream binding detached");
        this.table.as_ptr()
    }
}

impl<S: BridgeStream> Drop for StreamBinding<'_, S> {
    fn drop(&mut self) {
        let context = self.state.as_ptr().cast::<c_void>();
        // SAFETY: both allocations are still owned by this binding.
        unsafe {
            trampoline::close::<S>(context);
            drop(Box::from_raw(self.state.as_ptr()));
            (self.free_table())(self.table.as_ptr());
        }
    }
}

impl<S: BridgeStream> fmt::Debug for StreamBinding<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBinding")
            .field("table", &self.table)
            .field("calling_convention", &self.calling_convention)
            .field("ownership", &self.ownership)
            .finish_non_exhaustive()
    }
}

/// Records a failure that happened outside any callback, such as a bad
/// table handed to [`NativeStream`](crate::native::NativeStream).
pub(crate) fn record_failure(err: BridgeError) -> BridgeError {
    update_last_error(&err);
    err
}
