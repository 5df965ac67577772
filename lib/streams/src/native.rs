use crate::bridge::{CallingConvention, Ownership, RawStream, RawStreamCdecl, RawStreamTable, record_failure};
use crate::error::{BridgeError, take_last_error};
use crate::stream::SeekOrigin;
use docfilters_rt::{ErrorControlBlock, ReturnCode, check_status};
use libc::c_void;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ptr::NonNull;
use tracing::trace;

/// A stream table received from the engine, read through `std::io`.
///
/// When the table is [`Ownership::Owned`] its `close` callback runs on
/// drop.
pub struct NativeStream {
    table: NonNull<c_void>,
    calling_convention: CallingConvention,
    ownership: Ownership,
}

impl NativeStream {
    /// # Safety
    ///
    /// `table` must point to a live table of the layout named by
    /// `calling_convention`, and stay live for as long as the returned
    /// value does (or until its `close` runs, when owned).
    pub unsafe fn from_raw(
        table: *mut c_void,
        calling_convention: CallingConvention,
        ownership: Ownership,
    ) -> Result<Self, BridgeError> {
        let table = NonNull::new(table).ok_or_else(|| record_failure(BridgeError::NullTable))?;
        Ok(Self {
            table,
            calling_convention,
            ownership,
        })
    }

    fn table(&self) -> &dyn RawStreamTable {
        // SAFETY: the constructor's contract ties the layout to the
        // calling convention and keeps the table alive.
        match self.calling_convention {
            CallingConvention::System => unsafe {
                self.table.cast::<RawStream>().as_ref() as &dyn RawStreamTable
            },
            CallingConvention::Cdecl => unsafe { self.table.cast::<RawStreamCdecl>().as_ref() },
        }
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.table.as_ptr()
    }

    /// Calls the table's `open` callback.
    pub fn open(&mut self) -> Result<(), BridgeError> {
        // SAFETY: see `table`.
        let code = ReturnCode(unsafe { self.table().call_open() } as i32);
        let mut ecb = ErrorControlBlock::new();
        if code.is_failure() {
            if let Some(message) = take_last_error() {
                ecb.set_message(&message);
            }
        }
        check_status(code, &ecb, "open")?;
        Ok(())
    }

    fn failure(op: &'static str) -> io::Error {
        let message = take_last_error().unwrap_or_else(|| format!("native stream {op} failed"));
        io::Error::other(message)
    }
}

impl Read for NativeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        if size == 0 {
            return Ok(0);
        }
        // SAFETY: `buf` is valid for `size` bytes of writes.
        let read = unsafe { self.table().call_read(buf.as_mut_ptr().cast(), size) };
        Ok((read as usize).min(buf.len()))
    }
}

impl Write for NativeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let size = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        if size == 0 {
            return Ok(0);
        }
        // SAFETY: `buf` is valid for `size` bytes of reads.
        let written = unsafe { self.table().call_write(buf.as_ptr().cast(), size) };
        Ok((written as usize).min(buf.len()))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for NativeStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds i64")
                })?,
                SeekOrigin::Begin,
            ),
            SeekFrom::Current(offset) => (offset, SeekOrigin::Current),
            SeekFrom::End(offset) => (offset, SeekOrigin::End),
        };
        // SAFETY: see `table`.
        let position = unsafe { self.table().call_seek(offset, origin as u32) };
        u64::try_from(position).map_err(|_| Self::failure("seek"))
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owned {
            trace!(table = ?self.table, "closing native stream");
            // SAFETY: the table is live until this call, which may free it.
            unsafe { self.table().call_close() }
        }
    }
}

impl fmt::Debug for NativeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeStream")
            .field("table", &self.table)
            .field("calling_convention", &self.calling_convention)
            .field("ownership", &self.ownership)
            .finish()
    }
}
