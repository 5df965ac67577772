//! Errors raised while bridging streams.
//!
//! A bridge callback cannot return a Rust error to the engine: it reports
//! `0` bytes or a `-1` offset. The underlying cause is recorded here, one
//! per thread, and can be picked up by the caller once the native call
//! returns.

use crate::text::TextEncoding;
use docfilters_rt::NativeError;
use std::cell::RefCell;
use std::fmt::Display;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridged stream {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("bridged stream panicked during {0}")]
    Panicked(&'static str),
    #[error("bridged stream is already closed")]
    Closed,
    #[error("unknown seek origin {0}")]
    InvalidOrigin(u32),
    #[error("stream table pointer is null")]
    NullTable,
    #[error("{len} bytes is not a whole number of {width}-byte code units")]
    PartialCodeUnit { len: usize, width: usize },
    #[error("bytes are not valid {0}")]
    InvalidText(TextEncoding),
    #[error(transparent)]
    Native(#[from] NativeError),
}

impl From<BridgeError> for io::Error {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Io { source, .. } => source,
            BridgeError::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            other => io::Error::other(other),
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Records the cause of the latest failed bridge callback on this thread.
pub(crate) fn update_last_error<E: Display>(err: E) {
    LAST_ERROR.with(|prev| {
        *prev.borrow_mut() = Some(err.to_string());
    });
}

/// Retrieves the most recent bridge failure, clearing it in the process.
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|prev| prev.borrow_mut().take())
}

/// Length in bytes of the last error including a NUL terminator, zero
/// when there is none.
pub fn last_error_length() -> usize {
    LAST_ERROR.with(|prev| match *prev.borrow() {
        Some(ref err) => err.len() + 1,
        None => 0,
    })
}
