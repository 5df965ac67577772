//! Raw types shared with the native engine.
//!
//! Everything in here matches the engine's C header bit for bit, so the
//! layouts are `#[repr(C)]` / `#[repr(transparent)]` and must not change.

use libc::c_char;
use std::ffi::CStr;
use std::fmt;

/// Status value returned by every native entry point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ReturnCode(pub i32);

macro_rules! return_codes {
    ($($(#[$meta:meta])* $name:ident = $value:literal => $native:literal,)*) => {
        impl ReturnCode {
            $(
                $(#[$meta])*
                pub const $name: Self = Self($value);
            )*

            /// The engine's symbolic name for this code, if it is a known one.
            pub const fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some($native),)*
                    _ => None,
                }
            }
        }
    };
}

return_codes! {
    OK = 0 => "IGR_OK",
    OPEN_ERROR = 1 => "IGR_E_OPEN_ERROR",
    WRONG_TYPE = 2 => "IGR_E_WRONG_TYPE",
    IN_USE = 3 => "IGR_E_IN_USE",
    NOT_READABLE = 4 => "IGR_E_NOT_READABLE",
    PASSWORD = 5 => "IGR_E_PASSWORD",
    NOT_FOUND = 10 => "IGR_E_NOT_FOUND",
    WRITE_ERROR = 11 => "IGR_E_WRITE_ERROR",
    NOT_VALID_FOR_THIS_CLASS = 12 => "IGR_E_NOT_VALID_FOR_THIS_CLASS",
    ERROR = 13 => "IGR_E_ERROR",
    INVALID_HANDLE = 14 => "IGR_E_INVALID_HANDLE",
    INVALID_POINTER = 15 => "IGR_E_INVALID_POINTER",
    INVALID_PARAMETER = 16 => "IGR_E_INVALID_PARAMETER",
    FILE_CORRUPT = 17 => "IGR_E_FILE_CORRUPT",
    /// Ordinary exhaustion of a native cursor. Not a failure.
    NO_MORE = 19 => "IGR_NO_MORE",
    OUT_OF_MEMORY = 20 => "IGR_E_OUT_OF_MEMORY",
    BAD_ERROR = 21 => "IGR_E_BAD_ERROR",
    WRONG_THREAD = 22 => "IGR_E_WRONG_THREAD",
    TOO_MANY_HANDLES = 23 => "IGR_E_TOO_MANY_HANDLES",
    FONTS_NOT_FOUND = 24 => "IGR_E_FONTS_NOT_FOUND",
    VERSION_MISMATCH = 25 => "IGR_E_VERSION_MISMATCH",
    ACTION_NOT_SUPPORTED = 26 => "IGR_E_ACTION_NOT_SUPPORTED",
    CANCELLED = 27 => "IGR_CANCELLED",
}

impl ReturnCode {
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    pub const fn is_no_more(self) -> bool {
        self.0 == Self::NO_MORE.0
    }

    /// Neither success nor ordinary exhaustion.
    pub const fn is_failure(self) -> bool {
        !self.is_ok() && !self.is_no_more()
    }
}

impl fmt::Debug for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "ReturnCode({})", self.0),
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for ReturnCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ReturnCode> for i32 {
    fn from(code: ReturnCode) -> Self {
        code.0
    }
}

/// Size of the message buffer inside [`ErrorControlBlock`].
pub const ECB_MESSAGE_LEN: usize = 238;

/// Out-parameter filled in by the engine when a call fails.
#[derive(Clone)]
#[repr(C)]
pub struct ErrorControlBlock {
    pub msg: [c_char; ECB_MESSAGE_LEN],
    pub msg_id: i16,
}

impl ErrorControlBlock {
    pub const fn new() -> Self {
        Self {
            msg: [0; ECB_MESSAGE_LEN],
            msg_id: 0,
        }
    }

    /// The NUL-terminated message, or `None` when the engine left it blank.
    ///
    /// A buffer without a terminator is read up to its full length.
    pub fn message(&self) -> Option<String> {
        let bytes = self.message_bytes();
        let text = match CStr::from_bytes_until_nul(&bytes) {
            Ok(text) => text.to_string_lossy().into_owned(),
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Stores `message`, truncated so that the terminator always fits.
    pub fn set_message(&mut self, message: &str) {
        self.clear();
        let len = message.len().min(ECB_MESSAGE_LEN - 1);
        for (slot, byte) in self.msg.iter_mut().zip(&message.as_bytes()[..len]) {
            *slot = *byte as c_char;
        }
    }

    pub fn clear(&mut self) {
        self.msg = [0; ECB_MESSAGE_LEN];
        self.msg_id = 0;
    }

    pub fn as_mut_ptr(&mut self) -> *mut Self {
        self
    }

    fn message_bytes(&self) -> [u8; ECB_MESSAGE_LEN] {
        let mut bytes = [0u8; ECB_MESSAGE_LEN];
        for (byte, ch) in bytes.iter_mut().zip(self.msg.iter()) {
            *byte = *ch as u8;
        }
        bytes
    }
}

impl Default for ErrorControlBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorControlBlock")
            .field("msg", &self.message())
            .field("msg_id", &self.msg_id)
            .finish()
    }
}

/// Native operation releasing one handle.
pub type ReleaseFn<H> = unsafe extern "C" fn(handle: H, ecb: *mut ErrorControlBlock) -> ReturnCode;

/// Native operation opening an enumerator over `owner`.
pub type CreateEnumeratorFn<O, H> =
    unsafe extern "C" fn(owner: O, out: *mut H, ecb: *mut ErrorControlBlock) -> ReturnCode;

/// Native operation fetching the next item from an enumerator.
pub type NextItemFn<H, T> =
    unsafe extern "C" fn(handle: H, out: *mut T, ecb: *mut ErrorControlBlock) -> ReturnCode;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn return_code_names() {
        assert_eq!(ReturnCode::NO_MORE.name(), Some("IGR_NO_MORE"));
        assert_eq!(ReturnCode(6).name(), None);
        assert_eq!(ReturnCode::PASSWORD.to_string(), "IGR_E_PASSWORD (5)");
        assert_eq!(ReturnCode(99).to_string(), "99");
        assert_eq!(format!("{:?}", ReturnCode(42)), "ReturnCode(42)");
    }

    #[test]
    fn return_code_classes() {
        assert!(ReturnCode::OK.is_ok());
        assert!(ReturnCode::NO_MORE.is_no_more());
        assert!(!ReturnCode::NO_MORE.is_failure());
        assert!(ReturnCode::CANCELLED.is_failure());
    }

    #[test]
    fn message_round_trip() {
        let mut ecb = ErrorControlBlock::new();
        assert_eq!(ecb.message(), None);

        ecb.set_message("file is encrypted");
        assert_eq!(ecb.message().as_deref(), Some("file is encrypted"));

        ecb.clear();
        assert_eq!(ecb.message(), None);
    }

    #[test]
    fn long_messages_keep_their_terminator() {
        let mut ecb = ErrorControlBlock::new();
        let long = "x".repeat(ECB_MESSAGE_LEN * 2);
        ecb.set_message(&long);
        assert_eq!(ecb.message().map(|m| m.len()), Some(ECB_MESSAGE_LEN - 1));
        assert_eq!(ecb.msg[ECB_MESSAGE_LEN - 1], 0);
    }

    #[test]
    fn unterminated_buffer_is_read_in_full() {
        let mut ecb = ErrorControlBlock::new();
        ecb.msg = [b'a' as c_char; ECB_MESSAGE_LEN];
        assert_eq!(ecb.message().map(|m| m.len()), Some(ECB_MESSAGE_LEN));
    }
}
