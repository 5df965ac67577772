use crate::ffi::{ErrorControlBlock, ReturnCode};
use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A native call returned something other than success or exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}", .message, InFunction(.function))]
pub struct NativeError {
    code: ReturnCode,
    message: String,
    function: Option<&'static str>,
}

struct InFunction<'a>(&'a Option<&'static str>);

impl fmt::Display for InFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(function) => write!(f, " in {function}"),
            None => Ok(()),
        }
    }
}

impl NativeError {
    pub fn new(code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            function: None,
        }
    }

    /// Builds the error from the engine's error block, falling back to
    /// `"Error <code>"` when the block carries no text.
    pub fn from_block(code: ReturnCode, ecb: &ErrorControlBlock) -> Self {
        let message = ecb
            .message()
            .unwrap_or_else(|| format!("Error {}", code.0));
        Self::new(code, message)
    }

    pub fn in_function(mut self, function: &'static str) -> Self {
        self.function = Some(function);
        self
    }

    pub fn code(&self) -> ReturnCode {
        self.code
    }

    /// The message without the `" in <function>"` suffix.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn function(&self) -> Option<&'static str> {
        self.function
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Native(#[from] NativeError),
    #[error("index {index} is out of range for a sequence of {len} elements")]
    OutOfRange { index: i64, len: usize },
    #[error("enumerator is not positioned on an element")]
    NotPositioned,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("string of {len} code units does not fit a buffer of {capacity}")]
    StringTooLong { len: usize, capacity: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The native status behind this error, if it came from the engine.
    pub fn native_code(&self) -> Option<ReturnCode> {
        match self {
            Self::Native(err) => Some(err.code()),
            _ => None,
        }
    }
}

/// Turns a native status into a result.
///
/// `OK` and `NO_MORE` both pass through so callers can tell them apart;
/// anything else becomes a [`NativeError`] carrying the block's message and
/// `function`.
pub fn check_status(
    code: ReturnCode,
    ecb: &ErrorControlBlock,
    function: &'static str,
) -> Result<ReturnCode, NativeError> {
    if !code.is_failure() {
        return Ok(code);
    }
    Err(NativeError::from_block(code, ecb).in_function(function))
}

/// Like [`check_status`], but an explicit `message` wins over the block's.
pub fn check_status_with(
    code: ReturnCode,
    ecb: &ErrorControlBlock,
    function: &'static str,
    message: &str,
) -> Result<ReturnCode, NativeError> {
    if !code.is_failure() {
        return Ok(code);
    }
    if message.is_empty() {
        return check_status(code, ecb, function);
    }
    Err(NativeError::new(code, message).in_function(function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn success_and_exhaustion_pass() {
        let ecb = ErrorControlBlock::new();
        assert_eq!(check_status(ReturnCode::OK, &ecb, "f"), Ok(ReturnCode::OK));
        assert_eq!(
            check_status(ReturnCode::NO_MORE, &ecb, "f"),
            Ok(ReturnCode::NO_MORE)
        );
    }

    #[test]
    fn block_message_is_used() {
        let mut ecb = ErrorControlBlock::new();
        ecb.set_message("bad password");
        let err = check_status(ReturnCode::PASSWORD, &ecb, "IGR_Open_File").unwrap_err();
        assert_eq!(err.code(), ReturnCode::PASSWORD);
        assert_eq!(err.message(), "bad password");
        assert_eq!(err.to_string(), "bad password in IGR_Open_File");
    }

    #[test]
    fn blank_block_falls_back_to_code() {
        let ecb = ErrorControlBlock::new();
        let err = check_status(ReturnCode(13), &ecb, "IGR_Get_Page").unwrap_err();
        assert_eq!(err.to_string(), "Error 13 in IGR_Get_Page");
    }

    #[test]
    fn explicit_message_wins() {
        let mut ecb = ErrorControlBlock::new();
        ecb.set_message("from engine");
        let err = check_status_with(ReturnCode::ERROR, &ecb, "open", "from caller").unwrap_err();
        assert_eq!(err.to_string(), "from caller in open");

        let err = check_status_with(ReturnCode::ERROR, &ecb, "open", "").unwrap_err();
        assert_eq!(err.to_string(), "from engine in open");
    }

    #[test]
    fn without_function() {
        let err = NativeError::new(ReturnCode::NOT_FOUND, "missing");
        assert_eq!(err.to_string(), "missing");
        assert_eq!(err.function(), None);

        let err: Error = err.into();
        assert_eq!(err.native_code(), Some(ReturnCode::NOT_FOUND));
        assert_eq!(err.to_string(), "missing");
    }
}
