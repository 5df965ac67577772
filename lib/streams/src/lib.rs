//! Local byte streams, exposed to the Document Filters engine.
//!
//! The engine reads documents through one fixed callback table
//! (`open`/`read`/`seek`/`write`/`close` plus a context pointer). This crate
//! lets any [`BridgeStream`] sit behind that table:
//!
//! * [`StreamBinding`] builds the table for a stream, either taking
//!   ownership of it or borrowing it for a Rust lifetime.
//! * [`local`] and [`memory`] provide the stream kinds bindings are
//!   usually made from.
//! * [`NativeStream`] goes the other way and reads a table handed out by
//!   the engine through [`std::io::Read`] and [`std::io::Seek`].
//! * [`text`] writes and reads text in the engine's code-page encodings.

#![deny(
    dead_code,
    unused_imports,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]
#![warn(unsafe_op_in_unsafe_fn)]

#[macro_use]
mod macros;

pub mod bridge;
pub mod error;
pub mod local;
pub mod memory;
pub mod native;
pub mod stream;
pub mod text;

pub use crate::bridge::{
    BridgeOptions, CallingConvention, MAKE_STREAM_USECDECL, Ownership, RawStream, RawStreamCdecl,
    RawStreamTable, StreamBinding,
};
pub use crate::error::{BridgeError, last_error_length, take_last_error};
pub use crate::local::{BufferedFile, ReadStream, ReadWriteStream};
pub use crate::memory::{CHUNK_ALIGNMENT, MemoryStream, SliceStream, SliceStreamMut};
pub use crate::native::NativeStream;
pub use crate::stream::{BridgeStream, SeekOrigin};
pub use crate::text::{TextEncoding, WireOrder, decode_text, encode_text};
