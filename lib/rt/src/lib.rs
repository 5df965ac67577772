//! Boundary runtime for the Document Filters native engine.
//!
//! The engine is an opaque library reached only through C-style entry
//! points. Everything it hands back is either a handle that must be
//! released exactly once, or a cursor that produces elements one at a
//! time. This crate gives those two shapes a safe Rust face:
//!
//! * [`HandleGuard`] owns a native handle and releases it on drop.
//! * [`Enumerable`] / [`Enumerator`] describe single-pass forward cursors,
//!   and [`EnumIter`] drives one as a regular [`Iterator`].
//! * [`IndexedLazySequence`], [`tree::Children`], [`tree::DeepTree`] and
//!   [`NativeListEnumerable`] are the concrete collections built on top.
//!
//! Every native call goes through [`check_status`], which turns a
//! [`ReturnCode`] plus its [`ErrorControlBlock`] into a [`NativeError`].

#![deny(
    dead_code,
    unused_imports,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]
#![warn(unsafe_op_in_unsafe_fn)]

pub mod cache;
pub mod enumerate;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod lazy;
pub mod native_list;
pub mod tree;
pub mod ucs2;

pub use crate::cache::MetadataCache;
pub use crate::enumerate::{
    BoxEnumerator, ContainerEnumerable, EnumIter, Enumerable, Enumerator, SliceEnumerator,
};
pub use crate::error::{Error, NativeError, Result, check_status, check_status_with};
pub use crate::ffi::{ECB_MESSAGE_LEN, ErrorControlBlock, ReturnCode};
pub use crate::handle::{HandleGuard, NativeRelease, RawHandle, Release};
pub use crate::lazy::IndexedLazySequence;
pub use crate::native_list::{FnListSource, ListSource, NativeListEnumerable, NativeListFns};
pub use crate::tree::{Children, DeepTree, DeepTreeEnumerator, Node, SiblingEnumerator};
