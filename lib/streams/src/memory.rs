use crate::stream::{BridgeStream, SeekOrigin, resolve_seek};
use std::fmt;
use std::io;
use tracing::trace;

/// Backing storage of a [`MemoryStream`] grows in multiples of this.
pub const CHUNK_ALIGNMENT: usize = 1024;

/// Read-only view of a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct SliceStream<'a> {
    data: &'a [u8],
    position: u64,
}

impl<'a> SliceStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn get_ref(&self) -> &'a [u8] {
        self.data
    }
}

impl BridgeStream for SliceStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = usize::try_from(self.position).unwrap_or(usize::MAX);
        let Some(remaining) = self.data.get(start..) else {
            return Ok(0);
        };
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.position = resolve_seek(self.position, self.data.len() as u64, offset, origin)?;
        Ok(self.position)
    }
}

/// A caller-owned buffer, written in place.
///
/// The buffer never grows: a write stops at its end and reports how many
/// bytes fit.
#[derive(Debug)]
pub struct SliceStreamMut<'a> {
    data: &'a mut [u8],
    position: u64,
}

impl<'a> SliceStreamMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn get_ref(&self) -> &[u8] {
        &*self.data
    }

    pub fn into_inner(self) -> &'a mut [u8] {
        self.data
    }

    fn remaining(&mut self) -> &mut [u8] {
        let start = usize::try_from(self.position).unwrap_or(usize::MAX);
        self.data.get_mut(start..).unwrap_or_default()
    }
}

impl BridgeStream for SliceStreamMut<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        let n = remaining.len().min(buf.len());
        remaining[..n].copy_from_slice(&buf[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.position = resolve_seek(self.position, self.data.len() as u64, offset, origin)?;
        Ok(self.position)
    }
}

/// Growable in-memory stream.
///
/// `len` is the logical size; the backing vector is larger, rounded up to
/// the chunk size, and everything past `len` is kept zeroed so a write
/// beyond the end leaves a zero-filled gap.
#[derive(Clone)]
pub struct MemoryStream {
    storage: Vec<u8>,
    len: usize,
    position: usize,
    chunk_size: usize,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::with_chunk_size(CHUNK_ALIGNMENT)
    }

    /// A chunk size of zero is treated as one.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            storage: Vec::new(),
            len: 0,
            position: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Starts with `data` as content and the cursor at 0.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        let mut stream = Self::new();
        stream.storage = data;
        stream.len = len;
        stream
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing storage.
    pub fn backing_len(&self) -> usize {
        self.storage.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.storage.truncate(self.len);
        self.storage
    }

    /// Truncates or zero-extends the content. The cursor does not move.
    pub fn set_len(&mut self, len: usize) {
        if len > self.len {
            self.reserve_to(len);
        } else {
            self.storage[len..self.len].fill(0);
        }
        self.len = len;
    }

    fn reserve_to(&mut self, needed: usize) {
        if needed <= self.storage.len() {
            return;
        }
        let rounded = needed.div_ceil(self.chunk_size).saturating_mul(self.chunk_size);
        trace!(from = self.storage.len(), to = rounded, "growing memory stream");
        self.storage.resize(rounded, 0);
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStream")
            .field("len", &self.len)
            .field("position", &self.position)
            .field("backing_len", &self.storage.len())
            .finish()
    }
}

impl BridgeStream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.len {
            return Ok(0);
        }
        let n = (self.len - self.position).min(buf.len());
        buf[..n].copy_from_slice(&self.storage[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let end = self.position.checked_add(buf.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "write past the addressable end")
        })?;
        self.reserve_to(end);
        self.storage[self.position..end].copy_from_slice(buf);
        self.position = end;
        self.len = self.len.max(end);
        Ok(buf.len())
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        let target = resolve_seek(self.position as u64, self.len as u64, offset, origin)?;
        self.position = usize::try_from(target).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "position exceeds the address space")
        })?;
        Ok(target)
    }
}
