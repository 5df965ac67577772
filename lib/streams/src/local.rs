//! Bridgeable wrappers around `std::io` types.

use crate::stream::{BridgeStream, SeekOrigin};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::trace;

/// A file read through a buffer.
///
/// Writes go straight to the file after re-seeking to the logical
/// position, which also discards the read buffer, so reads and writes
/// always see the same cursor.
#[derive(Debug)]
pub struct BufferedFile {
    inner: BufReader<File>,
}

impl BufferedFile {
    pub fn new(file: File) -> Self {
        Self {
            inner: BufReader::new(file),
        }
    }

    /// Opens `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        trace!(path = %path.display(), "opening file for bridging");
        File::open(path).map(Self::new)
    }

    /// Creates (or truncates) `path` for reading and writing.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        trace!(path = %path.display(), "creating file for bridging");
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map(Self::new)
    }

    pub fn get_ref(&self) -> &File {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> File {
        self.inner.into_inner()
    }
}

impl BridgeStream for BufferedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let position = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(position))?;
        self.inner.get_mut().write(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.inner.seek(origin.to_seek_from(offset)?)
    }
}

/// Read-only adapter; writes are refused by reporting zero bytes.
#[derive(Debug)]
pub struct ReadStream<R> {
    inner: R,
}

impl<R: Read + Seek> ReadStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BridgeStream for ReadStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.inner.seek(origin.to_seek_from(offset)?)
    }
}

/// Read/write adapter over a single-cursor stream.
#[derive(Debug)]
pub struct ReadWriteStream<T> {
    inner: T,
}

impl<T: Read + Write + Seek> ReadWriteStream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write + Seek> BridgeStream for ReadWriteStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.inner.seek(origin.to_seek_from(offset)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn buffered_file_keeps_cursors_in_sync() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sync.bin");
        std::fs::write(&path, b"0123456789")?;

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mut stream = BufferedFile::new(file);
        let mut buf = [0u8; 2];
        assert_eq!(stream.read(&mut buf)?, 2);
        assert_eq!(&buf, b"01");

        // the buffer has read ahead, the write must still land at 2
        assert_eq!(stream.write(b"ab")?, 2);
        assert_eq!(stream.position()?, 4);
        assert_eq!(stream.read(&mut buf)?, 2);
        assert_eq!(&buf, b"45");

        stream.seek(-1, SeekOrigin::End)?;
        assert_eq!(stream.read(&mut buf)?, 1);
        assert_eq!(buf[0], b'9');
        drop(stream);

        assert_eq!(std::fs::read(&path)?, b"01ab456789");
        Ok(())
    }

    #[test]
    fn created_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut stream = BufferedFile::create(dir.path().join("out.bin"))?;
        stream.write(b"hello world")?;
        assert_eq!(stream.size()?, 11);
        stream.set_position(6)?;
        let mut buf = [0u8; 5];
        assert_eq!(stream.read(&mut buf)?, 5);
        assert_eq!(&buf, b"world");
        Ok(())
    }

    #[test]
    fn read_stream_refuses_writes() -> anyhow::Result<()> {
        let mut stream = ReadStream::new(Cursor::new(b"abc".to_vec()));
        assert_eq!(stream.write(b"zz")?, 0);
        assert_eq!(stream.get_ref().get_ref(), b"abc");
        assert_eq!(stream.size()?, 3);
        Ok(())
    }

    #[test]
    fn read_write_stream() -> anyhow::Result<()> {
        let mut stream = ReadWriteStream::new(Cursor::new(Vec::new()));
        assert_eq!(stream.write(b"abcdef")?, 6);
        stream.seek(-4, SeekOrigin::Current)?;
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf)?, 4);
        assert_eq!(&buf, b"cdef");
        assert!(stream.seek(-1, SeekOrigin::Begin).is_err());
        assert_eq!(stream.into_inner().into_inner(), b"abcdef");
        Ok(())
    }
}
