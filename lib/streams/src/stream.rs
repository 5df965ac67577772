use std::io::{self, SeekFrom};

/// Where a native seek offset is measured from.
///
/// The discriminants are the C `SEEK_*` values the engine passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SeekOrigin {
    Begin = libc::SEEK_SET as u32,
    Current = libc::SEEK_CUR as u32,
    End = libc::SEEK_END as u32,
}

impl SeekOrigin {
    pub fn from_raw(origin: u32) -> Option<Self> {
        [Self::Begin, Self::Current, Self::End]
            .into_iter()
            .find(|candidate| *candidate as u32 == origin)
    }

    /// The equivalent [`SeekFrom`]; a negative offset from the start is
    /// rejected.
    pub fn to_seek_from(self, offset: i64) -> io::Result<SeekFrom> {
        match self {
            Self::Begin => u64::try_from(offset)
                .map(SeekFrom::Start)
                .map_err(|_| before_start()),
            Self::Current => Ok(SeekFrom::Current(offset)),
            Self::End => Ok(SeekFrom::End(offset)),
        }
    }
}

pub(crate) fn before_start() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "seeking before the byte 0")
}

/// Resolves a seek against a cursor and a length.
pub(crate) fn resolve_seek(
    current: u64,
    len: u64,
    offset: i64,
    origin: SeekOrigin,
) -> io::Result<u64> {
    let base = match origin {
        SeekOrigin::Begin => 0,
        SeekOrigin::Current => i128::from(current),
        SeekOrigin::End => i128::from(len),
    };
    u64::try_from(base + i128::from(offset)).map_err(|_| before_start())
}

/// A local stream the engine can read from (and possibly write to).
///
/// Reads and writes may be short; the count is passed to the engine
/// unchanged. Streams that cannot be written keep the default `write`,
/// which accepts nothing.
pub trait BridgeStream {
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    /// Moves the cursor and returns the new absolute position.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64>;

    /// Total length; the cursor is left where it was.
    fn size(&mut self) -> io::Result<u64> {
        let position = self.position()?;
        let end = self.seek(0, SeekOrigin::End)?;
        self.set_position(position)?;
        Ok(end)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.seek(0, SeekOrigin::Current)
    }

    fn set_position(&mut self, position: u64) -> io::Result<u64> {
        let offset = i64::try_from(position)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "position exceeds i64"))?;
        self.seek(offset, SeekOrigin::Begin)
    }
}

impl<S: BridgeStream + ?Sized> BridgeStream for Box<S> {
    fn open(&mut self) -> io::Result<()> {
        (**self).open()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        (**self).seek(offset, origin)
    }
}
