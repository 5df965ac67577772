//! Streams bound on the Rust side and consumed through the raw table, the
//! way the engine sees them.

use docfilters_streams::text::write_text_all;
use docfilters_streams::{
    BridgeOptions, BridgeStream, BufferedFile, CallingConvention, MemoryStream, NativeStream,
    Ownership, SeekOrigin, StreamBinding, TextEncoding, WireOrder, decode_text,
    last_error_length, take_last_error,
};
use pretty_assertions::assert_eq;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Tracked {
    inner: MemoryStream,
    dropped: Arc<AtomicBool>,
}

impl Tracked {
    fn new(data: &[u8]) -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let stream = Self {
            inner: MemoryStream::from_vec(data.to_vec()),
            dropped: dropped.clone(),
        };
        (stream, dropped)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

impl BridgeStream for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> io::Result<u64> {
        self.inner.seek(offset, origin)
    }
}

#[test]
#[tracing_test::traced_test]
fn detached_binding_is_freed_by_close() -> anyhow::Result<()> {
    for convention in [CallingConvention::System, CallingConvention::Cdecl] {
        let (stream, dropped) = Tracked::new(b"%PDF-1.7 body");
        let binding = BridgeOptions::new()
            .calling_convention(convention)
            .bind_owned(stream);
        let raw = binding.into_raw();

        let mut native = unsafe { NativeStream::from_raw(raw, convention, Ownership::Owned)? };
        native.open()?;
        let mut magic = [0u8; 8];
        native.read_exact(&mut magic)?;
        assert_eq!(&magic, b"%PDF-1.7");
        assert_eq!(native.seek(SeekFrom::End(0))?, 13);
        assert!(!dropped.load(Ordering::SeqCst));

        drop(native);
        assert!(dropped.load(Ordering::SeqCst));
    }
    Ok(())
}

#[test]
fn borrowed_stream_outlives_the_engine() -> anyhow::Result<()> {
    let mut stream = MemoryStream::new();
    {
        let binding = StreamBinding::borrowed(&mut stream);
        let mut native = unsafe {
            NativeStream::from_raw(binding.as_ptr(), binding.calling_convention(), Ownership::Owned)?
        };
        native.write_all(b"written by the engine")?;
        drop(native);
        assert!(binding.is_closed());
    }
    assert_eq!(stream.as_bytes(), b"written by the engine");
    assert_eq!(stream.position()?, 21);
    Ok(())
}

#[test]
fn file_backed_binding() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("report.txt");
    std::fs::write(&path, b"quarterly report")?;

    let mut file = BufferedFile::open(&path)?;
    let binding = BridgeOptions::new()
        .calling_convention(CallingConvention::Cdecl)
        .bind_borrowed(&mut file);
    assert_eq!(binding.flags(), 1);

    let mut native = unsafe {
        NativeStream::from_raw(binding.as_ptr(), CallingConvention::Cdecl, Ownership::Borrowed)?
    };
    native.seek(SeekFrom::Start(10))?;
    let mut tail = String::new();
    native.read_to_string(&mut tail)?;
    assert_eq!(tail, "report");

    // read-only file: the write fails inside the callback and reports 0
    assert_eq!(native.write(b"x")?, 0);
    assert!(take_last_error().is_some_and(|msg| msg.starts_with("bridged stream write failed")));
    Ok(())
}

#[test]
fn text_through_the_table() -> anyhow::Result<()> {
    let binding = StreamBinding::owned(MemoryStream::new());
    let mut native = unsafe {
        NativeStream::from_raw(binding.as_ptr(), binding.calling_convention(), Ownership::Borrowed)?
    };
    let encoding = TextEncoding::Utf16(WireOrder::Big);
    write_text_all(&mut native, "Título", encoding)?;
    drop(native);

    let stream = binding
        .into_inner()
        .ok_or_else(|| anyhow::anyhow!("binding was closed"))?;
    assert_eq!(stream.len(), 12);
    assert_eq!(decode_text(stream.as_bytes(), encoding)?, "Título");
    Ok(())
}

#[test]
fn failures_leave_a_last_error() -> anyhow::Result<()> {
    let binding = StreamBinding::owned(MemoryStream::from_vec(vec![0; 4]));
    let table = binding.table();

    assert_eq!(last_error_length(), 0);
    assert_eq!(unsafe { table.call_seek(-10, SeekOrigin::End as u32) }, -1);
    let expected = "bridged stream seek failed: seeking before the byte 0";
    assert_eq!(last_error_length(), expected.len() + 1);
    assert_eq!(take_last_error().as_deref(), Some(expected));
    assert_eq!(last_error_length(), 0);

    assert_eq!(unsafe { table.call_seek(2, SeekOrigin::Begin as u32) }, 2);
    assert_eq!(take_last_error(), None);
    Ok(())
}
