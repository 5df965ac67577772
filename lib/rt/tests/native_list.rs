//! Drives `NativeListEnumerable` through real `extern "C"` entry points,
//! shaped like the engine's subfile enumeration.

use docfilters_rt::ffi::{CreateEnumeratorFn, NextItemFn, ReleaseFn};
use docfilters_rt::ucs2::{copy_to_ucs2, from_ucs2};
use docfilters_rt::{
    Enumerable, Enumerator, ErrorControlBlock, HandleGuard, NativeListEnumerable, NativeListFns,
    NativeRelease, ReturnCode,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;

#[derive(Clone, Copy, Debug)]
#[repr(C)]
struct SubfileEntry {
    id: [u16; 64],
    size: u64,
}

impl Default for SubfileEntry {
    fn default() -> Self {
        Self {
            id: [0; 64],
            size: 0,
        }
    }
}

#[derive(Default)]
struct Engine {
    documents: Vec<Vec<(&'static str, u64)>>,
    open_cursors: Vec<(u32, usize)>,
    closed: Vec<u32>,
    next_handle: u32,
}

thread_local! {
    static ENGINE: RefCell<Engine> = RefCell::new(Engine::default());
}

fn load_documents(documents: Vec<Vec<(&'static str, u64)>>) {
    ENGINE.with(|engine| {
        *engine.borrow_mut() = Engine {
            documents,
            next_handle: 100,
            ..Engine::default()
        }
    });
}

fn fail(ecb: *mut ErrorControlBlock, code: ReturnCode, message: &str) -> ReturnCode {
    if let Some(ecb) = unsafe { ecb.as_mut() } {
        ecb.set_message(message);
    }
    code
}

unsafe extern "C" fn subfiles_open(doc: u32, out: *mut u32, ecb: *mut ErrorControlBlock) -> ReturnCode {
    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        if doc as usize >= engine.documents.len() {
            return fail(ecb, ReturnCode::INVALID_HANDLE, "unknown document");
        }
        engine.next_handle += 1;
        let handle = engine.next_handle;
        engine.open_cursors.push((handle, 0));
        unsafe { *out = handle };
        ReturnCode::OK
    })
}

unsafe extern "C" fn subfiles_next(
    handle: u32,
    out: *mut SubfileEntry,
    ecb: *mut ErrorControlBlock,
) -> ReturnCode {
    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        let Some(index) = engine.open_cursors.iter().position(|(h, _)| *h == handle) else {
            return fail(ecb, ReturnCode::INVALID_HANDLE, "stale subfile enumerator");
        };
        let position = engine.open_cursors[index].1;
        // every cursor walks document 0 in these tests
        let Some(&(id, size)) = engine.documents[0].get(position) else {
            return ReturnCode::NO_MORE;
        };
        engine.open_cursors[index].1 += 1;
        let entry = unsafe { &mut *out };
        if copy_to_ucs2(id, &mut entry.id).is_err() {
            return fail(ecb, ReturnCode::ERROR, "subfile id too long");
        }
        entry.size = size;
        ReturnCode::OK
    })
}

unsafe extern "C" fn subfiles_close(handle: u32, ecb: *mut ErrorControlBlock) -> ReturnCode {
    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        let before = engine.open_cursors.len();
        engine.open_cursors.retain(|(h, _)| *h != handle);
        if engine.open_cursors.len() == before {
            return fail(ecb, ReturnCode::INVALID_HANDLE, "double close");
        }
        engine.closed.push(handle);
        ReturnCode::OK
    })
}

fn subfiles(doc: u32) -> NativeListEnumerable<NativeListFns<u32, u32, SubfileEntry>> {
    let source = unsafe {
        NativeListFns::new(
            doc,
            subfiles_open as CreateEnumeratorFn<u32, u32>,
            subfiles_next as NextItemFn<u32, SubfileEntry>,
            subfiles_close as ReleaseFn<u32>,
        )
    }
    .with_names("IGR_Subfiles_Open", "IGR_Subfiles_Next", "IGR_Subfiles_Close");
    NativeListEnumerable::new(source)
}

fn closed() -> Vec<u32> {
    ENGINE.with(|engine| engine.borrow().closed.clone())
}

fn open_cursors() -> usize {
    ENGINE.with(|engine| engine.borrow().open_cursors.len())
}

#[test]
fn lists_every_subfile() -> anyhow::Result<()> {
    load_documents(vec![vec![("word/document.xml", 2048), ("docProps/core.xml", 512)]]);
    let entries = subfiles(0).collect_vec()?;
    let ids: Vec<(String, u64)> = entries
        .iter()
        .map(|entry| (from_ucs2(&entry.id), entry.size))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("word/document.xml".to_string(), 2048),
            ("docProps/core.xml".to_string(), 512),
        ]
    );
    assert_eq!(closed(), vec![101]);
    assert_eq!(open_cursors(), 0);
    Ok(())
}

#[test]
fn empty_container() -> anyhow::Result<()> {
    load_documents(vec![vec![]]);
    let list = subfiles(0);
    assert!(list.iter()?.is_end());
    assert_eq!(closed(), vec![101]);
    Ok(())
}

#[test]
fn create_failure_surfaces_the_engine_message() {
    load_documents(vec![vec![("a", 1)]]);
    let err = subfiles(7).enumerator().unwrap_err();
    assert_eq!(err.native_code(), Some(ReturnCode::INVALID_HANDLE));
    assert_eq!(err.to_string(), "unknown document in IGR_Subfiles_Open");
    assert!(closed().is_empty());
}

#[test]
fn interleaved_cursors_close_independently() -> anyhow::Result<()> {
    load_documents(vec![vec![("a", 1), ("b", 2), ("c", 3)]]);
    let list = subfiles(0);
    let mut first = list.enumerator()?;
    let mut second = list.enumerator()?;
    assert!(first.advance()?);
    assert!(second.advance()?);
    assert!(second.advance()?);
    assert_eq!(from_ucs2(&first.current()?.id), "a");
    assert_eq!(from_ucs2(&second.current()?.id), "b");
    assert_eq!(open_cursors(), 2);

    drop(first);
    assert_eq!(closed(), vec![101]);
    drop(second);
    assert_eq!(closed(), vec![101, 102]);
    Ok(())
}

#[test]
#[tracing_test::traced_test]
fn guard_over_a_native_close() -> anyhow::Result<()> {
    load_documents(vec![vec![("a", 1)]]);
    let release = unsafe { NativeRelease::new(subfiles_close as ReleaseFn<u32>, "IGR_Subfiles_Close") };
    let mut guard = HandleGuard::empty(release);
    let status = unsafe { subfiles_open(0, guard.attach()?, std::ptr::null_mut()) };
    assert_eq!(status, ReturnCode::OK);
    assert_eq!(guard.get(), 101);

    let stolen = guard.steal();
    guard.reset(stolen)?;
    drop(guard);
    assert_eq!(closed(), vec![101]);

    // a second release of the same handle is reported by the engine
    let mut stale = HandleGuard::new(101u32, release);
    let err = stale.reset_empty().unwrap_err();
    assert_eq!(err.to_string(), "double close in IGR_Subfiles_Close");
    Ok(())
}
