/// Declares one layout of the native stream table together with the
/// trampolines that fill it for a [`BridgeStream`](crate::stream::BridgeStream).
///
/// The layouts only differ in the ABI of the five callbacks.
macro_rules! declare_stream_table {
    ($(#[$meta:meta])* $name:ident, $prefix:ident, $abi:tt) => {
        paste::paste! {
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                pub open: unsafe extern $abi fn(context: *mut c_void) -> u32,
                pub read: unsafe extern $abi fn(context: *mut c_void, buffer: *mut c_void, size: u32) -> u32,
                pub seek: unsafe extern $abi fn(context: *mut c_void, offset: i64, origin: u32) -> i64,
                pub write: unsafe extern $abi fn(context: *mut c_void, buffer: *const c_void, size: u32) -> u32,
                pub close: unsafe extern $abi fn(context: *mut c_void),
                pub context: *mut c_void,
            }

            unsafe extern $abi fn [<$prefix _open>]<S: BridgeStream>(context: *mut c_void) -> u32 {
                unsafe { trampoline::open::<S>(context) }
            }

            unsafe extern $abi fn [<$prefix _read>]<S: BridgeStream>(
                context: *mut c_void,
                buffer: *mut c_void,
                size: u32,
            ) -> u32 {
                unsafe { trampoline::read::<S>(context, buffer, size) }
            }

            unsafe extern $abi fn [<$prefix _seek>]<S: BridgeStream>(
                context: *mut c_void,
                offset: i64,
                origin: u32,
            ) -> i64 {
                unsafe { trampoline::seek::<S>(context, offset, origin) }
            }

            unsafe extern $abi fn [<$prefix _write>]<S: BridgeStream>(
                context: *mut c_void,
                buffer: *const c_void,
                size: u32,
            ) -> u32 {
                unsafe { trampoline::write::<S>(context, buffer, size) }
            }

            unsafe extern $abi fn [<$prefix _close>]<S: BridgeStream>(context: *mut c_void) {
                unsafe { trampoline::close::<S>(context) }
            }

            impl $name {
                pub(crate) fn for_stream<S: BridgeStream>(context: *mut c_void) -> Self {
                    Self {
                        open: [<$prefix _open>]::<S>,
                        read: [<$prefix _read>]::<S>,
                        seek: [<$prefix _seek>]::<S>,
                        write: [<$prefix _write>]::<S>,
                        close: [<$prefix _close>]::<S>,
                        context,
                    }
                }
            }

            impl RawStreamTable for $name {
                unsafe fn call_open(&self) -> u32 {
                    unsafe { (self.open)(self.context) }
                }

                unsafe fn call_read(&self, buffer: *mut c_void, size: u32) -> u32 {
                    unsafe { (self.read)(self.context, buffer, size) }
                }

                unsafe fn call_seek(&self, offset: i64, origin: u32) -> i64 {
                    unsafe { (self.seek)(self.context, offset, origin) }
                }

                unsafe fn call_write(&self, buffer: *const c_void, size: u32) -> u32 {
                    unsafe { (self.write)(self.context, buffer, size) }
                }

                unsafe fn call_close(&self) {
                    unsafe { (self.close)(self.context) }
                }
            }

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($name))
                        .field("context", &self.context)
                        .finish_non_exhaustive()
                }
            }
        }
    };
}
