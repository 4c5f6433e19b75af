//! Runtime stubs callable from native-compiled code
//!
//! These extern "C" functions are the interface between AOT-compiled spy
//! code and the Rust runtime. They cover:
//! - Runtime lifetime and logging setup
//! - Raw allocation
//! - String operations and number-to-string conversion
//! - Raw buffers for hand-laid-out records
//! - Arithmetic operators that can raise
//! - Panics raised by compiled code
//! - Debug output from compiled code
//!
//! The calling convention is:
//! - The first argument is the `*mut Runtime` from `spy_runtime_new`
//! - Strings travel as `*mut StrHeader`
//! - Byte buffers travel as a (pointer, length) pair
//! - Raw buffers travel by value as `RawBuffer { ptr, size }`
//!
//! A null runtime is unrecoverable and aborts the process. A null string is
//! a `PanicError` on the runtime it was passed with.

use tracing::{error, info};

use super::config::RuntimeConfig;
use super::context::Runtime;
use super::operator::{self, FloatOps, IntOps};
use super::panic::{PanicKind, SourceLoc};
use super::rawbuffer::RawBuffer;
use super::str::{Str, StrHeader};
use super::telemetry;

// =========================================================================
// Argument helpers
// =========================================================================

/// Borrow the runtime behind a handle.
///
/// # Safety
/// `rt` must be null or a live handle from `spy_runtime_new*`.
unsafe fn runtime<'a>(rt: *const Runtime) -> &'a Runtime {
    match unsafe { rt.as_ref() } {
        Some(rt) => rt,
        None => {
            error!("runtime stub called with a null runtime handle");
            std::process::abort()
        }
    }
}

/// Turn a string handle into a [`Str`], raising on null.
///
/// # Safety
/// `s` must be null or a handle returned by one of the string stubs.
#[track_caller]
unsafe fn str_arg(rt: &Runtime, s: *mut StrHeader) -> Str {
    match unsafe { Str::from_raw(s) } {
        Some(s) => s,
        None => rt.panic_here(PanicKind::PanicError, "null string handle"),
    }
}

/// Borrow a (pointer, length) byte buffer. A null pointer reads as empty.
///
/// # Safety
/// A non-null `data` must be valid for reads of `len` bytes.
unsafe fn bytes_arg<'a>(data: *const u8, len: usize) -> &'a [u8] {
    if data.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    }
}

// =========================================================================
// Runtime Stubs
// =========================================================================

/// Create a runtime with the default configuration.
#[unsafe(no_mangle)]
pub extern "C" fn spy_runtime_new() -> *mut Runtime {
    Box::into_raw(Box::new(Runtime::new()))
}

/// Create a runtime from a JSON configuration.
///
/// Returns null if the configuration does not parse or validate.
///
/// # Safety
/// `json` must be null or valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_runtime_new_from_json(json: *const u8, len: usize) -> *mut Runtime {
    let text = unsafe { bytes_arg(json, len) };
    let config = std::str::from_utf8(text)
        .map_err(Into::into)
        .and_then(RuntimeConfig::from_json);
    match config {
        Ok(config) => Box::into_raw(Box::new(Runtime::with_config(config))),
        Err(err) => {
            error!(%err, "invalid runtime configuration");
            std::ptr::null_mut()
        }
    }
}

/// Destroy a runtime. Objects it allocated must not be used afterwards.
///
/// # Safety
/// `rt` must be null or a handle from `spy_runtime_new*` not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_runtime_free(rt: *mut Runtime) {
    if !rt.is_null() {
        drop(unsafe { Box::from_raw(rt) });
    }
}

/// Install the stderr log subscriber. Returns false if one was already set.
#[unsafe(no_mangle)]
pub extern "C" fn spy_runtime_init_logging() -> bool {
    telemetry::init_tracing()
}

// =========================================================================
// Allocation Stubs
// =========================================================================

/// Allocate `size` uninitialized bytes on the runtime heap.
///
/// # Safety
/// `rt` must be a live runtime handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_gc_alloc_mem(rt: *const Runtime, size: usize) -> *mut u8 {
    let rt = unsafe { runtime(rt) };
    rt.allocate(size).as_ptr()
}

// =========================================================================
// String Stubs
// =========================================================================

/// Allocate a zero-filled string of `len` bytes.
///
/// # Safety
/// `rt` must be a live runtime handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_alloc(rt: *const Runtime, len: usize) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    Str::alloc(rt, len).as_ptr()
}

/// Copy a UTF-8 buffer into a new string.
///
/// # Safety
/// `rt` must be a live runtime handle; a non-null `data` must be valid for
/// reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_from_utf8(
    rt: *const Runtime,
    data: *const u8,
    len: usize,
) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    let data = unsafe { bytes_arg(data, len) };
    Str::from_bytes(rt, data).as_ptr()
}

/// Expose the payload of a string. Writes the length to `out_len` if it is
/// not null. The buffer lives as long as the string.
///
/// # Safety
/// Handles must be live; a non-null `out_len` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_utf8(
    rt: *const Runtime,
    s: *mut StrHeader,
    out_len: *mut usize,
) -> *const u8 {
    let rt = unsafe { runtime(rt) };
    let s = unsafe { str_arg(rt, s) };
    if let Some(out_len) = unsafe { out_len.as_mut() } {
        *out_len = s.len();
    }
    s.payload_ptr()
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_len(rt: *const Runtime, s: *mut StrHeader) -> i32 {
    let rt = unsafe { runtime(rt) };
    unsafe { str_arg(rt, s) }.len_i32(rt)
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_add(
    rt: *const Runtime,
    a: *mut StrHeader,
    b: *mut StrHeader,
) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    let (a, b) = unsafe { (str_arg(rt, a), str_arg(rt, b)) };
    a.add(rt, b).as_ptr()
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_mul(
    rt: *const Runtime,
    a: *mut StrHeader,
    n: i32,
) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    unsafe { str_arg(rt, a) }.mul(rt, n).as_ptr()
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_eq(
    rt: *const Runtime,
    a: *mut StrHeader,
    b: *mut StrHeader,
) -> bool {
    let rt = unsafe { runtime(rt) };
    unsafe { str_arg(rt, a) == str_arg(rt, b) }
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_ne(
    rt: *const Runtime,
    a: *mut StrHeader,
    b: *mut StrHeader,
) -> bool {
    unsafe { !spy_str_eq(rt, a, b) }
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_getitem(
    rt: *const Runtime,
    s: *mut StrHeader,
    i: i32,
) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    unsafe { str_arg(rt, s) }.get_item(rt, i).as_ptr()
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_replace(
    rt: *const Runtime,
    s: *mut StrHeader,
    old: *mut StrHeader,
    new: *mut StrHeader,
) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    let (s, old, new) = unsafe { (str_arg(rt, s), str_arg(rt, old), str_arg(rt, new)) };
    s.replace(rt, old, new).as_ptr()
}

/// # Safety
/// Handles must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_str_hash(rt: *const Runtime, s: *mut StrHeader) -> i32 {
    let rt = unsafe { runtime(rt) };
    unsafe { str_arg(rt, s) }.hash()
}

// =========================================================================
// Conversion Stubs
// =========================================================================

/// # Safety
/// `rt` must be a live runtime handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_int2str(rt: *const Runtime, n: i32) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    Str::from_i32(rt, n).as_ptr()
}

/// # Safety
/// `rt` must be a live runtime handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_float2str(rt: *const Runtime, x: f64) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    Str::from_f64(rt, x).as_ptr()
}

/// # Safety
/// `rt` must be a live runtime handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_bool2str(rt: *const Runtime, b: bool) -> *mut StrHeader {
    let rt = unsafe { runtime(rt) };
    Str::from_bool(rt, b).as_ptr()
}

/// Saturating `float -> int`; NaN gives 0.
#[unsafe(no_mangle)]
pub extern "C" fn spy_f64_to_i32(x: f64) -> i32 {
    operator::f64_to_i32(x)
}

// =========================================================================
// RawBuffer Stubs
// =========================================================================

/// Allocate a zero-filled buffer of `size` bytes.
///
/// # Safety
/// `rt` must be a live runtime handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_rawbuffer_alloc(rt: *const Runtime, size: usize) -> RawBuffer {
    let rt = unsafe { runtime(rt) };
    RawBuffer::alloc(rt, size)
}

/// # Safety
/// `rt` must be a live runtime handle and `rb` a buffer it allocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_rawbuffer_get_i32(
    rt: *const Runtime,
    rb: RawBuffer,
    offset: i32,
) -> i32 {
    rb.get_i32(unsafe { runtime(rt) }, offset)
}

/// # Safety
/// `rt` must be a live runtime handle and `rb` a buffer it allocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_rawbuffer_set_i32(
    rt: *const Runtime,
    rb: RawBuffer,
    offset: i32,
    value: i32,
) {
    rb.set_i32(unsafe { runtime(rt) }, offset, value)
}

/// # Safety
/// `rt` must be a live runtime handle and `rb` a buffer it allocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_rawbuffer_get_f64(
    rt: *const Runtime,
    rb: RawBuffer,
    offset: i32,
) -> f64 {
    rb.get_f64(unsafe { runtime(rt) }, offset)
}

/// # Safety
/// `rt` must be a live runtime handle and `rb` a buffer it allocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_rawbuffer_set_f64(
    rt: *const Runtime,
    rb: RawBuffer,
    offset: i32,
    value: f64,
) {
    rb.set_f64(unsafe { runtime(rt) }, offset, value)
}

// =========================================================================
// Debug Stubs
// =========================================================================

/// Text of a debug line: the message, then the value if there is one.
fn debug_line(msg: &[u8], value: Option<i32>) -> String {
    let msg = String::from_utf8_lossy(msg);
    match value {
        Some(n) => format!("{msg} {n}"),
        None => msg.into_owned(),
    }
}

/// Log a message from compiled code at info level.
///
/// # Safety
/// A non-null `msg` must be valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_debug_log(msg: *const u8, len: usize) {
    let msg = unsafe { bytes_arg(msg, len) };
    info!(target: "spy::debug", "{}", debug_line(msg, None));
}

/// Log a message followed by an integer at info level.
///
/// # Safety
/// A non-null `msg` must be valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn spy_debug_log_i32(msg: *const u8, len: usize, n: i32) {
    let msg = unsafe { bytes_arg(msg, len) };
    info!(target: "spy::debug", "{}", debug_line(msg, Some(n)));
}

// =========================================================================
// Panic Stub
// =========================================================================

/// Raise a panic from compiled code. Unknown kind names are `PanicError`.
fn raise(rt: &Runtime, kind: &[u8], message: &[u8], file: &[u8], line: i32) -> ! {
    let kind = std::str::from_utf8(kind)
        .ok()
        .and_then(|kind| kind.parse().ok())
        .unwrap_or(PanicKind::PanicError);
    let loc = SourceLoc::new(String::from_utf8_lossy(file).into_owned(), line.max(0) as u32);
    rt.panic(kind, String::from_utf8_lossy(message), loc)
}

/// # Safety
/// `rt` must be a live runtime handle; each non-null buffer must be valid
/// for reads of its length.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn spy_panic(
    rt: *const Runtime,
    kind: *const u8,
    kind_len: usize,
    message: *const u8,
    message_len: usize,
    file: *const u8,
    file_len: usize,
    line: i32,
) -> ! {
    let rt = unsafe { runtime(rt) };
    let (kind, message, file) = unsafe {
        (
            bytes_arg(kind, kind_len),
            bytes_arg(message, message_len),
            bytes_arg(file, file_len),
        )
    };
    raise(rt, kind, message, file, line)
}

// =========================================================================
// Operator Stubs
// =========================================================================

macro_rules! int_op_stubs {
    ($t:ty: $div:ident, $floordiv:ident, $modulo:ident,
     $udiv:ident, $ufloordiv:ident, $umodulo:ident) => {
        /// # Safety
        /// `rt` must be a live runtime handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $div(rt: *const Runtime, x: $t, y: $t) -> f64 {
            x.truediv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $floordiv(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.floordiv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $modulo(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.modulo(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle; `y` must be non-zero.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $udiv(rt: *const Runtime, x: $t, y: $t) -> f64 {
            x.unchecked_truediv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle; `y` must be non-zero.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $ufloordiv(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.unchecked_floordiv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle; `y` must be non-zero.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $umodulo(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.unchecked_modulo(unsafe { runtime(rt) }, y)
        }
    };
}

int_op_stubs!(i32: spy_i32_div, spy_i32_floordiv, spy_i32_mod,
    spy_i32_unchecked_div, spy_i32_unchecked_floordiv, spy_i32_unchecked_mod);
int_op_stubs!(i8: spy_i8_div, spy_i8_floordiv, spy_i8_mod,
    spy_i8_unchecked_div, spy_i8_unchecked_floordiv, spy_i8_unchecked_mod);
int_op_stubs!(u8: spy_u8_div, spy_u8_floordiv, spy_u8_mod,
    spy_u8_unchecked_div, spy_u8_unchecked_floordiv, spy_u8_unchecked_mod);
int_op_stubs!(u32: spy_u32_div, spy_u32_floordiv, spy_u32_mod,
    spy_u32_unchecked_div, spy_u32_unchecked_floordiv, spy_u32_unchecked_mod);

macro_rules! float_op_stubs {
    ($t:ty: $div:ident, $floordiv:ident, $modulo:ident,
     $udiv:ident, $ufloordiv:ident, $umodulo:ident, $ieee:ident) => {
        /// # Safety
        /// `rt` must be a live runtime handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $div(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.truediv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $floordiv(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.floordiv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $modulo(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.modulo(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle; `y` must be non-zero.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $udiv(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.unchecked_truediv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle; `y` must be non-zero.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $ufloordiv(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.unchecked_floordiv(unsafe { runtime(rt) }, y)
        }

        /// # Safety
        /// `rt` must be a live runtime handle; `y` must be non-zero.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $umodulo(rt: *const Runtime, x: $t, y: $t) -> $t {
            x.unchecked_modulo(unsafe { runtime(rt) }, y)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn $ieee(x: $t, y: $t) -> $t {
            x.ieee754_div(y)
        }
    };
}

float_op_stubs!(f64: spy_f64_div, spy_f64_floordiv, spy_f64_mod,
    spy_f64_unchecked_div, spy_f64_unchecked_floordiv, spy_f64_unchecked_mod,
    spy_f64_ieee754_div);
float_op_stubs!(f32: spy_f32_div, spy_f32_floordiv, spy_f32_mod,
    spy_f32_unchecked_div, spy_f32_unchecked_floordiv, spy_f32_unchecked_mod,
    spy_f32_ieee754_div);
