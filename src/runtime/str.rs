//! Immutable length-prefixed strings
//!
//! Layout of a string object on the runtime heap:
//!
//! ```text
//! +----------------+-----------+---------------------------+
//! | length: usize  | hash: i32 | payload: [u8; length]      |
//! +----------------+-----------+---------------------------+
//! ```
//!
//! The payload is UTF-8 written once by the constructor and never mutated.
//! `hash` is a lazily computed cache; 0 means "not computed yet".

use std::cell::Cell;
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use super::context::Runtime;
use super::error::Result;
use super::panic::PanicKind;

/// FNV-1a 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 2166136261;
/// FNV-1a 32-bit prime.
const FNV_PRIME: u32 = 16777619;

/// Header of a string object. The payload follows it directly.
#[repr(C)]
pub struct StrHeader {
    length: usize,
    hash: Cell<i32>,
}

impl StrHeader {
    pub const SIZE: usize = mem::size_of::<StrHeader>();
}

/// A handle to an immutable runtime string.
///
/// Handles are plain addresses: copying one does not copy the string.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Str {
    ptr: NonNull<StrHeader>,
}

/// FNV-1a over `bytes`, with the cache sentinels remapped.
pub fn fnv1a(bytes: &[u8]) -> i32 {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    match h as i32 {
        0 => 1,
        -1 => -2,
        h => h,
    }
}

impl Str {
    /// Allocate a string of `length` bytes and let `fill` write the payload.
    /// The payload is zeroed before `fill` runs.
    #[track_caller]
    fn build(rt: &Runtime, length: usize, fill: impl FnOnce(&mut [u8])) -> Str {
        let Some(size) = StrHeader::SIZE.checked_add(length) else {
            rt.panic_here(PanicKind::PanicError, "string is too long");
        };
        let align = mem::align_of::<StrHeader>();
        let layout = match std::alloc::Layout::from_size_align(size, align) {
            Ok(layout) => layout,
            Err(_) => rt.panic_here(PanicKind::PanicError, "string is too long"),
        };
        let ptr = rt.allocate_layout(layout).cast::<StrHeader>();
        unsafe {
            ptr.as_ptr().write(StrHeader {
                length,
                hash: Cell::new(0),
            });
            let payload = ptr.as_ptr().cast::<u8>().add(StrHeader::SIZE);
            payload.write_bytes(0, length);
            fill(std::slice::from_raw_parts_mut(payload, length));
        }
        Str { ptr }
    }

    /// Allocate a string of `length` zero bytes.
    #[track_caller]
    pub fn alloc(rt: &Runtime, length: usize) -> Str {
        Self::build(rt, length, |_| {})
    }

    /// Copy `bytes` into a new string.
    #[track_caller]
    pub fn from_bytes(rt: &Runtime, bytes: &[u8]) -> Str {
        Self::build(rt, bytes.len(), |buf| buf.copy_from_slice(bytes))
    }

    /// Copy `s` into a new string.
    #[track_caller]
    pub fn new(rt: &Runtime, s: &str) -> Str {
        Self::from_bytes(rt, s.as_bytes())
    }

    /// Rebuild a handle from a header pointer handed out by [`Str::as_ptr`].
    ///
    /// # Safety
    /// `ptr` must be null or a pointer previously obtained from `as_ptr`.
    pub unsafe fn from_raw(ptr: *mut StrHeader) -> Option<Str> {
        NonNull::new(ptr).map(|ptr| Str { ptr })
    }

    pub fn as_ptr(self) -> *mut StrHeader {
        self.ptr.as_ptr()
    }

    fn header(&self) -> &StrHeader {
        unsafe { self.ptr.as_ref() }
    }

    /// Length in bytes.
    #[inline]
    pub fn len(self) -> usize {
        self.header().length
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Address of the first payload byte.
    pub fn payload_ptr(self) -> *const u8 {
        unsafe { self.ptr.as_ptr().cast::<u8>().add(StrHeader::SIZE) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.payload_ptr(), self.len()) }
    }

    /// The payload as `&str`, if it is valid UTF-8.
    pub fn to_str(&self) -> Result<&str> {
        Ok(std::str::from_utf8(self.as_bytes())?)
    }

    /// Cached FNV-1a hash, never 0 and never -1.
    pub fn hash(self) -> i32 {
        let cache = &self.header().hash;
        match cache.get() {
            0 => {
                let h = fnv1a(self.as_bytes());
                cache.set(h);
                h
            }
            h => h,
        }
    }

    /// Concatenation: a new string holding `self` then `other`.
    #[track_caller]
    pub fn add(self, rt: &Runtime, other: Str) -> Str {
        let (a, b) = (self.as_bytes(), other.as_bytes());
        let Some(length) = a.len().checked_add(b.len()) else {
            rt.panic_here(PanicKind::PanicError, "concatenated string is too long");
        };
        Self::build(rt, length, |buf| {
            buf[..a.len()].copy_from_slice(a);
            buf[a.len()..].copy_from_slice(b);
        })
    }

    /// Repetition: `self` repeated `n` times; `n <= 0` gives the empty string.
    #[track_caller]
    pub fn mul(self, rt: &Runtime, n: i32) -> Str {
        let a = self.as_bytes();
        if n <= 0 || a.is_empty() {
            return Self::alloc(rt, 0);
        }
        let Some(length) = a.len().checked_mul(n as usize) else {
            rt.panic_here(PanicKind::PanicError, "repeated string is too long");
        };
        Self::build(rt, length, |buf| {
            for chunk in buf.chunks_exact_mut(a.len()) {
                chunk.copy_from_slice(a);
            }
        })
    }

    /// Length as the language's `int`. A string longer than `i32::MAX`
    /// bytes is a `PanicError`.
    #[track_caller]
    pub fn len_i32(self, rt: &Runtime) -> i32 {
        int_len(rt, self.len())
    }

    /// The byte at index `i` as a one-byte string. Negative indices count
    /// from the end. This indexes bytes, not code points.
    #[track_caller]
    pub fn get_item(self, rt: &Runtime, i: i32) -> Str {
        let len = self.len();
        let mut idx = i as i64;
        if idx < 0 {
            idx += len as i64;
        }
        if idx < 0 || idx >= len as i64 {
            rt.panic_here(PanicKind::IndexError, "string index out of range");
        }
        let byte = self.as_bytes()[idx as usize];
        Self::build(rt, 1, |buf| buf[0] = byte)
    }

    /// Replace every non-overlapping occurrence of `old` with `new`, scanning
    /// left to right.
    ///
    /// An empty `old` inserts `new` before every byte and once at the end.
    /// When nothing matches, the original string is returned.
    #[track_caller]
    pub fn replace(self, rt: &Runtime, old: Str, new: Str) -> Str {
        let (src, old, new) = (self.as_bytes(), old.as_bytes(), new.as_bytes());

        if old.is_empty() {
            let length = src
                .len()
                .checked_add(1)
                .and_then(|slots| slots.checked_mul(new.len()))
                .and_then(|inserted| inserted.checked_add(src.len()));
            let Some(length) = length else {
                rt.panic_here(PanicKind::PanicError, "replaced string is too long");
            };
            return Self::build(rt, length, |buf| {
                let mut at = 0;
                for &b in src {
                    buf[at..at + new.len()].copy_from_slice(new);
                    at += new.len();
                    buf[at] = b;
                    at += 1;
                }
                buf[at..].copy_from_slice(new);
            });
        }

        let count = count_matches(src, old);
        if count == 0 {
            return self;
        }
        let kept = src.len() - count * old.len();
        let length = count
            .checked_mul(new.len())
            .and_then(|inserted| inserted.checked_add(kept));
        let Some(length) = length else {
            rt.panic_here(PanicKind::PanicError, "replaced string is too long");
        };

        Self::build(rt, length, |buf| {
            let mut from = 0;
            let mut at = 0;
            let mut i = 0;
            while i + old.len() <= src.len() {
                if &src[i..i + old.len()] == old {
                    let seg = &src[from..i];
                    buf[at..at + seg.len()].copy_from_slice(seg);
                    at += seg.len();
                    buf[at..at + new.len()].copy_from_slice(new);
                    at += new.len();
                    i += old.len();
                    from = i;
                } else {
                    i += 1;
                }
            }
            buf[at..].copy_from_slice(&src[from..]);
        })
    }
}

#[track_caller]
fn int_len(rt: &Runtime, len: usize) -> i32 {
    match i32::try_from(len) {
        Ok(n) => n,
        Err(_) => rt.panic_here(PanicKind::PanicError, "string length does not fit in int"),
    }
}

/// Count non-overlapping occurrences of a non-empty `needle`.
fn count_matches(haystack: &[u8], needle: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Str {}

impl std::hash::Hash for Str {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_i32(Str::hash(*self));
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Str({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}
