//! Managed pointers
//!
//! `ManagedPtr<T, M>` is a handle to a run of `T`s living on the runtime heap.
//! The safety mode `M` is a strategy type chosen for the whole build:
//!
//! - [`Unchecked`]: just the base address. Bounds are the caller's business;
//!   the handle is exactly one machine word.
//! - [`Checked`]: base address plus element count. Every access is validated
//!   and violations go through the panic protocol.
//!
//! [`Ptr<T>`] uses [`BuildMode`], which follows the `checked` cargo feature,
//! so compiled code uses one call-site API for hardened and stripped builds.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;

use super::context::Runtime;
use super::panic::PanicKind;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Unchecked {}
    impl Sealed for super::Checked {}
}

/// A pointer safety mode.
pub trait PtrMode: sealed::Sealed + Copy + 'static {
    /// Per-pointer metadata carried by this mode.
    type Len: Copy + Eq + fmt::Debug;

    /// Whether accesses are validated.
    const CHECKED: bool;

    /// Metadata for a run of `n` elements.
    fn len_for(n: usize) -> Self::Len;

    /// The element count, if this mode tracks it.
    fn count(len: Self::Len) -> Option<usize>;

    /// Validate an access to element `index`.
    #[track_caller]
    fn check(rt: &Runtime, addr: usize, len: Self::Len, index: i32);
}

/// Zero-overhead mode: no metadata, no validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unchecked;

/// Hardened mode: element count carried and every access validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checked;

impl PtrMode for Unchecked {
    type Len = ();
    const CHECKED: bool = false;

    #[inline]
    fn len_for(_n: usize) -> Self::Len {}

    #[inline]
    fn count(_len: Self::Len) -> Option<usize> {
        None
    }

    #[inline(always)]
    #[track_caller]
    fn check(_rt: &Runtime, _addr: usize, _len: Self::Len, _index: i32) {}
}

impl PtrMode for Checked {
    type Len = usize;
    const CHECKED: bool = true;

    #[inline]
    fn len_for(n: usize) -> Self::Len {
        n
    }

    #[inline]
    fn count(len: Self::Len) -> Option<usize> {
        Some(len)
    }

    #[inline]
    #[track_caller]
    fn check(rt: &Runtime, addr: usize, len: Self::Len, index: i32) {
        if addr == 0 {
            rt.panic_here(PanicKind::PanicError, "cannot dereference null pointer");
        }
        if index < 0 || index as usize >= len {
            rt.panic_here(
                PanicKind::IndexError,
                format!("ptr access out of bounds: 0x{addr:x}[{index}] (upper bound: {len})"),
            );
        }
    }
}

/// The mode selected for this build.
#[cfg(feature = "checked")]
pub type BuildMode = Checked;

/// The mode selected for this build.
#[cfg(not(feature = "checked"))]
pub type BuildMode = Unchecked;

/// A managed pointer in the build's safety mode.
pub type Ptr<T> = ManagedPtr<T, BuildMode>;

/// A handle to a contiguous run of `T` on the runtime heap.
pub struct ManagedPtr<T, M: PtrMode = BuildMode> {
    addr: *mut T,
    len: M::Len,
    _mode: PhantomData<M>,
}

impl<T, M: PtrMode> Clone for ManagedPtr<T, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, M: PtrMode> Copy for ManagedPtr<T, M> {}

impl<T, M: PtrMode> ManagedPtr<T, M> {
    /// Allocate room for `n` elements. The memory is not initialized.
    #[track_caller]
    pub fn alloc(rt: &Runtime, n: usize) -> Self {
        let layout = match Layout::array::<T>(n) {
            Ok(layout) => layout,
            Err(_) => rt.panic_here(
                PanicKind::PanicError,
                format!("cannot allocate {n} elements: size overflow"),
            ),
        };
        let block = rt.allocate_layout(layout);
        Self {
            addr: block.cast::<T>().as_ptr(),
            len: M::len_for(n),
            _mode: PhantomData,
        }
    }

    /// The null pointer.
    pub fn null() -> Self {
        Self {
            addr: std::ptr::null_mut(),
            len: M::len_for(0),
            _mode: PhantomData,
        }
    }

    /// Wrap an existing address. In checked mode the view is one element
    /// long; longer runs must be tracked by the caller.
    ///
    /// # Safety
    /// `addr` must be null or point to a valid, properly aligned `T`.
    pub unsafe fn from_addr(addr: *mut T) -> Self {
        Self {
            addr,
            len: M::len_for(1),
            _mode: PhantomData,
        }
    }

    #[inline]
    pub fn addr(self) -> *mut T {
        self.addr
    }

    /// Element count in checked mode, `None` in unchecked mode.
    #[inline]
    pub fn count(self) -> Option<usize> {
        M::count(self.len)
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.addr.is_null()
    }

    /// Truth value of the pointer: true iff it is not null.
    #[inline]
    pub fn to_bool(self) -> bool {
        !self.is_null()
    }

    /// Read element `i`.
    ///
    /// # Safety
    /// In unchecked mode the caller guarantees `0 <= i < length`. In both
    /// modes the element must have been initialized.
    #[inline]
    #[track_caller]
    pub unsafe fn load(self, rt: &Runtime, i: i32) -> T
    where
        T: Copy,
    {
        M::check(rt, self.addr as usize, self.len, i);
        unsafe { self.addr.offset(i as isize).read() }
    }

    /// Write element `i`.
    ///
    /// # Safety
    /// In unchecked mode the caller guarantees `0 <= i < length`.
    #[inline]
    #[track_caller]
    pub unsafe fn store(self, rt: &Runtime, i: i32, value: T) {
        M::check(rt, self.addr as usize, self.len, i);
        unsafe { self.addr.offset(i as isize).write(value) }
    }

    /// A pointer to element `i`, as a one-element view in checked mode.
    ///
    /// # Safety
    /// In unchecked mode the caller guarantees `0 <= i < length`.
    #[inline]
    #[track_caller]
    pub unsafe fn get_ref(self, rt: &Runtime, i: i32) -> Self {
        M::check(rt, self.addr as usize, self.len, i);
        Self {
            addr: unsafe { self.addr.offset(i as isize) },
            len: M::len_for(1),
            _mode: PhantomData,
        }
    }
}

impl<T, M: PtrMode> PartialEq for ManagedPtr<T, M> {
    /// Same address, and in checked mode the same element count.
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.len == other.len
    }
}

impl<T, M: PtrMode> Eq for ManagedPtr<T, M> {}

impl<T, M: PtrMode> fmt::Debug for ManagedPtr<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count() {
            Some(n) => write!(f, "ManagedPtr({:p}, length={n})", self.addr),
            None => write!(f, "ManagedPtr({:p})", self.addr),
        }
    }
}
