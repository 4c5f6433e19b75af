//! Untyped byte buffers
//!
//! The standard library lays out struct-like records by hand in a
//! [`RawBuffer`] and reads fields back at byte offsets. Offsets need not be
//! aligned. Values use native byte order.

use std::fmt;
use std::ptr::NonNull;

use super::context::Runtime;
use super::panic::PanicKind;

/// A zeroed heap block with its size. Passed by value across the C ABI.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct RawBuffer {
    ptr: NonNull<u8>,
    size: usize,
}

impl RawBuffer {
    /// Allocate `size` zeroed bytes.
    #[track_caller]
    pub fn alloc(rt: &Runtime, size: usize) -> RawBuffer {
        let block = rt.allocate(size);
        let ptr = block.as_ptr();
        unsafe { ptr.write_bytes(0, size) };
        RawBuffer {
            ptr: block.cast::<u8>(),
            size,
        }
    }

    pub fn size(self) -> usize {
        self.size
    }

    pub fn as_ptr(self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Address of `width` bytes at `offset`, after checking they are in range.
    #[track_caller]
    fn field(self, rt: &Runtime, offset: i32, width: usize) -> *mut u8 {
        let in_range = usize::try_from(offset)
            .ok()
            .and_then(|start| start.checked_add(width))
            .is_some_and(|end| end <= self.size);
        if !in_range {
            rt.panic_here(
                PanicKind::IndexError,
                format!(
                    "rawbuffer access out of bounds: offset {offset}, width {width} (size: {})",
                    self.size
                ),
            );
        }
        unsafe { self.ptr.as_ptr().add(offset as usize) }
    }

    #[track_caller]
    pub fn get_i32(self, rt: &Runtime, offset: i32) -> i32 {
        let at = self.field(rt, offset, size_of::<i32>());
        unsafe { at.cast::<i32>().read_unaligned() }
    }

    #[track_caller]
    pub fn set_i32(self, rt: &Runtime, offset: i32, value: i32) {
        let at = self.field(rt, offset, size_of::<i32>());
        unsafe { at.cast::<i32>().write_unaligned(value) }
    }

    #[track_caller]
    pub fn get_f64(self, rt: &Runtime, offset: i32) -> f64 {
        let at = self.field(rt, offset, size_of::<f64>());
        unsafe { at.cast::<f64>().read_unaligned() }
    }

    #[track_caller]
    pub fn set_f64(self, rt: &Runtime, offset: i32, value: f64) {
        let at = self.field(rt, offset, size_of::<f64>());
        unsafe { at.cast::<f64>().write_unaligned(value) }
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawBuffer({:p}, size={})", self.ptr, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_support::expect_panic;

    #[test]
    fn test_zeroed_on_alloc() {
        let rt = Runtime::new();
        let buf = RawBuffer::alloc(&rt, 16);
        assert_eq!(buf.size(), 16);
        assert_eq!(buf.get_i32(&rt, 0), 0);
        assert_eq!(buf.get_f64(&rt, 8), 0.0);
    }

    #[test]
    fn test_fields_roundtrip_unaligned() {
        let rt = Runtime::new();
        let buf = RawBuffer::alloc(&rt, 13);
        buf.set_i32(&rt, 1, -7);
        buf.set_f64(&rt, 5, 2.5);
        assert_eq!(buf.get_i32(&rt, 1), -7);
        assert_eq!(buf.get_f64(&rt, 5), 2.5);
    }

    #[test]
    fn test_out_of_bounds() {
        for offset in [-1, 13, 10, i32::MAX] {
            let record = expect_panic(|rt| {
                let buf = RawBuffer::alloc(rt, 13);
                buf.get_i32(rt, offset)
            });
            assert_eq!(record.kind, PanicKind::IndexError);
            assert!(record.message.starts_with("rawbuffer access out of bounds"));
        }

        let record = expect_panic(|rt| RawBuffer::alloc(rt, 8).set_f64(rt, 1, 0.0));
        assert_eq!(record.kind, PanicKind::IndexError);
    }

    #[test]
    fn test_last_field_fits() {
        let rt = Runtime::new();
        let buf = RawBuffer::alloc(&rt, 12);
        buf.set_i32(&rt, 8, 99);
        assert_eq!(buf.get_i32(&rt, 8), 99);
    }
}
