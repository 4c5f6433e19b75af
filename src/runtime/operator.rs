//! Arithmetic operators
//!
//! Division follows the source language rather than Rust: integer `/` is true
//! division returning `f64`, `//` floors towards negative infinity, and `%`
//! takes the sign of the divisor.
//!
//! Every division comes in two forms. The plain form always checks for a zero
//! divisor and raises `ZeroDivisionError`. The `unchecked_` form is what
//! compiled code uses when the checker has proven the divisor non-zero; it
//! only checks in `checked` builds, where a violation is a `PanicError`.
//!
//! Signed `MIN // -1` wraps to `MIN` and `MIN % -1` is `0`.

use super::context::Runtime;
use super::panic::PanicKind;

const INT_DIV_ZERO: &str = "division by zero";
const INT_FLOORDIV_ZERO: &str = "integer division or modulo by zero";
const INT_MOD_ZERO: &str = "integer modulo by zero";
const FLOAT_DIV_ZERO: &str = "float division by zero";
const FLOAT_FLOORDIV_ZERO: &str = "float floor division by zero";
const FLOAT_MOD_ZERO: &str = "float modulo by zero";

/// Raise for a zero divisor in an unchecked operator. No-op in builds
/// without the `checked` feature.
#[inline(always)]
#[track_caller]
fn debug_zero_check(rt: &Runtime, is_zero: bool, message: &'static str) {
    if cfg!(feature = "checked") && is_zero {
        rt.panic_here(PanicKind::PanicError, message);
    }
}

// ============================================================================
// Integers
// ============================================================================

pub trait IntOps: Copy {
    /// `x / y`, as a float.
    fn truediv(self, rt: &Runtime, y: Self) -> f64;
    /// `x // y`
    fn floordiv(self, rt: &Runtime, y: Self) -> Self;
    /// `x % y`
    fn modulo(self, rt: &Runtime, y: Self) -> Self;
    fn unchecked_truediv(self, rt: &Runtime, y: Self) -> f64;
    fn unchecked_floordiv(self, rt: &Runtime, y: Self) -> Self;
    fn unchecked_modulo(self, rt: &Runtime, y: Self) -> Self;
}

/// Quotient and remainder with the quotient rounded towards negative infinity.
/// `y` must be non-zero.
trait FloorDivMod: Sized {
    fn floor_divmod(self, y: Self) -> (Self, Self);
}

macro_rules! floor_divmod_signed {
    ($($t:ty),*) => {$(
        impl FloorDivMod for $t {
            #[inline]
            fn floor_divmod(self, y: $t) -> ($t, $t) {
                let mut q = self.wrapping_div(y);
                let mut r = self.wrapping_rem(y);
                if r != 0 && (r < 0) != (y < 0) {
                    q = q.wrapping_sub(1);
                    r = r.wrapping_add(y);
                }
                (q, r)
            }
        }
    )*};
}

macro_rules! floor_divmod_unsigned {
    ($($t:ty),*) => {$(
        impl FloorDivMod for $t {
            #[inline]
            fn floor_divmod(self, y: $t) -> ($t, $t) {
                (self / y, self % y)
            }
        }
    )*};
}

floor_divmod_signed!(i8, i32);
floor_divmod_unsigned!(u8, u32);

macro_rules! impl_int_ops {
    ($($t:ty),*) => {$(
        impl IntOps for $t {
            #[inline]
            #[track_caller]
            fn truediv(self, rt: &Runtime, y: $t) -> f64 {
                if y == 0 {
                    rt.panic_here(PanicKind::ZeroDivisionError, INT_DIV_ZERO);
                }
                self as f64 / y as f64
            }

            #[inline]
            #[track_caller]
            fn floordiv(self, rt: &Runtime, y: $t) -> $t {
                if y == 0 {
                    rt.panic_here(PanicKind::ZeroDivisionError, INT_FLOORDIV_ZERO);
                }
                self.floor_divmod(y).0
            }

            #[inline]
            #[track_caller]
            fn modulo(self, rt: &Runtime, y: $t) -> $t {
                if y == 0 {
                    rt.panic_here(PanicKind::ZeroDivisionError, INT_MOD_ZERO);
                }
                self.floor_divmod(y).1
            }

            #[inline]
            #[track_caller]
            fn unchecked_truediv(self, rt: &Runtime, y: $t) -> f64 {
                debug_zero_check(rt, y == 0, INT_DIV_ZERO);
                self as f64 / y as f64
            }

            #[inline]
            #[track_caller]
            fn unchecked_floordiv(self, rt: &Runtime, y: $t) -> $t {
                debug_zero_check(rt, y == 0, INT_FLOORDIV_ZERO);
                self.floor_divmod(y).0
            }

            #[inline]
            #[track_caller]
            fn unchecked_modulo(self, rt: &Runtime, y: $t) -> $t {
                debug_zero_check(rt, y == 0, INT_MOD_ZERO);
                self.floor_divmod(y).1
            }
        }
    )*};
}

impl_int_ops!(i8, i32, u8, u32);

/// `abs(x)`; `abs(i32::MIN)` wraps to `i32::MIN`.
#[inline]
pub fn abs_i32(x: i32) -> i32 {
    x.wrapping_abs()
}

#[inline]
pub fn min_i32(x: i32, y: i32) -> i32 {
    x.min(y)
}

#[inline]
pub fn max_i32(x: i32, y: i32) -> i32 {
    x.max(y)
}

// ============================================================================
// Floats
// ============================================================================

pub trait FloatOps: Copy {
    fn truediv(self, rt: &Runtime, y: Self) -> Self;
    /// `floor(x / y)`
    fn floordiv(self, rt: &Runtime, y: Self) -> Self;
    /// `fmod(x, y)` moved to the sign of `y`.
    fn modulo(self, rt: &Runtime, y: Self) -> Self;
    fn unchecked_truediv(self, rt: &Runtime, y: Self) -> Self;
    fn unchecked_floordiv(self, rt: &Runtime, y: Self) -> Self;
    fn unchecked_modulo(self, rt: &Runtime, y: Self) -> Self;
    /// Plain IEEE-754 division: `x / 0.0` is `±inf` or `nan`.
    fn ieee754_div(self, y: Self) -> Self;
}

macro_rules! impl_float_ops {
    ($($t:ty),*) => {$(
        impl FloatOps for $t {
            #[inline]
            #[track_caller]
            fn truediv(self, rt: &Runtime, y: $t) -> $t {
                if y == 0.0 {
                    rt.panic_here(PanicKind::ZeroDivisionError, FLOAT_DIV_ZERO);
                }
                self / y
            }

            #[inline]
            #[track_caller]
            fn floordiv(self, rt: &Runtime, y: $t) -> $t {
                if y == 0.0 {
                    rt.panic_here(PanicKind::ZeroDivisionError, FLOAT_FLOORDIV_ZERO);
                }
                (self / y).floor()
            }

            #[inline]
            #[track_caller]
            fn modulo(self, rt: &Runtime, y: $t) -> $t {
                if y == 0.0 {
                    rt.panic_here(PanicKind::ZeroDivisionError, FLOAT_MOD_ZERO);
                }
                float_mod(self as f64, y as f64) as $t
            }

            #[inline]
            #[track_caller]
            fn unchecked_truediv(self, rt: &Runtime, y: $t) -> $t {
                debug_zero_check(rt, y == 0.0, FLOAT_DIV_ZERO);
                self / y
            }

            #[inline]
            #[track_caller]
            fn unchecked_floordiv(self, rt: &Runtime, y: $t) -> $t {
                debug_zero_check(rt, y == 0.0, FLOAT_FLOORDIV_ZERO);
                (self / y).floor()
            }

            #[inline]
            #[track_caller]
            fn unchecked_modulo(self, rt: &Runtime, y: $t) -> $t {
                debug_zero_check(rt, y == 0.0, FLOAT_MOD_ZERO);
                float_mod(self as f64, y as f64) as $t
            }

            #[inline]
            fn ieee754_div(self, y: $t) -> $t {
                self / y
            }
        }
    )*};
}

/// `fmod` moved to the sign of the divisor; a zero result carries the
/// divisor's sign too. Exact for `f32` operands as well.
#[inline]
fn float_mod(x: f64, y: f64) -> f64 {
    let r = x % y;
    if r == 0.0 {
        0.0f64.copysign(y)
    } else if (r < 0.0) != (y < 0.0) {
        r + y
    } else {
        r
    }
}

impl_float_ops!(f32, f64);

// ============================================================================
// Conversions
// ============================================================================

// Float to integer saturates at the target's bounds; NaN converts to 0.

#[inline]
pub fn f64_to_i32(x: f64) -> i32 {
    x as i32
}

#[inline]
pub fn f64_to_i8(x: f64) -> i8 {
    x as i8
}

#[inline]
pub fn f64_to_u8(x: f64) -> u8 {
    x as u8
}

#[inline]
pub fn f32_to_i32(x: f32) -> i32 {
    x as i32
}

#[inline]
pub fn i32_to_f64(x: i32) -> f64 {
    x as f64
}

#[inline]
pub fn i32_to_bool(x: i32) -> bool {
    x != 0
}

// Narrowing integer conversions wrap.

#[inline]
pub fn i32_to_i8(x: i32) -> i8 {
    x as i8
}

#[inline]
pub fn i32_to_u8(x: i32) -> u8 {
    x as u8
}

#[inline]
pub fn i8_to_i32(x: i8) -> i32 {
    x as i32
}

#[inline]
pub fn u8_to_i32(x: u8) -> i32 {
    x as i32
}

// ============================================================================
// Booleans
// ============================================================================

#[inline]
pub fn bool_and(a: bool, b: bool) -> bool {
    a & b
}

#[inline]
pub fn bool_or(a: bool, b: bool) -> bool {
    a | b
}

#[inline]
pub fn bool_xor(a: bool, b: bool) -> bool {
    a ^ b
}

#[inline]
pub fn bool_not(a: bool) -> bool {
    !a
}

#[inline]
pub fn bool_eq(a: bool, b: bool) -> bool {
    a == b
}

#[inline]
pub fn bool_ne(a: bool, b: bool) -> bool {
    a != b
}

#[inline]
pub fn bool_lt(a: bool, b: bool) -> bool {
    !a & b
}

#[inline]
pub fn bool_le(a: bool, b: bool) -> bool {
    !a | b
}

#[inline]
pub fn bool_gt(a: bool, b: bool) -> bool {
    a & !b
}

#[inline]
pub fn bool_ge(a: bool, b: bool) -> bool {
    a | !b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_support::expect_panic;

    #[test]
    fn test_int_floordiv_rounds_down() {
        let rt = Runtime::new();
        assert_eq!(7i32.floordiv(&rt, 2), 3);
        assert_eq!((-7i32).floordiv(&rt, 2), -4);
        assert_eq!(7i32.floordiv(&rt, -2), -4);
        assert_eq!((-7i32).floordiv(&rt, -2), 3);
        assert_eq!((-6i32).floordiv(&rt, 3), -2);
        assert_eq!((-7i8).floordiv(&rt, 2), -4);
        assert_eq!(7u8.floordiv(&rt, 2), 3);
        assert_eq!(u32::MAX.floordiv(&rt, 2), u32::MAX / 2);
    }

    #[test]
    fn test_int_modulo_takes_divisor_sign() {
        let rt = Runtime::new();
        assert_eq!(7i32.modulo(&rt, 3), 1);
        assert_eq!((-7i32).modulo(&rt, 3), 2);
        assert_eq!(7i32.modulo(&rt, -3), -2);
        assert_eq!((-7i32).modulo(&rt, -3), -1);
        assert_eq!((-6i32).modulo(&rt, 3), 0);
        assert_eq!((-1i8).modulo(&rt, 10), 9);
        assert_eq!(250u8.modulo(&rt, 7), 5);
    }

    #[test]
    fn test_int_min_over_minus_one_wraps() {
        let rt = Runtime::new();
        assert_eq!(i32::MIN.floordiv(&rt, -1), i32::MIN);
        assert_eq!(i32::MIN.modulo(&rt, -1), 0);
        assert_eq!(i8::MIN.floordiv(&rt, -1), i8::MIN);
        assert_eq!(i8::MIN.modulo(&rt, -1), 0);
        assert_eq!(i32::MIN.unchecked_floordiv(&rt, -1), i32::MIN);
    }

    #[test]
    fn test_int_truediv_is_float() {
        let rt = Runtime::new();
        assert_eq!(7i32.truediv(&rt, 2), 3.5);
        assert_eq!((-1i32).truediv(&rt, 4), -0.25);
        assert_eq!(9u8.unchecked_truediv(&rt, 3), 3.0);
    }

    #[test]
    fn test_int_division_by_zero() {
        let cases: [(fn(&Runtime), &str); 3] = [
            (|rt| { let _ = 1i32.truediv(rt, 0); }, "division by zero"),
            (|rt| { let _ = 1i32.floordiv(rt, 0); }, "integer division or modulo by zero"),
            (|rt| { let _ = 1i32.modulo(rt, 0); }, "integer modulo by zero"),
        ];
        for (op, message) in cases {
            let record = expect_panic(op);
            assert_eq!(record.kind, PanicKind::ZeroDivisionError);
            assert_eq!(record.message, message);
        }
        let record = expect_panic(|rt| 3u8.floordiv(rt, 0));
        assert_eq!(record.kind, PanicKind::ZeroDivisionError);
    }

    #[test]
    fn test_float_ops() {
        let rt = Runtime::new();
        assert_eq!(7.0f64.truediv(&rt, 2.0), 3.5);
        assert_eq!((-7.0f64).floordiv(&rt, 2.0), -4.0);
        assert_eq!((-7.0f64).modulo(&rt, 3.0), 2.0);
        assert_eq!(7.0f64.modulo(&rt, -3.0), -2.0);
        assert_eq!(5.5f32.modulo(&rt, 2.0), 1.5);
        assert!(6.0f64.modulo(&rt, -3.0).is_sign_negative());
        assert!((-6.0f64).modulo(&rt, 3.0).is_sign_positive());
    }

    #[test]
    fn test_float_division_by_zero() {
        let cases: [(fn(&Runtime), &str); 3] = [
            (|rt| { let _ = 1.0f64.truediv(rt, 0.0); }, "float division by zero"),
            (|rt| { let _ = 1.0f64.floordiv(rt, 0.0); }, "float floor division by zero"),
            (|rt| { let _ = 1.0f32.modulo(rt, -0.0); }, "float modulo by zero"),
        ];
        for (op, message) in cases {
            let record = expect_panic(op);
            assert_eq!(record.kind, PanicKind::ZeroDivisionError);
            assert_eq!(record.message, message);
        }
    }

    #[test]
    fn test_ieee754_div() {
        assert_eq!(1.0f64.ieee754_div(0.0), f64::INFINITY);
        assert_eq!((-1.0f64).ieee754_div(0.0), f64::NEG_INFINITY);
        assert!(0.0f32.ieee754_div(0.0).is_nan());
    }

    #[cfg(feature = "checked")]
    #[test]
    fn test_unchecked_ops_check_in_checked_builds() {
        let record = expect_panic(|rt| 1i32.unchecked_floordiv(rt, 0));
        assert_eq!(record.kind, PanicKind::PanicError);
        assert_eq!(record.message, "integer division or modulo by zero");

        let record = expect_panic(|rt| 1.0f64.unchecked_truediv(rt, 0.0));
        assert_eq!(record.kind, PanicKind::PanicError);
        assert_eq!(record.message, "float division by zero");
    }

    #[cfg(not(feature = "checked"))]
    #[test]
    fn test_unchecked_float_ops_do_not_check() {
        let rt = Runtime::new();
        assert_eq!(1.0f64.unchecked_truediv(&rt, 0.0), f64::INFINITY);
        assert!(1.0f64.unchecked_modulo(&rt, 0.0).is_nan());
    }

    #[test]
    fn test_saturating_float_conversions() {
        assert_eq!(f64_to_i32(3.9), 3);
        assert_eq!(f64_to_i32(-3.9), -3);
        assert_eq!(f64_to_i32(1e20), i32::MAX);
        assert_eq!(f64_to_i32(-1e20), i32::MIN);
        assert_eq!(f64_to_i32(f64::NAN), 0);
        assert_eq!(f64_to_i8(300.0), i8::MAX);
        assert_eq!(f64_to_u8(-5.0), 0);
        assert_eq!(f32_to_i32(f32::INFINITY), i32::MAX);
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(i32_to_f64(-3), -3.0);
        assert!(i32_to_bool(-1));
        assert!(!i32_to_bool(0));
        assert_eq!(i32_to_i8(300), 44);
        assert_eq!(i32_to_u8(-1), 255);
        assert_eq!(i8_to_i32(-128), -128);
        assert_eq!(u8_to_i32(255), 255);
    }

    #[test]
    fn test_builtins() {
        assert_eq!(abs_i32(-5), 5);
        assert_eq!(abs_i32(i32::MIN), i32::MIN);
        assert_eq!(min_i32(3, -2), -2);
        assert_eq!(max_i32(3, -2), 3);
    }

    #[test]
    fn test_bool_ops_match_ordering() {
        for a in [false, true] {
            for b in [false, true] {
                assert_eq!(bool_and(a, b), a && b);
                assert_eq!(bool_or(a, b), a || b);
                assert_eq!(bool_xor(a, b), a != b);
                assert_eq!(bool_eq(a, b), a == b);
                assert_eq!(bool_ne(a, b), a != b);
                assert_eq!(bool_lt(a, b), a < b);
                assert_eq!(bool_le(a, b), a <= b);
                assert_eq!(bool_gt(a, b), a > b);
                assert_eq!(bool_ge(a, b), a >= b);
            }
            assert_eq!(bool_not(a), !a);
        }
    }
}
