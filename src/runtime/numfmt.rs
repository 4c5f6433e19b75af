//! Number-to-string conversion
//!
//! Integers print in decimal. Floats print the way C's `%g` does with the
//! default precision of 6 significant digits, so `1e6` is `1e+06` and
//! `0.1` is `0.1`. All formatting happens in a fixed stack buffer.

use std::fmt::{self, Write};

use super::context::Runtime;
use super::panic::PanicKind;
use super::str::Str;

/// Significant digits used by `%g`.
const PRECISION: i32 = 6;

/// Room for the longest `%g` output (`-1.23457e+308`) with slack.
const NUM_BUF: usize = 32;

/// A fixed-capacity `fmt::Write` target. Writes past capacity fail.
pub struct StackBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> StackBuf<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only whole `&str`s are ever appended.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for StackBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Write for StackBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len.checked_add(s.len()).ok_or(fmt::Error)?;
        if end > N {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Strip trailing zeros from a fixed-point mantissa, and the point if
/// nothing follows it.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Write `x` as C's `%g` would.
pub fn write_g(out: &mut impl Write, x: f64) -> fmt::Result {
    if x.is_nan() {
        return out.write_str("nan");
    }
    if x.is_infinite() {
        return out.write_str(if x < 0.0 { "-inf" } else { "inf" });
    }
    if x == 0.0 {
        return out.write_str(if x.is_sign_negative() { "-0" } else { "0" });
    }

    // The exponent is taken after rounding to PRECISION digits, so 999999.5
    // lands in exponent form like it does in C.
    let mut sci = StackBuf::<NUM_BUF>::new();
    write!(sci, "{:.*e}", (PRECISION - 1) as usize, x)?;
    let (mantissa, exp) = sci.as_str().split_once('e').ok_or(fmt::Error)?;
    let exp: i32 = exp.parse().map_err(|_| fmt::Error)?;

    if exp < -4 || exp >= PRECISION {
        out.write_str(trim_fraction(mantissa))?;
        let sign = if exp < 0 { '-' } else { '+' };
        write!(out, "e{sign}{:02}", exp.unsigned_abs())
    } else {
        let mut fixed = StackBuf::<NUM_BUF>::new();
        write!(fixed, "{:.*}", (PRECISION - 1 - exp) as usize, x)?;
        out.write_str(trim_fraction(fixed.as_str()))
    }
}

impl Str {
    #[track_caller]
    fn from_fmt(rt: &Runtime, args: fmt::Arguments<'_>) -> Str {
        let mut buf = StackBuf::<NUM_BUF>::new();
        if buf.write_fmt(args).is_err() {
            rt.panic_here(PanicKind::PanicError, "number does not fit the format buffer");
        }
        Str::from_bytes(rt, buf.as_bytes())
    }

    #[track_caller]
    pub fn from_i32(rt: &Runtime, n: i32) -> Str {
        Self::from_fmt(rt, format_args!("{n}"))
    }

    #[track_caller]
    pub fn from_i8(rt: &Runtime, n: i8) -> Str {
        Self::from_fmt(rt, format_args!("{n}"))
    }

    #[track_caller]
    pub fn from_u8(rt: &Runtime, n: u8) -> Str {
        Self::from_fmt(rt, format_args!("{n}"))
    }

    #[track_caller]
    pub fn from_u32(rt: &Runtime, n: u32) -> Str {
        Self::from_fmt(rt, format_args!("{n}"))
    }

    #[track_caller]
    pub fn from_f64(rt: &Runtime, x: f64) -> Str {
        let mut buf = StackBuf::<NUM_BUF>::new();
        if write_g(&mut buf, x).is_err() {
            rt.panic_here(PanicKind::PanicError, "number does not fit the format buffer");
        }
        Str::from_bytes(rt, buf.as_bytes())
    }

    #[track_caller]
    pub fn from_f32(rt: &Runtime, x: f32) -> Str {
        Self::from_f64(rt, x as f64)
    }

    pub fn from_bool(rt: &Runtime, b: bool) -> Str {
        Str::new(rt, if b { "True" } else { "False" })
    }
}
