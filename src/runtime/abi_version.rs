//! Version of the C ABI exported by [`stubs`](super::stubs).
//!
//! Bump `ABI_VERSION` whenever a stub signature or an object layout changes.

pub const ABI_VERSION: u32 = 1;

/// Prefix shared by every exported symbol.
pub const ABI_NAME: &str = "spy";
