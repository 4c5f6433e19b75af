//! Value runtime for the spy language
//!
//! Compiled spy programs link against this crate, built as a static library,
//! and call into it through the extern "C" stubs in [`runtime::stubs`]. Rust
//! hosts can use the same primitives directly through [`Runtime`].

pub mod runtime;

// Re-export runtime for static library builds
pub use runtime::*;

#[cfg(test)]
mod tests;
