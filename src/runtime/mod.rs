//! Runtime kernel for compiled spy code
//!
//! This module provides the primitives that native-compiled programs call
//! into. It separates:
//! - Memory allocation behind an injectable policy (heap.rs)
//! - Managed pointers in checked or unchecked mode (ptr.rs)
//! - Immutable strings and number formatting (str.rs, numfmt.rs)
//! - Language-level arithmetic (operator.rs)
//! - The panic protocol (panic.rs)
//! - Extern "C" stubs callable from AOT code (stubs.rs)
//!
//! All state hangs off a [`Runtime`] value; there are no process-wide globals.

pub mod abi_version;
pub mod config;
pub mod context;
pub mod error;
pub mod heap;
pub mod host;
pub mod numfmt;
pub mod operator;
pub mod panic;
pub mod ptr;
pub mod rawbuffer;
pub mod str;
pub mod stubs;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use abi_version::ABI_VERSION;
pub use config::RuntimeConfig;
pub use context::Runtime;
pub use error::{Result, RuntimeError};
pub use heap::{AllocPolicy, Allocator, BumpAllocator, GcRef, HeapConfig, HeapStats, LeakAllocator};
pub use host::{Handler, Response, invoke};
pub use operator::{FloatOps, IntOps};
pub use panic::{PanicAction, PanicConfig, PanicKind, PanicRecord, PanicSink, SourceLoc};
pub use ptr::{BuildMode, Checked, ManagedPtr, Ptr, PtrMode, Unchecked};
pub use rawbuffer::RawBuffer;
pub use str::{Str, StrHeader};
