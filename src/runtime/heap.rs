//! Managed heap for the spy runtime
//!
//! Every runtime object (strings, managed pointers, raw buffers) is carved out
//! of an [`Allocator`]. The allocator is injected into the [`Runtime`] at
//! startup, so the policy is chosen once per runtime instance:
//! - `LeakAllocator`: one system allocation per request, never freed
//! - `BumpAllocator`: chunked bump-pointer arena, chunks never freed
//!
//! A tracing collector plugs in behind the same trait. Code above this layer
//! must behave identically whatever policy is installed.
//!
//! [`Runtime`]: super::Runtime

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

/// Alignment used for untyped byte allocations (`Runtime::allocate`).
pub const MIN_ALIGN: usize = 8;

/// An opaque owning handle to a block returned by an [`Allocator`].
///
/// The handle is just an address: it has no identity beyond it and stays
/// valid until the collector reclaims it (never, for the built-in policies).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct GcRef {
    ptr: NonNull<u8>,
}

impl GcRef {
    /// Wrap a block address.
    #[inline]
    pub fn from_non_null(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    /// Get the raw pointer.
    #[inline]
    pub fn as_ptr(self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Get the address as usize.
    #[inline]
    pub fn addr(self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Reinterpret the block as a pointer to `T`.
    #[inline]
    pub fn cast<T>(self) -> NonNull<T> {
        self.ptr.cast()
    }
}

impl std::fmt::Debug for GcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GcRef({:p})", self.ptr)
    }
}

impl std::fmt::Pointer for GcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Pointer::fmt(&self.ptr, f)
    }
}

/// Allocation counters reported by an allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes handed out to callers (excluding alignment padding).
    pub bytes_allocated: usize,
    /// Number of blocks handed out.
    pub blocks: usize,
}

/// A source of runtime memory.
///
/// # Safety
/// Implementors must return blocks that are at least `layout.size()` bytes
/// long, aligned to `layout.align()`, not aliased by any other live block, and
/// valid for the rest of the process (or until a collector proves them
/// unreachable). Handles are freely copied and dereferenced by the runtime on
/// the strength of this contract.
pub unsafe trait Allocator {
    /// Allocate an uninitialized block. Never fails: exhaustion aborts.
    fn alloc(&self, layout: Layout) -> GcRef;

    /// Short policy name, for logs.
    fn name(&self) -> &'static str;

    /// Counters since creation.
    fn stats(&self) -> HeapStats;

    /// Allocate a block and zero it.
    fn alloc_zeroed(&self, layout: Layout) -> GcRef {
        let block = self.alloc(layout);
        unsafe {
            std::ptr::write_bytes(block.as_ptr(), 0, layout.size());
        }
        block
    }
}

/// Which built-in policy a runtime installs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocPolicy {
    /// System allocation per request, never freed.
    #[default]
    Leak,
    /// Chunked bump allocation, chunks never freed.
    Bump,
}

/// Configuration for the runtime heap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Allocation policy.
    pub policy: AllocPolicy,
    /// Size of each bump chunk in bytes (bump policy only).
    pub chunk_size: usize,
}

impl HeapConfig {
    /// Default bump chunk: 1 MiB.
    pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

    /// Smallest chunk accepted by `validate`.
    pub const MIN_CHUNK_SIZE: usize = 4 * 1024;

    /// Build the allocator this configuration describes.
    pub fn build(&self) -> Box<dyn Allocator> {
        match self.policy {
            AllocPolicy::Leak => Box::new(LeakAllocator::new()),
            AllocPolicy::Bump => Box::new(BumpAllocator::with_chunk_size(self.chunk_size)),
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            policy: AllocPolicy::Leak,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }
}

// =========================================================================
// Exhaustion
// =========================================================================

/// Report an exhausted heap and abort.
#[cold]
fn out_of_memory(policy: &'static str, layout: Layout) -> ! {
    error!(
        policy,
        size = layout.size(),
        align = layout.align(),
        "heap exhausted"
    );
    alloc::handle_alloc_error(layout)
}

/// Raw system allocation that is never returned to the system.
fn system_block(policy: &'static str, layout: Layout) -> NonNull<u8> {
    // The system allocator rejects zero-sized layouts.
    let real = match Layout::from_size_align(layout.size().max(1), layout.align()) {
        Ok(l) => l,
        Err(_) => out_of_memory(policy, layout),
    };
    let ptr = unsafe { alloc::alloc(real) };
    match NonNull::new(ptr) {
        Some(p) => p,
        None => out_of_memory(policy, layout),
    }
}

// =========================================================================
// Leak policy
// =========================================================================

/// The default policy: allocate from the system and never free.
#[derive(Debug, Default)]
pub struct LeakAllocator {
    stats: Cell<HeapStats>,
}

impl LeakAllocator {
    pub fn new() -> Self {
        Self::default()
    }
}

unsafe impl Allocator for LeakAllocator {
    fn alloc(&self, layout: Layout) -> GcRef {
        let ptr = system_block(self.name(), layout);
        let mut stats = self.stats.get();
        stats.bytes_allocated += layout.size();
        stats.blocks += 1;
        self.stats.set(stats);
        GcRef::from_non_null(ptr)
    }

    fn name(&self) -> &'static str {
        "leak"
    }

    fn stats(&self) -> HeapStats {
        self.stats.get()
    }
}

// =========================================================================
// Bump policy
// =========================================================================

/// Bump-pointer allocation out of fixed-size chunks.
///
/// Chunks are requested from the system on demand and never released, so
/// handles stay valid even after the owning runtime is dropped. Requests
/// larger than a quarter chunk get a dedicated block instead of wasting the
/// tail of the current chunk.
pub struct BumpAllocator {
    /// Next free byte in the current chunk.
    cursor: Cell<usize>,
    /// One past the last byte of the current chunk.
    end: Cell<usize>,
    chunk_size: usize,
    chunks: Cell<usize>,
    stats: Cell<HeapStats>,
}

impl Default for BumpAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl BumpAllocator {
    /// Create a bump allocator with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(HeapConfig::DEFAULT_CHUNK_SIZE)
    }

    /// Create a bump allocator with a custom chunk size.
    ///
    /// No memory is reserved until the first allocation.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            cursor: Cell::new(0),
            end: Cell::new(0),
            chunk_size: chunk_size.max(HeapConfig::MIN_CHUNK_SIZE),
            chunks: Cell::new(0),
            stats: Cell::new(HeapStats::default()),
        }
    }

    /// Number of chunks reserved so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.get()
    }

    /// Bytes left in the current chunk.
    pub fn bytes_remaining(&self) -> usize {
        self.end.get() - self.cursor.get()
    }

    fn try_bump(&self, layout: Layout) -> Option<usize> {
        let start = self.cursor.get().checked_add(layout.align() - 1)? & !(layout.align() - 1);
        let new_cursor = start.checked_add(layout.size())?;
        if self.cursor.get() == 0 || new_cursor > self.end.get() {
            return None;
        }
        self.cursor.set(new_cursor);
        Some(start)
    }

    fn refill(&self) {
        let layout = match Layout::from_size_align(self.chunk_size, MIN_ALIGN) {
            Ok(l) => l,
            Err(_) => out_of_memory(self.name(), Layout::new::<u8>()),
        };
        let chunk = system_block(self.name(), layout).as_ptr() as usize;
        self.cursor.set(chunk);
        self.end.set(chunk + self.chunk_size);
        self.chunks.set(self.chunks.get() + 1);
        debug!(
            chunk_size = self.chunk_size,
            chunks = self.chunks.get(),
            "bump heap refilled"
        );
    }

    fn record(&self, size: usize) {
        let mut stats = self.stats.get();
        stats.bytes_allocated += size;
        stats.blocks += 1;
        self.stats.set(stats);
    }
}

unsafe impl Allocator for BumpAllocator {
    fn alloc(&self, layout: Layout) -> GcRef {
        self.record(layout.size());

        if layout.size() > self.chunk_size / 4 || layout.align() > MIN_ALIGN {
            trace!(size = layout.size(), "dedicated block for large request");
            return GcRef::from_non_null(system_block(self.name(), layout));
        }

        let addr = match self.try_bump(layout) {
            Some(addr) => addr,
            None => {
                self.refill();
                match self.try_bump(layout) {
                    Some(addr) => addr,
                    None => out_of_memory(self.name(), layout),
                }
            }
        };
        match NonNull::new(addr as *mut u8) {
            Some(p) => GcRef::from_non_null(p),
            None => out_of_memory(self.name(), layout),
        }
    }

    fn name(&self) -> &'static str {
        "bump"
    }

    fn stats(&self) -> HeapStats {
        self.stats.get()
    }
}
