//! The runtime context
//!
//! A [`Runtime`] bundles what would otherwise be process-wide state: the
//! configuration, the injected allocator and the panic sink. Compiled code
//! receives one at startup and threads it through every call that may
//! allocate or panic. Several runtimes can live in one process without
//! sharing anything.

use std::alloc::Layout;
use std::cell::Cell;

use tracing::{debug, error};

use super::config::RuntimeConfig;
use super::heap::{Allocator, GcRef, HeapStats, MIN_ALIGN};
use super::panic::{PanicAction, PanicKind, PanicRecord, PanicSink, SourceLoc, StderrSink};

pub struct Runtime {
    config: RuntimeConfig,
    heap: Box<dyn Allocator>,
    sink: Box<dyn PanicSink>,
    /// Running -> Panicking, never back.
    panicking: Cell<bool>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime from a configuration, using the built-in allocator
    /// policy it names and the stderr panic sink.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let heap = config.heap.build();
        let sink = Box::new(StderrSink::new(&config.panic));
        Self::with_parts(config, heap, sink)
    }

    /// Create a runtime with an injected allocator and panic sink.
    pub fn with_parts(
        config: RuntimeConfig,
        heap: Box<dyn Allocator>,
        sink: Box<dyn PanicSink>,
    ) -> Self {
        debug!(
            policy = heap.name(),
            panic_action = ?config.panic.action,
            "runtime created"
        );
        Self {
            config,
            heap,
            sink,
            panicking: Cell::new(false),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn heap(&self) -> &dyn Allocator {
        self.heap.as_ref()
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Allocate `size` uninitialized bytes, aligned to [`MIN_ALIGN`].
    #[track_caller]
    pub fn allocate(&self, size: usize) -> GcRef {
        match Layout::from_size_align(size, MIN_ALIGN) {
            Ok(layout) => self.heap.alloc(layout),
            Err(_) => self.panic_here(
                PanicKind::PanicError,
                format!("allocation of {size} bytes is too large"),
            ),
        }
    }

    /// Allocate for an explicit layout.
    pub fn allocate_layout(&self, layout: Layout) -> GcRef {
        self.heap.alloc(layout)
    }

    /// Whether this runtime has already panicked.
    pub fn is_panicking(&self) -> bool {
        self.panicking.get()
    }

    /// Report a panic and terminate the current execution.
    pub fn panic(&self, kind: PanicKind, message: impl Into<String>, loc: SourceLoc) -> ! {
        let record = PanicRecord {
            kind,
            message: message.into(),
            loc,
        };
        if self.panicking.replace(true) {
            error!(%record, "panic while panicking, aborting");
            std::process::abort();
        }
        self.sink.report(&record);
        match self.config.panic.action {
            PanicAction::Abort => std::process::abort(),
            PanicAction::Unwind => std::panic::resume_unwind(Box::new(record)),
        }
    }

    /// Report a panic located at the caller.
    #[track_caller]
    pub fn panic_here(&self, kind: PanicKind, message: impl Into<String>) -> ! {
        self.panic(kind, message, SourceLoc::caller())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("heap", &self.heap.name())
            .field("panic_action", &self.config.panic.action)
            .field("panicking", &self.panicking.get())
            .finish()
    }
}
