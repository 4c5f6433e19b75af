//! Helpers for observing runtime panics from unit tests.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use super::config::RuntimeConfig;
use super::context::Runtime;
use super::heap::LeakAllocator;
use super::panic::{PanicAction, PanicRecord, PanicSink};

/// A sink that keeps every record it sees.
#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<PanicRecord>>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<PanicRecord> {
        self.records.borrow().clone()
    }
}

impl PanicSink for RecordingSink {
    fn report(&self, record: &PanicRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}

/// A runtime that unwinds on panic and reports into `sink`.
pub fn unwinding_runtime(sink: RecordingSink) -> Runtime {
    let mut config = RuntimeConfig::default();
    config.panic.action = PanicAction::Unwind;
    config.panic.echo_source = false;
    Runtime::with_parts(config, Box::new(LeakAllocator::new()), Box::new(sink))
}

/// Run `f` on a fresh unwinding runtime and return the panic it raised.
///
/// Fails the test if `f` returns normally or panics for a reason other than
/// a runtime panic.
pub fn expect_panic<R>(f: impl FnOnce(&Runtime) -> R) -> PanicRecord {
    expect_panic_with(RecordingSink::default(), f)
}

pub fn expect_panic_with<R>(sink: RecordingSink, f: impl FnOnce(&Runtime) -> R) -> PanicRecord {
    let rt = unwinding_runtime(sink);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        f(&rt);
    }));
    match outcome {
        Ok(()) => panic!("expected a runtime panic, but the call returned"),
        Err(payload) => match payload.downcast::<PanicRecord>() {
            Ok(record) => *record,
            Err(_) => panic!("expected a runtime panic, got a Rust panic"),
        },
    }
}
