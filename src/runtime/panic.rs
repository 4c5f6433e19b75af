//! Panic protocol
//!
//! Every checked operation that cannot proceed ends up here. A panic is
//! reported to the runtime's [`PanicSink`] (kind, message, location and, when
//! the source file can be found, the offending source line) and then the
//! current execution is terminated. Nothing returns from a panic.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Failure classes raised by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanicKind {
    /// Division, floor division or modulo by zero.
    ZeroDivisionError,
    /// Out-of-bounds pointer, buffer or string access.
    IndexError,
    /// Null dereference, debug-build assertion, broken internal invariant.
    PanicError,
}

impl PanicKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PanicKind::ZeroDivisionError => "ZeroDivisionError",
            PanicKind::IndexError => "IndexError",
            PanicKind::PanicError => "PanicError",
        }
    }
}

impl fmt::Display for PanicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown panic kind name.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("unknown panic kind: {0}")]
pub struct UnknownPanicKind(pub String);

impl FromStr for PanicKind {
    type Err = UnknownPanicKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ZeroDivisionError" => Ok(PanicKind::ZeroDivisionError),
            "IndexError" => Ok(PanicKind::IndexError),
            "PanicError" => Ok(PanicKind::PanicError),
            other => Err(UnknownPanicKind(other.to_string())),
        }
    }
}

/// A source position: file name and 1-based line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: Cow<'static, str>,
    pub line: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The location of the caller, propagated through `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self::new(loc.file(), loc.line())
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Everything known about one panic. Created at the failure site and handed
/// straight to the sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanicRecord {
    pub kind: PanicKind,
    pub message: String,
    pub loc: SourceLoc,
}

impl fmt::Display for PanicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.message, self.loc)
    }
}

/// What happens after the sink has reported a panic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicAction {
    /// Abort the process.
    #[default]
    Abort,
    /// Unwind with the [`PanicRecord`] as payload, so a host that isolates
    /// executions (e.g. a test harness) can observe it. Control still never
    /// returns to the code that panicked.
    Unwind,
}

/// Panic reporting configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanicConfig {
    pub action: PanicAction,
    /// Echo the offending source line when the file can be read.
    pub echo_source: bool,
    /// Directory relative source paths are resolved against.
    pub source_root: Option<PathBuf>,
}

impl Default for PanicConfig {
    fn default() -> Self {
        Self {
            action: PanicAction::Abort,
            echo_source: true,
            source_root: None,
        }
    }
}

/// Receives panic records before the execution is terminated.
pub trait PanicSink {
    fn report(&self, record: &PanicRecord);
}

/// Read line `line` (1-based) of `file`, resolving relative paths against
/// `root` first and the working directory second.
pub fn source_line(file: &str, line: u32, root: Option<&Path>) -> Option<String> {
    if line == 0 {
        return None;
    }
    let path = Path::new(file);
    let candidates = root
        .filter(|_| path.is_relative())
        .map(|r| r.join(path))
        .into_iter()
        .chain(std::iter::once(path.to_path_buf()));

    for candidate in candidates {
        if let Ok(text) = std::fs::read_to_string(&candidate) {
            return text.lines().nth(line as usize - 1).map(str::to_string);
        }
    }
    None
}

/// Render a record the way the default sink prints it.
pub fn render(record: &PanicRecord, source: Option<&str>) -> String {
    let mut out = format!(
        "panic: {}: {}\n  --> {}\n",
        record.kind, record.message, record.loc
    );
    if let Some(src) = source {
        let gutter = record.loc.line.to_string();
        out.push_str(&format!("{gutter} | {src}\n"));
    }
    out
}

/// The default sink: stderr plus a `tracing` event.
#[derive(Clone, Debug, Default)]
pub struct StderrSink {
    echo_source: bool,
    source_root: Option<PathBuf>,
}

impl StderrSink {
    pub fn new(config: &PanicConfig) -> Self {
        Self {
            echo_source: config.echo_source,
            source_root: config.source_root.clone(),
        }
    }
}

impl PanicSink for StderrSink {
    fn report(&self, record: &PanicRecord) {
        error!(
            kind = record.kind.as_str(),
            file = %record.loc.file,
            line = record.loc.line,
            "{}",
            record.message
        );
        let source = if self.echo_source {
            source_line(&record.loc.file, record.loc.line, self.source_root.as_deref())
        } else {
            None
        };
        let text = render(record, source.as_deref());
        // stderr may be closed; there is nowhere left to report that
        let _ = std::io::stderr().lock().write_all(text.as_bytes());
    }
}
