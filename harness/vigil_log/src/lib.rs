//! Instrumentation log collection.
//!
//! Instrumented binaries (playground-transformed programs) write one log
//! record per line to stdout:
//!
//! ```text
//! [15:54-17:2] __builtin_log_scope_entry
//! [15:14-15:16] __builtin_log[lhs='3']
//! [17:1-17:2] __builtin_log_scope_exit
//! ```
//!
//! [`collect`] turns that stream into ordered [`LogEvent`]s. Lines without a
//! known tag are kept as opaque events so they still take part in matching.

mod collector;
mod event;

pub use collector::{collect, collect_bytes, CollectError, LogCollector, LogTags};
pub use event::{LogEvent, LogEventKind, SourceRange};
