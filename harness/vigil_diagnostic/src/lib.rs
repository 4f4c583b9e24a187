//! Diagnostic collection and verification.
//!
//! A compiler run under `-verify` prints diagnostics like
//!
//! ```text
//! main.swift:7:1: error: 'UIApplicationMain' attribute can only apply to one class in a module
//! main.swift:7:1: note: use @main instead
//! fix-it:"main.swift":{7:1-7:19}:"@main"
//! ```
//!
//! [`collect`] normalizes that text into [`DiagnosticRecord`]s, keeping
//! emission order and attaching each fix-it to the diagnostic before it.
//! [`verify`] then checks the records against the fixture's
//! `expected-error@-1 {{...}} {{1-19=@main}}` annotations.

mod collector;
mod diagnostic;
mod verify;

pub use collector::{collect, CollectError};
pub use diagnostic::{DiagnosticRecord, FixIt, Position, Severity};
pub use verify::{
    verify, ExpectedDiagnostic, ExpectedFixIt, FixItExpectation, Verification, VerifyProblem,
};
