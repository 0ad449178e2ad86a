//! Structured diagnostics for placement runs.
//!
//! Placement checks report their findings as [`Diagnostic`] values with a
//! severity, a [`DiagnosticCode`] and an optional subject (the block, net or
//! cost term involved). The thread-safe [`DiagnosticSink`] collects them and
//! [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
