//! Fatal error types.
//!
//! Recoverable conditions (malformed events, subscriber write failures,
//! unknown event types) are logged at the point of occurrence and never
//! surfaced as `Result`s across task boundaries. The only error type that
//! crosses a function boundary is [`BindError`], which is fatal: the
//! process cannot usefully run without both TCP ports.

use std::fmt;

#[derive(Debug)]
pub struct BindError {
    context: String,
    source: std::io::Error,
}

impl BindError {
    pub fn new(context: impl Into<String>, source: std::io::Error) -> Self {
        BindError {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to bind {}: {}", self.context, self.source)
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
