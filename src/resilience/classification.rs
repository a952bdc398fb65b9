//! # Error Classification
//!
//! Breaker and retry policies are configured with sets of error kind names.
//! Errors report their kind through [`ClassifiableError`], and [`matches_kind`]
//! applies the include/exclude precedence shared by both stages: the exclude
//! set is always consulted first, and an empty include set admits every kind.

use std::collections::HashSet;

/// An error that can report a stable kind label
///
/// The label is matched against configured kind sets such as
/// `excluded_error_kinds` or `non_retryable_error_kinds`, so it should be
/// stable across releases (e.g. `"timeout"`, `"connection_refused"`).
pub trait ClassifiableError {
    fn error_kind(&self) -> &str;
}

/// String errors are classified by their text
impl ClassifiableError for String {
    fn error_kind(&self) -> &str {
        self
    }
}

impl ClassifiableError for &'static str {
    fn error_kind(&self) -> &str {
        self
    }
}

impl ClassifiableError for std::io::Error {
    fn error_kind(&self) -> &str {
        use std::io::ErrorKind as Io;
        match self.kind() {
            Io::TimedOut => "timeout",
            Io::ConnectionRefused => "connection_refused",
            Io::ConnectionReset => "connection_reset",
            Io::ConnectionAborted => "connection_aborted",
            Io::NotConnected => "not_connected",
            Io::BrokenPipe => "broken_pipe",
            Io::Interrupted => "interrupted",
            Io::NotFound => "not_found",
            Io::PermissionDenied => "permission_denied",
            Io::InvalidInput => "invalid_input",
            Io::InvalidData => "invalid_data",
            Io::WouldBlock => "would_block",
            _ => "io",
        }
    }
}

impl ClassifiableError for tokio::time::error::Elapsed {
    fn error_kind(&self) -> &str {
        "timeout"
    }
}

/// Exclude-first matching shared by breaker and retry configuration
pub fn matches_kind(include: &HashSet<String>, exclude: &HashSet<String>, kind: &str) -> bool {
    if exclude.contains(kind) {
        return false;
    }
    include.is_empty() || include.contains(kind)
}
