//! Tracing/logging setup shared by rolegate binaries.

/// Tracing subscriber installation.
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging with JSON output.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::Json);
}

/// Initialize process-wide logging with the given output format.
pub fn init_with(format: LogFormat) {
    tracing::init(format);
}
