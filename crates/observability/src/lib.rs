//! Process-wide tracing setup shared by binaries, tests and benchmarks.

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber construction and filtering.
pub mod tracing;
