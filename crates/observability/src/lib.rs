//! Tracing/logging setup shared by every binary and test harness that embeds farmlink.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, init_with_filter};

/// Initialize process-wide tracing from `RUST_LOG` (default `info`), JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init();
}
