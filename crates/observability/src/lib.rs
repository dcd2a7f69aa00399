//! Process-wide tracing setup shared by the binaries.

pub mod logging;

pub use logging::LogFormat;

/// Initialize tracing from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    logging::init(LogFormat::from_env());
}
