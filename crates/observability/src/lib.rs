//! Tracing/logging setup shared by every process that hosts the control plane.
//!
//! The library crates only emit `tracing` events. Installing a subscriber is
//! left to the hosting binary, which calls [`init`] once at startup; this
//! workspace ships no binary of its own.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}
