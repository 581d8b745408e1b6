#![deny(missing_docs)]
//! Shared logging utilities for the trawler workspace.
//!
//! This crate provides the `trawl_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line emitted
//! through the macros is prefixed with the current poll tick so log output
//! can be correlated with harvest loop iterations.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the current poll tick count.
    static POLL_TICK: Cell<u64> = const { Cell::new(0) };
}

/// Sets the poll tick count for the current thread.
/// The harvest runner calls this once per loop iteration.
pub fn set_poll_tick(tick: u64) {
    POLL_TICK.with(|v| v.set(tick));
}

/// Retrieves the poll tick count for the current thread.
/// Returns 0 outside the harvest loop.
pub fn get_poll_tick() -> u64 {
    POLL_TICK.with(|v| v.get())
}

/// Logs a trace-level message, prefixed with the current poll tick.
#[macro_export]
macro_rules! trawl_trace {
    ($($arg:tt)*) => {{
        log::trace!("[t{}] {}", $crate::get_poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message, prefixed with the current poll tick.
#[macro_export]
macro_rules! trawl_debug {
    ($($arg:tt)*) => {{
        log::debug!("[t{}] {}", $crate::get_poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message, prefixed with the current poll tick.
#[macro_export]
macro_rules! trawl_info {
    ($($arg:tt)*) => {{
        log::info!("[t{}] {}", $crate::get_poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message, prefixed with the current poll tick.
#[macro_export]
macro_rules! trawl_warn {
    ($($arg:tt)*) => {{
        log::warn!("[t{}] {}", $crate::get_poll_tick(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message, prefixed with the current poll tick.
#[macro_export]
macro_rules! trawl_error {
    ($($arg:tt)*) => {{
        log::error!("[t{}] {}", $crate::get_poll_tick(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
