//! Stderr diagnostics for the schedulers, gated by
//! [`SchedulingConfig::verbosity`](crate::SchedulingConfig).
//!
//! Nothing is printed at the default verbosity, so embedding callers see no
//! output unless they ask for it. Messages carry a `[schedule]` or
//! `[back-schedule]` prefix naming the pass that wrote them.

/// No output.
pub const VERBOSITY_SILENT: u8 = 0;
/// Dates assigned to nodes and refused schedules.
pub const VERBOSITY_CHANGES: u8 = 1;
/// Readiness and predecessor constraints per node.
pub const VERBOSITY_CHECKS: u8 = 2;
/// Pass setup and component partitioning.
pub const VERBOSITY_DEBUG: u8 = 3;

/// Whether a message at `level` is printed under `verbosity`.
#[inline]
pub fn enabled(verbosity: u8, level: u8) -> bool {
    level > VERBOSITY_SILENT && verbosity >= level
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($level:expr, $verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $level) {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHANGES level.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHANGES, $verbosity, $($arg)*)
    };
}

/// Log at CHECKS level.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHECKS, $verbosity, $($arg)*)
    };
}

/// Log at DEBUG level.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_DEBUG, $verbosity, $($arg)*)
    };
}
