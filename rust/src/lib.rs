//! Task dependency and duration scheduling engine.
//!
//! Parses human duration expressions into working minutes, does working-day
//! arithmetic against a configurable business calendar, detects dependency
//! cycles, and computes earliest start/finish dates for every task in a
//! dependency graph.
//!
//! The Python bindings are built with the `python` cargo feature.

pub mod backward_pass;
pub mod calculator;
pub mod calendar;
mod config;
pub mod cycles;
pub mod duration;
mod error;
pub mod graph;
pub mod logging;
mod models;
pub mod scheduler;

#[cfg(feature = "python")]
mod python;

pub use backward_pass::backward_pass;
pub use calculator::{
    back_schedule, compute_duration, compute_end_date, compute_start_date, DurationCalculator,
};
pub use calendar::{BusinessCalendar, CalendarConfig, CalendarConfigError, CalendarError};
pub use config::{SchedulingConfig, DEFAULT_PARALLEL_THRESHOLD};
pub use cycles::{detect_cycles, ensure_acyclic, is_acyclic, CycleError, CycleReport};
pub use duration::{
    format, format_compact, format_with, parse, parse_with, DurationValue, ParseError, UnitScale,
    WorkUnit,
};
pub use error::EngineError;
pub use graph::{DependencyGraph, GraphError, Node, NodeIdx};
pub use models::{LatestEntry, Schedule, ScheduleEntry};
pub use scheduler::{ScheduleError, Scheduler};
