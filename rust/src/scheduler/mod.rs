//! Forward scheduling over dependency graphs.
//!
//! Cycle detection always runs first; a graph with cycles is never scheduled.
//! Independent components can also be scheduled on worker threads.

mod components;
mod core;

pub use core::{ScheduleError, Scheduler};
