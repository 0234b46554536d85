//! Crate-level error type joining the per-module errors.

use thiserror::Error;

use crate::calendar::{CalendarConfigError, CalendarError};
use crate::cycles::CycleError;
use crate::duration::ParseError;
use crate::graph::GraphError;
use crate::scheduler::ScheduleError;

/// Any error the engine can return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid duration for node {node_id}: {source}")]
    InvalidDuration {
        node_id: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    CalendarConfig(#[from] CalendarConfigError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl From<ScheduleError> for EngineError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Cycle(cycle) => EngineError::Cycle(cycle),
            ScheduleError::Calendar(calendar) => EngineError::Calendar(calendar),
        }
    }
}
