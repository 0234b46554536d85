//! Duration calculator: the entry point used by the surrounding application.
//!
//! Converts between start dates, end dates and durations on a business
//! calendar, builds graphs from raw `(id, duration text)` input, and
//! schedules them. Every schedule request runs cycle detection first.
//!
//! All operations are pure. A calculator holds only an immutable calendar and
//! configuration, so it can be shared freely between threads.

use chrono::NaiveDate;

use crate::backward_pass::backward_pass;
use crate::calendar::{BusinessCalendar, CalendarError};
use crate::config::SchedulingConfig;
use crate::cycles::{detect_cycles, CycleReport};
use crate::duration::{format_with, parse_with, DurationValue, ParseError, WorkUnit};
use crate::error::EngineError;
use crate::graph::DependencyGraph;
use crate::models::{LatestEntry, Schedule};
use crate::scheduler::{ScheduleError, Scheduler};

/// Date on which `duration` of work started on `start` is complete.
///
/// Partial days round up, so a task never finishes before its effort is used.
pub fn compute_end_date(
    start: NaiveDate,
    duration: DurationValue,
    calendar: &BusinessCalendar,
) -> Result<NaiveDate, CalendarError> {
    calendar.add_working_days(start, calendar.working_days_for(duration))
}

/// Effort represented by the working days in `[start, end)`.
pub fn compute_duration(
    start: NaiveDate,
    end: NaiveDate,
    calendar: &BusinessCalendar,
) -> DurationValue {
    let days = calendar.working_days_between(start, end).max(0) as u64;
    DurationValue::from_minutes(days.saturating_mul(calendar.unit_scale().minutes_per_day()))
}

/// Date on which work must start to deliver `duration` by `end`.
pub fn compute_start_date(
    end: NaiveDate,
    duration: DurationValue,
    calendar: &BusinessCalendar,
) -> Result<NaiveDate, CalendarError> {
    calendar.add_working_days(end, -calendar.working_days_for(duration))
}

/// Calendar-bound façade over parsing, date math and scheduling.
#[derive(Clone, Debug, Default)]
pub struct DurationCalculator {
    calendar: BusinessCalendar,
    scheduler: Scheduler,
}

impl DurationCalculator {
    pub fn new(calendar: BusinessCalendar) -> Self {
        Self::with_config(calendar, SchedulingConfig::default())
    }

    pub fn with_config(calendar: BusinessCalendar, config: SchedulingConfig) -> Self {
        Self {
            calendar,
            scheduler: Scheduler::new(config),
        }
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn compute_end_date(
        &self,
        start: NaiveDate,
        duration: DurationValue,
    ) -> Result<NaiveDate, CalendarError> {
        compute_end_date(start, duration, &self.calendar)
    }

    pub fn compute_duration(&self, start: NaiveDate, end: NaiveDate) -> DurationValue {
        compute_duration(start, end, &self.calendar)
    }

    pub fn compute_start_date(
        &self,
        end: NaiveDate,
        duration: DurationValue,
    ) -> Result<NaiveDate, CalendarError> {
        compute_start_date(end, duration, &self.calendar)
    }

    /// Parse using this calendar's working-day length.
    pub fn parse_duration(&self, text: &str) -> Result<DurationValue, ParseError> {
        parse_with(text, &self.calendar.unit_scale())
    }

    /// Format using this calendar's working-day length.
    pub fn format_duration(&self, value: DurationValue, unit: Option<WorkUnit>) -> String {
        format_with(value, unit, &self.calendar.unit_scale())
    }

    pub fn detect_cycles(&self, graph: &DependencyGraph) -> Vec<CycleReport> {
        detect_cycles(graph)
    }

    /// Build a graph from `(node id, duration text)` pairs and
    /// `(from id, to id)` edges.
    ///
    /// A bad duration is reported with the id of the node it belongs to; an
    /// edge naming an unknown node fails with `UnknownNodeReference`.
    pub fn build_graph<N, D, E>(
        &self,
        nodes: &[(N, D)],
        edges: &[(E, E)],
    ) -> Result<DependencyGraph, EngineError>
    where
        N: AsRef<str>,
        D: AsRef<str>,
        E: AsRef<str>,
    {
        let scale = self.calendar.unit_scale();
        let mut graph = DependencyGraph::with_capacity(nodes.len());
        for (id, text) in nodes {
            let id = id.as_ref();
            let duration =
                parse_with(text.as_ref(), &scale).map_err(|source| EngineError::InvalidDuration {
                    node_id: id.to_string(),
                    source,
                })?;
            graph.add_node(id, duration)?;
        }
        for (from, to) in edges {
            graph.add_edge(from.as_ref(), to.as_ref())?;
        }
        Ok(graph)
    }

    /// Schedule `graph` from `project_start`, refusing graphs with cycles.
    pub fn schedule(
        &self,
        graph: &DependencyGraph,
        project_start: NaiveDate,
    ) -> Result<Schedule, ScheduleError> {
        self.scheduler.schedule(graph, project_start, &self.calendar)
    }

    /// Component-parallel variant of [`schedule`](Self::schedule).
    pub fn schedule_parallel(
        &self,
        graph: &DependencyGraph,
        project_start: NaiveDate,
    ) -> Result<Schedule, ScheduleError> {
        self.scheduler.schedule_parallel(graph, project_start, &self.calendar)
    }

    /// Build a graph from raw input and schedule it.
    pub fn schedule_inputs<N, D, E>(
        &self,
        nodes: &[(N, D)],
        edges: &[(E, E)],
        project_start: NaiveDate,
    ) -> Result<Schedule, EngineError>
    where
        N: AsRef<str>,
        D: AsRef<str>,
        E: AsRef<str>,
    {
        let graph = self.build_graph(nodes, edges)?;
        Ok(self.schedule(&graph, project_start)?)
    }

    /// Latest dates that still meet `deadline`, refusing graphs with cycles.
    pub fn back_schedule(
        &self,
        graph: &DependencyGraph,
        deadline: NaiveDate,
    ) -> Result<Vec<LatestEntry>, ScheduleError> {
        self.scheduler.back_schedule(graph, deadline, &self.calendar)
    }
}

/// Latest dates that still meet `deadline`, with logging disabled.
pub fn back_schedule(
    graph: &DependencyGraph,
    deadline: NaiveDate,
    calendar: &BusinessCalendar,
) -> Result<Vec<LatestEntry>, ScheduleError> {
    crate::cycles::ensure_acyclic(graph)?;
    backward_pass(graph, deadline, calendar, 0)
}
