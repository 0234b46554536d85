//! Forward scheduler: earliest start/finish dates via Kahn's algorithm.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::backward_pass::backward_pass;
use crate::calendar::{BusinessCalendar, CalendarError};
use crate::config::SchedulingConfig;
use crate::cycles::{detect_cycles, ensure_acyclic, CycleError};
use crate::graph::{DependencyGraph, NodeIdx};
use crate::models::{LatestEntry, Schedule, ScheduleEntry};
use crate::{log_changes, log_checks, log_debug};

/// Errors that can occur during scheduling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Computes schedules for dependency graphs.
///
/// Holds only configuration; graphs and calendars are passed per call, so one
/// scheduler can serve any number of graphs.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    config: SchedulingConfig,
}

impl Scheduler {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Earliest start and finish for every node.
    ///
    /// Refuses graphs with cycles: the error carries every cycle found and no
    /// partial schedule is produced. Roots start on `project_start`, moved
    /// forward to the next working day if needed.
    pub fn schedule(
        &self,
        graph: &DependencyGraph,
        project_start: NaiveDate,
        calendar: &BusinessCalendar,
    ) -> Result<Schedule, ScheduleError> {
        self.validate(graph)?;
        forward_pass(graph, project_start, calendar, self.config.verbosity)
    }

    /// Latest start and finish for every node so that all work completes by
    /// `deadline`.
    pub fn back_schedule(
        &self,
        graph: &DependencyGraph,
        deadline: NaiveDate,
        calendar: &BusinessCalendar,
    ) -> Result<Vec<LatestEntry>, ScheduleError> {
        self.validate(graph)?;
        backward_pass(graph, deadline, calendar, self.config.verbosity)
    }

    pub(super) fn validate(&self, graph: &DependencyGraph) -> Result<(), ScheduleError> {
        ensure_acyclic(graph).map_err(|err| {
            log_changes!(
                self.config.verbosity,
                "[schedule] refused: {} cycle(s) in graph of {} nodes",
                err.reports().len(),
                graph.node_count()
            );
            ScheduleError::from(err)
        })
    }
}

/// Kahn pass over an acyclic graph.
///
/// Ready nodes are taken lowest insertion index first, which fixes the order
/// of the returned entries.
pub(crate) fn forward_pass(
    graph: &DependencyGraph,
    project_start: NaiveDate,
    calendar: &BusinessCalendar,
    verbosity: u8,
) -> Result<Schedule, ScheduleError> {
    let n = graph.node_count();
    let start = calendar.next_working_day(project_start)?;

    let mut in_degree: Vec<usize> = (0..n as NodeIdx)
        .map(|idx| graph.predecessor_indices(idx).len())
        .collect();
    // Latest predecessor finish seen so far, floored at the project start
    let mut ready_at: Vec<NaiveDate> = vec![start; n];
    let mut queue: BinaryHeap<Reverse<NodeIdx>> = (0..n as NodeIdx)
        .filter(|&idx| in_degree[idx as usize] == 0)
        .map(Reverse)
        .collect();

    log_debug!(
        verbosity,
        "[schedule] {} nodes, {} roots, start {}",
        n,
        queue.len(),
        start
    );

    let mut entries = Vec::with_capacity(n);
    while let Some(Reverse(node)) = queue.pop() {
        let earliest_start = calendar.next_working_day(ready_at[node as usize])?;
        let days = calendar.working_days_for(graph.duration_at(node));
        let earliest_finish = calendar.add_working_days(earliest_start, days)?;
        let node_id = graph.id_of(node).unwrap_or_default();

        log_changes!(
            verbosity,
            "[schedule] {}: {} -> {} ({} working days)",
            node_id,
            earliest_start,
            earliest_finish,
            days
        );

        for &succ in graph.successor_indices(node) {
            let slot = succ as usize;
            if earliest_finish > ready_at[slot] {
                ready_at[slot] = earliest_finish;
            }
            in_degree[slot] -= 1;
            if in_degree[slot] == 0 {
                log_checks!(
                    verbosity,
                    "[schedule]   {} ready at {}",
                    graph.id_of(succ).unwrap_or_default(),
                    ready_at[slot]
                );
                queue.push(Reverse(succ));
            }
        }

        entries.push(ScheduleEntry {
            node_id: node_id.to_string(),
            earliest_start,
            earliest_finish,
        });
    }

    if entries.len() != n {
        // Only reachable when the caller skipped validation
        return Err(CycleError::new(detect_cycles(graph)).into());
    }

    Ok(Schedule::from_entries(entries))
}
