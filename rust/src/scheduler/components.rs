//! Component-parallel scheduling.
//!
//! Dates in one weakly-connected component never depend on another
//! component, so each component can be scheduled on its own thread. The
//! calendar is shared read-only across workers.

use std::thread;

use chrono::NaiveDate;

use crate::calendar::BusinessCalendar;
use crate::graph::DependencyGraph;
use crate::log_debug;
use crate::models::Schedule;

use super::core::{forward_pass, ScheduleError, Scheduler};

impl Scheduler {
    /// Like [`schedule`](Scheduler::schedule), but schedules weakly-connected
    /// components independently, on worker threads once the graph reaches
    /// `parallel_threshold` nodes.
    ///
    /// Entries are grouped by component, components ordered by their first
    /// inserted node. Per-node dates are identical to `schedule`.
    pub fn schedule_parallel(
        &self,
        graph: &DependencyGraph,
        project_start: NaiveDate,
        calendar: &BusinessCalendar,
    ) -> Result<Schedule, ScheduleError> {
        self.validate(graph)?;

        let verbosity = self.config().verbosity;
        let subgraphs: Vec<DependencyGraph> = graph
            .weakly_connected_components()
            .iter()
            .map(|members| graph.subgraph(members))
            .collect();

        let workers = if graph.node_count() < self.config().parallel_threshold {
            1
        } else {
            self.config().worker_count(subgraphs.len())
        };
        log_debug!(
            verbosity,
            "[schedule] {} components on {} worker(s)",
            subgraphs.len(),
            workers
        );

        let batches: Vec<Vec<Result<Schedule, ScheduleError>>> = if workers <= 1 {
            vec![subgraphs
                .iter()
                .map(|sub| forward_pass(sub, project_start, calendar, verbosity))
                .collect()]
        } else {
            let batch_size = subgraphs.len().div_ceil(workers);
            thread::scope(|scope| {
                let handles: Vec<_> = subgraphs
                    .chunks(batch_size)
                    .map(|batch| {
                        scope.spawn(move || {
                            batch
                                .iter()
                                .map(|sub| forward_pass(sub, project_start, calendar, verbosity))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                    })
                    .collect()
            })
        };

        let mut merged = Schedule::default();
        for part in batches.into_iter().flatten() {
            merged.extend(part?);
        }
        Ok(merged)
    }
}
