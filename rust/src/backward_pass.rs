//! Backward pass: latest start/finish dates from a fixed deadline.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::NaiveDate;

use crate::calendar::BusinessCalendar;
use crate::cycles::{detect_cycles, CycleError};
use crate::graph::{DependencyGraph, NodeIdx};
use crate::models::LatestEntry;
use crate::scheduler::ScheduleError;
use crate::{log_changes, log_checks};

/// Latest dates that still let every node finish by `deadline`.
///
/// Mirrors the forward pass: nodes without successors finish on the last
/// working day on or before the deadline, and every other node must finish
/// by the earliest latest-start of its successors. Nodes are processed sinks
/// first, lowest insertion index among ties.
///
/// # Returns
/// * `Ok(entries)` in processing order
/// * `Err(ScheduleError::Cycle)` if the graph has cycles
pub fn backward_pass(
    graph: &DependencyGraph,
    deadline: NaiveDate,
    calendar: &BusinessCalendar,
    verbosity: u8,
) -> Result<Vec<LatestEntry>, ScheduleError> {
    let n = graph.node_count();
    let finish_limit = calendar.previous_working_day(deadline)?;

    let mut out_degree: Vec<usize> = (0..n as NodeIdx)
        .map(|idx| graph.successor_indices(idx).len())
        .collect();
    // Earliest successor latest-start seen so far, capped at the deadline
    let mut finish_by: Vec<NaiveDate> = vec![finish_limit; n];
    let mut queue: BinaryHeap<Reverse<NodeIdx>> = (0..n as NodeIdx)
        .filter(|&idx| out_degree[idx as usize] == 0)
        .map(Reverse)
        .collect();

    let mut entries = Vec::with_capacity(n);
    while let Some(Reverse(node)) = queue.pop() {
        let latest_finish = finish_by[node as usize];
        let days = calendar.working_days_for(graph.duration_at(node));
        let latest_start = calendar.add_working_days(latest_finish, -days)?;
        let node_id = graph.id_of(node).unwrap_or_default();

        log_changes!(
            verbosity,
            "[back-schedule] {}: {} -> {} ({} working days)",
            node_id,
            latest_start,
            latest_finish,
            days
        );

        for &pred in graph.predecessor_indices(node) {
            let slot = pred as usize;
            if latest_start < finish_by[slot] {
                finish_by[slot] = latest_start;
            }
            out_degree[slot] -= 1;
            if out_degree[slot] == 0 {
                log_checks!(
                    verbosity,
                    "[back-schedule]   {} must finish by {}",
                    graph.id_of(pred).unwrap_or_default(),
                    finish_by[slot]
                );
                queue.push(Reverse(pred));
            }
        }

        entries.push(LatestEntry {
            node_id: node_id.to_string(),
            latest_start,
            latest_finish,
        });
    }

    if entries.len() != n {
        return Err(CycleError::new(detect_cycles(graph)).into());
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::parse;
    use crate::scheduler::Scheduler;

    fn make_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn make_graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::from_parts(
            nodes.iter().map(|&(id, d)| (id, parse(d).unwrap())),
            edges.iter().copied(),
        )
        .unwrap()
    }

    fn latest<'a>(entries: &'a [LatestEntry], id: &str) -> &'a LatestEntry {
        entries.iter().find(|e| e.node_id == id).unwrap()
    }

    #[test]
    fn test_chain_mirrors_forward_schedule() {
        let graph = make_graph(&[("A", "2d"), ("B", "1d")], &[("A", "B")]);
        let calendar = BusinessCalendar::default();
        let thursday = make_date(2025, 1, 9);

        let entries = backward_pass(&graph, thursday, &calendar, 0).unwrap();
        let b = latest(&entries, "B");
        let a = latest(&entries, "A");
        assert_eq!((b.latest_start, b.latest_finish), (make_date(2025, 1, 8), thursday));
        assert_eq!(
            (a.latest_start, a.latest_finish),
            (make_date(2025, 1, 6), make_date(2025, 1, 8))
        );

        // Scheduling forward from the back-scheduled start lands on the deadline
        let forward = Scheduler::default()
            .schedule(&graph, a.latest_start, &calendar)
            .unwrap();
        assert_eq!(forward.project_finish(), Some(thursday));
    }

    #[test]
    fn test_weekend_deadline_snaps_back() {
        let graph = make_graph(&[("solo", "1d")], &[]);
        let sunday = make_date(2025, 1, 12);
        let entries = backward_pass(&graph, sunday, &BusinessCalendar::default(), 0).unwrap();
        assert_eq!(entries[0].latest_finish, make_date(2025, 1, 10));
        assert_eq!(entries[0].latest_start, make_date(2025, 1, 9));
    }

    #[test]
    fn test_fork_takes_tightest_successor() {
        // a blocks both b (1d) and c (3d); c is the tighter constraint
        let graph = make_graph(
            &[("a", "1d"), ("b", "1d"), ("c", "3d")],
            &[("a", "b"), ("a", "c")],
        );
        let friday = make_date(2025, 1, 17);
        let entries = backward_pass(&graph, friday, &BusinessCalendar::default(), 0).unwrap();
        let a = latest(&entries, "a");
        assert_eq!(a.latest_finish, make_date(2025, 1, 14));
        assert_eq!(a.latest_start, make_date(2025, 1, 13));
    }

    #[test]
    fn test_sinks_processed_first() {
        let graph = make_graph(
            &[("a", "1d"), ("b", "1d"), ("c", "1d")],
            &[("a", "b")],
        );
        let entries =
            backward_pass(&graph, make_date(2025, 1, 17), &BusinessCalendar::default(), 0)
                .unwrap();
        let order: Vec<&str> = entries.iter().map(|e| e.node_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_circular_dependency_error() {
        let graph = make_graph(&[("a", "1d"), ("b", "1d")], &[("a", "b"), ("b", "a")]);
        let result = backward_pass(&graph, make_date(2025, 1, 17), &BusinessCalendar::default(), 0);
        assert!(matches!(result, Err(ScheduleError::Cycle(_))));
    }
}
