//! Python bindings (cargo feature `python`).
//!
//! Exposes the calculator to the Python application as the `workplan.rust`
//! module. Errors surface as `ValueError` with the engine's message.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::calendar::{BusinessCalendar, CalendarConfig};
use crate::calculator::DurationCalculator;
use crate::config::SchedulingConfig;
use crate::cycles::detect_cycles as detect_graph_cycles;
use crate::duration::{format_with, parse_with, DurationValue, UnitScale, WorkUnit};
use crate::graph::DependencyGraph;

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn unit_scale(hours_per_day: u32) -> PyResult<UnitScale> {
    UnitScale::with_hours_per_day(hours_per_day)
        .ok_or_else(|| value_error(format!("Invalid hours per day: {}", hours_per_day)))
}

/// Business calendar (Python wrapper).
#[pyclass(name = "Calendar")]
#[derive(Clone, Debug)]
pub struct PyCalendar {
    inner: BusinessCalendar,
}

#[pymethods]
impl PyCalendar {
    #[new]
    #[pyo3(signature = (
        holidays=Vec::new(),
        non_working_weekdays=vec![5, 6],
        timezone=String::from("UTC"),
        hours_per_day=8
    ))]
    fn new(
        holidays: Vec<NaiveDate>,
        non_working_weekdays: Vec<u8>,
        timezone: String,
        hours_per_day: u32,
    ) -> PyResult<Self> {
        let config = CalendarConfig::new(timezone, holidays, non_working_weekdays)
            .and_then(|config| config.with_hours_per_day(hours_per_day))
            .map_err(value_error)?;
        Ok(Self {
            inner: BusinessCalendar::new(config),
        })
    }

    fn is_working_day(&self, date: NaiveDate) -> bool {
        self.inner.is_working_day(date)
    }

    fn add_working_days(&self, start: NaiveDate, n: i64) -> PyResult<NaiveDate> {
        self.inner.add_working_days(start, n).map_err(value_error)
    }

    fn next_working_day(&self, date: NaiveDate) -> PyResult<NaiveDate> {
        self.inner.next_working_day(date).map_err(value_error)
    }

    fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        self.inner.working_days_between(start, end)
    }

    fn __repr__(&self) -> String {
        let config = self.inner.config();
        format!(
            "Calendar(timezone={:?}, holidays={}, non_working_weekdays={:?}, hours_per_day={})",
            config.timezone(),
            config.holidays().count(),
            config.non_working_weekdays(),
            config.hours_per_day()
        )
    }
}

/// One row of a computed schedule.
#[pyclass(name = "ScheduleEntry")]
#[derive(Clone, Debug)]
pub struct PyScheduleEntry {
    #[pyo3(get, set)]
    pub node_id: String,
    #[pyo3(get, set)]
    pub earliest_start: NaiveDate,
    #[pyo3(get, set)]
    pub earliest_finish: NaiveDate,
}

#[pymethods]
impl PyScheduleEntry {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleEntry(node_id={:?}, start={}, finish={})",
            self.node_id, self.earliest_start, self.earliest_finish
        )
    }
}

/// Parse a duration expression into minutes.
///
/// # Raises
/// * ValueError if the expression is empty, negative or malformed
#[pyfunction]
#[pyo3(signature = (text, hours_per_day=8))]
fn parse_duration(text: &str, hours_per_day: u32) -> PyResult<u64> {
    let scale = unit_scale(hours_per_day)?;
    parse_with(text, &scale)
        .map(|value| value.minutes())
        .map_err(value_error)
}

/// Format minutes for display, optionally in a fixed unit ("day", "h", ...).
#[pyfunction]
#[pyo3(signature = (minutes, unit=None, hours_per_day=8))]
fn format_duration(minutes: u64, unit: Option<&str>, hours_per_day: u32) -> PyResult<String> {
    let scale = unit_scale(hours_per_day)?;
    let unit = match unit {
        Some(token) => Some(
            WorkUnit::from_token(&token.trim().to_lowercase())
                .ok_or_else(|| value_error(format!("Unknown duration unit: {}", token)))?,
        ),
        None => None,
    };
    Ok(format_with(DurationValue::from_minutes(minutes), unit, &scale))
}

/// Return every dependency cycle as a list of node ids.
///
/// # Raises
/// * ValueError if an edge names an unknown node
#[pyfunction]
fn detect_cycles(
    node_ids: Vec<String>,
    edges: Vec<(String, String)>,
) -> PyResult<Vec<Vec<String>>> {
    let graph = DependencyGraph::from_parts(
        node_ids.into_iter().map(|id| (id, DurationValue::ZERO)),
        edges,
    )
    .map_err(value_error)?;
    Ok(detect_graph_cycles(&graph)
        .into_iter()
        .map(|report| report.cycle)
        .collect())
}

/// Schedule `(node_id, duration text)` tasks with `(from_id, to_id)` edges.
///
/// # Raises
/// * ValueError on malformed durations, unknown nodes or dependency cycles
#[pyfunction]
#[pyo3(signature = (tasks, edges, project_start, calendar=None, verbosity=0))]
fn schedule_tasks(
    tasks: Vec<(String, String)>,
    edges: Vec<(String, String)>,
    project_start: NaiveDate,
    calendar: Option<PyCalendar>,
    verbosity: u8,
) -> PyResult<Vec<PyScheduleEntry>> {
    let calendar = calendar.map(|c| c.inner).unwrap_or_default();
    let calculator = DurationCalculator::with_config(
        calendar,
        SchedulingConfig::default().with_verbosity(verbosity),
    );
    let schedule = calculator
        .schedule_inputs(&tasks, &edges, project_start)
        .map_err(value_error)?;
    Ok(schedule
        .into_entries()
        .into_iter()
        .map(|entry| PyScheduleEntry {
            node_id: entry.node_id,
            earliest_start: entry.earliest_start,
            earliest_finish: entry.earliest_finish,
        })
        .collect())
}

/// The workplan.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCalendar>()?;
    m.add_class::<PyScheduleEntry>()?;

    m.add_function(wrap_pyfunction!(parse_duration, m)?)?;
    m.add_function(wrap_pyfunction!(format_duration, m)?)?;
    m.add_function(wrap_pyfunction!(detect_cycles, m)?)?;
    m.add_function(wrap_pyfunction!(schedule_tasks, m)?)?;

    Ok(())
}
