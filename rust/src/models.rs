//! Result types produced by the schedulers.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

/// Earliest dates for one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub node_id: String,
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
}

/// Latest dates for one node when working back from a deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatestEntry {
    pub node_id: String,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
}

/// A forward schedule: one entry per node, in processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
    positions: FxHashMap<String, usize>,
}

impl Schedule {
    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.node_id.clone(), pos))
            .collect();
        Self { entries, positions }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ScheduleEntry> {
        self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleEntry> {
        self.entries.iter()
    }

    pub fn get(&self, node_id: &str) -> Option<&ScheduleEntry> {
        self.positions
            .get(node_id)
            .and_then(|&pos| self.entries.get(pos))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest earliest-finish across all entries.
    pub fn project_finish(&self) -> Option<NaiveDate> {
        self.entries.iter().map(|e| e.earliest_finish).max()
    }

    /// Append another schedule's entries after this one's.
    pub(crate) fn extend(&mut self, other: Schedule) {
        for entry in other.entries {
            self.positions.insert(entry.node_id.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduleEntry;
    type IntoIter = std::slice::Iter<'a, ScheduleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
