//! Configuration types for the scheduling engine.

use crate::logging::VERBOSITY_SILENT;

/// Nodes below which component-parallel scheduling runs on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1024;

/// Configuration for the schedulers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Minimum graph size before components are scheduled on worker threads.
    pub parallel_threshold: usize,
    /// Upper bound on worker threads (None = available parallelism).
    pub max_threads: Option<usize>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            verbosity: VERBOSITY_SILENT,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_threads: None,
        }
    }
}

impl SchedulingConfig {
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Number of worker threads to use for `work_items` independent pieces.
    pub fn worker_count(&self, work_items: usize) -> usize {
        let available = self.max_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        available.clamp(1, work_items.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SchedulingConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
        assert_eq!(config.max_threads, None);
    }

    #[test]
    fn test_worker_count_is_bounded() {
        let config = SchedulingConfig {
            max_threads: Some(4),
            ..SchedulingConfig::default()
        };
        assert_eq!(config.worker_count(2), 2);
        assert_eq!(config.worker_count(100), 4);
        assert_eq!(config.worker_count(0), 1);

        let zero = SchedulingConfig {
            max_threads: Some(0),
            ..SchedulingConfig::default()
        };
        assert_eq!(zero.worker_count(10), 1);
    }
}
