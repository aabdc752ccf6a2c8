use std::time::Duration;

use crate::{eval::EvalReport, schedule::Phase};

/// Everything recorded about a single epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub selected: bool,
    pub phase: Phase,
    pub subset_size: usize,
    pub fingerprint: u64,
    pub selection_time: Duration,
    pub train_time: Duration,
    /// The sum of the reduced batch losses of the epoch.
    pub loss: f32,
    pub accuracy: f32,
    pub eval: Option<EvalReport>,
}

impl EpochRecord {
    #[inline]
    pub fn total_time(&self) -> Duration {
        self.selection_time + self.train_time
    }
}

#[derive(Debug, Default, Clone)]
pub struct MetricsRecorder {
    records: Vec<EpochRecord>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&mut self, record: EpochRecord) -> &EpochRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    /// The epochs a selection ran at.
    pub fn selections(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.epoch)
            .collect()
    }

    /// Selection plus training time of every epoch, in seconds.
    pub fn timing(&self) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.total_time().as_secs_f64())
            .collect()
    }

    /// The running total of `timing`, in hours.
    pub fn cumulative_hours(&self) -> Vec<f64> {
        self.timing()
            .into_iter()
            .scan(0., |acc, t| {
                *acc += t;
                Some(*acc / 3600.)
            })
            .collect()
    }

    /// The whole run's selection plus training time, in hours.
    pub fn total_hours(&self) -> f64 {
        self.cumulative_hours().last().copied().unwrap_or(0.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, selection_ms: u64, train_ms: u64, selected: bool) -> EpochRecord {
        EpochRecord {
            epoch,
            selected,
            phase: Phase::Subset,
            subset_size: 10,
            fingerprint: 0,
            selection_time: Duration::from_millis(selection_ms),
            train_time: Duration::from_millis(train_ms),
            loss: 0.,
            accuracy: 0.,
            eval: None,
        }
    }

    #[test]
    fn cumulative_time_is_monotonic_and_in_hours() {
        let mut metrics = MetricsRecorder::new();
        metrics.record(record(0, 1_800_000, 0, true));
        metrics.record(record(1, 0, 0, false));
        metrics.record(record(2, 900_000, 900_000, true));

        assert_eq!(metrics.timing(), [1800., 0., 1800.]);
        assert_eq!(metrics.cumulative_hours(), [0.5, 0.5, 1.]);
        assert_eq!(metrics.total_hours(), 1.);
        assert_eq!(metrics.selections(), [0, 2]);
    }

    #[test]
    fn empty_runs_take_no_time() {
        let metrics = MetricsRecorder::new();
        assert_eq!(metrics.total_hours(), 0.);
        assert!(metrics.last().is_none());
    }
}
