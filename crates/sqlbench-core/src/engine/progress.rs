use crate::model::BenchmarkCase;

/// Receives progress notifications while a pass runs. All methods default
/// to doing nothing.
pub trait ProgressSink: Send + Sync {
    /// `total` is the number of trials the case will have at the end of the
    /// pass, including cache-hydrated ones.
    fn case_started(&self, _index: usize, _case: &BenchmarkCase, _total: usize) {}

    fn trial_completed(&self, _index: usize, _completed: usize, _total: usize) {}

    fn verifying(&self, _index: usize, _total: usize, _name: &str) {}

    fn finished(&self) {}
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {}
