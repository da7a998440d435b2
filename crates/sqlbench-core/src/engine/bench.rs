use super::progress::ProgressSink;
use super::scheduler::{ScheduleOptions, TrialScheduler};
use crate::cache::RunCache;
use crate::executor::SqlExecutor;
use crate::model::{BenchmarkResult, BenchmarkSuite};
use crate::report::{summarize, SortOrder, SummaryRow};
use crate::sql::CommandBuilder;
use crate::verify::{EqualityVerifier, VerificationReport};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub iterations: usize,
    pub timeout: Option<Duration>,
    pub force_rerun: bool,
    pub sort: SortOrder,
    pub verify: bool,
    pub seed: u64,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            iterations: 3,
            timeout: Some(Duration::from_secs(120)),
            force_rerun: false,
            sort: SortOrder::Declared,
            verify: false,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchRun {
    pub verification: Option<VerificationReport>,
    pub results: Vec<BenchmarkResult>,
    pub summary: Vec<SummaryRow>,
    pub seed: u64,
}

/// Result of a bench invocation. Execution and user errors come back as
/// `Err` instead.
#[derive(Debug, Clone)]
pub enum Outcome {
    VerificationFailed(VerificationReport),
    Completed(BenchRun),
}

pub async fn run_bench(
    suite: &BenchmarkSuite,
    executor: &dyn SqlExecutor,
    cache: &RunCache,
    opts: &BenchOptions,
    progress: &dyn ProgressSink,
) -> anyhow::Result<Outcome> {
    let mut builder = CommandBuilder::default();
    let plan = super::plan(suite, &mut builder)?;

    let verification = if opts.verify {
        let report = EqualityVerifier::new(executor, opts.timeout)
            .verify(&plan, progress)
            .await?;
        if !report.ok {
            return Ok(Outcome::VerificationFailed(report));
        }
        Some(report)
    } else {
        None
    };

    let results = TrialScheduler::new(executor, cache, opts.seed)
        .schedule(
            &plan,
            ScheduleOptions {
                iterations: opts.iterations,
                force_rerun: opts.force_rerun,
                timeout: opts.timeout,
            },
            progress,
        )
        .await?;
    let summary = summarize(&results, opts.sort);

    Ok(Outcome::Completed(BenchRun {
        verification,
        results,
        summary,
        seed: opts.seed,
    }))
}
