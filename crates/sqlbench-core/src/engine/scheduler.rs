use super::progress::ProgressSink;
use super::PlannedCase;
use crate::cache::RunCache;
use crate::errors::exec_failed;
use crate::executor::SqlExecutor;
use crate::model::{BenchmarkResult, TrialSample};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct ScheduleOptions {
    pub iterations: usize,
    pub force_rerun: bool,
    pub timeout: Option<Duration>,
}

/// Decides which trials a pass needs, runs them one at a time in shuffled
/// order and records the merged sample set of every case.
pub struct TrialScheduler<'a> {
    executor: &'a dyn SqlExecutor,
    cache: &'a RunCache,
    rng: StdRng,
}

impl<'a> TrialScheduler<'a> {
    pub fn new(executor: &'a dyn SqlExecutor, cache: &'a RunCache, seed: u64) -> Self {
        Self {
            executor,
            cache,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub async fn schedule(
        &mut self,
        plan: &[PlannedCase],
        opts: ScheduleOptions,
        progress: &dyn ProgressSink,
    ) -> anyhow::Result<Vec<BenchmarkResult>> {
        let mut results: Vec<BenchmarkResult> = plan
            .iter()
            .map(|p| BenchmarkResult {
                case: p.case.clone(),
                samples: Vec::new(),
                cached: false,
            })
            .collect();

        let mut work: Vec<usize> = Vec::new();
        for (i, p) in plan.iter().enumerate() {
            let case = &p.case;
            if opts.force_rerun {
                self.cache.invalidate(&case.name, &case.connection_target)?;
            } else if let Some(hit) =
                self.cache
                    .fetch_latest(&case.name, &case.connection_target, &p.statement)?
            {
                let n = hit.samples.len();
                results[i].samples = hit.samples;
                results[i].cached = true;
                progress.case_started(i, case, n);
                progress.trial_completed(i, n, n);
                continue;
            }
            progress.case_started(i, case, opts.iterations);
            work.extend(std::iter::repeat(i).take(opts.iterations));
        }

        work.shuffle(&mut self.rng);
        tracing::info!(
            event = "sqlbench.schedule.plan",
            cases = plan.len(),
            cached_cases = results.iter().filter(|r| r.cached).count(),
            trials = work.len(),
            force_rerun = opts.force_rerun,
        );

        for &i in &work {
            let p = &plan[i];
            let started = Instant::now();
            let rows = self
                .executor
                .drain(&p.case.connection_target, &p.statement, opts.timeout)
                .await
                .map_err(|e| {
                    exec_failed(&p.case.name, &p.case.connection_target, &p.statement.text, &e)
                })?;
            let sample = TrialSample::new(started.elapsed());

            let result = &mut results[i];
            result.samples.push(sample);
            tracing::debug!(
                event = "sqlbench.trial.complete",
                case = %p.case.name,
                backend = self.executor.backend_name(),
                trial = result.samples.len(),
                rows,
                duration_ms = sample.millis(),
            );
            progress.trial_completed(i, result.samples.len(), opts.iterations);
        }

        let now = Utc::now();
        for (p, r) in plan.iter().zip(&results) {
            if r.samples.is_empty() {
                continue;
            }
            self.cache.record(
                &p.case.name,
                &p.case.connection_target,
                &p.statement,
                &r.samples,
                now,
            )?;
        }
        progress.finished();
        Ok(results)
    }
}

/// Seed for the trial shuffle when none is given.
pub fn clock_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    nanos as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::recording::RecordingProgress;
    use crate::executor::fake::FakeExecutor;
    use crate::model::BenchmarkCase;
    use crate::sql::ResolvedStatement;
    use crate::storage::Store;

    fn planned(name: &str, sql: &str) -> PlannedCase {
        PlannedCase {
            case: BenchmarkCase::new(name, sql, "fake"),
            statement: ResolvedStatement::raw(sql),
        }
    }

    fn cache() -> RunCache {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        RunCache::new(store)
    }

    fn opts(iterations: usize, force_rerun: bool) -> ScheduleOptions {
        ScheduleOptions {
            iterations,
            force_rerun,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_trials_then_full_cache_hit() {
        let exec = FakeExecutor::new();
        let cache = cache();
        let plan = vec![planned("a", "select 1"), planned("b", "select 2")];

        let first = TrialScheduler::new(&exec, &cache, 7)
            .schedule(&plan, opts(3, false), &RecordingProgress::default())
            .await
            .unwrap();
        assert_eq!(exec.drain_count(), 6);
        assert!(first.iter().all(|r| r.samples.len() == 3 && !r.cached));

        let progress = RecordingProgress::default();
        let second = TrialScheduler::new(&exec, &cache, 8)
            .schedule(&plan, opts(3, false), &progress)
            .await
            .unwrap();
        assert_eq!(exec.drain_count(), 6);
        assert!(second.iter().all(|r| r.cached));
        assert_eq!(first[0].samples, second[0].samples);
        assert_eq!(first[1].samples, second[1].samples);
        assert_eq!(*progress.completed.lock().unwrap(), vec![(0, 3, 3), (1, 3, 3)]);
    }

    #[tokio::test]
    async fn test_execution_error_is_fatal() {
        let exec = FakeExecutor::new().with_failure("select broken", "syntax error");
        let cache = cache();
        let plan = vec![planned("ok", "select 1"), planned("bad", "select broken")];
        let err = TrialScheduler::new(&exec, &cache, 1)
            .schedule(&plan, opts(2, false), &RecordingProgress::default())
            .await
            .unwrap_err();
        let d = crate::errors::try_map_error(&err).unwrap();
        assert_eq!(d.code, crate::errors::diagnostic::codes::E_EXEC_FAILED);
        assert!(cache.history("ok", "fake").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_samples_cover_the_drain_time() {
        let exec = FakeExecutor::new().with_latency(Duration::from_millis(15));
        let cache = cache();
        let results = TrialScheduler::new(&exec, &cache, 5)
            .schedule(&[planned("slowish", "q")], opts(2, false), &RecordingProgress::default())
            .await
            .unwrap();
        assert_eq!(results[0].samples.len(), 2);
        assert!(results[0].samples.iter().all(|s| s.duration >= Duration::from_millis(15)));
    }

    #[tokio::test]
    async fn test_statement_over_the_limit_is_a_timeout() {
        let exec = FakeExecutor::new().with_latency(Duration::from_millis(500));
        let cache = cache();
        let opts = ScheduleOptions {
            iterations: 1,
            force_rerun: false,
            timeout: Some(Duration::from_millis(20)),
        };
        let err = TrialScheduler::new(&exec, &cache, 5)
            .schedule(&[planned("slow", "q")], opts, &RecordingProgress::default())
            .await
            .unwrap_err();
        let d = crate::errors::try_map_error(&err).unwrap();
        assert_eq!(d.code, crate::errors::diagnostic::codes::E_EXEC_TIMEOUT);
        assert_eq!(d.context["case"], "slow");
    }

    #[tokio::test]
    async fn test_same_seed_gives_same_order() {
        let plan = vec![planned("a", "qa"), planned("b", "qb"), planned("c", "qc")];
        let mut orders = Vec::new();
        for _ in 0..2 {
            let exec = FakeExecutor::new();
            let cache = cache();
            TrialScheduler::new(&exec, &cache, 42)
                .schedule(&plan, opts(4, false), &RecordingProgress::default())
                .await
                .unwrap();
            orders.push(exec.calls().into_iter().map(|c| c.text).collect::<Vec<_>>());
        }
        assert_eq!(orders[0], orders[1]);
        assert_eq!(orders[0].len(), 12);
    }

    #[tokio::test]
    async fn test_zero_iterations_yields_empty_samples() {
        let exec = FakeExecutor::new();
        let cache = cache();
        let results = TrialScheduler::new(&exec, &cache, 3)
            .schedule(&[planned("a", "q")], opts(0, false), &RecordingProgress::default())
            .await
            .unwrap();
        assert!(results[0].samples.is_empty());
        assert_eq!(results[0].mean_ms(), None);
        assert!(cache.fetch_latest("a", "fake", &ResolvedStatement::raw("q")).unwrap().is_none());
    }
}
