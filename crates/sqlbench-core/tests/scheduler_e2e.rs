use sqlbench_core::cache::RunCache;
use sqlbench_core::engine::progress::NoopProgress;
use sqlbench_core::engine::scheduler::{ScheduleOptions, TrialScheduler};
use sqlbench_core::engine::{plan, PlannedCase};
use sqlbench_core::executor::fake::FakeExecutor;
use sqlbench_core::model::{BenchmarkCase, BenchmarkSuite};
use sqlbench_core::sql::CommandBuilder;
use sqlbench_core::storage::Store;
use std::time::Duration;

fn two_case_plan() -> Vec<PlannedCase> {
    let suite = BenchmarkSuite {
        parameter_sql: None,
        cases: vec![
            BenchmarkCase::new("in_list", "select * from t where id in (1, 2)", "fake"),
            BenchmarkCase::new("or_chain", "select * from t where id = 1 or id = 2", "fake"),
        ],
    };
    plan(&suite, &mut CommandBuilder::default()).unwrap()
}

fn opts(force_rerun: bool) -> ScheduleOptions {
    ScheduleOptions {
        iterations: 3,
        force_rerun,
        timeout: None,
    }
}

fn open_cache(dir: &tempfile::TempDir) -> RunCache {
    let store = Store::open(&dir.path().join("runs.db")).unwrap();
    store.init_schema().unwrap();
    RunCache::new(store)
}

#[tokio::test]
async fn test_cache_lifecycle_across_passes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let plan = two_case_plan();

    // First pass: nothing cached.
    let exec = FakeExecutor::new();
    let cache = open_cache(&dir);
    let first = TrialScheduler::new(&exec, &cache, 1)
        .schedule(&plan, opts(false), &NoopProgress)
        .await?;
    assert_eq!(exec.drain_count(), 6);
    for p in &plan {
        let latest = cache
            .fetch_latest(&p.case.name, "fake", &p.statement)?
            .expect("recorded");
        assert_eq!(latest.samples.len(), 3);
    }

    // Second pass in a fresh process: full hit.
    let exec = FakeExecutor::new();
    let cache = open_cache(&dir);
    let second = TrialScheduler::new(&exec, &cache, 2)
        .schedule(&plan, opts(false), &NoopProgress)
        .await?;
    assert_eq!(exec.drain_count(), 0);
    assert_eq!(first[0].samples, second[0].samples);
    assert_eq!(first[1].samples, second[1].samples);
    let before = cache
        .fetch_latest("in_list", "fake", &plan[0].statement)?
        .expect("recorded");

    // Forced pass: everything is measured again and old rows are gone.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let exec = FakeExecutor::new();
    let third = TrialScheduler::new(&exec, &cache, 3)
        .schedule(&plan, opts(true), &NoopProgress)
        .await?;
    assert_eq!(exec.drain_count(), 6);
    assert!(third.iter().all(|r| r.samples.len() == 3 && !r.cached));

    let history = cache.history("in_list", "fake")?;
    assert_eq!(history.len(), 1);
    assert_ne!(history[0].run_at, before.run_at);
    assert!(history[0].id > before.id);
    Ok(())
}

#[tokio::test]
async fn test_changed_sql_is_measured_again() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = open_cache(&dir);
    let exec = FakeExecutor::new();
    let plan = two_case_plan();
    TrialScheduler::new(&exec, &cache, 1)
        .schedule(&plan, opts(false), &NoopProgress)
        .await?;

    let mut edited = plan.clone();
    edited[1].case.sql = "select * from t where id between 1 and 2".into();
    edited[1].statement = CommandBuilder::default().build(None, None, &edited[1].case.sql)?;

    let exec = FakeExecutor::new();
    let results = TrialScheduler::new(&exec, &cache, 2)
        .schedule(&edited, opts(false), &NoopProgress)
        .await?;
    assert_eq!(exec.drain_count(), 3);
    assert!(results[0].cached);
    assert!(!results[1].cached);
    Ok(())
}

#[tokio::test]
async fn test_shuffle_interleaves_cases() -> anyhow::Result<()> {
    let plan = two_case_plan();
    let mut interleaved = 0;
    let runs = 50;

    for seed in 0..runs {
        let exec = FakeExecutor::new();
        let store = Store::memory()?;
        store.init_schema()?;
        let cache = RunCache::new(store);
        TrialScheduler::new(&exec, &cache, seed)
            .schedule(&plan, opts(false), &NoopProgress)
            .await?;

        let order: Vec<String> = exec.calls().into_iter().map(|c| c.text).collect();
        let switches = order.windows(2).filter(|w| w[0] != w[1]).count();
        if switches > 1 {
            interleaved += 1;
        }
    }

    // Fully grouped orders are 2 of the 20 distinct arrangements.
    assert!(interleaved > runs / 2, "only {} of {} runs interleaved", interleaved, runs);
    Ok(())
}
