use super::{ensure_parent_dir, exit_codes};
use crate::cli::args::BenchArgs;
use crate::cli::progress::BarProgress;
use anyhow::Context;
use sqlbench_core::cache::RunCache;
use sqlbench_core::config::{load_settings, load_suite};
use sqlbench_core::engine::bench::{run_bench, BenchOptions, Outcome};
use sqlbench_core::engine::scheduler::clock_seed;
use sqlbench_core::executor::{timeout_from_secs, RoutingExecutor};
use sqlbench_core::report::console::{render_bar_chart, render_verification};
use sqlbench_core::report::json::write_run_json;
use sqlbench_core::report::SortOrder;
use sqlbench_core::storage::Store;

const CHART_WIDTH: usize = 50;

pub async fn run(args: BenchArgs) -> anyhow::Result<i32> {
    match run_inner(args).await {
        Ok(code) => Ok(code),
        Err(e) => {
            if let Some(diag) = sqlbench_core::errors::try_map_error(&e) {
                eprintln!("{}", diag.format_terminal());
                return Ok(exit_codes::CONFIG_ERROR);
            }
            Err(e)
        }
    }
}

async fn run_inner(args: BenchArgs) -> anyhow::Result<i32> {
    let settings = load_settings(&args.config)?;
    let suite = load_suite(&args.benchmarks, &settings.connection_string)?;

    ensure_parent_dir(&args.db)?;
    let store = Store::open(&args.db)?;
    store.init_schema()?;
    let cache = RunCache::new(store);

    let opts = BenchOptions {
        iterations: args.iterations as usize,
        timeout: timeout_from_secs(args.sql_timeout),
        force_rerun: args.re_run_all,
        sort: if args.sort_results {
            SortOrder::MeanAscending
        } else {
            SortOrder::Declared
        },
        verify: args.verify_result_equality,
        seed: args.seed.unwrap_or_else(clock_seed),
    };
    tracing::info!(
        event = "sqlbench.bench.start",
        cases = suite.cases.len(),
        iterations = opts.iterations,
        seed = opts.seed,
        verify = opts.verify,
    );

    let executor = RoutingExecutor::default();
    let progress = BarProgress::default();
    let outcome = run_bench(&suite, &executor, &cache, &opts, &progress).await?;

    match outcome {
        Outcome::VerificationFailed(report) => {
            println!("{}", render_verification(&report));
            Ok(exit_codes::VERIFICATION_FAILED)
        }
        Outcome::Completed(run) => {
            if let Some(report) = &run.verification {
                println!("{}", render_verification(report));
            }
            println!("{}", render_bar_chart(&run.summary, CHART_WIDTH));

            if let Some(out) = &args.out {
                ensure_parent_dir(out)?;
                write_run_json(out, &run.summary, &run.results, run.verification.as_ref(), run.seed)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                eprintln!("wrote {}", out.display());
            }
            Ok(exit_codes::OK)
        }
    }
}
