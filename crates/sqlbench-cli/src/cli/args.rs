use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlbench",
    version,
    about = "Benchmark SQL query rewrites and check that they return the same results"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the cases of a benchmark file and chart their mean durations
    Bench(BenchArgs),
    /// Write example Config.toml and BenchCases.toml files
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BenchArgs {
    /// Benchmark definition file (TOML)
    #[arg(value_parser = existing_file)]
    pub benchmarks: PathBuf,

    /// Trials per case
    #[arg(
        short = 'n',
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub iterations: u32,

    /// Per-statement timeout in seconds (0 = no limit)
    #[arg(short = 't', long = "sql-timeout", default_value_t = 120)]
    pub sql_timeout: u64,

    /// Ignore and delete recorded runs of every case before running
    #[arg(long)]
    pub re_run_all: bool,

    /// Order the chart by mean duration instead of file order
    #[arg(long)]
    pub sort_results: bool,

    /// Check that every case returns the same rows as the first one before timing
    #[arg(long)]
    pub verify_result_equality: bool,

    #[arg(long, default_value = "Config.toml")]
    pub config: PathBuf,

    /// Run history database
    #[arg(long, env = "SQLBENCH_DB", default_value = ".sqlbench/sqlbench.db")]
    pub db: PathBuf,

    /// Seed for the trial order (defaults to the clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a JSON summary of the run to this path
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "Config.toml")]
    pub config: PathBuf,

    #[arg(long, default_value = "BenchCases.toml")]
    pub benchmarks: PathBuf,
}

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let p = PathBuf::from(s);
    if p.is_file() {
        Ok(p)
    } else {
        Err(format!("benchmark file {} does not exist", p.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bench_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.toml");
        std::fs::write(&file, "").unwrap();

        let cli = Cli::try_parse_from(["sqlbench", "bench", file.to_str().unwrap()]).unwrap();
        let Command::Bench(args) = cli.cmd else {
            panic!("expected bench");
        };
        assert_eq!(args.iterations, 3);
        assert_eq!(args.sql_timeout, 120);
        assert!(!args.re_run_all && !args.sort_results && !args.verify_result_equality);
        assert_eq!(args.config, PathBuf::from("Config.toml"));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.toml");
        std::fs::write(&file, "").unwrap();
        let res = Cli::try_parse_from(["sqlbench", "bench", "-n", "0", file.to_str().unwrap()]);
        assert!(res.is_err());
    }

    #[test]
    fn test_missing_benchmark_file_rejected() {
        let res = Cli::try_parse_from(["sqlbench", "bench", "/definitely/not/here.toml"]);
        assert!(res.is_err());
    }
}
