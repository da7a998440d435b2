use super::args::*;
use std::path::Path;

pub mod bench;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const VERIFICATION_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Bench(args) => bench::run(args).await,
        Command::Init(args) => cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    write_file_if_missing(&args.config, crate::templates::CONFIG_TOML)?;
    write_file_if_missing(&args.benchmarks, crate::templates::BENCH_CASES_TOML)?;
    Ok(exit_codes::OK)
}

fn write_file_if_missing(path: &Path, content: &str) -> anyhow::Result<()> {
    if path.exists() {
        eprintln!("note: {} already exists (skipped)", path.display());
        return Ok(());
    }
    ensure_parent_dir(path)?;
    std::fs::write(path, content)?;
    eprintln!("created {}", path.display());
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
