use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod templates;

use cli::args::Cli;
use cli::commands::{dispatch, exit_codes};

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env("SQLBENCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_current_span(false)
            .with_span_list(false)
            .init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
