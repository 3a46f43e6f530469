use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
pub mod exit_codes;

use cli::args::Cli;
use cli::commands::dispatch;
use vsp2fdm_core::PipelineError;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            failure_code(&e)
        }
    };
    std::process::exit(code);
}

fn failure_code(e: &anyhow::Error) -> i32 {
    let Some(err) = e.downcast_ref::<PipelineError>() else {
        return exit_codes::CONFIG_ERROR;
    };
    let code = err.exit_code();
    debug_assert!([
        exit_codes::SOLVER_FAILED,
        exit_codes::CONFIG_ERROR,
        exit_codes::MISSING_RESULTS
    ]
    .contains(&code));
    code
}

/// `RUST_LOG` wins; otherwise `info`, raised by each `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
