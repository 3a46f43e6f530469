use anyhow::Result;

use vsp2fdm_core::params::DEFAULT_WAKE_ITERATIONS;
use vsp2fdm_core::{convert, ConvertOptions, RunParams};

use crate::cli::args::ConvertArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: ConvertArgs) -> Result<i32> {
    let params = RunParams::load(&args.params)?;
    let options = ConvertOptions {
        wake_iterations: args
            .wake_iterations
            .or(params.wake_iterations)
            .unwrap_or(DEFAULT_WAKE_ITERATIONS),
        strict: args.strict,
    };

    let report = convert(&params, &options)?;

    if !report.missing.is_empty() {
        eprintln!("Skipped (no results): {}", report.missing.join(", "));
    }
    match report.stability_points {
        Some(points) => eprintln!("Stability points: {}", points),
        None => eprintln!("Stability points: none (stab file missing)"),
    }
    eprintln!(
        "Wrote {} rows to {}",
        report.rows,
        report.dataset_path.display()
    );
    eprintln!(
        "Wrote {} tables to {}",
        report.tables,
        report.tables_path.display()
    );
    println!("{}", report.output_path.display());
    Ok(SUCCESS)
}
