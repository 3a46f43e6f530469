use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use vsp2fdm_core::{
    case_matrix, Case, CaseFilter, CaseRunner, OpenVspTools, ProgressTracker, RunParams,
    RunSettings,
};

use crate::cli::args::RunArgs;
use crate::exit_codes::{INTERRUPTED, SUCCESS};

pub async fn run(args: RunArgs) -> Result<i32> {
    let filter = CaseFilter::from_lists(args.ignore.as_deref(), args.only.as_deref())?;
    let params = RunParams::load(&args.params)?;

    let mut settings = RunSettings::from_params(&params);
    if let Some(resolution) = args.resolution {
        settings.resolution = resolution.into();
    }
    if let Some(jobs) = args.jobs {
        settings.jobs = jobs.max(1);
    }
    if let Some(wake) = args.wake_iterations {
        settings.wake_iterations = wake;
    }
    settings.dry_run = args.dry_run;
    settings.cleanup = args.cleanup;
    settings.force = args.force;

    let cases = case_matrix(&params);
    for name in filter.unknown_names(&cases) {
        warn!(name, "case filter matches nothing");
    }
    let selected: Vec<Case> = cases.into_iter().filter(|c| filter.allows(c)).collect();
    info!(
        params = %args.params.display(),
        cases = selected.len(),
        "case matrix ready"
    );

    let tools = OpenVspTools::new(args.vspaero, args.vspscript);
    let runner = CaseRunner::new(&params, &settings, &tools)?;
    let mut progress = ProgressTracker::open(&args.progress_file, settings.force)
        .with_context(|| format!("opening {}", args.progress_file.display()))?;

    let ctrl_c = async {
        // no signal handler: run to completion
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let summary = runner.run(&selected, &mut progress, ctrl_c).await?;

    if summary.interrupted {
        eprintln!(
            "Interrupted; progress saved to {} ({} case(s) done)",
            progress.path().display(),
            progress.state().completed.len()
        );
        return Ok(INTERRUPTED);
    }

    eprintln!(
        "[{}] Finished: {} solved, {} prepared, {} already done",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        summary.solved.len(),
        summary.prepared.len(),
        summary.resumed.len()
    );
    Ok(SUCCESS)
}
