//! Drives the case matrix through the external tools.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::case::Case;
use crate::error::{PipelineError, PipelineResult};
use crate::executor::{CaseExecutor, GeometryJob, SolverJob};
use crate::params::{Resolution, RunParams, DEFAULT_JOBS, DEFAULT_WAKE_ITERATIONS};
use crate::progress::ProgressTracker;
use crate::setup::{case_setup, SetupFile};

/// Solver by-products removed by `--cleanup`. `.history`, `.stab` and `.lod` stay.
pub const CLEANUP_EXTENSIONS: [&str; 5] = ["adb", "adb.cases", "fem", "group.1", "polar"];

/// Effective run settings after layering CLI flags over the parameter file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub resolution: Resolution,
    pub wake_iterations: u32,
    pub jobs: u32,
    pub dry_run: bool,
    pub cleanup: bool,
    pub force: bool,
}

impl RunSettings {
    /// Parameter-file values with defaults; callers overlay CLI flags.
    pub fn from_params(params: &RunParams) -> Self {
        Self {
            resolution: params.resolution.unwrap_or_default(),
            wake_iterations: params.wake_iterations.unwrap_or(DEFAULT_WAKE_ITERATIONS),
            jobs: params.jobs.unwrap_or(DEFAULT_JOBS).max(1),
            dry_run: false,
            cleanup: false,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Cases whose solver ran to completion.
    pub solved: Vec<String>,
    /// Cases prepared without solving (dry run).
    pub prepared: Vec<String>,
    /// Cases skipped because an earlier run finished them.
    pub resumed: Vec<String>,
    pub interrupted: bool,
}

enum CaseOutcome {
    Solved,
    Prepared,
}

pub struct CaseRunner<'a, E: CaseExecutor> {
    params: &'a RunParams,
    settings: &'a RunSettings,
    executor: &'a E,
    base_setup: SetupFile,
}

impl<'a, E: CaseExecutor> CaseRunner<'a, E> {
    /// Loads the model's base setup file up front so a bad file fails before any case runs.
    pub fn new(params: &'a RunParams, settings: &'a RunSettings, executor: &'a E) -> PipelineResult<Self> {
        let source = params.setup_source();
        info!(path = %source.display(), "reading base setup");
        let base_setup = SetupFile::load(&source)?;
        Ok(Self::with_base_setup(params, settings, executor, base_setup))
    }

    pub fn with_base_setup(
        params: &'a RunParams,
        settings: &'a RunSettings,
        executor: &'a E,
        base_setup: SetupFile,
    ) -> Self {
        Self {
            params,
            settings,
            executor,
            base_setup,
        }
    }

    /// Run `cases` in order, checkpointing after each one.
    ///
    /// When `shutdown` resolves the current case is abandoned (its child
    /// process is killed), progress is saved and the summary comes back with
    /// `interrupted` set.
    pub async fn run<S>(
        &self,
        cases: &[Case],
        progress: &mut ProgressTracker,
        shutdown: S,
    ) -> PipelineResult<RunSummary>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = RunSummary::default();

        progress.begin(
            self.settings.dry_run,
            self.settings.cleanup,
            self.settings.jobs,
            self.settings.wake_iterations,
        )?;

        info!(
            cases = cases.len(),
            dry_run = self.settings.dry_run,
            cleanup = self.settings.cleanup,
            resolution = %self.settings.resolution,
            "starting case matrix"
        );

        for case in cases {
            let id = case.id();
            if !self.settings.force && progress.is_completed(&id) {
                info!(case = %id, "already completed, skipping");
                summary.resumed.push(id);
                continue;
            }

            let outcome = tokio::select! {
                outcome = self.run_case(case) => outcome,
                _ = &mut shutdown => {
                    warn!(case = %id, "interrupted, saving progress");
                    progress.save()?;
                    summary.interrupted = true;
                    return Ok(summary);
                }
            };

            match outcome {
                Ok(CaseOutcome::Solved) => {
                    progress.mark_completed(&id)?;
                    summary.solved.push(id);
                }
                Ok(CaseOutcome::Prepared) => summary.prepared.push(id),
                Err(err) => {
                    progress.save()?;
                    return Err(err);
                }
            }
        }

        if !self.settings.dry_run {
            progress.finish()?;
        }
        Ok(summary)
    }

    async fn run_case(&self, case: &Case) -> PipelineResult<CaseOutcome> {
        let id = case.id();
        let dir = case.directory(self.params);
        info!(case = %id, dir = %dir.display(), "preparing case");

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::io("failed to create", &dir, e))?;

        remove_if_exists(&self.params.result_file(&dir, "csv")).await?;
        if !self.settings.dry_run {
            remove_if_exists(&self.params.result_file(&dir, "history")).await?;
            if case.wants_stability() {
                remove_if_exists(&self.params.result_file(&dir, "stab")).await?;
            }
        }

        let setup = case_setup(
            &self.base_setup,
            self.params,
            case,
            self.settings.resolution,
            self.settings.wake_iterations,
        )?;
        let setup_path = dir.join(self.params.setup_file_name());
        info!(case = %id, path = %setup_path.display(), "writing setup");
        tokio::fs::write(&setup_path, setup.render())
            .await
            .map_err(|e| PipelineError::io("failed to write", &setup_path, e))?;

        let work_dir = absolute(&dir)?;
        let geometry = GeometryJob {
            case_id: id.clone(),
            work_dir: work_dir.clone(),
            source: absolute(&self.params.geometry_source())?,
            target: work_dir.join(format!("{}.vsp3", self.params.vspname)),
        };
        self.executor.build_geometry(&geometry).await?;

        // The estimate is a single cheap point, so dry runs still solve it.
        if self.settings.dry_run && !matches!(case, Case::Estimate) {
            info!(case = %id, "dry run, solver skipped");
            return Ok(CaseOutcome::Prepared);
        }

        let job = SolverJob {
            case_id: id.clone(),
            work_dir,
            model: self.params.case_model_name(),
            threads: self.settings.jobs,
            stability: case.wants_stability(),
        };
        self.executor.solve(&job).await?;

        if self.settings.cleanup {
            self.cleanup(&dir).await?;
        }

        if self.settings.dry_run {
            Ok(CaseOutcome::Prepared)
        } else {
            Ok(CaseOutcome::Solved)
        }
    }

    async fn cleanup(&self, dir: &Path) -> PipelineResult<()> {
        for ext in CLEANUP_EXTENSIONS {
            remove_if_exists(&self.params.result_file(dir, ext)).await?;
        }
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> PipelineResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::io("failed to remove", path, e)),
    }
}

fn absolute(path: &Path) -> PipelineResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| PipelineError::io("failed to resolve", path, e))?;
    Ok(cwd.join(path))
}
