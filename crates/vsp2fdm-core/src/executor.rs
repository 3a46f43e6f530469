//! External OpenVSP tools behind a seam the runner can swap out.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_VSPAERO: &str = "vspaero";
pub const DEFAULT_VSPSCRIPT: &str = "vspscript";

/// Regenerate the DegenGeom CSV for a case directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryJob {
    pub case_id: String,
    pub work_dir: PathBuf,
    /// Model `.vsp3` to read.
    pub source: PathBuf,
    /// `<work_dir>/<vspname>.vsp3`; the CSV is named after it.
    pub target: PathBuf,
}

impl GeometryJob {
    pub fn script_path(&self) -> PathBuf {
        self.work_dir.join("degengeom.vspscript")
    }

    /// AngelScript run by `vspscript`.
    pub fn script(&self) -> String {
        let source = script_path_literal(&self.source);
        let target = script_path_literal(&self.target);
        format!(
            "void main()\n\
             {{\n\
             \x20   ReadVSPFile(\"{source}\");\n\
             \x20   SetVSP3FileName(\"{target}\");\n\
             \x20   ComputeDegenGeom(SET_ALL, DEGEN_GEOM_CSV_TYPE);\n\
             \x20   WriteVSPFile(\"{target}\", SET_ALL);\n\
             \x20   ClearVSPModel();\n\
             }}\n"
        )
    }
}

fn script_path_literal(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace('"', "\\\"")
}

/// One VSPAERO solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverJob {
    pub case_id: String,
    pub work_dir: PathBuf,
    /// `<vspname>_DegenGeom`
    pub model: String,
    pub threads: u32,
    pub stability: bool,
}

impl SolverJob {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-omp".to_string(), self.threads.to_string()];
        if self.stability {
            args.push("-stab".to_string());
        }
        args.push(self.model.clone());
        args
    }
}

#[async_trait]
pub trait CaseExecutor: Send + Sync {
    async fn build_geometry(&self, job: &GeometryJob) -> PipelineResult<()>;
    async fn solve(&self, job: &SolverJob) -> PipelineResult<()>;
}

/// Runs the real `vspscript` and `vspaero` executables.
#[derive(Debug, Clone)]
pub struct OpenVspTools {
    pub vspaero: PathBuf,
    pub vspscript: PathBuf,
}

impl Default for OpenVspTools {
    fn default() -> Self {
        Self {
            vspaero: PathBuf::from(DEFAULT_VSPAERO),
            vspscript: PathBuf::from(DEFAULT_VSPSCRIPT),
        }
    }
}

impl OpenVspTools {
    pub fn new(vspaero: impl Into<PathBuf>, vspscript: impl Into<PathBuf>) -> Self {
        Self {
            vspaero: vspaero.into(),
            vspscript: vspscript.into(),
        }
    }

    async fn run_tool(
        &self,
        program: &Path,
        args: &[String],
        work_dir: &Path,
        case_id: &str,
    ) -> PipelineResult<()> {
        let tool = program.display().to_string();
        info!(case = case_id, cwd = %work_dir.display(), "running {} {}", tool, args.join(" "));

        // Dropping the future (interrupt) kills the child.
        let status = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| PipelineError::ToolSpawn {
                tool: tool.clone(),
                source,
            })?;

        if status.success() {
            debug!(case = case_id, tool = %tool, "tool finished");
            Ok(())
        } else {
            Err(PipelineError::ToolFailed {
                tool,
                case: case_id.to_string(),
                code: status.code(),
            })
        }
    }
}

#[async_trait]
impl CaseExecutor for OpenVspTools {
    async fn build_geometry(&self, job: &GeometryJob) -> PipelineResult<()> {
        let script_path = job.script_path();
        tokio::fs::write(&script_path, job.script())
            .await
            .map_err(|e| PipelineError::io("failed to write", &script_path, e))?;

        let args = vec!["-script".to_string(), script_path.display().to_string()];
        self.run_tool(&self.vspscript, &args, &job.work_dir, &job.case_id)
            .await
    }

    async fn solve(&self, job: &SolverJob) -> PipelineResult<()> {
        self.run_tool(&self.vspaero, &job.args(), &job.work_dir, &job.case_id)
            .await
    }
}
