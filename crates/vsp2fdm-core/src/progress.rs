//! Resumable run checkpoint (`progress.json`).

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_PROGRESS_FILE: &str = "progress.json";

/// On-disk checkpoint. Fields are declared in key order so the file is sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default)]
    pub completed: Vec<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub nproc: u32,
    #[serde(default)]
    pub wake: u32,
}

/// Progress bound to its file; every change is persisted immediately.
#[derive(Debug)]
pub struct ProgressTracker {
    path: PathBuf,
    state: Progress,
}

impl ProgressTracker {
    /// Open the checkpoint at `path`, starting fresh if it is absent or `force` is set.
    pub fn open(path: impl AsRef<Path>, force: bool) -> PipelineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if force || !path.exists() {
            Progress::default()
        } else {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| PipelineError::io("failed to read", &path, e))?;
            let state: Progress =
                serde_json::from_str(&content).map_err(|e| PipelineError::Progress {
                    path: path.clone(),
                    message: format!("failed to parse: {}", e),
                })?;
            info!(
                path = %path.display(),
                completed = state.completed.len(),
                "resuming from progress file"
            );
            state
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &Progress {
        &self.state
    }

    /// Record the settings of the run about to start.
    ///
    /// Completed cases were solved with the recorded wake count; resuming with a
    /// different one is refused so old and new results never mix. A wake of 0
    /// means the file predates the setting and is accepted.
    pub fn begin(&mut self, dry_run: bool, cleanup: bool, jobs: u32, wake: u32) -> PipelineResult<()> {
        if !self.state.completed.is_empty() && self.state.wake != 0 && self.state.wake != wake {
            return Err(PipelineError::Progress {
                path: self.path.clone(),
                message: format!(
                    "{} case(s) were solved with {} wake iterations but this run uses {}; \
                     pass --force to start over",
                    self.state.completed.len(),
                    self.state.wake,
                    wake
                ),
            });
        }
        self.state.dryrun = dry_run;
        self.state.cleanup = cleanup;
        self.state.nproc = jobs;
        self.state.wake = wake;
        self.state.done = false;
        self.save()
    }

    pub fn is_completed(&self, case_id: &str) -> bool {
        self.state.completed.iter().any(|c| c == case_id)
    }

    pub fn mark_completed(&mut self, case_id: &str) -> PipelineResult<()> {
        if !self.is_completed(case_id) {
            self.state.completed.push(case_id.to_string());
        }
        debug!(case = case_id, "checkpoint");
        self.save()
    }

    pub fn finish(&mut self) -> PipelineResult<()> {
        self.state.done = true;
        self.save()
    }

    /// Write via a temp file in the same directory so a crash never leaves half a file.
    pub fn save(&self) -> PipelineResult<()> {
        let content =
            serde_json::to_string_pretty(&self.state).map_err(|e| PipelineError::Encode {
                what: "progress",
                message: e.to_string(),
            })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::io("failed to create", &dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| PipelineError::io("failed to create temp file in", &dir, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.write_all(b"\n"))
            .map_err(|e| PipelineError::io("failed to write", tmp.path().to_path_buf(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| PipelineError::io("failed to write", &self.path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut tracker = ProgressTracker::open(&path, false).unwrap();
        tracker.begin(false, true, 4, 3).unwrap();
        tracker.mark_completed("base").unwrap();
        tracker.mark_completed("base").unwrap();
        tracker.mark_completed("elevator/-5.0").unwrap();

        let reopened = ProgressTracker::open(&path, false).unwrap();
        assert!(reopened.is_completed("base"));
        assert!(reopened.is_completed("elevator/-5.0"));
        assert!(!reopened.is_completed("stab"));
        assert_eq!(reopened.state().completed.len(), 2);
        assert_eq!(reopened.state().nproc, 4);
        assert!(reopened.state().cleanup);
        assert!(!reopened.state().done);
    }

    #[test]
    fn test_resume_with_other_wake_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let mut tracker = ProgressTracker::open(&path, false).unwrap();
        tracker.begin(false, false, 1, 5).unwrap();
        tracker.mark_completed("base").unwrap();

        let mut reopened = ProgressTracker::open(&path, false).unwrap();
        let err = reopened.begin(false, false, 1, 3).unwrap_err();
        assert!(matches!(err, PipelineError::Progress { .. }));
        assert!(err.to_string().contains("--force"), "{}", err);
        assert_eq!(reopened.state().wake, 5);

        let mut same = ProgressTracker::open(&path, false).unwrap();
        same.begin(false, false, 8, 5).unwrap();
        assert_eq!(same.state().nproc, 8);
    }

    #[test]
    fn test_force_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let mut tracker = ProgressTracker::open(&path, false).unwrap();
        tracker.mark_completed("base").unwrap();

        let forced = ProgressTracker::open(&path, true).unwrap();
        assert!(forced.state().completed.is_empty());
    }

    #[test]
    fn test_file_keys_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let mut tracker = ProgressTracker::open(&path, false).unwrap();
        tracker.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let keys: Vec<usize> = ["cleanup", "completed", "done", "dryrun", "nproc", "wake"]
            .iter()
            .map(|k| text.find(&format!("\"{}\"", k)).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "{}", text);
        assert!(text.contains("\"done\": true"));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{").unwrap();
        let err = ProgressTracker::open(&path, false).unwrap_err();
        assert!(matches!(err, PipelineError::Progress { .. }));
    }
}
