//! Intermediate dataset: every converged history row, grouped by case.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::case::Case;
use crate::error::{PipelineError, PipelineResult};
use crate::history::{load_history, HistoryRow};
use crate::numeric::position_label;
use crate::params::RunParams;

pub const BASE_GROUP: &str = "base";
pub const BASE_POSITION: &str = "0";

/// group -> position label -> rows. Serialised with sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset(BTreeMap<String, BTreeMap<String, Vec<HistoryRow>>>);

impl Dataset {
    /// Read the base and deflection history files named by `params`.
    ///
    /// Missing files are skipped; their case ids come back alongside the dataset.
    pub fn collect(params: &RunParams, wake_iterations: u32) -> PipelineResult<(Self, Vec<String>)> {
        let mut dataset = Dataset::default();
        let mut missing = Vec::new();

        let mut cases = vec![Case::Base];
        for (group, angles) in &params.deflection_cases {
            cases.extend(angles.iter().map(|angle| Case::Deflection {
                group: group.clone(),
                angle: *angle,
            }));
        }

        for case in &cases {
            let path = params.result_file(&case.directory(params), "history");
            if !path.exists() {
                warn!(case = %case, path = %path.display(), "history file missing, skipping");
                missing.push(case.id());
                continue;
            }
            let rows = load_history(&path, wake_iterations)?;
            info!(case = %case, rows = rows.len(), "read history");

            let (group, position) = match case {
                Case::Deflection { group, angle } => (group.clone(), position_label(*angle)),
                _ => (BASE_GROUP.to_string(), BASE_POSITION.to_string()),
            };
            dataset.insert(group, position, rows);
        }

        Ok((dataset, missing))
    }

    pub fn insert(&mut self, group: impl Into<String>, position: impl Into<String>, rows: Vec<HistoryRow>) {
        self.0
            .entry(group.into())
            .or_default()
            .insert(position.into(), rows);
    }

    pub fn rows(&self, group: &str, position: &str) -> Option<&[HistoryRow]> {
        self.0.get(group)?.get(position).map(Vec::as_slice)
    }

    pub fn base_rows(&self) -> Option<&[HistoryRow]> {
        self.rows(BASE_GROUP, BASE_POSITION)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let mut content = serde_json::to_string_pretty(self).map_err(|e| PipelineError::Encode {
            what: "dataset",
            message: e.to_string(),
        })?;
        content.push('\n');
        write_file(path, &content)?;
        info!(path = %path.display(), rows = self.row_count(), "wrote dataset");
        Ok(())
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io("failed to read", path, e))?;
        serde_json::from_str(&content).map_err(|e| PipelineError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Write `content`, creating parent directories first.
pub(crate) fn write_file(path: &Path, content: &str) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| PipelineError::io("failed to create", parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| PipelineError::io("failed to write", path, e))
}
