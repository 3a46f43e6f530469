//! VSPAERO `.history` files: one converged row per solver case.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::numeric::flush_tiny;

pub const SOLVER_CASE_MARKER: &str = "Solver Case:";

pub const HISTORY_COLUMNS: [&str; 35] = [
    "Mach", "AoA", "Beta", "CLo", "CLi", "CLtot", "CDo", "CDi", "CDtot", "CDt", "CDtot_t", "CSo",
    "CSi", "CStot", "L/D", "E", "CFxo", "CFyo", "CFzo", "CFxi", "CFyi", "CFzi", "CFxtot", "CFytot",
    "CFztot", "CMxo", "CMyo", "CMzo", "CMxi", "CMyi", "CMzi", "CMxtot", "CMytot", "CMztot", "T/QS",
];

/// Converged coefficients for one flight condition, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryRow(BTreeMap<String, f64>);

impl HistoryRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }

    pub fn mach(&self) -> Option<f64> {
        self.get("Mach")
    }

    pub fn aoa(&self) -> Option<f64> {
        self.get("AoA")
    }

    pub fn beta(&self) -> Option<f64> {
        self.get("Beta")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for HistoryRow {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn load_history(path: &Path, wake_iterations: u32) -> PipelineResult<Vec<HistoryRow>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| PipelineError::io("failed to read", path, e))?;
    Ok(parse_history(&content, wake_iterations, &path.display().to_string()))
}

/// Extract the converged row of every solver case.
///
/// The row sits `2 + wake_iterations` lines below its `Solver Case:` marker.
pub fn parse_history(content: &str, wake_iterations: u32, source_name: &str) -> Vec<HistoryRow> {
    let lines: Vec<&str> = content.lines().collect();
    let offset = 2 + wake_iterations as usize;
    let mut rows = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if !line.starts_with(SOLVER_CASE_MARKER) {
            continue;
        }
        let Some(data_line) = lines.get(index + offset) else {
            warn!(
                source = source_name,
                line = index + 1,
                "solver case has no converged row, check --wake"
            );
            continue;
        };
        match parse_row(data_line) {
            Ok(values) => {
                if values.len() != HISTORY_COLUMNS.len() {
                    warn!(
                        source = source_name,
                        line = index + offset + 1,
                        expected = HISTORY_COLUMNS.len(),
                        found = values.len(),
                        "column count mismatch"
                    );
                }
                rows.push(
                    HISTORY_COLUMNS
                        .iter()
                        .zip(values)
                        .map(|(column, value)| (column.to_string(), value))
                        .collect(),
                );
            }
            Err(token) => warn!(
                source = source_name,
                line = index + offset + 1,
                token = %token,
                "unparsable history row skipped"
            ),
        }
    }
    rows
}

/// Values of a data row without its leading iteration number.
/// NaN and infinities count as unparsable.
fn parse_row(line: &str) -> Result<Vec<f64>, String> {
    let mut tokens = line.split_whitespace();
    if tokens.next().is_none() {
        return Err("<empty line>".to_string());
    }
    tokens
        .map(|t| match t.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(flush_tiny(v)),
            _ => Err(t.to_string()),
        })
        .collect()
}
