//! Results -> dataset -> tables -> JSBSim document.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::dataset::{write_file, Dataset};
use crate::error::{PipelineError, PipelineResult};
use crate::jsbsim::{render_document, CoefficientTables, StabilityTables};
use crate::params::{RunParams, DEFAULT_WAKE_ITERATIONS};
use crate::stab::load_stab;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub wake_iterations: u32,
    /// Fail instead of skipping cases without results.
    pub strict: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            wake_iterations: DEFAULT_WAKE_ITERATIONS,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertReport {
    pub rows: usize,
    pub tables: usize,
    pub stability_points: Option<usize>,
    pub missing: Vec<String>,
    pub dataset_path: PathBuf,
    pub tables_path: PathBuf,
    pub output_path: PathBuf,
}

pub fn convert(params: &RunParams, options: &ConvertOptions) -> PipelineResult<ConvertReport> {
    let (dataset, missing) = Dataset::collect(params, options.wake_iterations)?;
    if !missing.is_empty() {
        if options.strict {
            return Err(PipelineError::MissingResults { cases: missing });
        }
        warn!(cases = %missing.join(", "), "converting without some results");
    }

    let dataset_path = params.dataset_path();
    dataset.save(&dataset_path)?;

    let tables = CoefficientTables::build(&params.data_to_axis_map, &dataset)?;
    let tables_path = params.tables_path();
    write_file(&tables_path, &tables.to_json()?)?;
    info!(path = %tables_path.display(), tables = tables.table_count(), "wrote coefficient tables");

    let stab_path = params.result_file(&params.stab_dir(), "stab");
    let stability = if stab_path.exists() {
        Some(StabilityTables::new(load_stab(&stab_path)?))
    } else {
        warn!(path = %stab_path.display(), "stability file missing, derivatives skipped");
        None
    };

    let document = render_document(&tables, stability.as_ref(), &params.run_data_to_axis)?;
    let output_path = params.output_xml();
    write_file(&output_path, &document)?;
    info!(path = %output_path.display(), "wrote aerodynamics");

    Ok(ConvertReport {
        rows: dataset.row_count(),
        tables: tables.table_count(),
        stability_points: stability.as_ref().map(StabilityTables::len),
        missing,
        dataset_path,
        tables_path,
        output_path,
    })
}
