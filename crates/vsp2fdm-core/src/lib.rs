//! VSPAERO case orchestration and JSBSim aerodynamics generation.
//!
//! `run` drives the solver across the case matrix described by a
//! [`RunParams`] file, `convert` turns the results into a JSBSim
//! `<aerodynamics>` document and `plot` draws raw result files.

pub mod case;
pub mod convert;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod history;
pub mod jsbsim;
pub mod lod;
pub mod numeric;
pub mod params;
pub mod plot;
pub mod progress;
pub mod runner;
pub mod setup;
pub mod stab;

pub use case::{case_matrix, Case, CaseFilter};
pub use convert::{convert, ConvertOptions, ConvertReport};
pub use dataset::Dataset;
pub use error::{PipelineError, PipelineResult};
pub use executor::{CaseExecutor, GeometryJob, OpenVspTools, SolverJob};
pub use params::{Resolution, RunParams};
pub use progress::ProgressTracker;
pub use runner::{CaseRunner, RunSettings, RunSummary};
pub use setup::SetupFile;
