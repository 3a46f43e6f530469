use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use vsp2fdm_core::executor::{DEFAULT_VSPAERO, DEFAULT_VSPSCRIPT};
use vsp2fdm_core::params::DEFAULT_PARAMS_FILE;
use vsp2fdm_core::progress::DEFAULT_PROGRESS_FILE;
use vsp2fdm_core::Resolution;

#[derive(Parser)]
#[command(
    name = "vsp2fdm",
    version,
    about = "Run VSPAERO case matrices and turn the results into JSBSim aerodynamics"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the solver over every case in the parameter file
    Run(RunArgs),
    /// Build dataset.json, outputData.json and the aerodynamics XML from results
    Convert(ConvertArgs),
    /// Plot a .history or .lod file
    Plot(PlotArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResolutionArg {
    Low,
    Medium,
    High,
}

impl From<ResolutionArg> for Resolution {
    fn from(value: ResolutionArg) -> Self {
        match value {
            ResolutionArg::Low => Resolution::Low,
            ResolutionArg::Medium => Resolution::Medium,
            ResolutionArg::High => Resolution::High,
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// Run parameter file (JSON with comments)
    #[arg(short = 'p', long = "runparams", default_value = DEFAULT_PARAMS_FILE)]
    pub params: PathBuf,

    /// Write case files but only solve the estimate case
    #[arg(short, long)]
    pub dry_run: bool,

    /// Delete solver by-products after each case
    #[arg(short, long)]
    pub cleanup: bool,

    #[arg(short, long, value_enum)]
    pub resolution: Option<ResolutionArg>,

    /// Solver threads (vspaero -omp)
    #[arg(short, long)]
    pub jobs: Option<u32>,

    #[arg(short, long = "wake")]
    pub wake_iterations: Option<u32>,

    /// Ignore the progress file and rerun every case
    #[arg(short, long)]
    pub force: bool,

    /// Comma-separated cases to skip (est, base, stab or a deflection group)
    #[arg(short, long)]
    pub ignore: Option<String>,

    /// Comma-separated cases to run exclusively
    #[arg(short, long)]
    pub only: Option<String>,

    #[arg(long, default_value = DEFAULT_PROGRESS_FILE)]
    pub progress_file: PathBuf,

    #[arg(long, env = "VSP2FDM_VSPAERO", default_value = DEFAULT_VSPAERO)]
    pub vspaero: PathBuf,

    #[arg(long, env = "VSP2FDM_VSPSCRIPT", default_value = DEFAULT_VSPSCRIPT)]
    pub vspscript: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct ConvertArgs {
    #[arg(short = 'p', long = "runparams", default_value = DEFAULT_PARAMS_FILE)]
    pub params: PathBuf,

    /// Wake iterations the results were computed with
    #[arg(short, long = "wake")]
    pub wake_iterations: Option<u32>,

    /// Fail when result files for any case are missing
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct PlotArgs {
    /// .history or .lod file
    pub input: PathBuf,

    /// X column (default: AoA for history, yavg for lod)
    #[arg(short = 'x', long)]
    pub x_axis: Option<String>,

    /// Y column (default: CLtot for history, Cl for lod)
    #[arg(short = 'y', long)]
    pub y_axis: Option<String>,

    /// Comma-separated AoA values to keep
    #[arg(short = 'a', long)]
    pub aoa: Option<String>,

    #[arg(short = 'm', long)]
    pub mach: Option<String>,

    #[arg(short = 'b', long)]
    pub beta: Option<String>,

    /// Comma-separated wing numbers to keep (lod only)
    #[arg(short = 'w', long)]
    pub wing: Option<String>,

    /// Wake iterations of a history file
    #[arg(long, default_value_t = vsp2fdm_core::params::DEFAULT_WAKE_ITERATIONS)]
    pub wake: u32,

    /// Print the series instead of drawing them
    #[arg(long)]
    pub headless: bool,

    /// SVG output (default: input with .svg extension)
    #[arg(short = 'O', long)]
    pub output: Option<PathBuf>,
}
