//! Process exit codes. Scripts chaining `run` and `convert` depend on these.

pub const SUCCESS: i32 = 0;
pub const SOLVER_FAILED: i32 = 1; // vspaero/vspscript returned non-zero
pub const CONFIG_ERROR: i32 = 2; // bad parameters, arguments or input files
pub const MISSING_RESULTS: i32 = 3; // convert --strict with absent result files
pub const INTERRUPTED: i32 = 130; // Ctrl-C during run
