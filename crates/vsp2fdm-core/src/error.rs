//! Error types for the conversion pipeline.

use std::path::{Path, PathBuf};

/// Pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Filesystem access failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run parameter file is malformed or incomplete.
    #[error("invalid parameter file {}: {message}", path.display())]
    Params { path: PathBuf, message: String },

    /// VSPAERO setup file could not be parsed or derived.
    #[error("setup error in {source_name}: {message}")]
    Setup { source_name: String, message: String },

    /// Progress checkpoint could not be read or written.
    #[error("progress file {}: {message}", path.display())]
    Progress { path: PathBuf, message: String },

    /// Arguments contradict each other or name unknown things.
    #[error("invalid arguments: {message}")]
    InvalidArgs { message: String },

    /// External tool could not be started.
    #[error("failed to start {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool ran but reported failure.
    #[error("{tool} failed for case {case} ({})", describe_status(*code))]
    ToolFailed {
        tool: String,
        case: String,
        code: Option<i32>,
    },

    /// Result files for requested cases are absent.
    #[error("missing results for {} case(s): {}", cases.len(), cases.join(", "))]
    MissingResults { cases: Vec<String> },

    /// Result file content could not be interpreted.
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Serialising an output document failed.
    #[error("failed to encode {what}: {message}")]
    Encode { what: &'static str, message: String },

    /// Plot rendering failed.
    #[error("plot error: {message}")]
    Plot { message: String },
}

fn describe_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl PipelineError {
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Solver side
            Self::ToolFailed { .. } => 1,

            // Config and input issues
            Self::Params { .. } => 2,
            Self::Setup { .. } => 2,
            Self::InvalidArgs { .. } => 2,
            Self::Parse { .. } => 2,
            Self::ToolSpawn { .. } => 2,

            // Bookkeeping
            Self::MissingResults { .. } => 3,

            // Other
            Self::Io { .. } => 2,
            Self::Progress { .. } => 2,
            Self::Encode { .. } => 2,
            Self::Plot { .. } => 2,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
