//! Case matrix: which solver runs make up a full sweep.

use std::fmt;
use std::path::PathBuf;

use crate::error::{PipelineError, PipelineResult};
use crate::numeric::position_label;
use crate::params::RunParams;

/// One solver invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Case {
    /// Single-point estimate at Mach 0.4, AoA 5, Beta 0.
    Estimate,
    Base,
    Stability,
    Deflection { group: String, angle: f64 },
}

impl Case {
    /// Stable identifier used in progress files and logs.
    pub fn id(&self) -> String {
        match self {
            Case::Deflection { group, angle } => format!("{}/{}", group, position_label(*angle)),
            other => other.filter_key().to_string(),
        }
    }

    /// Name matched against `--ignore` / `--only`.
    pub fn filter_key(&self) -> &str {
        match self {
            Case::Estimate => "est",
            Case::Base => "base",
            Case::Stability => "stab",
            Case::Deflection { group, .. } => group,
        }
    }

    pub fn directory(&self, params: &RunParams) -> PathBuf {
        match self {
            Case::Estimate => params.est_dir(),
            Case::Base => params.base_dir(),
            Case::Stability => params.stab_dir(),
            Case::Deflection { group, angle } => {
                params.output_dir.join(group).join(position_label(*angle))
            }
        }
    }

    /// Whether VSPAERO is asked for stability derivatives (`-stab`).
    pub fn wants_stability(&self) -> bool {
        !matches!(self, Case::Estimate)
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Every case described by the parameter file, in execution order.
pub fn case_matrix(params: &RunParams) -> Vec<Case> {
    let mut cases = vec![Case::Estimate, Case::Base, Case::Stability];
    for (group, angles) in &params.deflection_cases {
        for angle in angles {
            cases.push(Case::Deflection {
                group: group.clone(),
                angle: *angle,
            });
        }
    }
    cases
}

/// `--ignore` / `--only` selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseFilter {
    ignore: Vec<String>,
    only: Vec<String>,
}

impl CaseFilter {
    pub fn new(ignore: Vec<String>, only: Vec<String>) -> PipelineResult<Self> {
        if !ignore.is_empty() && !only.is_empty() {
            return Err(PipelineError::invalid_args(
                "cannot use --only and --ignore at the same time",
            ));
        }
        Ok(Self { ignore, only })
    }

    /// Build from comma-separated lists as given on the command line.
    pub fn from_lists(ignore: Option<&str>, only: Option<&str>) -> PipelineResult<Self> {
        Self::new(split_list(ignore), split_list(only))
    }

    pub fn allows(&self, case: &Case) -> bool {
        let key = case.filter_key();
        if self.ignore.iter().any(|k| k == key) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(|k| k == key)
    }

    /// Filter names that match no case; usually a typo.
    pub fn unknown_names<'a>(&'a self, cases: &[Case]) -> Vec<&'a str> {
        self.ignore
            .iter()
            .chain(self.only.iter())
            .filter(|name| !cases.iter().any(|c| c.filter_key() == name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

pub fn split_list(list: Option<&str>) -> Vec<String> {
    list.map(|l| {
        l.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
