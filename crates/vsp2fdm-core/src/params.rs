//! Run parameter file (`runparams.jsonc`).
//!
//! Plain JSON plus `//` and `/* */` comments. Map-valued fields keep the
//! order they were written in, which is the order cases run in.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use json_comments::StripComments;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::numeric::position_label;

pub const DEFAULT_PARAMS_FILE: &str = "runparams.jsonc";
pub const DEFAULT_WAKE_ITERATIONS: u32 = 3;
pub const DEFAULT_JOBS: u32 = 1;

/// Case names that deflection groups may not reuse.
const RESERVED_CASE_NAMES: [&str; 3] = ["est", "base", "stab"];

/// Mesh/solver fidelity preset selected per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Resolution::Low => "low",
            Resolution::Medium => "medium",
            Resolution::High => "high",
        })
    }
}

/// A flow-condition sweep as written in the parameter file.
///
/// VSPAERO takes these verbatim (`AoA = -4, 0, 4`), so text is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowValues {
    List(Vec<f64>),
    Scalar(f64),
    Text(String),
}

impl FlowValues {
    /// Value as it appears on the right-hand side of a setup line.
    pub fn to_setup_value(&self) -> String {
        match self {
            FlowValues::List(values) => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            FlowValues::Scalar(v) => v.to_string(),
            FlowValues::Text(text) => text.trim().to_string(),
        }
    }

    /// Numeric values; unparsable text entries are dropped.
    pub fn values(&self) -> Vec<f64> {
        match self {
            FlowValues::List(values) => values.clone(),
            FlowValues::Scalar(v) => vec![*v],
            FlowValues::Text(text) => text
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect(),
        }
    }
}

/// Positions listed for one group in `data_to_axis_map`.
///
/// Older parameter files spell these as object keys with empty values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionSet {
    List(Vec<PositionValue>),
    Keys(IndexMap<String, serde_json::Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionValue {
    Number(f64),
    Text(String),
}

impl PositionSet {
    pub fn labels(&self) -> Vec<String> {
        match self {
            PositionSet::List(values) => values
                .iter()
                .map(|v| match v {
                    PositionValue::Number(n) => n.to_string(),
                    PositionValue::Text(t) => t.trim().to_string(),
                })
                .collect(),
            PositionSet::Keys(keys) => keys.keys().map(|k| k.trim().to_string()).collect(),
        }
    }
}

/// coefficient -> group -> positions
pub type CoefficientMap = IndexMap<String, IndexMap<String, PositionSet>>;

/// `forces`/`moments` -> axis -> summed properties
pub type AxisMap = IndexMap<String, IndexMap<String, Vec<String>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub vspname: String,
    pub vsp_filepath: PathBuf,
    pub vsp3_file: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub est_file: Option<PathBuf>,
    #[serde(default)]
    pub base_file: Option<PathBuf>,
    #[serde(default)]
    pub stab_file: Option<PathBuf>,
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    pub alpha: FlowValues,
    pub beta: FlowValues,
    pub mach: FlowValues,

    #[serde(default)]
    pub deflection_cases: IndexMap<String, Vec<f64>>,
    #[serde(default)]
    pub surf_names: BTreeMap<String, String>,
    #[serde(default, rename = "CLmax")]
    pub cl_max: BTreeMap<String, f64>,
    #[serde(default)]
    pub alpha_only: Vec<String>,

    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub wake_iterations: Option<u32>,
    #[serde(default)]
    pub jobs: Option<u32>,
    #[serde(default)]
    pub resolutions: BTreeMap<String, IndexMap<String, String>>,

    #[serde(default)]
    pub data_to_axis_map: CoefficientMap,
    #[serde(default)]
    pub run_data_to_axis: AxisMap,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl RunParams {
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let mut content = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut content))
            .map_err(|e| PipelineError::io("failed to read", path, e))?;

        Self::from_jsonc_str(&content).map_err(|message| PipelineError::Params {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse parameter text; the error is a bare message so callers can attach a path.
    pub fn from_jsonc_str(content: &str) -> Result<Self, String> {
        let stripped = StripComments::new(content.as_bytes());
        let params: RunParams = serde_json::from_reader(stripped).map_err(|e| e.to_string())?;
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), String> {
        if self.vspname.trim().is_empty() {
            return Err("vspname must not be empty".to_string());
        }
        if self.vsp3_file.trim().is_empty() {
            return Err("vsp3_file must not be empty".to_string());
        }
        for (group, angles) in &self.deflection_cases {
            if group.is_empty()
                || group.contains('/')
                || group.contains('\\')
                || RESERVED_CASE_NAMES.contains(&group.as_str())
            {
                return Err(format!("deflection group name '{}' is not usable as a directory", group));
            }
            if angles.iter().any(|a| !a.is_finite()) {
                return Err(format!("deflection group '{}' has a non-finite angle", group));
            }
            let mut labels = BTreeSet::new();
            for angle in angles {
                let label = position_label(*angle);
                if !labels.insert(label.clone()) {
                    return Err(format!(
                        "deflection group '{}' has two angles labelled {}",
                        group, label
                    ));
                }
            }
        }
        Ok(())
    }

    /// `<vspname>_DegenGeom`, the stem VSPAERO is invoked with.
    pub fn case_model_name(&self) -> String {
        format!("{}_DegenGeom", self.vspname)
    }

    pub fn setup_file_name(&self) -> String {
        format!("{}.vspaero", self.case_model_name())
    }

    /// Base setup file every case is derived from.
    pub fn setup_source(&self) -> PathBuf {
        self.vsp_filepath.join(self.setup_file_name())
    }

    pub fn geometry_source(&self) -> PathBuf {
        self.vsp_filepath.join(&self.vsp3_file)
    }

    pub fn est_dir(&self) -> PathBuf {
        self.est_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("est"))
    }

    pub fn base_dir(&self) -> PathBuf {
        self.base_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("base"))
    }

    pub fn stab_dir(&self) -> PathBuf {
        self.stab_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("stab"))
    }

    pub fn output_xml(&self) -> PathBuf {
        self.output_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("aerodynamics.xml"))
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.output_dir.join("dataset.json")
    }

    pub fn tables_path(&self) -> PathBuf {
        self.output_dir.join("outputData.json")
    }

    /// Result file `<vspname>_DegenGeom.<ext>` inside `dir`.
    pub fn result_file(&self, dir: &Path, ext: &str) -> PathBuf {
        dir.join(format!("{}.{}", self.case_model_name(), ext))
    }

    /// Setup overrides configured for a resolution preset.
    pub fn resolution_overrides(&self, resolution: Resolution) -> Option<&IndexMap<String, String>> {
        self.resolutions.get(&resolution.to_string())
    }

    /// Control-group name in the setup file for a deflection group key.
    pub fn control_group_name<'a>(&'a self, group: &'a str) -> &'a str {
        self.surf_names.get(group).map(String::as_str).unwrap_or(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
{
    // model
    "vspname": "glider",
    "vsp_filepath": "./model",
    "vsp3_file": "glider.vsp3",
    /* flow conditions */
    "alpha": "-4, 0, 4, 8",
    "beta": [0, 5],
    "mach": 0.2,
    "deflection_cases": {
        "elevator": [-10, 0, 10],
        "aileron": [5, -5]
    },
    "surf_names": { "elevator": "Elev" },
    "CLmax": { "aileron": 1.4 },
    "alpha_only": ["elevator"],
    "resolutions": { "high": { "NumWakeNodes": "64" } },
    "data_to_axis_map": {
        "CLtot": { "base": {"0": {}}, "elevator": ["-10.0", 10] }
    }
}
"#;

    #[test]
    fn test_parse_jsonc_with_comments() {
        let params = RunParams::from_jsonc_str(SAMPLE).unwrap();
        assert_eq!(params.vspname, "glider");
        assert_eq!(params.alpha.to_setup_value(), "-4, 0, 4, 8");
        assert_eq!(params.beta.to_setup_value(), "0, 5");
        assert_eq!(params.mach.to_setup_value(), "0.2");
        assert_eq!(params.alpha.values(), vec![-4.0, 0.0, 4.0, 8.0]);
        assert_eq!(params.cl_max.get("aileron"), Some(&1.4));
        assert_eq!(
            params.resolution_overrides(Resolution::High).unwrap()["NumWakeNodes"],
            "64".to_string()
        );
    }

    #[test]
    fn test_deflection_cases_keep_file_order() {
        let params = RunParams::from_jsonc_str(SAMPLE).unwrap();
        let groups: Vec<_> = params.deflection_cases.keys().cloned().collect();
        assert_eq!(groups, vec!["elevator", "aileron"]);
        assert_eq!(params.deflection_cases["aileron"], vec![5.0, -5.0]);
    }

    #[test]
    fn test_defaults_and_paths() {
        let params = RunParams::from_jsonc_str(SAMPLE).unwrap();
        assert_eq!(params.output_dir, PathBuf::from("output"));
        assert_eq!(params.base_dir(), PathBuf::from("output/base"));
        assert_eq!(params.output_xml(), PathBuf::from("output/aerodynamics.xml"));
        assert_eq!(
            params.setup_source(),
            PathBuf::from("./model/glider_DegenGeom.vspaero")
        );
        assert_eq!(params.control_group_name("elevator"), "Elev");
        assert_eq!(params.control_group_name("aileron"), "aileron");
    }

    #[test]
    fn test_position_sets_accept_lists_and_keys() {
        let params = RunParams::from_jsonc_str(SAMPLE).unwrap();
        let groups = &params.data_to_axis_map["CLtot"];
        assert_eq!(groups["base"].labels(), vec!["0"]);
        assert_eq!(groups["elevator"].labels(), vec!["-10.0", "10"]);
    }

    #[test]
    fn test_missing_required_field_is_reported() {
        let err = RunParams::from_jsonc_str(r#"{ "vspname": "x" }"#).unwrap_err();
        assert!(err.contains("missing field"), "{}", err);
    }

    #[test]
    fn test_group_named_base_is_rejected() {
        let text = r#"{"vspname":"a","vsp_filepath":".","vsp3_file":"a.vsp3",
            "alpha":"0","beta":"0","mach":"0.1","deflection_cases":{"base":[1]}}"#;
        let err = RunParams::from_jsonc_str(text).unwrap_err();
        assert!(err.contains("not usable"), "{}", err);
    }

    #[test]
    fn test_angles_sharing_a_label_are_rejected() {
        let text = r#"{"vspname":"a","vsp_filepath":".","vsp3_file":"a.vsp3",
            "alpha":"0","beta":"0","mach":"0.1","deflection_cases":{"elevator":[2.01, 2.04]}}"#;
        let err = RunParams::from_jsonc_str(text).unwrap_err();
        assert!(err.contains("elevator"), "{}", err);
        assert!(err.contains("2.0"), "{}", err);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runparams.jsonc");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RunParams::load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Params { .. }));
        assert!(err.to_string().contains("runparams.jsonc"));
    }
}
