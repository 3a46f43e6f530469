//! VSPAERO setup file (`<model>_DegenGeom.vspaero`).
//!
//! The file is a list of `Name = value` lines. A `NumberOfControlGroups = N`
//! line is followed by `4 * N` lines describing the groups: name, surface
//! names, gains, deflection. Entry order is kept so a parsed file renders
//! back with the same layout.

use std::path::Path;

use crate::case::Case;
use crate::error::{PipelineError, PipelineResult};
use crate::params::{Resolution, RunParams};

pub const CONTROL_GROUPS_KEY: &str = "NumberOfControlGroups";

/// Flow condition used for the quick estimate case.
const ESTIMATE_OVERRIDES: [(&str, &str); 3] = [("Mach", "0.4"), ("AoA", "5"), ("Beta", "0")];

/// Settings written into every case.
const SOLVER_OVERRIDES: [(&str, &str); 2] =
    [("Preconditioner", "Matrix"), ("Karman-Tsien Correction", "N")];

#[derive(Debug, Clone, PartialEq)]
pub struct ControlGroup {
    pub name: String,
    pub surfaces: Vec<String>,
    pub gains: Vec<f64>,
    pub deflection: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetupEntry {
    Property { key: String, value: String },
    ControlGroups(Vec<ControlGroup>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetupFile {
    entries: Vec<SetupEntry>,
}

fn setup_error(source_name: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::Setup {
        source_name: source_name.to_string(),
        message: message.into(),
    }
}

impl SetupFile {
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io("failed to read", path, e))?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse setup text. `source_name` only labels errors.
    pub fn parse(content: &str, source_name: &str) -> PipelineResult<Self> {
        let lines: Vec<&str> = content.lines().collect();
        let mut entries = Vec::new();
        let mut row = 0;

        while row < lines.len() {
            let line = lines[row].trim();
            if line.is_empty() {
                row += 1;
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                setup_error(
                    source_name,
                    format!("line {}: expected 'name = value', got '{}'", row + 1, line),
                )
            })?;
            let key = key.trim();
            let value = value.trim();

            if key == CONTROL_GROUPS_KEY {
                let count: usize = value.parse().map_err(|_| {
                    setup_error(
                        source_name,
                        format!("line {}: bad control group count '{}'", row + 1, value),
                    )
                })?;
                let block_end = row + 1 + count * 4;
                if block_end > lines.len() {
                    return Err(setup_error(
                        source_name,
                        format!(
                            "line {}: {} control group(s) declared but file ends early",
                            row + 1,
                            count
                        ),
                    ));
                }
                let groups = (0..count)
                    .map(|i| parse_control_group(&lines[row + 1 + i * 4..], row + 2 + i * 4))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|message| setup_error(source_name, message))?;
                entries.push(SetupEntry::ControlGroups(groups));
                row = block_end;
            } else {
                entries.push(SetupEntry::Property {
                    key: key.to_string(),
                    value: value.to_string(),
                });
                row += 1;
            }
        }

        Ok(Self { entries })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                SetupEntry::Property { key, value } => {
                    out.push_str(&format!("{} = {}\n", key, value));
                }
                SetupEntry::ControlGroups(groups) => {
                    out.push_str(&format!("{} = {}\n", CONTROL_GROUPS_KEY, groups.len()));
                    for group in groups {
                        out.push_str(&format!("{}\n", group.name));
                        out.push_str(&format!("{}\n", group.surfaces.join(", ")));
                        let gains: Vec<String> = group.gains.iter().map(|g| g.to_string()).collect();
                        out.push_str(&format!("{}\n", gains.join(", ")));
                        out.push_str(&format!("{}\n", group.deflection));
                    }
                }
            }
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render()).map_err(|e| PipelineError::io("failed to write", path, e))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            SetupEntry::Property { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set a property, appending it if absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !self.replace(key, value.clone()) {
            self.entries.push(SetupEntry::Property {
                key: key.to_string(),
                value,
            });
        }
    }

    /// Replace an existing property; returns whether it was present.
    pub fn replace(&mut self, key: &str, value: impl Into<String>) -> bool {
        for entry in &mut self.entries {
            if let SetupEntry::Property { key: k, value: v } = entry {
                if k == key {
                    *v = value.into();
                    return true;
                }
            }
        }
        false
    }

    pub fn control_groups(&self) -> impl Iterator<Item = &ControlGroup> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                SetupEntry::ControlGroups(groups) => Some(groups.iter()),
                _ => None,
            })
            .flatten()
    }

    fn control_groups_mut(&mut self) -> impl Iterator<Item = &mut ControlGroup> {
        self.entries
            .iter_mut()
            .filter_map(|entry| match entry {
                SetupEntry::ControlGroups(groups) => Some(groups.iter_mut()),
                _ => None,
            })
            .flatten()
    }

    pub fn control_group(&self, name: &str) -> Option<&ControlGroup> {
        self.control_groups()
            .find(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn zero_deflections(&mut self) {
        for group in self.control_groups_mut() {
            group.deflection = 0.0;
        }
    }

    /// Deflect one control group; returns whether it exists.
    pub fn set_deflection(&mut self, name: &str, deflection: f64) -> bool {
        let mut found = false;
        for group in self.control_groups_mut() {
            if group.name.eq_ignore_ascii_case(name) {
                group.deflection = deflection;
                found = true;
            }
        }
        found
    }
}

fn parse_control_group(lines: &[&str], first_line: usize) -> Result<ControlGroup, String> {
    let name = lines[0].trim().to_string();
    let surfaces = lines[1]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let gains = lines[2]
        .split(',')
        .map(|g| {
            g.trim()
                .parse::<f64>()
                .map_err(|_| format!("line {}: bad gain '{}'", first_line + 2, g.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let deflection = lines[3]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("line {}: bad deflection '{}'", first_line + 3, lines[3].trim()))?;
    Ok(ControlGroup {
        name,
        surfaces,
        gains,
        deflection,
    })
}

/// Derive the setup file for one case from the base model setup.
pub fn case_setup(
    base: &SetupFile,
    params: &RunParams,
    case: &Case,
    resolution: Resolution,
    wake_iterations: u32,
) -> PipelineResult<SetupFile> {
    let mut setup = base.clone();

    setup.set("WakeIters", wake_iterations.to_string());
    setup.set("AoA", params.alpha.to_setup_value());
    setup.set("Beta", params.beta.to_setup_value());
    setup.set("Mach", params.mach.to_setup_value());

    if let Some(overrides) = params.resolution_overrides(resolution) {
        for (key, value) in overrides {
            setup.set(key, value.as_str());
        }
    }

    setup.zero_deflections();

    match case {
        Case::Estimate => {
            for (key, value) in ESTIMATE_OVERRIDES {
                setup.set(key, value);
            }
        }
        Case::Base | Case::Stability => {}
        Case::Deflection { group, angle } => {
            if let Some(cl_max) = params.cl_max.get(group) {
                setup.replace("ClMax", cl_max.to_string());
            }
            if params.alpha_only.iter().any(|g| g == group) {
                setup.set("Beta", "0");
            }
            let control = params.control_group_name(group);
            if !setup.set_deflection(control, *angle) {
                return Err(setup_error(
                    &case.id(),
                    format!("no control group named '{}' in the base setup", control),
                ));
            }
        }
    }

    for (key, value) in SOLVER_OVERRIDES {
        setup.set(key, value);
    }

    Ok(setup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "Sref = 12.5
Cref = 1.2
Bref = 10.0
Mach = 0.3
AoA = 2
Beta = 0
ClMax = -1
WakeIters = 5
NumberOfControlGroups = 2
Elev
Elevator_Left, Elevator_Right
1, 1
3.0
Ail
Aileron_Left, Aileron_Right
1, -1
0.0
";

    fn params() -> RunParams {
        RunParams::from_jsonc_str(
            r#"{
                "vspname": "glider", "vsp_filepath": ".", "vsp3_file": "glider.vsp3",
                "alpha": "-4, 0, 4", "beta": "0, 5", "mach": "0.2",
                "deflection_cases": { "elevator": [-10], "aileron": [5], "rudder": [5] },
                "surf_names": { "elevator": "Elev", "aileron": "Ail" },
                "CLmax": { "aileron": 1.3 },
                "alpha_only": ["elevator"],
                "resolutions": { "medium": { "NumWakeNodes": "32" } }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_render_keeps_layout() {
        let setup = SetupFile::parse(BASE, "base").unwrap();
        assert_eq!(setup.get("Sref"), Some("12.5"));
        assert_eq!(setup.control_groups().count(), 2);
        let elev = setup.control_group("elev").unwrap();
        assert_eq!(elev.surfaces, vec!["Elevator_Left", "Elevator_Right"]);
        assert_eq!(elev.gains, vec![1.0, 1.0]);
        assert_eq!(elev.deflection, 3.0);

        let rendered = setup.render();
        let reparsed = SetupFile::parse(&rendered, "rendered").unwrap();
        assert_eq!(reparsed, setup);
        assert!(rendered.starts_with("Sref = 12.5\nCref = 1.2\n"));
        assert!(rendered.contains("NumberOfControlGroups = 2\nElev\nElevator_Left, Elevator_Right\n1, 1\n3\n"));
    }

    #[test]
    fn test_parse_rejects_line_without_equals() {
        let err = SetupFile::parse("Sref = 1\ngarbage\n", "bad.vspaero").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("bad.vspaero"), "{}", msg);
    }

    #[test]
    fn test_parse_rejects_truncated_group_block() {
        let err = SetupFile::parse("NumberOfControlGroups = 1\nElev\n1\n", "x").unwrap_err();
        assert!(err.to_string().contains("ends early"));
    }

    #[test]
    fn test_base_case_overrides_flow_and_zeroes_deflections() {
        let base = SetupFile::parse(BASE, "base").unwrap();
        let setup = case_setup(&base, &params(), &Case::Base, Resolution::Low, 3).unwrap();
        assert_eq!(setup.get("WakeIters"), Some("3"));
        assert_eq!(setup.get("AoA"), Some("-4, 0, 4"));
        assert_eq!(setup.get("Beta"), Some("0, 5"));
        assert_eq!(setup.get("Mach"), Some("0.2"));
        assert_eq!(setup.get("Preconditioner"), Some("Matrix"));
        assert_eq!(setup.get("Karman-Tsien Correction"), Some("N"));
        assert!(setup.control_groups().all(|g| g.deflection == 0.0));
        assert_eq!(setup.get("NumWakeNodes"), None);
    }

    #[test]
    fn test_estimate_case_uses_single_condition() {
        let base = SetupFile::parse(BASE, "base").unwrap();
        let setup = case_setup(&base, &params(), &Case::Estimate, Resolution::Medium, 3).unwrap();
        assert_eq!(setup.get("Mach"), Some("0.4"));
        assert_eq!(setup.get("AoA"), Some("5"));
        assert_eq!(setup.get("Beta"), Some("0"));
        assert_eq!(setup.get("NumWakeNodes"), Some("32"));
    }

    #[test]
    fn test_deflection_case_deflects_aliased_group() {
        let base = SetupFile::parse(BASE, "base").unwrap();
        let case = Case::Deflection {
            group: "elevator".into(),
            angle: -10.0,
        };
        let setup = case_setup(&base, &params(), &case, Resolution::Low, 3).unwrap();
        assert_eq!(setup.control_group("Elev").unwrap().deflection, -10.0);
        assert_eq!(setup.control_group("Ail").unwrap().deflection, 0.0);
        // alpha_only group
        assert_eq!(setup.get("Beta"), Some("0"));
        assert_eq!(setup.get("ClMax"), Some("-1"));
    }

    #[test]
    fn test_deflection_case_applies_cl_max() {
        let base = SetupFile::parse(BASE, "base").unwrap();
        let case = Case::Deflection {
            group: "aileron".into(),
            angle: 5.0,
        };
        let setup = case_setup(&base, &params(), &case, Resolution::Low, 3).unwrap();
        assert_eq!(setup.get("ClMax"), Some("1.3"));
        assert_eq!(setup.get("Beta"), Some("0, 5"));
        assert_eq!(setup.control_group("Ail").unwrap().deflection, 5.0);
    }

    #[test]
    fn test_deflection_without_control_group_fails() {
        let base = SetupFile::parse(BASE, "base").unwrap();
        let case = Case::Deflection {
            group: "rudder".into(),
            angle: 5.0,
        };
        let err = case_setup(&base, &params(), &case, Resolution::Low, 3).unwrap_err();
        assert!(err.to_string().contains("rudder"), "{}", err);
    }
}
