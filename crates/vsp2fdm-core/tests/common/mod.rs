#![allow(dead_code)]

use std::path::Path;

use vsp2fdm_core::history::{HISTORY_COLUMNS, SOLVER_CASE_MARKER};
use vsp2fdm_core::RunParams;

pub const WAKE: u32 = 3;

pub const BASE_SETUP: &str = "Sref = 12.5
Cref = 1.2
Bref = 10.0
Mach = 0.3
AoA = 2
Beta = 0
ClMax = -1
WakeIters = 5
NumberOfControlGroups = 1
Elevator
Elevator_Left, Elevator_Right
1, 1
0.0
";

/// Parameter file rooted in `dir`; one elevator group with two positions.
pub fn params_text(dir: &Path) -> String {
    format!(
        r#"{{
    // generated for tests
    "vspname": "glider",
    "vsp_filepath": "{root}/model",
    "vsp3_file": "glider.vsp3",
    "output_dir": "{root}/output",
    "est_file": "{root}/output/est",
    "base_file": "{root}/output/base",
    "stab_file": "{root}/output/stab",
    "output_file": "{root}/output/aerodynamics.xml",
    "alpha": "0, 4",
    "beta": "0",
    "mach": "0.2",
    "deflection_cases": {{ "elevator": [-10, 10] }},
    "surf_names": {{ "elevator": "Elevator" }},
    "data_to_axis_map": {{
        "CLtot": {{ "base": {{ "0": {{}} }}, "elevator": [-10, 10] }}
    }},
    "run_data_to_axis": {{
        "forces": {{ "lift": ["aero/CLtot_base", "aero/CLtot_elevator"] }},
        "moments": {{ "pitch": ["aero/CMytot_base"] }}
    }}
}}"#,
        root = dir.display()
    )
}

pub fn write_params(dir: &Path) -> RunParams {
    let model = dir.join("model");
    std::fs::create_dir_all(&model).unwrap();
    std::fs::write(model.join("glider_DegenGeom.vspaero"), BASE_SETUP).unwrap();
    std::fs::write(model.join("glider.vsp3"), "<vsp3/>").unwrap();

    let path = dir.join("runparams.jsonc");
    std::fs::write(&path, params_text(dir)).unwrap();
    RunParams::load(&path).unwrap()
}

/// History text with one solver case per (aoa, CLtot) pair at Mach 0.2, Beta 0.
pub fn history_text(points: &[(f64, f64)]) -> String {
    let mut text = String::from("VSPAERO history\n");
    for (index, (aoa, cl)) in points.iter().enumerate() {
        text.push_str(&format!("{} {}\n\n  Iter  Mach  AoA  Beta ...\n", SOLVER_CASE_MARKER, index + 1));
        for iter in 1..=WAKE {
            let mut values = vec![0.01; HISTORY_COLUMNS.len()];
            values[0] = 0.2;
            values[1] = *aoa;
            values[2] = 0.0;
            values[5] = if iter == WAKE { *cl } else { 0.0 };
            let body: Vec<String> = values.iter().map(|v| format!("{:>10.5}", v)).collect();
            text.push_str(&format!("{:>5} {}\n", iter, body.join(" ")));
        }
        text.push('\n');
    }
    text
}

pub const STAB_TEXT: &str = "\
Mach_                0.200000000 no_unit
AoA_                 0.000000000 deg
Beta_                0.000000000 deg
CS         0.0000    0.0000    -0.2500    -0.0310     0.0000     0.1200
CMx        0.0000    0.0000    -0.0400    -0.4500     0.0000     0.0600
CMy       -0.0200   -1.1000     0.0000     0.0000   -12.5000     0.0000
CMz        0.0000    0.0000     0.0700    -0.0150     0.0000    -0.0800
# Result
";
