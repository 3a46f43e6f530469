mod common;

use std::path::Path;

use vsp2fdm_core::{convert, ConvertOptions, Dataset, PipelineError};

use common::{history_text, write_params, STAB_TEXT, WAKE};

fn write_result(dir: &Path, case: &str, ext: &str, content: &str) {
    let case_dir = dir.join("output").join(case);
    std::fs::create_dir_all(&case_dir).unwrap();
    std::fs::write(case_dir.join(format!("glider_DegenGeom.{}", ext)), content).unwrap();
}

fn options() -> ConvertOptions {
    ConvertOptions {
        wake_iterations: WAKE,
        strict: false,
    }
}

#[test]
fn converts_results_into_aerodynamics() {
    let dir = tempfile::tempdir().unwrap();
    let params = write_params(dir.path());
    write_result(dir.path(), "base", "history", &history_text(&[(0.0, 0.1), (4.0, 0.5)]));
    write_result(dir.path(), "elevator/-10.0", "history", &history_text(&[(0.0, 0.02), (4.0, 0.41)]));
    write_result(dir.path(), "elevator/10.0", "history", &history_text(&[(0.0, 0.2), (4.0, 0.6)]));
    write_result(dir.path(), "stab", "stab", STAB_TEXT);

    let report = convert(&params, &options()).unwrap();
    assert_eq!(report.rows, 6);
    assert_eq!(report.tables, 3);
    assert_eq!(report.stability_points, Some(1));
    assert!(report.missing.is_empty());

    let dataset = Dataset::load(&report.dataset_path).unwrap();
    assert_eq!(dataset.rows("elevator", "-10.0").unwrap()[1].get("CLtot"), Some(0.41));

    let tables: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.tables_path).unwrap()).unwrap();
    assert_eq!(tables["CLtot"]["elevator"]["-10.0"]["0.0"]["0.200"]["4.000"], -0.09);

    let xml = std::fs::read_to_string(&report.output_path).unwrap();
    assert!(xml.contains("<function name=\"aero/CLtot_base\">"));
    assert!(xml.contains("<function name=\"aero/CLtot_elevator_n10.0\">"));
    assert!(xml.contains("<property>fcs/surfaces/elevator-pos-deg</property>"));
    assert!(xml.contains("      <value>0.0</value> <value>0</value>\n"));
    assert!(xml.contains("        0.200     0.10000     0.50000  \n"));
    assert!(xml.contains("        0.200     0.10000     0.10000  \n"));
    assert!(xml.contains("<function name=\"aero/s/cmlp\">"));
    assert!(xml.contains("<axis name=\"LIFT\">"));
    assert!(xml.contains("<property>metrics/cbarw-ft</property>"));
    assert!(xml.trim_end().ends_with("</aerodynamics>"));

    let function_order = ["aero/CLtot_base", "aero/s/cmlp", "<axis name=\"LIFT\">"]
        .map(|needle| xml.find(needle).unwrap());
    assert!(function_order.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn missing_results_are_skipped_unless_strict() {
    let dir = tempfile::tempdir().unwrap();
    let params = write_params(dir.path());
    write_result(dir.path(), "base", "history", &history_text(&[(0.0, 0.1)]));

    let report = convert(&params, &options()).unwrap();
    assert_eq!(report.missing, vec!["elevator/-10.0", "elevator/10.0"]);
    assert_eq!(report.stability_points, None);
    let xml = std::fs::read_to_string(&report.output_path).unwrap();
    assert!(!xml.contains("<function name=\"aero/CLtot_elevator"));
    assert!(!xml.contains("aero/s/"));

    let strict = ConvertOptions {
        strict: true,
        ..options()
    };
    let err = convert(&params, &strict).unwrap_err();
    assert!(matches!(err, PipelineError::MissingResults { ref cases } if cases.len() == 2));
    assert_eq!(err.exit_code(), 3);
}
