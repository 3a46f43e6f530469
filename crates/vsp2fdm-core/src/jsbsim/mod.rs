//! JSBSim `<aerodynamics>` document.
//!
//! The document is assembled from three parts, in order: coefficient
//! tables (with their deflection interpolations), stability-derivative
//! tables and the axis blocks that sum everything into forces and moments.

use std::fmt::{self, Write};

use crate::error::{PipelineError, PipelineResult};
use crate::params::AxisMap;

pub mod axes;
pub mod stability;
pub mod tables;

pub use axes::render_axes;
pub use stability::StabilityTables;
pub use tables::{CoefficientTables, Grid};

const HELPER_FUNCTIONS: &str = r#"  <function name="aero/beta-deg-abs">
    <description>Beta absolute value</description>
    <abs>
      <property>aero/beta-deg</property>
    </abs>
  </function>

  <function name="aero/pb">
    <description>PB Denormalization</description>
    <product>
      <property>aero/bi2vel</property>
      <property>velocities/p-aero-rad_sec</property>
    </product>
  </function>

  <function name="aero/qb">
    <description>For denormalization</description>
    <product>
      <property>aero/ci2vel</property>
      <property>velocities/q-aero-rad_sec</property>
    </product>
  </function>

  <function name="aero/rb">
    <description>For denormalization</description>
    <product>
      <property>aero/bi2vel</property>
      <property>velocities/r-aero-rad_sec</property>
    </product>
  </function>

"#;

/// Escape text for use in XML attributes and element content.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Full document text.
pub fn render_document(
    tables: &CoefficientTables,
    stability: Option<&StabilityTables>,
    axes: &AxisMap,
) -> PipelineResult<String> {
    let mut out = String::new();
    write_document(&mut out, tables, stability, axes).map_err(|e| PipelineError::Encode {
        what: "aerodynamics document",
        message: e.to_string(),
    })?;
    Ok(out)
}

fn write_document(
    out: &mut impl Write,
    tables: &CoefficientTables,
    stability: Option<&StabilityTables>,
    axes: &AxisMap,
) -> fmt::Result {
    writeln!(out, "<!--")?;
    writeln!(out, "  Generated by vsp2fdm {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "  from VSPAERO history and stability results")?;
    writeln!(out, "-->")?;
    writeln!(out, "<aerodynamics>")?;
    writeln!(out)?;
    out.write_str(HELPER_FUNCTIONS)?;

    tables.render(out)?;
    if let Some(stability) = stability {
        stability.render(out)?;
    }
    render_axes(axes, out)?;

    writeln!(out, "</aerodynamics>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\">"), "a&lt;b &amp; &quot;c&quot;&gt;");
        assert_eq!(escape("aero/CLtot_base"), "aero/CLtot_base");
    }

    #[test]
    fn test_empty_document_is_well_formed() {
        let doc = render_document(&CoefficientTables::default(), None, &AxisMap::default()).unwrap();
        assert!(doc.starts_with("<!--\n  Generated by vsp2fdm "));
        assert!(doc.contains("<aerodynamics>\n"));
        assert!(doc.contains("<function name=\"aero/rb\">"));
        assert!(doc.ends_with("</aerodynamics>\n"));
        assert!(!doc.contains("aero/s/"));
    }
}
