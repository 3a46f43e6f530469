//! `<axis>` blocks summing the table functions into forces and moments.

use std::fmt::{self, Write};

use tracing::warn;

use crate::params::AxisMap;

use super::escape;

/// Reference length multiplied into a moment axis.
///
/// Roll and yaw coefficients are normalised by span and pitch by mean chord,
/// so yaw uses `bw-ft` and pitch `cbarw-ft`.
pub fn moment_reference(axis: &str) -> Option<&'static str> {
    match axis.to_ascii_lowercase().as_str() {
        "roll" | "yaw" => Some("metrics/bw-ft"),
        "pitch" => Some("metrics/cbarw-ft"),
        _ => None,
    }
}

pub fn render_axes(axes: &AxisMap, out: &mut impl Write) -> fmt::Result {
    for (kind, entries) in axes {
        for (axis, properties) in entries {
            if properties.is_empty() {
                warn!(kind = %kind, axis = %axis, "axis without properties skipped");
                continue;
            }
            render_axis(out, kind, axis, properties)?;
        }
    }
    Ok(())
}

fn render_axis(out: &mut impl Write, kind: &str, axis: &str, properties: &[String]) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "  <axis name=\"{}\">", escape(&axis.to_uppercase()))?;
    writeln!(out, "    <function name=\"aero/{}/{}\">", escape(kind), escape(axis))?;
    writeln!(out, "      <product>")?;
    writeln!(out, "        <property>aero/qbar-psf</property>")?;
    writeln!(out, "        <property>metrics/Sw-sqft</property>")?;
    if kind == "moments" {
        if let Some(reference) = moment_reference(axis) {
            writeln!(out, "        <property>{}</property>", reference)?;
        }
    }
    match properties {
        [single] => writeln!(out, "        <property>{}</property>", escape(single))?,
        _ => {
            writeln!(out, "        <sum>")?;
            for property in properties {
                writeln!(out, "          <property>{}</property>", escape(property))?;
            }
            writeln!(out, "        </sum>")?;
        }
    }
    writeln!(out, "      </product>")?;
    writeln!(out, "    </function>")?;
    writeln!(out, "  </axis>")
}
