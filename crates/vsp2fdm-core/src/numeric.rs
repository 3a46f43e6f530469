//! Number handling shared by the parsers and table builders.

use std::fmt;

use serde::{Serialize, Serializer};

/// Zero out values the solver reports as numerical noise.
///
/// Anything that would print in exponent form (non-zero magnitude below
/// 1e-4, or 1e16 and above) is treated as zero.
pub fn flush_tiny(value: f64) -> f64 {
    let magnitude = value.abs();
    if value != 0.0 && (magnitude < 1e-4 || magnitude >= 1e16) {
        0.0
    } else {
        value
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Directory and function label for a deflection angle (`-10.0`, `5.0`).
pub fn position_label(angle: f64) -> String {
    format!("{:.1}", angle)
}

/// Label as it appears inside JSBSim property names (`n10.0`).
pub fn property_label(label: &str) -> String {
    label.replace('-', "n")
}

/// A breakpoint on one table axis, compared at fixed precision.
///
/// Keys from different rows that agree to `decimals` places collapse onto
/// the same breakpoint, which is how grid points line up across cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridKey {
    scaled: i64,
    decimals: u8,
}

impl GridKey {
    pub fn new(value: f64, decimals: u8) -> Self {
        let scale = 10f64.powi(i32::from(decimals));
        Self {
            scaled: (value * scale).round() as i64,
            decimals,
        }
    }

    pub fn value(&self) -> f64 {
        self.scaled as f64 / 10f64.powi(i32::from(self.decimals))
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", usize::from(self.decimals), self.value())
    }
}

impl Serialize for GridKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
