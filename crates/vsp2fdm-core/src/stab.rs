//! VSPAERO `.stab` files: stability derivatives per flight condition.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

const RESULT_MARKER: &str = "# Result";

/// Byte range holding the value on `Mach_`/`AoA_`/`Beta_` lines.
const CONDITION_VALUE_COLUMNS: std::ops::Range<usize> = 21..33;

/// Derivatives emitted as JSBSim stability functions, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StabCoefficient {
    Cmlp,
    Cmlr,
    Cmmq,
    Cmma,
    Cmnp,
    Cmnr,
    Cfyp,
    Cfyr,
}

impl StabCoefficient {
    pub const ALL: [StabCoefficient; 8] = [
        StabCoefficient::Cmlp,
        StabCoefficient::Cmlr,
        StabCoefficient::Cmmq,
        StabCoefficient::Cmma,
        StabCoefficient::Cmnp,
        StabCoefficient::Cmnr,
        StabCoefficient::Cfyp,
        StabCoefficient::Cfyr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StabCoefficient::Cmlp => "cmlp",
            StabCoefficient::Cmlr => "cmlr",
            StabCoefficient::Cmmq => "cmmq",
            StabCoefficient::Cmma => "cmma",
            StabCoefficient::Cmnp => "cmnp",
            StabCoefficient::Cmnr => "cmnr",
            StabCoefficient::Cfyp => "cfyp",
            StabCoefficient::Cfyr => "cfyr",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StabCoefficient::Cmlp => "Roll damping derivative",
            StabCoefficient::Cmlr => "Roll moment due to yaw rate",
            StabCoefficient::Cmmq => "Pitch damping derivative",
            StabCoefficient::Cmma => "Pitch moment alpha dot",
            StabCoefficient::Cmnp => "Yaw moment due to roll rate",
            StabCoefficient::Cmnr => "Yaw damping derivative",
            StabCoefficient::Cfyp => "Side force due to roll rate",
            StabCoefficient::Cfyr => "Side force due to yaw rate",
        }
    }

    /// Property the tabulated derivative is multiplied by.
    pub fn denormalization(self) -> &'static str {
        match self {
            StabCoefficient::Cmlp | StabCoefficient::Cmnp | StabCoefficient::Cfyp => "aero/pb",
            StabCoefficient::Cmlr | StabCoefficient::Cmnr | StabCoefficient::Cfyr => "aero/rb",
            StabCoefficient::Cmmq => "aero/qb",
            StabCoefficient::Cmma => "aero/alphadot-rad_sec",
        }
    }
}

/// One flight condition of a stability file. Values the file lacks stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StabPoint {
    pub mach: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub cmlp: Option<f64>,
    pub cmlr: Option<f64>,
    pub cmma: Option<f64>,
    pub cmmq: Option<f64>,
    pub cmnb: Option<f64>,
    pub cmnr: Option<f64>,
    pub cmnp: Option<f64>,
    pub cfyp: Option<f64>,
    pub cfyr: Option<f64>,
}

impl StabPoint {
    pub fn get(&self, coefficient: StabCoefficient) -> Option<f64> {
        match coefficient {
            StabCoefficient::Cmlp => self.cmlp,
            StabCoefficient::Cmlr => self.cmlr,
            StabCoefficient::Cmmq => self.cmmq,
            StabCoefficient::Cmma => self.cmma,
            StabCoefficient::Cmnp => self.cmnp,
            StabCoefficient::Cmnr => self.cmnr,
            StabCoefficient::Cfyp => self.cfyp,
            StabCoefficient::Cfyr => self.cfyr,
        }
    }

    /// (mach, alpha, beta) once all three are known.
    pub fn condition(&self) -> Option<(f64, f64, f64)> {
        Some((self.mach?, self.alpha?, self.beta?))
    }
}

pub fn load_stab(path: &Path) -> PipelineResult<Vec<StabPoint>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| PipelineError::io("failed to read", path, e))?;
    let points = parse_stab(&content);
    debug!(path = %path.display(), points = points.len(), "parsed stability file");
    Ok(points)
}

pub fn parse_stab(content: &str) -> Vec<StabPoint> {
    let mut points = Vec::new();
    let mut current = StabPoint::default();

    for (index, line) in content.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let token = |n: usize| -> Option<f64> {
            let value = tokens.get(n).and_then(|t| t.parse().ok());
            if value.is_none() {
                warn!(line = index + 1, column = n, "stability value missing");
            }
            value
        };

        if line.starts_with("Mach_") {
            current.mach = condition_value(line, &tokens);
        } else if line.starts_with("AoA_") {
            current.alpha = condition_value(line, &tokens);
        } else if line.starts_with("Beta_") {
            current.beta = condition_value(line, &tokens);
        } else if line.starts_with("CMx") {
            current.cmlp = token(4);
            current.cmlr = token(6);
        } else if line.starts_with("CMy") {
            current.cmma = token(2);
            current.cmmq = token(5);
        } else if line.starts_with("CMz") {
            current.cmnb = token(3);
            current.cmnr = token(4);
            current.cmnp = token(6);
        } else if line.starts_with("CS") {
            current.cfyp = token(4);
            current.cfyr = token(6);
        } else if line.starts_with(RESULT_MARKER) {
            points.push(std::mem::take(&mut current));
        }
    }
    points
}

fn condition_value(line: &str, tokens: &[&str]) -> Option<f64> {
    line.get(CONDITION_VALUE_COLUMNS)
        .and_then(|field| field.trim().parse().ok())
        .or_else(|| tokens.get(1).and_then(|t| t.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Name \t Value \t Units
Mach_                0.200000000 no_unit
AoA_                 4.000000000 deg
Beta_                0.000000000 deg

Coef      Total      Alpha      Beta       p          q          r
CFx       -0.0100    0.1000     0.0000     0.0000     0.0000     0.0000
CS         0.0000    0.0000    -0.2500    -0.0310     0.0000     0.1200
CMx        0.0000    0.0000    -0.0400    -0.4500     0.0000     0.0600
CMy       -0.0200   -1.1000     0.0000     0.0000   -12.5000     0.0000
CMz        0.0000    0.0000     0.0700    -0.0150     0.0000    -0.0800
# Result: done
Mach_ 0.3 no_unit
AoA_ 0.0 deg
# Result: done
";

    #[test]
    fn test_parses_blocks() {
        let points = parse_stab(SAMPLE);
        assert_eq!(points.len(), 2);

        let first = &points[0];
        assert_eq!(first.condition(), Some((0.2, 4.0, 0.0)));
        assert_eq!(first.cmlp, Some(-0.45));
        assert_eq!(first.cmlr, Some(0.06));
        assert_eq!(first.cmma, Some(-1.1));
        assert_eq!(first.cmmq, Some(-12.5));
        assert_eq!(first.cmnb, Some(0.07));
        assert_eq!(first.cmnr, Some(-0.015));
        assert_eq!(first.cmnp, Some(-0.08));
        assert_eq!(first.cfyp, Some(-0.031));
        assert_eq!(first.cfyr, Some(0.12));
    }

    #[test]
    fn test_short_condition_lines_fall_back_to_tokens() {
        let points = parse_stab(SAMPLE);
        let second = &points[1];
        assert_eq!(second.mach, Some(0.3));
        assert_eq!(second.alpha, Some(0.0));
        assert_eq!(second.beta, None);
        assert_eq!(second.condition(), None);
        assert_eq!(second.get(StabCoefficient::Cmlp), None);
    }

    #[test]
    fn test_coefficient_metadata() {
        assert_eq!(StabCoefficient::ALL.len(), 8);
        assert_eq!(StabCoefficient::Cmma.denormalization(), "aero/alphadot-rad_sec");
        assert_eq!(StabCoefficient::Cfyr.name(), "cfyr");
    }
}
