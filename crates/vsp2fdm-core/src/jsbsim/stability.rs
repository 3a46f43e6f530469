//! Stability-derivative functions (`aero/s/<coef>`).

use std::fmt::{self, Write};

use tracing::warn;

use crate::numeric::GridKey;
use crate::stab::{StabCoefficient, StabPoint};

const KEY_DECIMALS: u8 = 6;

struct Condition {
    mach: GridKey,
    alpha: GridKey,
    beta: GridKey,
    point: usize,
}

/// Mach x alpha x beta tables built from parsed `.stab` points.
#[derive(Debug, Clone)]
pub struct StabilityTables {
    points: Vec<StabPoint>,
}

impl StabilityTables {
    /// Points missing the flight condition or any derivative are dropped with a warning.
    pub fn new(points: Vec<StabPoint>) -> Self {
        let mut kept = Vec::with_capacity(points.len());
        for point in points {
            let missing: Vec<&str> = StabCoefficient::ALL
                .iter()
                .filter(|c| point.get(**c).is_none())
                .map(|c| c.name())
                .collect();
            match point.condition() {
                None => warn!("stability block without mach/alpha/beta dropped"),
                Some((mach, alpha, beta)) if !missing.is_empty() => warn!(
                    mach,
                    alpha,
                    beta,
                    missing = %missing.join(", "),
                    "stability block with missing derivatives dropped"
                ),
                Some(_) => kept.push(point),
            }
        }
        Self { points: kept }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn conditions(&self) -> Vec<Condition> {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                let (mach, alpha, beta) = p.condition()?;
                Some(Condition {
                    mach: GridKey::new(mach, KEY_DECIMALS),
                    alpha: GridKey::new(alpha, KEY_DECIMALS),
                    beta: GridKey::new(beta, KEY_DECIMALS),
                    point: index,
                })
            })
            .collect()
    }

    /// First point at the grid location; grid gaps are 0.
    fn value(
        &self,
        conditions: &[Condition],
        coefficient: StabCoefficient,
        mach: GridKey,
        alpha: GridKey,
        beta: GridKey,
    ) -> f64 {
        conditions
            .iter()
            .find(|c| c.mach == mach && c.alpha == alpha && c.beta == beta)
            .and_then(|c| self.points[c.point].get(coefficient))
            .unwrap_or(0.0)
    }

    pub fn render(&self, out: &mut impl Write) -> fmt::Result {
        let conditions = self.conditions();
        let axis = |key: fn(&Condition) -> GridKey| {
            let mut values: Vec<GridKey> = conditions.iter().map(key).collect();
            values.sort();
            values.dedup();
            values
        };
        let machs = axis(|c| c.mach);
        let alphas = axis(|c| c.alpha);
        let betas = axis(|c| c.beta);

        for coefficient in StabCoefficient::ALL {
            writeln!(out, "  <function name=\"aero/s/{}\">", coefficient.name())?;
            writeln!(out, "    <description>{}</description>", coefficient.description())?;
            writeln!(out, "    <product>")?;
            writeln!(out, "      <property>{}</property>", coefficient.denormalization())?;
            writeln!(out, "      <table>")?;
            writeln!(out, "        <independentVar lookup=\"row\">velocities/mach</independentVar>")?;
            writeln!(out, "        <independentVar lookup=\"column\">aero/alpha-deg</independentVar>")?;
            writeln!(out, "        <independentVar lookup=\"table\">aero/beta-deg</independentVar>")?;

            for beta in &betas {
                writeln!(out, "        <tableData breakPoint=\"{:.1}\">", beta.value())?;
                write!(out, "{}", " ".repeat(16))?;
                for alpha in &alphas {
                    write!(out, "{:10.1}   ", alpha.value())?;
                }
                writeln!(out)?;
                for mach in &machs {
                    write!(out, "           {:.3}   ", mach.value())?;
                    for alpha in &alphas {
                        let value = self.value(&conditions, coefficient, *mach, *alpha, *beta);
                        write!(out, "{:10.4}   ", value)?;
                    }
                    writeln!(out)?;
                }
                writeln!(out, "        </tableData>")?;
            }

            writeln!(out, "      </table>")?;
            writeln!(out, "    </product>")?;
            writeln!(out, "  </function>")?;
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(mach: f64, alpha: f64, cmlp: f64) -> StabPoint {
        StabPoint {
            mach: Some(mach),
            alpha: Some(alpha),
            beta: Some(0.0),
            cmlp: Some(cmlp),
            cmlr: Some(0.0),
            cmma: Some(0.0),
            cmmq: Some(0.0),
            cmnb: Some(0.0),
            cmnr: Some(0.0),
            cmnp: Some(0.0),
            cfyp: Some(0.0),
            cfyr: Some(0.0),
        }
    }

    #[test]
    fn test_renders_every_coefficient() {
        let tables = StabilityTables::new(vec![point(0.2, 0.0, -0.4), point(0.2, 4.0, -0.45)]);
        let mut out = String::new();
        tables.render(&mut out).unwrap();

        for coefficient in StabCoefficient::ALL {
            assert!(out.contains(&format!("aero/s/{}\"", coefficient.name())));
        }
        assert!(out.contains("      <property>aero/pb</property>\n"));
        assert!(out.contains("           0.200      -0.4000      -0.4500   \n"), "{}", out);
        assert!(out.contains("           0.200       0.0000       0.0000   \n"));
    }

    #[test]
    fn test_gaps_in_grid_are_zero() {
        let tables = StabilityTables::new(vec![point(0.2, 0.0, -0.4), point(0.3, 4.0, -0.5)]);
        let mut out = String::new();
        tables.render(&mut out).unwrap();
        assert!(out.contains("           0.200      -0.4000       0.0000   \n"), "{}", out);
        assert!(out.contains("           0.300       0.0000      -0.5000   \n"), "{}", out);
    }

    #[test]
    fn test_incomplete_points_are_dropped() {
        let mut partial = point(0.2, 0.0, -0.4);
        partial.beta = None;
        let mut no_damping = point(0.2, 4.0, -0.2);
        no_damping.cmmq = None;
        let tables = StabilityTables::new(vec![partial, no_damping, point(0.2, 2.0, -0.1)]);
        assert_eq!(tables.len(), 1);

        let mut out = String::new();
        tables.render(&mut out).unwrap();
        assert!(!out.contains("       4.0   "), "{}", out);
    }
}
