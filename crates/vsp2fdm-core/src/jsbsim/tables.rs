//! Coefficient tables: dataset rows regrouped as beta -> mach -> aoa grids.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dataset::{Dataset, BASE_GROUP, BASE_POSITION};
use crate::error::{PipelineError, PipelineResult};
use crate::history::{HistoryRow, HISTORY_COLUMNS};
use crate::numeric::{flush_tiny, position_label, property_label, round_to, GridKey};
use crate::params::CoefficientMap;

use super::escape;

const VALUE_DECIMALS: u32 = 5;
const BETA_DECIMALS: u8 = 1;
const MACH_DECIMALS: u8 = 3;
const AOA_DECIMALS: u8 = 3;

/// beta -> mach -> aoa -> value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grid(BTreeMap<GridKey, BTreeMap<GridKey, BTreeMap<GridKey, f64>>>);

type GridPoint = (GridKey, GridKey, GridKey);

fn grid_point(row: &HistoryRow) -> Option<GridPoint> {
    Some((
        GridKey::new(row.beta()?, BETA_DECIMALS),
        GridKey::new(row.mach()?, MACH_DECIMALS),
        GridKey::new(row.aoa()?, AOA_DECIMALS),
    ))
}

impl Grid {
    pub fn insert(&mut self, (beta, mach, aoa): GridPoint, value: f64) {
        self.0
            .entry(beta)
            .or_default()
            .entry(mach)
            .or_default()
            .insert(aoa, value);
    }

    pub fn get(&self, (beta, mach, aoa): GridPoint) -> Option<f64> {
        self.0.get(&beta)?.get(&mach)?.get(&aoa).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `<tableData>` sections, one per beta. Points absent from a mach row are 0.
    fn render(&self, out: &mut impl Write) -> fmt::Result {
        for (beta, machs) in &self.0 {
            writeln!(out, "      <tableData breakPoint=\"{:.1}\">", beta.value())?;

            let mut aoas: Vec<GridKey> = machs.values().flat_map(|row| row.keys().copied()).collect();
            aoas.sort();
            aoas.dedup();

            write!(out, "{}", " ".repeat(11))?;
            for aoa in &aoas {
                write!(out, "{:10.1}  ", aoa.value())?;
            }
            writeln!(out)?;

            for (mach, row) in machs {
                write!(out, "        {:.3}  ", mach.value())?;
                for aoa in &aoas {
                    write!(out, "{:10.5}  ", row.get(aoa).copied().unwrap_or(0.0))?;
                }
                writeln!(out)?;
            }
            writeln!(out, "      </tableData>")?;
            writeln!(out)?;
        }
        Ok(())
    }
}

/// coefficient -> group -> position -> grid, in parameter-file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CoefficientTables(IndexMap<String, IndexMap<String, IndexMap<String, Grid>>>);

impl CoefficientTables {
    /// Fill a grid for every coefficient, group and position named in `map`.
    ///
    /// Deflection grids hold the increment over the base case at the same
    /// (beta, mach, aoa). Positions without data are left out with a warning.
    pub fn build(map: &CoefficientMap, dataset: &Dataset) -> PipelineResult<Self> {
        let mut tables = IndexMap::new();

        for (coefficient, groups) in map {
            if !HISTORY_COLUMNS.contains(&coefficient.as_str()) {
                return Err(PipelineError::invalid_args(format!(
                    "data_to_axis_map names unknown coefficient '{}'",
                    coefficient
                )));
            }

            let base = dataset
                .base_rows()
                .map(|rows| coefficient_grid(rows, coefficient))
                .unwrap_or_default();

            let mut by_group = IndexMap::new();
            for (group, positions) in groups {
                let mut by_position = IndexMap::new();
                for label in positions.labels() {
                    let position = dataset_position(group, &label);
                    let Some(rows) = dataset.rows(group, &position) else {
                        warn!(coefficient = %coefficient, group = %group, position = %position, "no data, table skipped");
                        continue;
                    };
                    let mut grid = coefficient_grid(rows, coefficient);
                    if group != BASE_GROUP {
                        subtract_base(&mut grid, &base, coefficient, group, &position);
                    }
                    debug!(coefficient = %coefficient, group = %group, position = %position, "table built");
                    by_position.insert(position, grid);
                }
                by_group.insert(group.clone(), by_position);
            }
            tables.insert(coefficient.clone(), by_group);
        }

        Ok(Self(tables))
    }

    pub fn get(&self, coefficient: &str, group: &str, position: &str) -> Option<&Grid> {
        self.0.get(coefficient)?.get(group)?.get(position)
    }

    pub fn table_count(&self) -> usize {
        self.0
            .values()
            .flat_map(IndexMap::values)
            .map(IndexMap::len)
            .sum()
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        serde_json::to_string_pretty(self)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| PipelineError::Encode {
                what: "coefficient tables",
                message: e.to_string(),
            })
    }

    /// Table functions followed by one `interpolate1d` per deflection group.
    pub fn render(&self, out: &mut impl Write) -> fmt::Result {
        for (coefficient, groups) in &self.0 {
            writeln!(out, "  <!-- {} -->", escape(&coefficient.to_uppercase()))?;
            for (group, positions) in groups {
                writeln!(out, "  <!-- {} -->", escape(group))?;
                for (position, grid) in positions {
                    let name = table_function_name(coefficient, group, position);
                    writeln!(out, "  <function name=\"{}\">", escape(&name))?;
                    writeln!(out, "    <table>")?;
                    writeln!(out, "      <independentVar lookup=\"row\">velocities/mach</independentVar>")?;
                    writeln!(out, "      <independentVar lookup=\"column\">aero/alpha-deg</independentVar>")?;
                    writeln!(out, "      <independentVar lookup=\"table\">aero/beta-deg</independentVar>")?;
                    grid.render(out)?;
                    writeln!(out, "    </table>")?;
                    writeln!(out, "  </function>")?;
                    writeln!(out)?;
                }
                if group != BASE_GROUP && !positions.is_empty() {
                    render_interpolation(out, coefficient, group, positions.keys())?;
                }
            }
        }
        Ok(())
    }
}

/// Positions in the dataset are `{:.1}` labels; the base case has a single `0`.
fn dataset_position(group: &str, label: &str) -> String {
    if group == BASE_GROUP {
        return BASE_POSITION.to_string();
    }
    label
        .parse::<f64>()
        .map(position_label)
        .unwrap_or_else(|_| label.to_string())
}

pub fn table_function_name(coefficient: &str, group: &str, position: &str) -> String {
    if group == BASE_GROUP {
        format!("aero/{}_{}", coefficient, BASE_GROUP)
    } else {
        format!("aero/{}_{}_{}", coefficient, group, property_label(position))
    }
}

fn coefficient_grid(rows: &[HistoryRow], coefficient: &str) -> Grid {
    let mut grid = Grid::default();
    for row in rows {
        let (Some(point), Some(value)) = (grid_point(row), row.get(coefficient)) else {
            continue;
        };
        grid.insert(point, flush_tiny(round_to(value, VALUE_DECIMALS)));
    }
    grid
}

fn subtract_base(grid: &mut Grid, base: &Grid, coefficient: &str, group: &str, position: &str) {
    for (beta, machs) in grid.0.iter_mut() {
        for (mach, row) in machs.iter_mut() {
            for (aoa, value) in row.iter_mut() {
                match base.get((*beta, *mach, *aoa)) {
                    Some(base_value) => *value = round_to(*value - base_value, VALUE_DECIMALS),
                    None => warn!(
                        coefficient,
                        group,
                        position,
                        beta = %beta,
                        mach = %mach,
                        aoa = %aoa,
                        "no base value at grid point, increment left absolute"
                    ),
                }
            }
        }
    }
}

/// Positions sorted numerically; a zero point is added when they straddle zero.
pub fn interpolation_points<'a>(positions: impl Iterator<Item = &'a String>) -> Vec<(f64, Option<&'a str>)> {
    let mut points: Vec<(f64, Option<&str>)> = positions
        .filter_map(|p| p.parse::<f64>().ok().map(|v| (v, Some(p.as_str()))))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let has_negative = points.iter().any(|(v, _)| *v < 0.0);
    let has_positive = points.iter().any(|(v, _)| *v > 0.0);
    let has_zero = points.iter().any(|(v, _)| *v == 0.0);
    if has_negative && has_positive && !has_zero {
        let at = points.iter().position(|(v, _)| *v > 0.0).unwrap_or(points.len());
        points.insert(at, (0.0, None));
    }
    points
}

fn render_interpolation<'a>(
    out: &mut impl Write,
    coefficient: &str,
    group: &str,
    positions: impl Iterator<Item = &'a String>,
) -> fmt::Result {
    writeln!(out, "  <function name=\"aero/{}_{}\">", escape(coefficient), escape(group))?;
    writeln!(out, "    <interpolate1d>")?;
    writeln!(out, "      <property>fcs/surfaces/{}-pos-deg</property>", escape(group))?;
    for (value, position) in interpolation_points(positions) {
        match position {
            Some(position) => writeln!(
                out,
                "      <value>{:.1}</value> <property>{}</property>",
                value,
                escape(&table_function_name(coefficient, group, position))
            )?,
            None => writeln!(out, "      <value>{:.1}</value> <value>0</value>", value)?,
        }
    }
    writeln!(out, "    </interpolate1d>")?;
    writeln!(out, "  </function>")?;
    writeln!(out)
}
