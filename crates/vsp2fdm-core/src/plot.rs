//! Curves from raw `.history` and `.lod` files.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::history::{load_history, HISTORY_COLUMNS};
use crate::lod::{load_lod, SPAN_COLUMNS};
use crate::numeric::GridKey;

const MATCH_DECIMALS: u8 = 6;
const CONDITION_COLUMNS: [&str; 3] = ["Mach", "AoA", "Beta"];
const CHART_SIZE: (u32, u32) = (1024, 768);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    History,
    Lod,
}

impl ResultKind {
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("history") => Ok(ResultKind::History),
            Some("lod") => Ok(ResultKind::Lod),
            _ => Err(PipelineError::invalid_args(format!(
                "{} is neither a .history nor a .lod file",
                path.display()
            ))),
        }
    }

    pub fn default_axes(self) -> (&'static str, &'static str) {
        match self {
            ResultKind::History => ("AoA", "CLtot"),
            ResultKind::Lod => ("yavg", "Cl"),
        }
    }

    pub fn columns(self) -> Vec<&'static str> {
        match self {
            ResultKind::History => HISTORY_COLUMNS.to_vec(),
            ResultKind::Lod => SPAN_COLUMNS.iter().chain(&CONDITION_COLUMNS).copied().collect(),
        }
    }
}

/// Comma-separated value filters; an empty list accepts everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotFilter {
    pub aoa: Vec<f64>,
    pub mach: Vec<f64>,
    pub beta: Vec<f64>,
    pub wing: Vec<i64>,
}

impl PlotFilter {
    pub fn from_lists(
        aoa: Option<&str>,
        mach: Option<&str>,
        beta: Option<&str>,
        wing: Option<&str>,
    ) -> PipelineResult<Self> {
        Ok(Self {
            aoa: parse_list("aoa", aoa)?,
            mach: parse_list("mach", mach)?,
            beta: parse_list("beta", beta)?,
            wing: parse_list("wing", wing)?,
        })
    }

    fn accepts(&self, record: &Record) -> bool {
        fn matches(allowed: &[f64], value: Option<f64>) -> bool {
            allowed.is_empty()
                || value.is_some_and(|v| {
                    allowed
                        .iter()
                        .any(|a| GridKey::new(*a, MATCH_DECIMALS) == GridKey::new(v, MATCH_DECIMALS))
                })
        }
        matches(&self.aoa, record.get("AoA"))
            && matches(&self.mach, record.get("Mach"))
            && matches(&self.beta, record.get("Beta"))
            && (self.wing.is_empty()
                || record
                    .get("wing")
                    .is_some_and(|w| self.wing.contains(&(w.round() as i64))))
    }
}

fn parse_list<T: std::str::FromStr>(name: &str, list: Option<&str>) -> PipelineResult<Vec<T>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| PipelineError::invalid_args(format!("invalid {} value '{}'", name, s)))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Record(BTreeMap<String, f64>);

impl Record {
    fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }
}

/// One labelled curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Parsed result file ready for series selection.
#[derive(Debug, Clone)]
pub struct PlotData {
    kind: ResultKind,
    records: Vec<Record>,
}

impl PlotData {
    pub fn load(path: &Path, wake_iterations: u32) -> PipelineResult<Self> {
        let kind = ResultKind::from_path(path)?;
        let records: Vec<Record> = match kind {
            ResultKind::History => load_history(path, wake_iterations)?
                .into_iter()
                .map(|row| {
                    Record(
                        HISTORY_COLUMNS
                            .iter()
                            .filter_map(|c| row.get(c).map(|v| (c.to_string(), v)))
                            .collect(),
                    )
                })
                .collect(),
            ResultKind::Lod => load_lod(path)?
                .into_iter()
                .flat_map(|case| {
                    let condition = [("Mach", case.mach), ("AoA", case.aoa), ("Beta", case.beta)];
                    case.span
                        .into_iter()
                        .map(move |strip| {
                            let mut values: BTreeMap<String, f64> = SPAN_COLUMNS
                                .iter()
                                .filter_map(|c| strip.get(c).map(|v| (c.to_string(), v)))
                                .collect();
                            values.extend(condition.iter().map(|(k, v)| (k.to_string(), *v)));
                            Record(values)
                        })
                })
                .collect(),
        };
        debug!(path = %path.display(), records = records.len(), "loaded plot data");
        Ok(Self { kind, records })
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Group matching records into curves of `y` against `x`.
    ///
    /// History files get one curve per combination of the two flow
    /// conditions not on the x axis (Mach/Beta when x is anything else).
    /// Load files get one curve per flight condition and wing.
    pub fn series(&self, x: &str, y: &str, filter: &PlotFilter) -> PipelineResult<Vec<Series>> {
        let columns = self.kind.columns();
        for axis in [x, y] {
            if !columns.contains(&axis) {
                return Err(PipelineError::invalid_args(format!(
                    "unknown column '{}', expected one of: {}",
                    axis,
                    columns.join(", ")
                )));
            }
        }

        let group_by: &[&str] = match (self.kind, x) {
            (ResultKind::History, "Mach") => &["AoA", "Beta"],
            (ResultKind::History, "Beta") => &["AoA", "Mach"],
            (ResultKind::History, _) => &["Mach", "Beta"],
            (ResultKind::Lod, _) => &["AoA", "Beta", "Mach", "wing"],
        };

        let mut groups: BTreeMap<Vec<GridKey>, Series> = BTreeMap::new();
        for record in self.records.iter().filter(|r| filter.accepts(r)) {
            let (Some(xv), Some(yv)) = (record.get(x), record.get(y)) else {
                continue;
            };
            let key_values: Vec<f64> = group_by.iter().map(|c| record.get(c).unwrap_or(0.0)).collect();
            let key = key_values.iter().map(|v| GridKey::new(*v, MATCH_DECIMALS)).collect();
            groups
                .entry(key)
                .or_insert_with(|| Series {
                    label: group_by
                        .iter()
                        .zip(&key_values)
                        .map(|(c, v)| format!("{}={}", c, v))
                        .collect::<Vec<_>>()
                        .join(" "),
                    points: Vec::new(),
                })
                .points
                .push((xv, yv));
        }

        let mut series: Vec<Series> = groups.into_values().collect();
        if self.kind == ResultKind::History {
            for s in &mut series {
                s.points.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
        }
        Ok(series)
    }
}

/// Plain-text dump of the series for headless runs.
pub fn format_series(series: &[Series]) -> String {
    let mut out = String::new();
    for s in series {
        let xs: Vec<String> = s.points.iter().map(|p| p.0.to_string()).collect();
        let ys: Vec<String> = s.points.iter().map(|p| p.1.to_string()).collect();
        let _ = writeln!(out, "{}: x=[{}] y=[{}]", s.label, xs.join(", "), ys.join(", "));
    }
    out
}

/// `<input stem>.svg` next to the input file.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("svg")
}

fn plot_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Plot {
        message: e.to_string(),
    }
}

/// Draw `series` into an SVG chart titled `Y vs X`.
pub fn render_svg(series: &[Series], x: &str, y: &str, output: &Path) -> PipelineResult<()> {
    let points = || series.iter().flat_map(|s| s.points.iter());
    if points().next().is_none() {
        return Err(PipelineError::Plot {
            message: "no data points match the filters".to_string(),
        });
    }
    let (x_range, y_range) = padded_ranges(points());

    let root = SVGBackend::new(output, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} vs {}", y, x), ("sans-serif", 28))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc(x)
        .y_desc(y)
        .draw()
        .map_err(plot_error)?;

    for (index, s) in series.iter().enumerate() {
        let color = Palette99::pick(index).mix(0.9);
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))
            .map_err(plot_error)?
            .label(s.label.clone())
            .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    info!(path = %output.display(), series = series.len(), "wrote plot");
    Ok(())
}

fn padded_ranges<'a>(
    points: impl Iterator<Item = &'a (f64, f64)>,
) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let (mut x_min, mut x_max, mut y_min, mut y_max) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in points {
        x_min = x_min.min(*x);
        x_max = x_max.max(*x);
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }
    (pad(x_min, x_max), pad(y_min, y_max))
}

fn pad(min: f64, max: f64) -> std::ops::Range<f64> {
    let span = max - min;
    let margin = if span > 0.0 { span * 0.05 } else { min.abs().max(1.0) * 0.1 };
    (min - margin)..(max + margin)
}
