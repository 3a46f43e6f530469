//! VSPAERO `.lod` files: spanwise loading and per-component totals.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use crate::error::{PipelineError, PipelineResult};

pub const SPAN_COLUMNS: [&str; 14] = [
    "wing", "S", "yavg", "chord", "v/vref", "Cl", "Cd", "Cs", "Cx", "Cy", "Cz", "CMx", "CMy", "CMz",
];

pub const COMPONENT_COLUMNS: [&str; 14] = [
    "comp", "compname", "Mach", "AoA", "beta", "CL", "CDi", "CS", "CFx", "CFy", "CFz", "Cmx", "Cmy",
    "Cmz",
];

const SPAN_HEADER: &str = "Wing";
const COMPONENT_HEADER: &str = "Comp";

/// One spanwise strip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanRow(BTreeMap<String, f64>);

impl SpanRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }

    /// Surface number the strip belongs to.
    pub fn wing(&self) -> Option<i64> {
        self.get("wing").map(|w| w.round() as i64)
    }
}

/// Totals for one component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentRow {
    pub name: String,
    values: BTreeMap<String, f64>,
}

impl ComponentRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Loads for a single flight condition.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCase {
    pub mach: f64,
    pub aoa: f64,
    pub beta: f64,
    pub span: Vec<SpanRow>,
    pub components: Vec<ComponentRow>,
}

pub fn load_lod(path: &Path) -> PipelineResult<Vec<LoadCase>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| PipelineError::io("failed to read", path, e))?;
    Ok(parse_lod(&content))
}

enum Block {
    None,
    Span(Vec<SpanRow>),
    Components(Vec<ComponentRow>),
}

/// Each spanwise block belongs to the component block right after it.
#[derive(Default)]
struct Pairing {
    pending_span: Option<Vec<SpanRow>>,
    cases: Vec<LoadCase>,
}

impl Pairing {
    fn close(&mut self, block: Block, line: usize) {
        match block {
            Block::None => {}
            Block::Span(rows) => {
                if let Some(unpaired) = self.pending_span.replace(rows) {
                    warn!(line, rows = unpaired.len(), "spanwise block without components dropped");
                }
            }
            Block::Components(components) => {
                let Some(span) = self.pending_span.take() else {
                    warn!(line, "component block without spanwise block dropped");
                    return;
                };
                match load_case(span, components) {
                    Some(case) => self.cases.push(case),
                    None => warn!(line, "component block without flight condition dropped"),
                }
            }
        }
    }

    fn finish(self) -> Vec<LoadCase> {
        if let Some(unpaired) = self.pending_span {
            warn!(rows = unpaired.len(), "trailing spanwise block without components dropped");
        }
        self.cases
    }
}

fn load_case(span: Vec<SpanRow>, components: Vec<ComponentRow>) -> Option<LoadCase> {
    let first = components.first()?;
    Some(LoadCase {
        mach: first.get("Mach")?,
        aoa: first.get("AoA")?,
        beta: first.get("beta")?,
        span,
        components,
    })
}

pub fn parse_lod(content: &str) -> Vec<LoadCase> {
    let mut pairing = Pairing::default();
    let mut block = Block::None;

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            pairing.close(std::mem::replace(&mut block, Block::None), index + 1);
            continue;
        }
        if matches!(block, Block::None) {
            let header = line.trim_start();
            if header.starts_with(SPAN_HEADER) {
                block = Block::Span(Vec::new());
            } else if header.starts_with(COMPONENT_HEADER) {
                block = Block::Components(Vec::new());
            }
            continue;
        }
        match &mut block {
            Block::Span(rows) => match parse_span_row(line) {
                Some(row) => rows.push(row),
                None => warn!(line = index + 1, "malformed spanwise row skipped"),
            },
            Block::Components(rows) => match parse_component_row(line) {
                Some(row) => rows.push(row),
                None => warn!(line = index + 1, "malformed component row skipped"),
            },
            Block::None => {}
        }
    }
    pairing.close(block, content.lines().count());
    pairing.finish()
}

fn parse_span_row(line: &str) -> Option<SpanRow> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(|t| t.parse().ok())
        .collect::<Option<_>>()?;
    if values.len() != SPAN_COLUMNS.len() {
        return None;
    }
    Some(SpanRow(
        SPAN_COLUMNS.iter().map(|c| c.to_string()).zip(values).collect(),
    ))
}

fn parse_component_row(line: &str) -> Option<ComponentRow> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != COMPONENT_COLUMNS.len() {
        return None;
    }
    let mut values = BTreeMap::new();
    for (column, token) in COMPONENT_COLUMNS.iter().zip(&tokens) {
        if *column == "compname" {
            continue;
        }
        values.insert(column.to_string(), token.parse().ok()?);
    }
    Some(ComponentRow {
        name: tokens[1].to_string(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "   Wing       S      Yavg     Chord    V/Vref      Cl        Cd        Cs        Cx        Cy        Cz       Cmx       Cmy       Cmz\n",
        "      1   0.1000   0.2500   1.0000   1.0000   0.5000   0.0100   0.0000   0.0000   0.0000   0.5000   0.0000  -0.1000   0.0000\n",
        "      1   0.1000   0.7500   0.9000   1.0000   0.4500   0.0100   0.0000   0.0000   0.0000   0.4500   0.0000  -0.0900   0.0000\n",
        "      2   0.1000  -0.2500   1.0000   1.0000   0.5100   0.0100   0.0000   0.0000   0.0000   0.5100   0.0000  -0.1000   0.0000\n",
        "\n",
        "Comp      Component-Name             Mach       AoA      Beta        CL       CDi        CS       CFx       CFy       CFz       Cmx       Cmy       Cmz\n",
        "   1      WingGeom                 0.2000    4.0000    0.0000    0.4800    0.0100    0.0000    0.0000    0.0000    0.4800    0.0000   -0.0950    0.0000\n",
        "\n",
        "   Wing       S      Yavg\n",
        "      1   0.1000   0.2500   1.0000   1.0000   0.9000   0.0200   0.0000   0.0000   0.0000   0.9000   0.0000  -0.2000   0.0000\n",
        "\n",
        "Comp      Component-Name\n",
        "   1      WingGeom                 0.2000    8.0000    0.0000    0.9000    0.0200    0.0000    0.0000    0.0000    0.9000    0.0000   -0.1900    0.0000\n",
    );

    #[test]
    fn test_blocks_pair_with_conditions() {
        let cases = parse_lod(SAMPLE);
        assert_eq!(cases.len(), 2);
        assert_eq!((cases[0].mach, cases[0].aoa, cases[0].beta), (0.2, 4.0, 0.0));
        assert_eq!(cases[0].span.len(), 3);
        assert_eq!(cases[0].span[2].wing(), Some(2));
        assert_eq!(cases[0].span[1].get("yavg"), Some(0.75));
        assert_eq!(cases[0].components[0].name, "WingGeom");
        assert_eq!(cases[1].aoa, 8.0);
        assert_eq!(cases[1].span[0].get("Cl"), Some(0.9));
    }

    const SPAN_ROW: &str =
        "      1   0.1000   0.2500   1.0000   1.0000   0.9000   0.0200   0.0000   0.0000   0.0000   0.9000   0.0000  -0.2000   0.0000\n";

    fn component_block(aoa: f64) -> String {
        format!(
            "Comp      Component-Name\n   1      WingGeom   0.2000   {:.4}   0.0000   0.9000   0.0200   0.0000   0.0000   0.0000   0.9000   0.0000   -0.1900   0.0000\n\n",
            aoa
        )
    }

    #[test]
    fn test_empty_span_block_keeps_its_own_condition() {
        let text = format!(
            "   Wing       S\n\n{}   Wing       S\n{}\n{}",
            component_block(4.0),
            SPAN_ROW,
            component_block(8.0)
        );
        let cases = parse_lod(&text);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].aoa, 4.0);
        assert!(cases[0].span.is_empty());
        assert_eq!(cases[1].aoa, 8.0);
        assert_eq!(cases[1].span[0].get("Cl"), Some(0.9));
    }

    #[test]
    fn test_unpaired_blocks_are_dropped() {
        let text = format!(
            "{}   Wing\n{}\n   Wing\n{}\n{}   Wing\n{}",
            component_block(2.0),
            SPAN_ROW,
            SPAN_ROW,
            component_block(6.0),
            SPAN_ROW
        );
        let cases = parse_lod(&text);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].aoa, 6.0);
        assert_eq!(cases[0].span.len(), 1);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let text = "   Wing\n      1   0.1   bad\n      1   0.1   0.2   1.0   1.0   0.3   0.0   0.0   0.0   0.0   0.3   0.0   0.0   0.0\n\nComp\n   1   W   0.1   2.0   0.0   0.3   0.0   0.0   0.0   0.0   0.3   0.0   0.0   0.0\n";
        let cases = parse_lod(text);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].span.len(), 1);
        assert_eq!(cases[0].mach, 0.1);
    }
}
