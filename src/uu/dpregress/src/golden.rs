// Compare generated placement reports against golden references
//
// A report carries the legality indicator on its first line and the
// sum of cell displacements on its third, each as "<Label>: <value>".
// Legality must match exactly; displacement may not regress beyond the
// configured tolerance.
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::error_handling::{malformed_field, malformed_report};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use uucore::display::Quotable;
use uucore::error::{FromIo, UResult};

/// Suffix marking a golden reference; `X.ok` is the golden for `X`
pub const GOLDEN_SUFFIX: &str = ".ok";

/// Separator between a report label and its value
const FIELD_DELIMITER: &str = ": ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The report fields taking part in a comparison
pub enum ReportField {
    Legality,
    SumDisplacement,
}

impl ReportField {
    /// Zero-based line carrying the field
    pub fn line_index(&self) -> usize {
        match self {
            ReportField::Legality => 0,
            ReportField::SumDisplacement => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportField::Legality => "Legality",
            ReportField::SumDisplacement => "Sum_Displacement",
        }
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Return the value text of a "<Label>: <value>" line: whatever follows
/// the last delimiter, or the whole line if there is none.
pub fn field_value(line: &str) -> &str {
    line.rsplit(FIELD_DELIMITER)
        .next()
        .unwrap_or(line)
        .trim()
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Numeric fields extracted from one report
pub struct GoldenRecord {
    pub legality: f64,
    pub sum_displacement: f64,
}

impl GoldenRecord {
    /// Extract the record from report text; source names the report in
    /// diagnostics.
    pub fn parse(text: &str, source: &Path) -> UResult<Self> {
        let lines: Vec<&str> = text.split('\n').collect();
        let needed = ReportField::SumDisplacement.line_index() + 1;
        if lines.len() < needed {
            return malformed_report(
                source,
                format!(
                    "expected at least {needed} lines, found {}",
                    lines.len()
                ),
            );
        }

        Ok(GoldenRecord {
            legality: parse_field(&lines, ReportField::Legality, source)?,
            sum_displacement: parse_field(&lines, ReportField::SumDisplacement, source)?,
        })
    }

    /// Read and parse the report at path.
    pub fn read(path: &Path) -> UResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) => malformed_report(path, format!("cannot read report: {e}")),
        }
    }
}

fn parse_field(lines: &[&str], field: ReportField, source: &Path) -> UResult<f64> {
    let line = lines[field.line_index()];
    let value = field_value(line);
    value.parse::<f64>().or_else(|e| {
        malformed_field(
            source,
            field,
            format!("cannot parse {value:?} as a number: {e}"),
        )
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// How far the displacement sum may exceed its golden value
pub enum DisplacementTolerance {
    /// Pass if candidate <= golden * factor
    Factor(f64),
    /// Pass if |golden - candidate| / |golden| <= fraction
    Relative(f64),
}

impl Default for DisplacementTolerance {
    fn default() -> Self {
        DisplacementTolerance::Factor(5.0)
    }
}

impl DisplacementTolerance {
    /// True if candidate does not regress beyond the tolerance. Lower is
    /// better, so any candidate at or below the golden value passes.
    pub fn accepts(&self, golden: f64, candidate: f64) -> bool {
        if candidate <= golden {
            return true;
        }
        match *self {
            DisplacementTolerance::Factor(factor) => candidate <= golden * factor,
            DisplacementTolerance::Relative(fraction) => {
                golden != 0.0 && (golden - candidate).abs() / golden.abs() <= fraction
            }
        }
    }
}

impl fmt::Display for DisplacementTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplacementTolerance::Factor(factor) => write!(f, "{factor}x"),
            DisplacementTolerance::Relative(fraction) => write!(f, "{}%", fraction * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Verdict of comparing one report with its golden reference
pub enum ComparisonOutcome {
    Pass,
    Fail {
        field: ReportField,
        golden: f64,
        candidate: f64,
        tolerance: Option<DisplacementTolerance>,
    },
}

impl ComparisonOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ComparisonOutcome::Pass)
    }
}

impl fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOutcome::Pass => f.write_str("passed"),
            ComparisonOutcome::Fail {
                field,
                golden,
                candidate,
                tolerance: None,
            } => write!(f, "{field} is different! {golden} {candidate}"),
            ComparisonOutcome::Fail {
                field,
                golden,
                candidate,
                tolerance: Some(tolerance),
            } => write!(
                f,
                "{field} exceeds the {tolerance} tolerance: {golden} {candidate}"
            ),
        }
    }
}

/// Compare a candidate record with its golden counterpart. Legality is
/// checked first and a mismatch there ends the comparison.
pub fn compare(
    golden: &GoldenRecord,
    candidate: &GoldenRecord,
    tolerance: DisplacementTolerance,
) -> ComparisonOutcome {
    if golden.legality != candidate.legality {
        return ComparisonOutcome::Fail {
            field: ReportField::Legality,
            golden: golden.legality,
            candidate: candidate.legality,
            tolerance: None,
        };
    }

    if !tolerance.accepts(golden.sum_displacement, candidate.sum_displacement) {
        return ComparisonOutcome::Fail {
            field: ReportField::SumDisplacement,
            golden: golden.sum_displacement,
            candidate: candidate.sum_displacement,
            tolerance: Some(tolerance),
        };
    }

    ComparisonOutcome::Pass
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A generated report and the golden file it is checked against
pub struct GoldenPair {
    pub report: PathBuf,
    pub golden: PathBuf,
}

impl GoldenPair {
    /// Pair a golden file with its report, or None if path does not carry
    /// the golden suffix.
    pub fn from_golden(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let report_name = name.strip_suffix(GOLDEN_SUFFIX)?;
        if report_name.is_empty() {
            return None;
        }
        Some(GoldenPair {
            report: path.with_file_name(report_name),
            golden: path.to_path_buf(),
        })
    }

    /// Read both files and compare them.
    pub fn compare(&self, tolerance: DisplacementTolerance) -> UResult<ComparisonOutcome> {
        let golden = GoldenRecord::read(&self.golden)?;
        let candidate = GoldenRecord::read(&self.report)?;
        Ok(compare(&golden, &candidate, tolerance))
    }
}

/// Return the golden pairs of a case directory, sorted by golden name.
pub fn find_pairs(dir: &Path) -> UResult<Vec<GoldenPair>> {
    let entries =
        fs::read_dir(dir).map_err_context(|| format!("listing goldens in {}", dir.quote()))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let entry = entry.map_err_context(|| format!("listing goldens in {}", dir.quote()))?;
        let path = entry.path();
        if path.is_file() {
            if let Some(pair) = GoldenPair::from_golden(&path) {
                pairs.push(pair);
            }
        }
    }
    pairs.sort_by(|a, b| a.golden.cmp(&b.golden));
    Ok(pairs)
}
