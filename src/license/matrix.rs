//! License compatibility matrix
//!
//! Square table indexed by license identifier: row = outbound license,
//! column = inbound license, cell = can the inbound component be
//! redistributed as part of a work under the outbound license.
//!
//! ## CSV layout
//!
//! ```text
//! "Outbound \ Inbound","Apache-2.0","MIT"
//! "Apache-2.0","","Yes"
//! "MIT","No","Same"
//! ```
//!
//! The corner cell is ignored. Empty cells mean "Yes".

use super::LicenseId;
use crate::{LicompatError, LicompatResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

const BUILTIN_MATRIX: &str = include_str!("../../data/matrix.csv");

static CELL_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\s"'`]+"#).expect("valid regex"));

/// Compatibility verdict between an outbound and an inbound license
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// "Yes" / "Same" / empty cell
    #[serde(rename = "Yes")]
    Compatible,
    /// "No"
    #[serde(rename = "No")]
    Incompatible,
    /// Inbound license is not in the matrix
    Unknown,
    /// Outbound license is not in the matrix, or the cell text is unrecognised
    Undefined,
    /// "Dep.": compatibility depends on how the work is combined
    Depends,
    /// "?": the matrix authors could not decide
    Question,
}

impl Verdict {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible)
    }

    /// Unknown/undefined verdicts are reported as problems
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Unknown | Self::Undefined)
    }

    /// Strict two-valued collapse applied at AND/OR boundaries
    pub fn collapse(compatible: bool) -> Self {
        if compatible {
            Self::Compatible
        } else {
            Self::Incompatible
        }
    }

    /// Parse a matrix cell. Case, whitespace and quotes are ignored.
    pub fn from_cell(cell: &str) -> Self {
        let normalized = CELL_NOISE.replace_all(cell, "").to_lowercase();
        match normalized.as_str() {
            "" | "yes" | "same" => Self::Compatible,
            "no" => Self::Incompatible,
            "dep." | "dep" => Self::Depends,
            "?" => Self::Question,
            _ => {
                tracing::error!("Unrecognised compatibility matrix value: {:?}", cell);
                Self::Undefined
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compatible => write!(f, "Yes"),
            Self::Incompatible => write!(f, "No"),
            Self::Unknown => write!(f, "Unknown"),
            Self::Undefined => write!(f, "Undefined"),
            Self::Depends => write!(f, "Depends"),
            Self::Question => write!(f, "Question"),
        }
    }
}

/// Read-only compatibility lookup table
#[derive(Debug, Clone)]
pub struct CompatibilityMatrix {
    licenses: Vec<LicenseId>,
    index: HashMap<String, usize>,
    /// `cells[outbound][inbound]`
    cells: Vec<Vec<Verdict>>,
}

impl CompatibilityMatrix {
    /// The matrix shipped with the crate
    pub fn builtin() -> LicompatResult<Self> {
        Self::from_csv_str(BUILTIN_MATRIX)
    }

    /// Load a matrix from a CSV file
    pub fn from_file(path: &Path) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        let matrix = Self::from_csv_str(&content)?;
        tracing::info!(
            "Loaded compatibility matrix from {} ({} licenses)",
            path.display(),
            matrix.licenses.len()
        );
        Ok(matrix)
    }

    pub fn from_csv_str(content: &str) -> LicompatResult<Self> {
        let mut rows = content
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header = rows
            .next()
            .ok_or_else(|| LicompatError::MatrixError("matrix is empty".into()))?;
        let header = split_csv_line(header)?;
        let licenses: Vec<LicenseId> = header
            .iter()
            .skip(1)
            .map(|h| LicenseId::new(h.trim()))
            .collect();
        if licenses.is_empty() {
            return Err(LicompatError::MatrixError("header lists no licenses".into()));
        }

        let mut index = HashMap::with_capacity(licenses.len());
        for (i, lic) in licenses.iter().enumerate() {
            if index.insert(lic.as_str().to_string(), i).is_some() {
                return Err(LicompatError::MatrixError(format!(
                    "duplicate column '{}'",
                    lic
                )));
            }
        }

        let n = licenses.len();
        let mut cells: Vec<Option<Vec<Verdict>>> = vec![None; n];
        for (line_no, line) in rows.enumerate() {
            let fields = split_csv_line(line)?;
            let outbound = fields.first().map(|f| f.trim()).unwrap_or_default();
            let row_idx = *index.get(outbound).ok_or_else(|| {
                LicompatError::MatrixError(format!(
                    "row {} names '{}' which is not in the header",
                    line_no + 2,
                    outbound
                ))
            })?;
            if fields.len() != n + 1 {
                return Err(LicompatError::MatrixError(format!(
                    "row '{}' has {} cells, expected {}",
                    outbound,
                    fields.len() - 1,
                    n
                )));
            }
            if cells[row_idx].is_some() {
                return Err(LicompatError::MatrixError(format!(
                    "duplicate row '{}'",
                    outbound
                )));
            }
            cells[row_idx] = Some(fields[1..].iter().map(|c| Verdict::from_cell(c)).collect());
        }

        let cells = cells
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                row.ok_or_else(|| {
                    LicompatError::MatrixError(format!("missing row for '{}'", licenses[i]))
                })
            })
            .collect::<LicompatResult<Vec<_>>>()?;

        Ok(Self {
            licenses,
            index,
            cells,
        })
    }

    /// All licenses in header order
    pub fn licenses(&self) -> &[LicenseId] {
        &self.licenses
    }

    pub fn supports(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Verdict for using `inbound` in a work licensed under `outbound`.
    ///
    /// Never fails: an unknown outbound yields `Undefined`, an unknown
    /// inbound yields `Unknown`.
    pub fn lookup(&self, outbound: &str, inbound: &str) -> Verdict {
        let Some(&row) = self.index.get(outbound) else {
            return Verdict::Undefined;
        };
        let Some(&col) = self.index.get(inbound) else {
            return Verdict::Unknown;
        };
        self.cells[row][col]
    }

    /// Direct pairwise check, failing hard on licenses outside the matrix
    pub fn check(&self, outbound: &str, inbound: &str) -> LicompatResult<Verdict> {
        for id in [outbound, inbound] {
            if !self.supports(id) {
                return Err(LicompatError::UnsupportedLicense(id.to_string()));
            }
        }
        Ok(self.lookup(outbound, inbound))
    }
}

/// Split one CSV record. Supports quoted fields with `""` escapes.
fn split_csv_line(line: &str) -> LicompatResult<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(LicompatError::MatrixError(format!(
            "unterminated quote in line: {}",
            line
        )));
    }
    fields.push(field);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
corner,A,B,C
A,,Yes,No
B,no,,Dep.
C,\"?\",maybe,Same
";

    #[test]
    fn test_verdict_vocabulary() {
        assert_eq!(Verdict::from_cell("Yes"), Verdict::Compatible);
        assert_eq!(Verdict::from_cell(" SAME "), Verdict::Compatible);
        assert_eq!(Verdict::from_cell(""), Verdict::Compatible);
        assert_eq!(Verdict::from_cell("\"No\""), Verdict::Incompatible);
        assert_eq!(Verdict::from_cell("Dep."), Verdict::Depends);
        assert_eq!(Verdict::from_cell("?"), Verdict::Question);
        assert_eq!(Verdict::from_cell("perhaps"), Verdict::Undefined);
    }

    #[test]
    fn test_small_matrix_lookup() {
        let m = CompatibilityMatrix::from_csv_str(SMALL).unwrap();
        assert_eq!(m.licenses().len(), 3);
        assert_eq!(m.lookup("A", "A"), Verdict::Compatible);
        assert_eq!(m.lookup("A", "C"), Verdict::Incompatible);
        assert_eq!(m.lookup("B", "C"), Verdict::Depends);
        assert_eq!(m.lookup("C", "A"), Verdict::Question);
        assert_eq!(m.lookup("C", "B"), Verdict::Undefined);
        assert_eq!(m.lookup("C", "C"), Verdict::Compatible);
    }

    #[test]
    fn test_unknown_licenses_do_not_fail_lookup() {
        let m = CompatibilityMatrix::from_csv_str(SMALL).unwrap();
        assert_eq!(m.lookup("A", "Z"), Verdict::Unknown);
        assert_eq!(m.lookup("Z", "A"), Verdict::Undefined);
        assert_eq!(m.lookup("Z", "Y"), Verdict::Undefined);
    }

    #[test]
    fn test_check_fails_hard_on_unknown() {
        let m = CompatibilityMatrix::from_csv_str(SMALL).unwrap();
        assert!(matches!(m.check("A", "Z"), Err(LicompatError::UnsupportedLicense(_))));
        assert_eq!(m.check("A", "B").unwrap(), Verdict::Compatible);
    }

    #[test]
    fn test_row_column_mismatch_is_error() {
        let bad = "corner,A,B\nA,Yes\nB,Yes,Yes\n";
        assert!(matches!(
            CompatibilityMatrix::from_csv_str(bad),
            Err(LicompatError::MatrixError(_))
        ));
        let missing_row = "corner,A,B\nA,Yes,Yes\n";
        assert!(CompatibilityMatrix::from_csv_str(missing_row).is_err());
        let stray_row = "corner,A\nA,\nQ,\n";
        assert!(CompatibilityMatrix::from_csv_str(stray_row).is_err());
    }

    #[test]
    fn test_quoted_header_with_comma() {
        let csv = "\"x\",\"A, with comma\"\n\"A, with comma\",\"\"\n";
        let m = CompatibilityMatrix::from_csv_str(csv).unwrap();
        assert!(m.supports("A, with comma"));
    }

    #[test]
    fn test_builtin_matrix_is_reflexive() {
        let m = CompatibilityMatrix::builtin().unwrap();
        assert!(m.supports("GPL-2.0-only WITH Classpath-exception-2.0"));
        for lic in m.licenses() {
            assert_eq!(m.lookup(lic.as_str(), lic.as_str()), Verdict::Compatible);
        }
    }

    #[test]
    fn test_builtin_matrix_gpl_direction() {
        let m = CompatibilityMatrix::builtin().unwrap();
        assert_eq!(m.lookup("GPL-2.0-only", "MIT"), Verdict::Compatible);
        assert_eq!(m.lookup("MIT", "GPL-2.0-only"), Verdict::Incompatible);
    }
}
