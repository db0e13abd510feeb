//! Report generation: JSON, text, Markdown, and DOT output
//!
//! Every engine operation returns a plain data structure; `Report` wraps
//! them so a single `render_report` call can turn any of them into the
//! requested format.

pub mod dot;
pub mod json;
pub mod markdown;
pub mod text;

use crate::engine::{
    CompatibilityTable, Expansion, OutboundReport, PairVerdict, PolicyCheck, Simplification,
};
use crate::license::alias::AliasEntry;
use crate::license::evaluator::{CompatibilityReport, Evaluation};
use crate::license::LicenseId;
use crate::project::ProjectVerification;
use crate::LicompatResult;
use serde::Serialize;
use std::path::Path;

/// Output format for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Structured JSON (machine-readable)
    Json,
    /// Plain text, one fact per line
    Text,
    /// Markdown with tables
    Markdown,
    /// Graphviz DOT graph
    Dot,
}

/// Any result the engine can produce
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Simplified(Simplification),
    Licenses(Vec<LicenseId>),
    Aliases(Vec<AliasEntry>),
    Expansion(Expansion),
    Compatibility(CompatibilityReport),
    Evaluation(Evaluation),
    Outbound(OutboundReport),
    Pair(PairVerdict),
    Table(CompatibilityTable),
    Project(ProjectVerification),
    Policy(PolicyCheck),
}

/// Write a report in the specified format
pub fn write_report(report: &Report, format: ReportFormat, output: &Path) -> LicompatResult<()> {
    let content = render_report(report, format)?;
    std::fs::write(output, content)?;
    Ok(())
}

/// Render a report to a string
pub fn render_report(report: &Report, format: ReportFormat) -> LicompatResult<String> {
    match format {
        ReportFormat::Json => json::render(report),
        ReportFormat::Text => Ok(text::render(report)),
        ReportFormat::Markdown => Ok(markdown::render(report)),
        ReportFormat::Dot => Ok(dot::render(report)),
    }
}

/// `yes`/`no` for boolean flags in human-readable output
pub(crate) fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub(crate) fn join_ids(ids: &[LicenseId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompatEngine;

    #[test]
    fn test_every_format_renders() {
        let engine = CompatEngine::builtin().unwrap();
        let mut diag = engine.diagnostics();
        let report = Report::Compatibility(
            engine.verify(&["GPL-2.0-only"], &["MIT AND BSD-3-Clause"], &mut diag).unwrap(),
        );
        for format in [
            ReportFormat::Json,
            ReportFormat::Text,
            ReportFormat::Markdown,
            ReportFormat::Dot,
        ] {
            let out = render_report(&report, format).unwrap();
            assert!(out.contains("GPL-2.0-only"), "{:?} output: {}", format, out);
        }
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("licenses.json");
        let report = Report::Licenses(vec![LicenseId::new("MIT")]);
        write_report(&report, ReportFormat::Json, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"MIT\""));
    }
}
