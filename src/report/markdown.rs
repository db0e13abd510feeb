//! Markdown report renderer
//!
//! Verdict summaries become field tables, proof trees become nested
//! bullet lists, and the compatibility table becomes a grid with outbound
//! licenses as rows and inbound licenses as columns.

use super::{join_ids, yes_no, Report};
use crate::engine::CompatibilityTable;
use crate::license::evaluator::{EvaluatedNode, OutboundNode, Problem};
use crate::license::matrix::Verdict;
use crate::policy::PolicyOutcome;
use crate::project::PackageVerification;

/// Render a report as Markdown
pub fn render(report: &Report) -> String {
    let mut md = String::with_capacity(2048);

    match report {
        Report::Simplified(s) => {
            md.push_str("# Simplified Expression\n\n");
            md.push_str("| Field | Value |\n|---|---|\n");
            md.push_str(&format!("| **Original** | `{}` |\n", s.original));
            md.push_str(&format!("| **Simplified** | `{}` |\n", s.simplified));
        }
        Report::Licenses(ids) => {
            md.push_str("# Supported Licenses\n\n");
            md.push_str("| License | Family |\n|---|---|\n");
            for id in ids {
                md.push_str(&format!("| `{}` | {} |\n", id, id.family()));
            }
        }
        Report::Aliases(entries) => {
            md.push_str("# License Aliases\n\n");
            md.push_str("| Alias | License |\n|---|---|\n");
            for e in entries {
                md.push_str(&format!("| `{}` | `{}` |\n", e.alias, e.license));
            }
        }
        Report::Expansion(e) => {
            md.push_str("# Expanded Expression\n\n");
            md.push_str(&format!(
                "`{}` has **{}** combination(s):\n\n",
                e.expression, e.combinations
            ));
            md.push_str("| # | Licenses |\n|--:|---|\n");
            for (i, set) in e.sets.iter().enumerate() {
                let names: Vec<String> = set.iter().map(|id| format!("`{}`", id)).collect();
                md.push_str(&format!("| {} | {} |\n", i + 1, names.join(" + ")));
            }
        }
        Report::Compatibility(r) => {
            md.push_str("# License Compatibility\n\n");
            md.push_str("| Field | Value |\n|---|---|\n");
            md.push_str(&format!("| **Outbound** | `{}` |\n", r.outbound));
            md.push_str(&format!("| **Inbound** | `{}` |\n", r.inbound));
            md.push_str(&format!("| **Verdict** | {} |\n", verdict_badge(r.verdict)));
            md.push_str(&format!("| **Allowed** | {} |\n\n", yes_no(r.allowed)));
            md.push_str("## Proof Tree\n\n");
            outbound_tree(&mut md, &r.tree, 0);
            md.push('\n');
            problems(&mut md, &r.problems);
        }
        Report::Evaluation(e) => {
            md.push_str(&format!("# `{}` as Outbound License\n\n", e.outbound));
            md.push_str(&format!(
                "**Inbound:** `{}`, **Verdict:** {}\n\n",
                e.inbound,
                verdict_badge(e.verdict)
            ));
            inbound_tree(&mut md, &e.tree, 0);
        }
        Report::Outbound(o) => {
            md.push_str("# Outbound License Candidates\n\n");
            md.push_str(&format!("**Inbound:** `{}`\n\n", o.inbound));
            if o.candidates.is_empty() {
                md.push_str("❌ **No compatible outbound license.**\n\n");
            } else {
                if let Some(chosen) = &o.chosen {
                    md.push_str(&format!("✅ **Recommended:** `{}`\n\n", chosen));
                }
                md.push_str("| Candidate | Family |\n|---|---|\n");
                for id in &o.candidates {
                    md.push_str(&format!("| `{}` | {} |\n", id, id.family()));
                }
                md.push('\n');
            }
            problems(&mut md, &o.problems);
        }
        Report::Pair(p) => {
            md.push_str("| Outbound | Inbound | Verdict |\n|---|---|---|\n");
            md.push_str(&format!(
                "| `{}` | `{}` | {} |\n",
                p.outbound,
                p.inbound,
                verdict_badge(p.verdict)
            ));
        }
        Report::Table(t) => table(&mut md, t),
        Report::Project(p) => {
            md.push_str(&format!("# Project `{}`\n\n", p.project));
            md.push_str("| Field | Value |\n|---|---|\n");
            md.push_str(&format!(
                "| **Status** | {} |\n",
                if p.compatible { "✅ Compatible" } else { "❌ Incompatible" }
            ));
            md.push_str(&format!("| **Combined** | `{}` |\n", p.combined));
            md.push_str(&format!("| **Combinations** | {} |\n", p.combinations));
            md.push_str(&format!(
                "| **Outbound Candidates** | {} |\n",
                join_ids(&p.outbound_candidates)
            ));
            if let Some(chosen) = &p.chosen {
                md.push_str(&format!("| **Recommended** | `{}` |\n", chosen));
            }
            md.push_str("\n## Dependencies\n\n");
            md.push_str("| Package | License | Dependency | Dependency License | Verdict |\n");
            md.push_str("|---|---|---|---|---|\n");
            package_rows(&mut md, &p.root);
            md.push('\n');
            problems(&mut md, &p.problems);
        }
        Report::Policy(p) => {
            md.push_str("# Policy Report\n\n");
            md.push_str(&format!(
                "**Inbound:** `{}`, **Outcome:** {}\n\n",
                p.inbound,
                policy_badge(p.policy.outcome)
            ));
            md.push_str("| Candidate | Policy |\n|---|---|\n");
            for entry in &p.policy.entries {
                md.push_str(&format!(
                    "| `{}` | {} |\n",
                    entry.license,
                    policy_badge(entry.outcome)
                ));
            }
        }
    }

    md
}

fn verdict_badge(v: Verdict) -> String {
    let icon = match v {
        Verdict::Compatible => "✅",
        Verdict::Incompatible => "❌",
        Verdict::Depends | Verdict::Question => "🟡",
        Verdict::Unknown | Verdict::Undefined => "❔",
    };
    format!("{} {}", icon, v)
}

fn policy_badge(o: PolicyOutcome) -> String {
    let icon = match o {
        PolicyOutcome::Allowed => "✅",
        PolicyOutcome::Avoid => "🟡",
        PolicyOutcome::Denied => "❌",
    };
    format!("{} {}", icon, o)
}

fn inbound_tree(md: &mut String, node: &EvaluatedNode, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        EvaluatedNode::License {
            name,
            resolved,
            verdict,
            allowed,
        } => {
            md.push_str(&format!("{}- `{}`", pad, name));
            if name != resolved {
                md.push_str(&format!(" → `{}`", resolved));
            }
            md.push_str(&format!(": {}", verdict_badge(*verdict)));
            if !allowed {
                md.push_str(" (denied)");
            }
            md.push('\n');
        }
        EvaluatedNode::Operator {
            op,
            verdict,
            operands,
            ..
        } => {
            md.push_str(&format!("{}- **{}**: {}\n", pad, op, verdict_badge(*verdict)));
            for child in operands {
                inbound_tree(md, child, depth + 1);
            }
        }
    }
}

fn outbound_tree(md: &mut String, node: &OutboundNode, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        OutboundNode::License {
            name,
            verdict,
            inbound,
            ..
        } => {
            md.push_str(&format!(
                "{}- outbound `{}`: {}\n",
                pad,
                name,
                verdict_badge(*verdict)
            ));
            inbound_tree(md, inbound, depth + 1);
        }
        OutboundNode::Operator {
            op,
            verdict,
            operands,
            ..
        } => {
            md.push_str(&format!(
                "{}- outbound **{}**: {}\n",
                pad,
                op,
                verdict_badge(*verdict)
            ));
            for child in operands {
                outbound_tree(md, child, depth + 1);
            }
        }
    }
}

fn package_rows(md: &mut String, pkg: &PackageVerification) {
    for check in &pkg.checks {
        md.push_str(&format!(
            "| `{}` | `{}` | `{}` | `{}` | {} |\n",
            pkg.name,
            pkg.license,
            check.name,
            check.license,
            verdict_badge(check.verdict)
        ));
    }
    for dep in &pkg.dependencies {
        package_rows(md, dep);
    }
}

fn table(md: &mut String, t: &CompatibilityTable) {
    md.push_str("# License Compatibility Table\n\n");
    md.push_str("Rows are outbound licenses, columns are inbound licenses.\n\n");
    md.push_str("| Outbound \\ Inbound |");
    for inbound in &t.licenses {
        md.push_str(&format!(" `{}` |", inbound));
    }
    md.push_str("\n|---|");
    md.push_str(&"---|".repeat(t.licenses.len()));
    md.push('\n');
    for outbound in &t.licenses {
        md.push_str(&format!("| `{}` |", outbound));
        for inbound in &t.licenses {
            let cell = t
                .verdict(outbound.as_str(), inbound.as_str())
                .map(|v| v.to_string())
                .unwrap_or_default();
            md.push_str(&format!(" {} |", cell));
        }
        md.push('\n');
    }
}

fn problems(md: &mut String, problems: &[Problem]) {
    if problems.is_empty() {
        return;
    }
    md.push_str("## Problems\n\n");
    for p in problems {
        md.push_str(&format!("- {}\n", p.description));
    }
    md.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompatEngine;

    #[test]
    fn test_table_grid_shape() {
        let engine = CompatEngine::builtin().unwrap();
        let t = engine
            .compatibility_table(&["MIT", "GPL-3.0-only", "Apache-2.0"])
            .unwrap();
        let md = render(&Report::Table(t));
        let rows: Vec<&str> = md.lines().filter(|l| l.starts_with("| `")).collect();
        assert_eq!(rows.len(), 3);
        // columns sorted: Apache-2.0, GPL-3.0-only, MIT
        assert!(md.contains("| `MIT` | No | No | Yes |"));
    }

    #[test]
    fn test_problems_section() {
        let engine = CompatEngine::builtin().unwrap();
        let mut diag = engine.diagnostics();
        let report = engine.verify(&["MIT"], &["NONESUCH"], &mut diag).unwrap();
        let md = render(&Report::Compatibility(report));
        assert!(md.contains("## Problems"));
        assert!(md.contains("NONESUCH"));
    }
}
