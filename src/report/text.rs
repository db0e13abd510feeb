//! Plain-text renderer
//!
//! Proof trees are printed indented two spaces per level:
//!
//! ```text
//! AND  Yes
//!   MIT  Yes
//!   BSD-3-Clause  Yes
//! ```

use super::{join_ids, yes_no, Report};
use crate::engine::CompatibilityTable;
use crate::license::evaluator::{EvaluatedNode, OutboundNode, Problem};
use crate::project::PackageVerification;
use std::fmt::Write;

/// Render any report as plain text
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    match report {
        Report::Simplified(s) => {
            let _ = writeln!(out, "{}", s.simplified);
        }
        Report::Licenses(ids) => {
            for id in ids {
                let _ = writeln!(out, "{}", id);
            }
        }
        Report::Aliases(entries) => {
            for e in entries {
                let _ = writeln!(out, "{} -> {}", e.alias, e.license);
            }
        }
        Report::Expansion(e) => {
            let _ = writeln!(out, "{} ({} combinations)", e.expression, e.combinations);
            for set in &e.sets {
                let names: Vec<&str> = set.iter().map(|id| id.as_str()).collect();
                let _ = writeln!(out, "  [{}]", names.join(", "));
            }
        }
        Report::Compatibility(r) => {
            let _ = writeln!(out, "outbound: {}", r.outbound);
            let _ = writeln!(out, "inbound:  {}", r.inbound);
            let _ = writeln!(out, "verdict:  {}", r.verdict);
            let _ = writeln!(out, "allowed:  {}", yes_no(r.allowed));
            out.push('\n');
            outbound_tree(&mut out, &r.tree, 0);
            problems(&mut out, &r.problems);
        }
        Report::Evaluation(e) => {
            let _ = writeln!(out, "{} as outbound for {}: {}", e.outbound, e.inbound, e.verdict);
            inbound_tree(&mut out, &e.tree, 1);
        }
        Report::Outbound(o) => {
            let _ = writeln!(out, "inbound:    {}", o.inbound);
            let _ = writeln!(out, "candidates: {}", join_ids(&o.candidates));
            match &o.chosen {
                Some(chosen) => {
                    let _ = writeln!(out, "chosen:     {}", chosen);
                }
                None => out.push_str("chosen:     none (no compatible outbound license)\n"),
            }
            problems(&mut out, &o.problems);
        }
        Report::Pair(p) => {
            let _ = writeln!(out, "{} <- {}: {}", p.outbound, p.inbound, p.verdict);
        }
        Report::Table(t) => table(&mut out, t),
        Report::Project(p) => {
            let _ = writeln!(out, "project:    {}", p.project);
            let _ = writeln!(out, "compatible: {}", yes_no(p.compatible));
            let _ = writeln!(out, "combined:   {}", p.combined);
            let _ = writeln!(out, "candidates: {}", join_ids(&p.outbound_candidates));
            if let Some(chosen) = &p.chosen {
                let _ = writeln!(out, "chosen:     {}", chosen);
            }
            out.push('\n');
            package(&mut out, &p.root, 0);
            problems(&mut out, &p.problems);
        }
        Report::Policy(p) => {
            let _ = writeln!(out, "inbound: {}", p.inbound);
            let _ = writeln!(out, "outcome: {}", p.policy.outcome);
            for entry in &p.policy.entries {
                let _ = writeln!(out, "  {:<8} {}", entry.outcome, entry.license);
            }
        }
    }
    out
}

fn inbound_tree(out: &mut String, node: &EvaluatedNode, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        EvaluatedNode::License {
            name,
            resolved,
            verdict,
            allowed,
        } => {
            let alias = if name != resolved {
                format!(" ({})", resolved)
            } else {
                String::new()
            };
            let denied = if *allowed { "" } else { "  [denied]" };
            let _ = writeln!(out, "{}{}{}  {}{}", pad, name, alias, verdict, denied);
        }
        EvaluatedNode::Operator {
            op,
            verdict,
            operands,
            ..
        } => {
            let _ = writeln!(out, "{}{}  {}", pad, op, verdict);
            for child in operands {
                inbound_tree(out, child, depth + 1);
            }
        }
    }
}

fn outbound_tree(out: &mut String, node: &OutboundNode, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        OutboundNode::License {
            name,
            verdict,
            inbound,
            ..
        } => {
            let _ = writeln!(out, "{}{} (outbound)  {}", pad, name, verdict);
            inbound_tree(out, inbound, depth + 1);
        }
        OutboundNode::Operator {
            op,
            verdict,
            operands,
            ..
        } => {
            let _ = writeln!(out, "{}{} (outbound)  {}", pad, op, verdict);
            for child in operands {
                outbound_tree(out, child, depth + 1);
            }
        }
    }
}

fn package(out: &mut String, pkg: &PackageVerification, depth: usize) {
    let pad = "  ".repeat(depth);
    let version = pkg.version.as_deref().map(|v| format!(" {}", v)).unwrap_or_default();
    let mark = if pkg.compatible { "ok" } else { "INCOMPATIBLE" };
    let _ = writeln!(out, "{}{}{} [{}] {}", pad, pkg.name, version, pkg.license, mark);
    for check in &pkg.checks {
        if !check.verdict.is_compatible() || !check.allowed {
            let _ = writeln!(
                out,
                "{}  ! {} ({}): {}{}",
                pad,
                check.name,
                check.license,
                check.verdict,
                if check.allowed { "" } else { ", denied" }
            );
        }
    }
    for dep in &pkg.dependencies {
        package(out, dep, depth + 1);
    }
}

fn table(out: &mut String, t: &CompatibilityTable) {
    let width = t.licenses.iter().map(|l| l.as_str().len()).max().unwrap_or(0);
    for pair in &t.pairs {
        let _ = writeln!(
            out,
            "{:<width$}  <-  {:<width$}  {}",
            pair.outbound.as_str(),
            pair.inbound.as_str(),
            pair.verdict,
            width = width
        );
    }
}

fn problems(out: &mut String, problems: &[Problem]) {
    if problems.is_empty() {
        return;
    }
    out.push_str("\nproblems:\n");
    for p in problems {
        let _ = writeln!(out, "  {}", p.description);
    }
}
