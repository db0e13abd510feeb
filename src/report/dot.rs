//! Graphviz DOT renderer
//!
//! Proof trees, compatibility tables and project trees become directed
//! graphs. Reports without a graph shape render as a single record node.

use super::{text, Report};
use crate::engine::CompatibilityTable;
use crate::license::evaluator::{EvaluatedNode, OutboundNode};
use crate::license::matrix::Verdict;
use crate::project::PackageVerification;

/// Node and edge accumulator with sequential node ids
struct Graph {
    body: String,
    next: usize,
}

impl Graph {
    fn new() -> Self {
        Self {
            body: String::new(),
            next: 0,
        }
    }

    fn node(&mut self, label: &str, color: &str) -> String {
        let id = format!("n{}", self.next);
        self.next += 1;
        self.body.push_str(&format!(
            "  {} [label=\"{}\", color=\"{}\"];\n",
            id,
            escape(label),
            color
        ));
        id
    }

    fn edge(&mut self, from: &str, to: &str, label: Option<&str>) {
        match label {
            Some(l) => self
                .body
                .push_str(&format!("  {} -> {} [label=\"{}\"];\n", from, to, escape(l))),
            None => self.body.push_str(&format!("  {} -> {};\n", from, to)),
        }
    }

    fn finish(self, name: &str) -> String {
        format!(
            "digraph {} {{\n  node [shape=box, fontname=\"Helvetica\"];\n{}}}\n",
            name, self.body
        )
    }
}

/// Render a report as a DOT graph
pub fn render(report: &Report) -> String {
    let mut g = Graph::new();
    match report {
        Report::Compatibility(r) => {
            outbound_tree(&mut g, &r.tree);
            g.finish("compatibility")
        }
        Report::Evaluation(e) => {
            let root = g.node(&format!("{} (outbound)", e.outbound), color(e.verdict));
            let child = inbound_tree(&mut g, &e.tree);
            g.edge(&root, &child, None);
            g.finish("evaluation")
        }
        Report::Table(t) => {
            table(&mut g, t);
            g.finish("licenses")
        }
        Report::Project(p) => {
            package(&mut g, &p.root);
            g.finish("project")
        }
        other => {
            let text = text::render(other);
            g.node(text.trim_end(), "black");
            g.finish("report")
        }
    }
}

fn color(v: Verdict) -> &'static str {
    match v {
        Verdict::Compatible => "darkgreen",
        Verdict::Incompatible => "red",
        Verdict::Depends | Verdict::Question => "orange",
        Verdict::Unknown | Verdict::Undefined => "gray",
    }
}

fn inbound_tree(g: &mut Graph, node: &EvaluatedNode) -> String {
    match node {
        EvaluatedNode::License {
            name,
            resolved,
            verdict,
            ..
        } => {
            let label = if name != resolved {
                format!("{} ({})\n{}", name, resolved, verdict)
            } else {
                format!("{}\n{}", name, verdict)
            };
            g.node(&label, color(*verdict))
        }
        EvaluatedNode::Operator {
            op,
            verdict,
            operands,
            ..
        } => {
            let id = g.node(&format!("{}\n{}", op, verdict), color(*verdict));
            for child in operands {
                let child_id = inbound_tree(g, child);
                g.edge(&id, &child_id, None);
            }
            id
        }
    }
}

fn outbound_tree(g: &mut Graph, node: &OutboundNode) -> String {
    match node {
        OutboundNode::License {
            name,
            verdict,
            inbound,
            ..
        } => {
            let id = g.node(&format!("{} (outbound)\n{}", name, verdict), color(*verdict));
            let child = inbound_tree(g, inbound);
            g.edge(&id, &child, None);
            id
        }
        OutboundNode::Operator {
            op,
            verdict,
            operands,
            ..
        } => {
            let id = g.node(&format!("{} (outbound)\n{}", op, verdict), color(*verdict));
            for child in operands {
                let child_id = outbound_tree(g, child);
                g.edge(&id, &child_id, None);
            }
            id
        }
    }
}

/// One node per license, one edge per compatible or conditional pair.
/// Edges point from the inbound license to the outbound license that can
/// use it.
fn table(g: &mut Graph, t: &CompatibilityTable) {
    let ids: Vec<String> = t
        .licenses
        .iter()
        .map(|l| g.node(l.as_str(), "black"))
        .collect();
    let index = |name: &str| t.licenses.iter().position(|l| l.as_str() == name);
    for pair in &t.pairs {
        if pair.outbound == pair.inbound || pair.verdict == Verdict::Incompatible {
            continue;
        }
        let (Some(o), Some(i)) = (index(pair.outbound.as_str()), index(pair.inbound.as_str()))
        else {
            continue;
        };
        let label = match pair.verdict {
            Verdict::Compatible => None,
            _ => Some(pair.verdict.to_string()),
        };
        g.edge(&ids[i], &ids[o], label.as_deref());
    }
}

fn package(g: &mut Graph, pkg: &PackageVerification) -> String {
    let id = g.node(
        &format!("{}\n{}", pkg.name, pkg.license),
        if pkg.compatible { "darkgreen" } else { "red" },
    );
    for (dep, check) in pkg.dependencies.iter().zip(&pkg.checks) {
        let child = package(g, dep);
        g.edge(&id, &child, Some(&check.verdict.to_string()));
    }
    id
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompatEngine;
    use crate::license::LicenseId;

    #[test]
    fn test_table_edges_skip_incompatible() {
        let engine = CompatEngine::builtin().unwrap();
        let t = engine.compatibility_table(&["MIT", "GPL-3.0-only"]).unwrap();
        let dot = render(&Report::Table(t));
        assert!(dot.starts_with("digraph licenses {"));
        // nodes sorted: GPL-3.0-only = n0, MIT = n1; MIT can be used by GPL-3.0-only
        assert!(dot.contains("n1 -> n0;"));
        assert!(!dot.contains("n0 -> n1"));
    }

    #[test]
    fn test_fallback_single_node() {
        let dot = render(&Report::Licenses(vec![LicenseId::new("MIT"), LicenseId::new("ISC")]));
        assert!(dot.starts_with("digraph report {"));
        assert!(dot.contains("label=\"MIT\\nISC\""));
        assert!(!dot.contains("->"));
    }

    #[test]
    fn test_labels_are_escaped() {
        assert_eq!(escape("a \"b\"\nc"), "a \\\"b\\\"\\nc");
    }
}
