//! Compatibility evaluation
//!
//! Walks an inbound expression tree for a given outbound license:
//!
//! - leaf: `matrix.lookup(outbound, resolved_leaf)`; allowed unless denied
//! - `AND`: compatible iff every operand is compatible; allowed iff all are
//! - `OR`: compatible iff any operand is compatible; allowed iff any is
//!
//! Operator nodes collapse to a strict Yes/No: a `Depends`/`Unknown` operand
//! never passes an `AND`. The result is a separate annotated tree; the
//! input expression is never modified, so the same tree can be evaluated
//! against many outbound candidates.

use super::alias::AliasResolver;
use super::expression::{Expression, Operator};
use super::matrix::{CompatibilityMatrix, Verdict};
use super::LicenseId;
use crate::LicompatResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ─── Diagnostics ────────────────────────────────────────────────────

/// A pairwise lookup that could not be answered by the matrix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Problem {
    pub outbound: LicenseId,
    pub inbound: LicenseId,
    pub verdict: Verdict,
    pub description: String,
}

/// Per-call diagnostics context, passed explicitly into evaluation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    trace_lookups: bool,
    problems: Vec<Problem>,
    seen: HashSet<(LicenseId, LicenseId)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log every matrix lookup at debug level
    pub fn with_lookup_tracing(mut self, enabled: bool) -> Self {
        self.trace_lookups = enabled;
        self
    }

    pub fn trace_lookups(&self) -> bool {
        self.trace_lookups
    }

    fn lookup(&mut self, outbound: &LicenseId, inbound: &LicenseId, verdict: Verdict) {
        if self.trace_lookups {
            tracing::debug!("lookup {} <- {}: {}", outbound, inbound, verdict);
        }
        if !verdict.is_problem() {
            return;
        }
        if !self.seen.insert((outbound.clone(), inbound.clone())) {
            return;
        }
        let description = match verdict {
            Verdict::Undefined => format!("outbound license '{}' is not supported", outbound),
            _ => format!("inbound license '{}' is not supported", inbound),
        };
        tracing::debug!("{}", description);
        self.problems.push(Problem {
            outbound: outbound.clone(),
            inbound: inbound.clone(),
            verdict,
            description,
        });
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }

    /// Fold another context's problems into this one
    pub fn merge(&mut self, other: Diagnostics) {
        for problem in other.problems {
            if self
                .seen
                .insert((problem.outbound.clone(), problem.inbound.clone()))
            {
                self.problems.push(problem);
            }
        }
    }
}

// ─── Annotated output ───────────────────────────────────────────────

/// Inbound expression tree annotated for one outbound license
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvaluatedNode {
    License {
        /// Spelling as written in the expression
        name: LicenseId,
        /// Identifier after alias resolution
        resolved: LicenseId,
        verdict: Verdict,
        allowed: bool,
    },
    Operator {
        op: Operator,
        verdict: Verdict,
        allowed: bool,
        operands: Vec<EvaluatedNode>,
    },
}

impl EvaluatedNode {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::License { verdict, .. } | Self::Operator { verdict, .. } => *verdict,
        }
    }

    pub fn allowed(&self) -> bool {
        match self {
            Self::License { allowed, .. } | Self::Operator { allowed, .. } => *allowed,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.verdict().is_compatible()
    }
}

/// Result of evaluating one inbound expression for one outbound license
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub outbound: LicenseId,
    pub inbound: String,
    pub verdict: Verdict,
    pub allowed: bool,
    pub tree: EvaluatedNode,
}

impl Evaluation {
    pub fn is_compatible(&self) -> bool {
        self.verdict.is_compatible()
    }
}

/// Outbound expression tree, each outbound leaf carrying the evaluation
/// of the whole inbound expression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundNode {
    License {
        name: LicenseId,
        resolved: LicenseId,
        verdict: Verdict,
        allowed: bool,
        inbound: EvaluatedNode,
    },
    Operator {
        op: Operator,
        verdict: Verdict,
        allowed: bool,
        operands: Vec<OutboundNode>,
    },
}

impl OutboundNode {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::License { verdict, .. } | Self::Operator { verdict, .. } => *verdict,
        }
    }

    pub fn allowed(&self) -> bool {
        match self {
            Self::License { allowed, .. } | Self::Operator { allowed, .. } => *allowed,
        }
    }
}

/// Outbound expression checked against an inbound expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub outbound: String,
    pub inbound: String,
    pub verdict: Verdict,
    pub allowed: bool,
    pub tree: OutboundNode,
    pub problems: Vec<Problem>,
}

// ─── Evaluator ──────────────────────────────────────────────────────

/// Stateless evaluator over read-only matrix and alias tables
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    matrix: &'a CompatibilityMatrix,
    aliases: &'a AliasResolver,
    denylist: HashSet<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(matrix: &'a CompatibilityMatrix, aliases: &'a AliasResolver) -> Self {
        Self {
            matrix,
            aliases,
            denylist: HashSet::new(),
        }
    }

    /// Licenses whose leaves are annotated `allowed = false`
    pub fn with_denylist<I, S>(mut self, denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denylist = denied
            .into_iter()
            .map(|d| self.aliases.resolve(d.as_ref().trim()))
            .collect();
        self
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        self.matrix
    }

    pub fn aliases(&self) -> &AliasResolver {
        self.aliases
    }

    pub fn is_denied(&self, id: &LicenseId) -> bool {
        self.denylist.contains(id.as_str()) || self.denylist.contains(id.base())
    }

    /// Evaluate `inbound` for an outbound given as text.
    ///
    /// Fails with `InvalidExpression` unless `outbound` is a single atom.
    pub fn evaluate(
        &self,
        outbound: &str,
        inbound: &Expression,
        diag: &mut Diagnostics,
    ) -> LicompatResult<Evaluation> {
        let outbound = self.aliases.resolve_id(&Expression::parse_atom(outbound)?);
        Ok(self.evaluate_id(&outbound, inbound, diag))
    }

    /// Evaluate `inbound` for an already-parsed outbound atom
    pub fn evaluate_id(
        &self,
        outbound: &LicenseId,
        inbound: &Expression,
        diag: &mut Diagnostics,
    ) -> Evaluation {
        let tree = self.evaluate_node(outbound, inbound, diag);
        Evaluation {
            outbound: outbound.clone(),
            inbound: inbound.to_string(),
            verdict: tree.verdict(),
            allowed: tree.allowed(),
            tree,
        }
    }

    fn evaluate_node(
        &self,
        outbound: &LicenseId,
        expr: &Expression,
        diag: &mut Diagnostics,
    ) -> EvaluatedNode {
        match expr {
            Expression::License { name } => {
                let resolved = self.aliases.resolve_id(name);
                let verdict = self.matrix.lookup(outbound.as_str(), resolved.as_str());
                diag.lookup(outbound, &resolved, verdict);
                EvaluatedNode::License {
                    name: name.clone(),
                    allowed: !self.is_denied(&resolved),
                    resolved,
                    verdict,
                }
            }
            Expression::Operator { op, operands } => {
                let operands: Vec<EvaluatedNode> = operands
                    .iter()
                    .map(|o| self.evaluate_node(outbound, o, diag))
                    .collect();
                let (compatible, allowed) =
                    combine(*op, operands.iter().map(|o| (o.is_compatible(), o.allowed())));
                EvaluatedNode::Operator {
                    op: *op,
                    verdict: Verdict::collapse(compatible),
                    allowed,
                    operands,
                }
            }
        }
    }

    /// Check an outbound *expression* against an inbound expression.
    ///
    /// Every outbound atom is evaluated against the full inbound tree; the
    /// outbound tree aggregates with the same AND/OR rules.
    pub fn check(
        &self,
        outbound: &Expression,
        inbound: &Expression,
        diag: &mut Diagnostics,
    ) -> CompatibilityReport {
        let tree = self.check_node(outbound, inbound, diag);
        CompatibilityReport {
            outbound: outbound.to_string(),
            inbound: inbound.to_string(),
            verdict: tree.verdict(),
            allowed: tree.allowed(),
            tree,
            problems: diag.problems().to_vec(),
        }
    }

    fn check_node(
        &self,
        outbound: &Expression,
        inbound: &Expression,
        diag: &mut Diagnostics,
    ) -> OutboundNode {
        match outbound {
            Expression::License { name } => {
                let resolved = self.aliases.resolve_id(name);
                let evaluated = self.evaluate_node(&resolved, inbound, diag);
                OutboundNode::License {
                    name: name.clone(),
                    verdict: evaluated.verdict(),
                    allowed: !self.is_denied(&resolved) && evaluated.allowed(),
                    resolved,
                    inbound: evaluated,
                }
            }
            Expression::Operator { op, operands } => {
                let operands: Vec<OutboundNode> = operands
                    .iter()
                    .map(|o| self.check_node(o, inbound, diag))
                    .collect();
                let (compatible, allowed) = combine(
                    *op,
                    operands
                        .iter()
                        .map(|o| (o.verdict().is_compatible(), o.allowed())),
                );
                OutboundNode::Operator {
                    op: *op,
                    verdict: Verdict::collapse(compatible),
                    allowed,
                    operands,
                }
            }
        }
    }
}

/// The first operand seeds the result; the rest fold in with `&&` or `||`
fn combine<I>(op: Operator, operands: I) -> (bool, bool)
where
    I: IntoIterator<Item = (bool, bool)>,
{
    let mut acc: Option<(bool, bool)> = None;
    for (compatible, allowed) in operands {
        acc = Some(match (acc, op) {
            (None, _) => (compatible, allowed),
            (Some((c, a)), Operator::And) => (c && compatible, a && allowed),
            (Some((c, a)), Operator::Or) => (c || compatible, a || allowed),
        });
    }
    acc.unwrap_or(match op {
        Operator::And => (true, true),
        Operator::Or => (false, false),
    })
}
