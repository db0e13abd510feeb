//! Expression normalization
//!
//! - `licenses`: the set of atoms an expression mentions
//! - `simplify`: flatten nested same-operator nodes, drop duplicate
//!   operands, unwrap single-operand nodes (`MIT AND MIT` → `MIT`).
//!   Operands are compared up to operand order, so `(A AND B) OR (B AND A)`
//!   keeps one branch.
//! - `to_set_list`: disjunctive normal form as a list of license sets
//!
//! DNF distribution multiplies the branch counts of every `AND` level.
//! `combination_count` computes that product up front so callers can refuse
//! to enumerate past a threshold instead of hanging.

use super::expression::{Expression, Operator};
use super::LicenseId;
use crate::{LicompatError, LicompatResult};
use std::collections::BTreeSet;

/// Default upper bound on enumerated combinations
pub const DEFAULT_COMBINATION_THRESHOLD: u64 = 10_000;

/// One AND-combination of licenses
pub type LicenseSet = BTreeSet<LicenseId>;

/// OR of AND-combinations
pub type SetList = Vec<LicenseSet>;

/// Every atom used in the expression
pub fn licenses(expr: &Expression) -> BTreeSet<LicenseId> {
    expr.leaves().into_iter().cloned().collect()
}

/// Remove boolean redundancy without changing the atom set
pub fn simplify(expr: &Expression) -> Expression {
    match expr {
        Expression::License { .. } => expr.clone(),
        Expression::Operator { op, operands } => {
            let mut flat: Vec<Expression> = Vec::with_capacity(operands.len());
            let mut seen: BTreeSet<String> = BTreeSet::new();
            for operand in operands.iter().map(simplify) {
                let spliced = match operand {
                    Expression::Operator { op: child_op, operands: children } if child_op == *op => {
                        children
                    }
                    other => vec![other],
                };
                for child in spliced {
                    if seen.insert(canonical_key(&child)) {
                        flat.push(child);
                    }
                }
            }
            if flat.len() == 1 {
                return flat.remove(0);
            }
            Expression::Operator {
                op: *op,
                operands: flat,
            }
        }
    }
}

/// Order-insensitive identity of a simplified tree
fn canonical_key(expr: &Expression) -> String {
    match expr {
        Expression::License { name } => name.as_str().to_string(),
        Expression::Operator { op, operands } => {
            let mut keys: Vec<String> = operands.iter().map(canonical_key).collect();
            keys.sort();
            let op = match op {
                Operator::And => "AND",
                Operator::Or => "OR",
            };
            format!("{}({})", op, keys.join(","))
        }
    }
}

/// Parse, simplify and print an expression
pub fn simplify_str(text: &str) -> LicompatResult<String> {
    Ok(simplify(&Expression::parse(text)?).to_string())
}

/// Number of set-list entries DNF distribution would produce
pub fn combination_count(expr: &Expression) -> u64 {
    match expr {
        Expression::License { .. } => 1,
        Expression::Operator { op: Operator::Or, operands } => operands
            .iter()
            .map(combination_count)
            .fold(0u64, |acc, n| acc.saturating_add(n)),
        Expression::Operator { op: Operator::And, operands } => operands
            .iter()
            .map(combination_count)
            .fold(1u64, |acc, n| acc.saturating_mul(n)),
    }
}

/// Fail with `TooManyCombinations` when `expr` would expand past `threshold`
pub fn ensure_within_threshold(expr: &Expression, threshold: u64) -> LicompatResult<u64> {
    let count = combination_count(expr);
    if count > threshold {
        tracing::warn!(
            "Refusing to expand {} license combinations (threshold {})",
            count,
            threshold
        );
        return Err(LicompatError::TooManyCombinations { count, threshold });
    }
    Ok(count)
}

/// DNF set list with the default threshold
pub fn to_set_list(expr: &Expression) -> LicompatResult<SetList> {
    to_set_list_with_threshold(expr, DEFAULT_COMBINATION_THRESHOLD)
}

/// DNF set list, aborting before enumeration when the threshold is exceeded
pub fn to_set_list_with_threshold(expr: &Expression, threshold: u64) -> LicompatResult<SetList> {
    ensure_within_threshold(expr, threshold)?;
    Ok(distribute(expr))
}

fn distribute(expr: &Expression) -> SetList {
    match expr {
        Expression::License { name } => vec![BTreeSet::from([name.clone()])],
        Expression::Operator { op: Operator::Or, operands } => {
            let mut out: SetList = Vec::new();
            for set in operands.iter().flat_map(distribute) {
                if !out.contains(&set) {
                    out.push(set);
                }
            }
            out
        }
        Expression::Operator { op: Operator::And, operands } => {
            let mut acc: SetList = vec![LicenseSet::new()];
            for operand in operands {
                let child = distribute(operand);
                let mut next: SetList = Vec::with_capacity(acc.len() * child.len());
                for left in &acc {
                    for right in &child {
                        let merged: LicenseSet = left.union(right).cloned().collect();
                        if !next.contains(&merged) {
                            next.push(merged);
                        }
                    }
                }
                acc = next;
            }
            acc
        }
    }
}

/// Render a set list as `A AND B OR C`-style text, one set per OR branch
pub fn set_list_to_expression(list: &SetList) -> Expression {
    let branches: Vec<Expression> = list
        .iter()
        .map(|set| {
            let mut leaves: Vec<Expression> = set
                .iter()
                .map(|id| Expression::License { name: id.clone() })
                .collect();
            if leaves.len() == 1 {
                leaves.remove(0)
            } else {
                Expression::and(leaves)
            }
        })
        .collect();
    simplify(&Expression::or(branches))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Expression {
        Expression::parse(s).unwrap()
    }

    fn set(ids: &[&str]) -> LicenseSet {
        ids.iter().map(|s| LicenseId::new(*s)).collect()
    }

    #[test]
    fn test_simplify_duplicates() {
        assert_eq!(simplify_str("MIT and MIT").unwrap(), "MIT");
        assert_eq!(simplify_str("MIT OR MIT").unwrap(), "MIT");
        assert_eq!(simplify_str("(MIT OR BSD-3-Clause) AND (MIT OR BSD-3-Clause)").unwrap(), "MIT OR BSD-3-Clause");
    }

    #[test]
    fn test_simplify_commutative_duplicates() {
        assert_eq!(simplify_str("(A AND B) OR (B AND A)").unwrap(), "A AND B");
        assert_eq!(simplify_str("(A OR (B AND C)) AND ((C AND B) OR A)").unwrap(), "A OR (B AND C)");
        assert_eq!(simplify_str("(A AND B) OR (B AND C)").unwrap(), "(A AND B) OR (B AND C)");
    }

    #[test]
    fn test_simplify_flattens_same_operator() {
        assert_eq!(
            simplify_str("A AND (B AND (C AND A))").unwrap(),
            "A AND B AND C"
        );
        assert_eq!(simplify_str("(A OR B) AND C").unwrap(), "(A OR B) AND C");
    }

    #[test]
    fn test_simplify_is_idempotent() {
        for text in [
            "MIT and MIT",
            "A AND (B OR (C OR B)) AND A",
            "X11 AND (GPL-2.0-only WITH Classpath-exception-2.0 OR GPL-3.0-only)",
            "((A AND A) OR (B AND (C AND C)))",
        ] {
            let once = simplify_str(text).unwrap();
            let twice = simplify_str(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {:?}", text);
        }
    }

    #[test]
    fn test_simplify_preserves_atoms() {
        for text in ["A OR (A AND B)", "(A AND B) OR (B AND C) OR D", "A AND A AND (B OR B)"] {
            let expr = parse(text);
            let simplified = parse(&simplify(&expr).to_string());
            let atoms_from_sets: BTreeSet<LicenseId> = to_set_list(&simplified)
                .unwrap()
                .into_iter()
                .flatten()
                .collect();
            assert_eq!(atoms_from_sets, licenses(&expr), "atom set changed for {:?}", text);
        }
    }

    #[test]
    fn test_set_list_single() {
        assert_eq!(to_set_list(&parse("MIT")).unwrap(), vec![set(&["MIT"])]);
    }

    #[test]
    fn test_set_list_distributes_and_over_or() {
        let list = to_set_list(&parse("GPL-2.0-only AND (MIT OR BSD-3-Clause)")).unwrap();
        assert_eq!(
            list,
            vec![set(&["GPL-2.0-only", "MIT"]), set(&["BSD-3-Clause", "GPL-2.0-only"])]
        );
    }

    #[test]
    fn test_set_list_cross_product() {
        let list = to_set_list(&parse("(A OR B) AND (C OR D)")).unwrap();
        assert_eq!(
            list,
            vec![set(&["A", "C"]), set(&["A", "D"]), set(&["B", "C"]), set(&["B", "D"])]
        );
    }

    #[test]
    fn test_set_list_collapses_duplicate_atoms() {
        let list = to_set_list(&parse("(A OR B) AND A")).unwrap();
        assert_eq!(list, vec![set(&["A"]), set(&["A", "B"])]);
    }

    #[test]
    fn test_combination_count() {
        assert_eq!(combination_count(&parse("MIT")), 1);
        assert_eq!(combination_count(&parse("A OR B OR C")), 3);
        assert_eq!(combination_count(&parse("(A OR B) AND (C OR D OR E)")), 6);
    }

    #[test]
    fn test_threshold_aborts_before_enumeration() {
        // 2^20 combinations
        let text = (0..20)
            .map(|i| format!("(A{} OR B{})", i, i))
            .collect::<Vec<_>>()
            .join(" AND ");
        let expr = parse(&text);
        assert_eq!(combination_count(&expr), 1 << 20);
        match to_set_list(&expr) {
            Err(LicompatError::TooManyCombinations { count, threshold }) => {
                assert_eq!(count, 1 << 20);
                assert_eq!(threshold, DEFAULT_COMBINATION_THRESHOLD);
            }
            other => panic!("expected TooManyCombinations, got {:?}", other),
        }
        assert_eq!(to_set_list_with_threshold(&parse("(A OR B) AND C"), 2).unwrap().len(), 2);
    }

    #[test]
    fn test_set_list_to_expression() {
        let list = to_set_list(&parse("GPL-2.0-only AND (MIT OR BSD-3-Clause)")).unwrap();
        assert_eq!(
            set_list_to_expression(&list).to_string(),
            "(GPL-2.0-only AND MIT) OR (BSD-3-Clause AND GPL-2.0-only)"
        );
    }
}
