//! Integration tests: end-to-end behaviour over the built-in data set
//!
//! Drives the public API the way the CLI does: text in, reports out.

use licompat::engine::CompatConfig;
use licompat::license::alias::AliasResolver;
use licompat::license::normalize;
use licompat::{
    CompatEngine, CompatibilityMatrix, Diagnostics, Evaluator, Expression, LicenseId,
    LicompatError, Verdict,
};

fn engine() -> CompatEngine {
    CompatEngine::builtin().expect("built-in data loads")
}

fn ids(names: &[&str]) -> Vec<LicenseId> {
    names.iter().map(|n| LicenseId::new(*n)).collect()
}

// ─── Worked scenarios ───────────────────────────────────────────────

#[test]
fn test_simplify_duplicate_and() {
    let s = engine().simplify(&["MIT and MIT"]).unwrap();
    assert_eq!(s.simplified, "MIT");
}

#[test]
fn test_permissive_inbound_into_gpl() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let e = engine.evaluate("GPL-2.0-only", &["MIT"], &mut diag).unwrap();
    assert_eq!(e.verdict, Verdict::Compatible);
    assert!(e.allowed);
}

#[test]
fn test_gpl_inbound_into_permissive() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let e = engine.evaluate("MIT", &["GPL-2.0-only"], &mut diag).unwrap();
    assert_eq!(e.verdict, Verdict::Incompatible);
}

#[test]
fn test_exception_clause_inside_or() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let e = engine
        .evaluate(
            "GPL-2.0-only",
            &["X11 AND (GPL-2.0-only WITH Classpath-exception-2.0 OR GPL-3.0-only)"],
            &mut diag,
        )
        .unwrap();
    assert_eq!(e.verdict, Verdict::Compatible);
    assert_eq!(e.verdict.to_string(), "Yes");
}

#[test]
fn test_unknown_licenses_on_both_sides() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let report = engine
        .verify(
            &["NONESUCHEITHER OR WHATSISTHIS"],
            &["NONESUCH OR WHATSUP"],
            &mut diag,
        )
        .unwrap();
    assert_eq!(report.problems.len(), 4);
    assert!(report.problems.iter().all(|p| p.verdict.is_problem()));
    assert_eq!(report.verdict, Verdict::Incompatible);
}

#[test]
fn test_suggest_from_expression_licenses() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let report = engine
        .suggest_outbound(&["GPL-2.0-only and (MIT or BSD-3-Clause)"], &mut diag)
        .unwrap();
    assert_eq!(report.candidates, ids(&["GPL-2.0-only"]));
    assert_eq!(report.chosen, Some(LicenseId::new("GPL-2.0-only")));
}

// ─── Properties ─────────────────────────────────────────────────────

#[test]
fn test_every_license_is_compatible_with_itself() {
    let matrix = CompatibilityMatrix::builtin().unwrap();
    let aliases = AliasResolver::builtin().unwrap();
    let evaluator = Evaluator::new(&matrix, &aliases);
    for license in matrix.licenses() {
        let mut diag = Diagnostics::new();
        let e = evaluator
            .evaluate_id(license, &Expression::license(license.as_str()), &mut diag);
        assert_eq!(e.verdict, Verdict::Compatible, "{} with itself", license);
    }
}

#[test]
fn test_and_requires_both_or_needs_one() {
    let engine = engine();
    let licenses = engine.supported_licenses();
    let pairs = [("MIT", "GPL-3.0-only"), ("Apache-2.0", "MPL-2.0"), ("BSD-2-Clause", "ISC")];
    for outbound in &licenses {
        for (a, b) in pairs {
            let mut diag = engine.diagnostics();
            let single = |x: &str, diag: &mut Diagnostics| {
                engine
                    .evaluate(outbound.as_str(), &[x], diag)
                    .unwrap()
                    .is_compatible()
            };
            let (ca, cb) = (single(a, &mut diag), single(b, &mut diag));
            let and = engine
                .evaluate(outbound.as_str(), &[format!("{} AND {}", a, b)], &mut diag)
                .unwrap();
            let or = engine
                .evaluate(outbound.as_str(), &[format!("{} OR {}", a, b)], &mut diag)
                .unwrap();
            assert_eq!(and.is_compatible(), ca && cb, "{} <- {} AND {}", outbound, a, b);
            assert_eq!(or.is_compatible(), ca || cb, "{} <- {} OR {}", outbound, a, b);
        }
    }
}

#[test]
fn test_simplify_is_idempotent_and_keeps_atoms() {
    let inputs = [
        "MIT OR MIT OR Apache-2.0",
        "(MIT AND (BSD-3-Clause AND MIT)) OR ISC",
        "GPL-2.0-only WITH Classpath-exception-2.0 AND (X11 OR X11)",
        "((A))",
    ];
    for input in inputs {
        let expr = Expression::parse(input).unwrap();
        let once = normalize::simplify(&expr);
        assert_eq!(normalize::simplify(&once), once, "{}", input);

        let sets = normalize::to_set_list(&Expression::parse(&once.to_string()).unwrap()).unwrap();
        let atoms: std::collections::BTreeSet<LicenseId> =
            sets.into_iter().flatten().collect();
        assert_eq!(atoms, normalize::licenses(&expr), "{}", input);
    }
}

#[test]
fn test_unknown_inbound_forgiven_by_or_sibling() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let or = engine.evaluate("MIT", &["NONESUCH OR ISC"], &mut diag).unwrap();
    assert!(or.is_compatible());
    let and = engine.evaluate("MIT", &["NONESUCH AND ISC"], &mut diag).unwrap();
    assert!(!and.is_compatible());
    // Same pair twice, one problem
    assert_eq!(diag.problems().len(), 1);
    assert_eq!(diag.problems()[0].verdict, Verdict::Unknown);
}

// ─── Boundaries ─────────────────────────────────────────────────────

#[test]
fn test_empty_inputs_are_invalid_expressions() {
    let engine = engine();
    let empty: [&str; 0] = [];
    assert!(matches!(engine.simplify(&empty), Err(LicompatError::InvalidExpression(_))));
    assert!(matches!(engine.simplify(&[""]), Err(LicompatError::InvalidExpression(_))));
    assert!(matches!(
        engine.simplify(&["MIT", ""]),
        Err(LicompatError::InvalidExpression(_))
    ));
}

#[test]
fn test_malformed_expressions_are_rejected() {
    let engine = engine();
    for bad in ["MIT AND", "(MIT OR ISC", "MIT ISC", "AND MIT", "MIT WITH", "MIT)"] {
        let err = engine.simplify(&[bad]).unwrap_err();
        assert_eq!(err.exit_code(), 10, "{}", bad);
    }
}

#[test]
fn test_outbound_must_be_single_atom() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    assert!(matches!(
        engine.evaluate("MIT OR ISC", &["MIT"], &mut diag),
        Err(LicompatError::InvalidExpression(_))
    ));
}

#[test]
fn test_combination_threshold_aborts_before_enumeration() {
    let engine = CompatEngine::new(CompatConfig {
        combination_threshold: 100,
        ..Default::default()
    })
    .unwrap();
    let clause = "(MIT OR ISC OR X11)";
    let expr = vec![clause; 5].join(" AND ");
    let err = engine.expand(&[expr]).unwrap_err();
    assert!(matches!(
        err,
        LicompatError::TooManyCombinations { count: 243, threshold: 100 }
    ));
    assert_eq!(err.exit_code(), 20);
}

#[test]
fn test_direct_pair_check_fails_on_unknown() {
    let err = engine().check_pair("MIT", "NONESUCH").unwrap_err();
    assert!(matches!(err, LicompatError::UnsupportedLicense(_)));
}

#[test]
fn test_depends_verdict_is_not_compatible() {
    let engine = engine();
    let pair = engine
        .check_pair("MIT", "GPL-2.0-only WITH Classpath-exception-2.0")
        .unwrap();
    assert_eq!(pair.verdict, Verdict::Depends);
    let mut diag = engine.diagnostics();
    let report = engine
        .verify(&["MIT"], &["GPL-2.0-only WITH Classpath-exception-2.0 AND ISC"], &mut diag)
        .unwrap();
    assert_eq!(report.verdict, Verdict::Incompatible);
}

#[test]
fn test_later_versions_expand_before_evaluation() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    let e = engine.evaluate("GPL-3.0-only", &["GPLv2+"], &mut diag).unwrap();
    assert!(e.is_compatible());
    assert!(diag.problems().is_empty());
}

#[test]
fn test_or_later_outbound_agrees_across_entry_points() {
    let engine = engine();
    let mut diag = engine.diagnostics();
    for inbound in ["Apache-2.0", "MIT", "GPL-3.0-only"] {
        let evaluated = engine.evaluate("GPL-2.0-or-later", &[inbound], &mut diag).unwrap();
        let verified = engine
            .verify(&["GPL-2.0-or-later"], &[inbound], &mut diag)
            .unwrap();
        assert_eq!(
            evaluated.is_compatible(),
            verified.verdict.is_compatible(),
            "GPL-2.0-or-later <- {}",
            inbound
        );
    }
}
