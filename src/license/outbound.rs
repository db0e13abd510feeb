//! Outbound license selection
//!
//! `suggest_outbound` runs the evaluator once per candidate outbound license
//! and keeps every candidate that is compatible with, and allowed for, the
//! whole inbound expression. Candidates are independent, so they are
//! evaluated in parallel; the final case-insensitive sort fixes the order.
//!
//! `LicenseChooser` picks one license from such a list, either by an
//! explicit preference list or by license family (permissive first).

use super::alias::AliasResolver;
use super::evaluator::{Diagnostics, Evaluation, Evaluator};
use super::expression::Expression;
use super::matrix::CompatibilityMatrix;
use super::normalize::licenses;
use super::{sort_case_insensitive, LicenseId};
use crate::{LicompatError, LicompatResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Which licenses are tried as outbound candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidatePool {
    /// Licenses that appear in the inbound expression
    Expression,
    /// Every license known to the matrix
    Extended,
    /// A caller-supplied list
    Explicit(Vec<LicenseId>),
}

/// Candidate evaluation results for one inbound expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundSuggestion {
    pub inbound: String,
    /// Compatible and allowed candidates, case-insensitively sorted
    pub candidates: Vec<LicenseId>,
    /// Every candidate tried, in the same order as tried
    pub evaluations: Vec<Evaluation>,
}

/// Resolve a pool into concrete, alias-resolved, de-duplicated candidates
pub fn candidate_licenses(
    evaluator: &Evaluator<'_>,
    inbound: &Expression,
    pool: &CandidatePool,
) -> Vec<LicenseId> {
    let aliases = evaluator.aliases();
    let raw: Vec<LicenseId> = match pool {
        CandidatePool::Expression => licenses(inbound).into_iter().collect(),
        CandidatePool::Extended => evaluator.matrix().licenses().to_vec(),
        CandidatePool::Explicit(list) => list.clone(),
    };
    let unique: BTreeSet<LicenseId> = raw.iter().map(|id| aliases.resolve_id(id)).collect();
    let mut out: Vec<LicenseId> = unique.into_iter().collect();
    sort_case_insensitive(&mut out);
    out
}

/// Every candidate that is compatible and allowed as the sole outbound license
pub fn suggest_outbound(
    evaluator: &Evaluator<'_>,
    inbound: &Expression,
    pool: &CandidatePool,
    diag: &mut Diagnostics,
) -> OutboundSuggestion {
    let candidates = candidate_licenses(evaluator, inbound, pool);
    tracing::debug!(
        "Trying {} outbound candidates for '{}'",
        candidates.len(),
        inbound
    );

    let trace = diag.trace_lookups();
    let results: Vec<(Evaluation, Diagnostics)> = candidates
        .par_iter()
        .map(|candidate| {
            let mut local = Diagnostics::new().with_lookup_tracing(trace);
            let evaluation = evaluator.evaluate_id(candidate, inbound, &mut local);
            (evaluation, local)
        })
        .collect();

    let mut evaluations = Vec::with_capacity(results.len());
    for (evaluation, local) in results {
        diag.merge(local);
        evaluations.push(evaluation);
    }

    let mut compatible: Vec<LicenseId> = evaluations
        .iter()
        .filter(|e| e.is_compatible() && e.allowed)
        .map(|e| e.outbound.clone())
        .collect();
    sort_case_insensitive(&mut compatible);
    compatible.dedup();

    OutboundSuggestion {
        inbound: inbound.to_string(),
        candidates: compatible,
        evaluations,
    }
}

// ─── License Chooser ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PreferenceFile {
    license_preferences: Vec<String>,
}

/// Picks a single preferred license out of a compatible set
#[derive(Debug, Clone, Default)]
pub struct LicenseChooser {
    preferences: Vec<LicenseId>,
}

impl LicenseChooser {
    /// Rank by license family, then name
    pub fn heuristic() -> Self {
        Self::default()
    }

    /// Rank listed licenses first, in list order.
    ///
    /// Every entry must be known to the matrix after alias resolution.
    pub fn with_preferences<S: AsRef<str>>(
        preferences: &[S],
        matrix: &CompatibilityMatrix,
        aliases: &AliasResolver,
    ) -> LicompatResult<Self> {
        if preferences.is_empty() {
            return Err(LicompatError::InvalidLicensePreference(
                "preference list is empty".into(),
            ));
        }
        let mut resolved = Vec::with_capacity(preferences.len());
        for pref in preferences {
            let pref = pref.as_ref().trim();
            let id = LicenseId::new(aliases.resolve(pref));
            if !matrix.supports(id.as_str()) {
                return Err(LicompatError::InvalidLicensePreference(format!(
                    "'{}' is not a supported license",
                    pref
                )));
            }
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }
        Ok(Self {
            preferences: resolved,
        })
    }

    /// Load `{"license_preferences": [...]}` from a JSON file
    pub fn from_file(
        path: &Path,
        matrix: &CompatibilityMatrix,
        aliases: &AliasResolver,
    ) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        let file: PreferenceFile = serde_json::from_str(&content)
            .map_err(|e| LicompatError::InvalidLicensePreference(e.to_string()))?;
        Self::with_preferences(&file.license_preferences, matrix, aliases)
    }

    pub fn preferences(&self) -> &[LicenseId] {
        &self.preferences
    }

    /// Candidates ordered best-first
    pub fn rank(&self, candidates: &[LicenseId]) -> Vec<LicenseId> {
        let mut ranked = candidates.to_vec();
        ranked.sort_by_key(|id| {
            let position = self
                .preferences
                .iter()
                .position(|p| p == id)
                .unwrap_or(usize::MAX);
            (position, id.family().preference_rank(), id.as_str().to_lowercase())
        });
        ranked.dedup();
        ranked
    }

    /// Best candidate, or `None` when nothing is compatible
    pub fn choose(&self, candidates: &[LicenseId]) -> Option<LicenseId> {
        self.rank(candidates).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CompatibilityMatrix, AliasResolver) {
        (
            CompatibilityMatrix::builtin().unwrap(),
            AliasResolver::builtin().unwrap(),
        )
    }

    fn ids(names: &[&str]) -> Vec<LicenseId> {
        names.iter().map(|n| LicenseId::new(*n)).collect()
    }

    #[test]
    fn test_suggest_from_expression_pool() {
        let (matrix, aliases) = setup();
        let evaluator = Evaluator::new(&matrix, &aliases);
        let expr = Expression::parse("GPL-2.0-only and (MIT or BSD-3-Clause)").unwrap();
        let mut diag = Diagnostics::new();
        let suggestion = suggest_outbound(&evaluator, &expr, &CandidatePool::Expression, &mut diag);
        assert_eq!(suggestion.candidates, ids(&["GPL-2.0-only"]));
        assert_eq!(suggestion.evaluations.len(), 3);
        assert!(diag.problems().is_empty());
    }

    #[test]
    fn test_suggest_extended_pool_is_sorted() {
        let (matrix, aliases) = setup();
        let evaluator = Evaluator::new(&matrix, &aliases);
        let expr = Expression::parse("MIT").unwrap();
        let mut diag = Diagnostics::new();
        let suggestion = suggest_outbound(&evaluator, &expr, &CandidatePool::Extended, &mut diag);
        // MIT is usable under every license in the built-in matrix
        assert_eq!(suggestion.candidates.len(), matrix.licenses().len());
        let mut sorted = suggestion.candidates.clone();
        sort_case_insensitive(&mut sorted);
        assert_eq!(suggestion.candidates, sorted);
    }

    #[test]
    fn test_suggest_skips_denied() {
        let (matrix, aliases) = setup();
        let evaluator = Evaluator::new(&matrix, &aliases).with_denylist(["MIT"]);
        let expr = Expression::parse("MIT AND BSD-3-Clause").unwrap();
        let mut diag = Diagnostics::new();
        let suggestion = suggest_outbound(&evaluator, &expr, &CandidatePool::Extended, &mut diag);
        assert!(suggestion.candidates.is_empty());
    }

    #[test]
    fn test_pool_resolves_aliases() {
        let (matrix, aliases) = setup();
        let evaluator = Evaluator::new(&matrix, &aliases);
        let expr = Expression::parse("Expat OR MIT").unwrap();
        assert_eq!(
            candidate_licenses(&evaluator, &expr, &CandidatePool::Expression),
            ids(&["MIT"])
        );
    }

    #[test]
    fn test_chooser_heuristic_prefers_permissive() {
        let chooser = LicenseChooser::heuristic();
        let candidates = ids(&["GPL-3.0-only", "Apache-2.0", "MIT", "AGPL-3.0-only"]);
        assert_eq!(chooser.choose(&candidates), Some(LicenseId::new("MIT")));
        assert_eq!(
            chooser.rank(&candidates),
            ids(&["MIT", "Apache-2.0", "GPL-3.0-only", "AGPL-3.0-only"])
        );
        assert_eq!(chooser.choose(&[]), None);
    }

    #[test]
    fn test_chooser_explicit_preferences() {
        let (matrix, aliases) = setup();
        let chooser =
            LicenseChooser::with_preferences(&["GPLv3", "MIT"], &matrix, &aliases).unwrap();
        let candidates = ids(&["MIT", "GPL-3.0-only", "BSD-3-Clause"]);
        assert_eq!(chooser.choose(&candidates), Some(LicenseId::new("GPL-3.0-only")));
        assert_eq!(
            chooser.rank(&ids(&["BSD-3-Clause", "Apache-2.0"])),
            ids(&["BSD-3-Clause", "Apache-2.0"])
        );
    }

    #[test]
    fn test_chooser_rejects_unknown_preference() {
        let (matrix, aliases) = setup();
        assert!(matches!(
            LicenseChooser::with_preferences(&["NOT-A-LICENSE"], &matrix, &aliases),
            Err(LicompatError::InvalidLicensePreference(_))
        ));
        let empty: [&str; 0] = [];
        assert!(LicenseChooser::with_preferences(&empty, &matrix, &aliases).is_err());
    }
}
