//! # Compatibility Engine: Orchestrator
//!
//! Owns the read-only tables (matrix, aliases, relicense rules, policy,
//! license preferences) and exposes one method per user-facing operation:
//!
//! - `simplify`: boolean redundancy removal
//! - `supported_licenses`: every license in the matrix
//! - `expand`: disjunctive set list, threshold-guarded
//! - `verify`: outbound expression vs inbound expression, with proof tree
//! - `suggest_outbound`: compatible outbound candidates + preferred choice
//! - `check_pair` / `compatibility_table`: direct matrix queries
//! - `verify_project`: dependency-tree manifests
//! - `policy_report`: allow/avoid/deny classification of candidates
//!
//! Tables are loaded once in `CompatEngine::new`; every call after that is
//! a pure in-memory computation.

use crate::license::alias::{AliasResolver, Relicenser};
pub use crate::license::evaluator::Diagnostics;
use crate::license::evaluator::{CompatibilityReport, Evaluation, Evaluator, Problem};
use crate::license::expression::Expression;
use crate::license::matrix::{CompatibilityMatrix, Verdict};
use crate::license::normalize::{self, LicenseSet, DEFAULT_COMBINATION_THRESHOLD};
use crate::license::outbound::{suggest_outbound, CandidatePool, LicenseChooser};
use crate::license::{sort_case_insensitive, LicenseId};
use crate::policy::{PolicyEngine, PolicyReport};
use crate::project::{Project, ProjectVerification};
use crate::{LicompatError, LicompatResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ─── Configuration ─────────────────────────────────────────────────

/// Engine configuration (loadable from `.licompat.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Compatibility matrix CSV; built-in matrix when unset
    pub matrix_file: Option<PathBuf>,
    /// Alias JSON file; built-in aliases when unset
    pub alias_file: Option<PathBuf>,
    /// Relicense JSON file; built-in rules when unset
    pub relicense_file: Option<PathBuf>,
    /// Policy TOML file; no policy when unset
    pub policy_file: Option<PathBuf>,
    /// JSON `{"license_preferences": [...]}`; overrides `license_preferences`
    pub preferences_file: Option<PathBuf>,
    /// Preferred outbound licenses, best first
    pub license_preferences: Vec<String>,
    /// Maximum number of DNF combinations to enumerate
    pub combination_threshold: u64,
    /// Try every matrix license as an outbound candidate
    pub extended_licenses: bool,
    /// Expand "or later" licenses before evaluation
    pub relicense: bool,
    /// Log every matrix lookup at debug level
    pub trace_lookups: bool,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            matrix_file: None,
            alias_file: None,
            relicense_file: None,
            policy_file: None,
            preferences_file: None,
            license_preferences: vec![],
            combination_threshold: DEFAULT_COMBINATION_THRESHOLD,
            extended_licenses: false,
            relicense: true,
            trace_lookups: false,
        }
    }
}

impl CompatConfig {
    pub fn from_file(path: &Path) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Try `.licompat.toml` then `licompat.toml` in `root`, fall back to defaults
    pub fn from_project_root(root: &Path) -> Self {
        for name in [".licompat.toml", "licompat.toml"] {
            let path = root.join(name);
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}, using defaults", path.display(), e);
                }
            }
        }
        Self::default()
    }
}

// ─── Reports ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simplification {
    pub original: String,
    pub simplified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub expression: String,
    pub combinations: u64,
    pub sets: Vec<LicenseSet>,
}

/// Suggested outbound licenses for one inbound expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundReport {
    pub inbound: String,
    pub extended: bool,
    pub candidates: Vec<LicenseId>,
    pub chosen: Option<LicenseId>,
    pub evaluations: Vec<Evaluation>,
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairVerdict {
    pub outbound: LicenseId,
    pub inbound: LicenseId,
    pub verdict: Verdict,
}

/// Every ordered pair among a set of licenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityTable {
    pub licenses: Vec<LicenseId>,
    pub pairs: Vec<PairVerdict>,
}

impl CompatibilityTable {
    pub fn verdict(&self, outbound: &str, inbound: &str) -> Option<Verdict> {
        self.pairs
            .iter()
            .find(|p| p.outbound.as_str() == outbound && p.inbound.as_str() == inbound)
            .map(|p| p.verdict)
    }
}

/// Policy classification of the outbound candidates for an expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheck {
    pub inbound: String,
    pub candidates: Vec<LicenseId>,
    pub policy: PolicyReport,
}

// ─── Engine ────────────────────────────────────────────────────────

pub struct CompatEngine {
    config: CompatConfig,
    matrix: CompatibilityMatrix,
    aliases: AliasResolver,
    relicenser: Relicenser,
    policy: PolicyEngine,
    chooser: LicenseChooser,
}

impl CompatEngine {
    /// Engine over the built-in data set
    pub fn builtin() -> LicompatResult<Self> {
        Self::new(CompatConfig::default())
    }

    pub fn new(config: CompatConfig) -> LicompatResult<Self> {
        let matrix = match &config.matrix_file {
            Some(path) => CompatibilityMatrix::from_file(path)?,
            None => CompatibilityMatrix::builtin()?,
        };
        let aliases = match &config.alias_file {
            Some(path) => AliasResolver::from_file(path)?,
            None => AliasResolver::builtin()?,
        };
        let relicenser = match &config.relicense_file {
            Some(path) => Relicenser::from_file(path)?,
            None => Relicenser::builtin()?,
        };
        let policy = match &config.policy_file {
            Some(path) => PolicyEngine::from_file(path)?.resolve_aliases(&aliases)?,
            None => PolicyEngine::default(),
        };
        let chooser = match &config.preferences_file {
            Some(path) => LicenseChooser::from_file(path, &matrix, &aliases)?,
            None if config.license_preferences.is_empty() => LicenseChooser::heuristic(),
            None => {
                LicenseChooser::with_preferences(&config.license_preferences, &matrix, &aliases)?
            }
        };

        tracing::debug!(
            "Engine ready: {} licenses, {} aliases, {} relicense rules",
            matrix.licenses().len(),
            aliases.len(),
            relicenser.len()
        );

        Ok(Self {
            config,
            matrix,
            aliases,
            relicenser,
            policy,
            chooser,
        })
    }

    /// Replace the policy after construction; list entries are alias-resolved
    pub fn with_policy(mut self, policy: PolicyEngine) -> LicompatResult<Self> {
        self.policy = policy.resolve_aliases(&self.aliases)?;
        Ok(self)
    }

    pub fn config(&self) -> &CompatConfig {
        &self.config
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    pub fn aliases(&self) -> &AliasResolver {
        &self.aliases
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn chooser(&self) -> &LicenseChooser {
        &self.chooser
    }

    /// Fresh diagnostics context honouring `trace_lookups`
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new().with_lookup_tracing(self.config.trace_lookups)
    }

    /// Evaluator with the policy denylist applied
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.matrix, &self.aliases).with_denylist(self.policy.denylist())
    }

    pub fn candidate_pool(&self) -> CandidatePool {
        if self.config.extended_licenses {
            CandidatePool::Extended
        } else {
            CandidatePool::Expression
        }
    }

    /// Relicense expansion on alias-resolved atoms (when enabled).
    ///
    /// Inbound expressions only. Outbound atoms are always looked up under
    /// their own matrix row.
    pub fn prepare(&self, expr: &Expression) -> Expression {
        if self.config.relicense {
            self.relicenser.expand_resolved(expr, &self.aliases)
        } else {
            expr.clone()
        }
    }

    pub fn parse<S: AsRef<str>>(&self, parts: &[S]) -> LicompatResult<Expression> {
        Expression::parse_list(parts)
    }

    // ── Operations ──

    pub fn simplify<S: AsRef<str>>(&self, parts: &[S]) -> LicompatResult<Simplification> {
        let expr = self.parse(parts)?;
        Ok(Simplification {
            original: expr.to_string(),
            simplified: normalize::simplify(&expr).to_string(),
        })
    }

    pub fn supported_licenses(&self) -> Vec<LicenseId> {
        let mut licenses = self.matrix.licenses().to_vec();
        sort_case_insensitive(&mut licenses);
        licenses
    }

    pub fn expand<S: AsRef<str>>(&self, parts: &[S]) -> LicompatResult<Expansion> {
        let expr = self.prepare(&self.parse(parts)?);
        let sets = normalize::to_set_list_with_threshold(&expr, self.config.combination_threshold)?;
        let combinations = normalize::combination_count(&expr);
        Ok(Expansion {
            expression: expr.to_string(),
            combinations,
            sets,
        })
    }

    /// Evaluate `inbound` for a single outbound atom
    pub fn evaluate<S: AsRef<str>>(
        &self,
        outbound: &str,
        inbound: &[S],
        diag: &mut Diagnostics,
    ) -> LicompatResult<Evaluation> {
        let inbound = self.prepare(&self.parse(inbound)?);
        self.evaluator().evaluate(outbound, &inbound, diag)
    }

    /// Check an outbound expression against an inbound expression
    pub fn verify<S: AsRef<str>, T: AsRef<str>>(
        &self,
        outbound: &[S],
        inbound: &[T],
        diag: &mut Diagnostics,
    ) -> LicompatResult<CompatibilityReport> {
        let outbound = self.parse(outbound)?;
        let inbound = self.prepare(&self.parse(inbound)?);
        let report = self.evaluator().check(&outbound, &inbound, diag);
        tracing::info!(
            "'{}' as outbound for '{}': {}",
            report.outbound,
            report.inbound,
            report.verdict
        );
        Ok(report)
    }

    pub fn suggest_outbound<S: AsRef<str>>(
        &self,
        inbound: &[S],
        diag: &mut Diagnostics,
    ) -> LicompatResult<OutboundReport> {
        let inbound = self.prepare(&self.parse(inbound)?);
        Ok(self.suggest_for(&inbound, diag))
    }

    /// Outbound suggestion for an already-prepared expression
    pub fn suggest_for(&self, inbound: &Expression, diag: &mut Diagnostics) -> OutboundReport {
        let pool = self.candidate_pool();
        let suggestion = suggest_outbound(&self.evaluator(), inbound, &pool, diag);
        let chosen = self.chooser.choose(&suggestion.candidates);
        OutboundReport {
            inbound: suggestion.inbound,
            extended: pool == CandidatePool::Extended,
            candidates: suggestion.candidates,
            chosen,
            evaluations: suggestion.evaluations,
            problems: diag.problems().to_vec(),
        }
    }

    /// Direct matrix query; fails on licenses outside the matrix
    pub fn check_pair(&self, outbound: &str, inbound: &str) -> LicompatResult<PairVerdict> {
        let outbound = self.aliases.resolve_id(&Expression::parse_atom(outbound)?);
        let inbound = self.aliases.resolve_id(&Expression::parse_atom(inbound)?);
        let verdict = self.matrix.check(outbound.as_str(), inbound.as_str())?;
        Ok(PairVerdict {
            outbound,
            inbound,
            verdict,
        })
    }

    /// Pairwise verdicts among `licenses`, or among every matrix license
    /// when the list is empty
    pub fn compatibility_table<S: AsRef<str>>(
        &self,
        licenses: &[S],
    ) -> LicompatResult<CompatibilityTable> {
        let licenses: Vec<LicenseId> = if licenses.is_empty() {
            self.supported_licenses()
        } else {
            let mut ids = Vec::new();
            for text in licenses {
                let expr = Expression::parse(text.as_ref())?;
                ids.extend(
                    normalize::licenses(&expr)
                        .iter()
                        .map(|id| self.aliases.resolve_id(id)),
                );
            }
            sort_case_insensitive(&mut ids);
            ids.dedup();
            ids
        };

        let mut pairs = Vec::with_capacity(licenses.len() * licenses.len());
        for outbound in &licenses {
            for inbound in &licenses {
                pairs.push(self.check_pair(outbound.as_str(), inbound.as_str())?);
            }
        }
        Ok(CompatibilityTable { licenses, pairs })
    }

    pub fn verify_project_file(
        &self,
        path: &Path,
        diag: &mut Diagnostics,
    ) -> LicompatResult<ProjectVerification> {
        let project = Project::from_file(path)?;
        self.verify_project(&project, diag)
    }

    pub fn verify_project(
        &self,
        project: &Project,
        diag: &mut Diagnostics,
    ) -> LicompatResult<ProjectVerification> {
        crate::project::verify(self, project, diag)
    }

    pub fn policy_report<S: AsRef<str>>(
        &self,
        inbound: &[S],
        diag: &mut Diagnostics,
    ) -> LicompatResult<PolicyCheck> {
        let inbound = self.prepare(&self.parse(inbound)?);
        // Policy classifies every compatible candidate, denied ones included
        let pool = self.candidate_pool();
        let evaluator = Evaluator::new(&self.matrix, &self.aliases);
        let suggestion = suggest_outbound(&evaluator, &inbound, &pool, diag);
        let policy = self.policy.report(&suggestion.candidates);
        Ok(PolicyCheck {
            inbound: suggestion.inbound,
            candidates: suggestion.candidates,
            policy,
        })
    }
}

impl std::fmt::Debug for CompatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatEngine")
            .field("config", &self.config)
            .field("licenses", &self.matrix.licenses().len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

/// Wrap an expression error with the package it came from
pub(crate) fn in_package(package: &str, err: LicompatError) -> LicompatError {
    match err {
        LicompatError::InvalidExpression(msg) => {
            LicompatError::InvalidProject(format!("package '{}': {}", package, msg))
        }
        other => other,
    }
}
