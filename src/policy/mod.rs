//! Policy engine: allow/avoid/deny lists for outbound licenses
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! allowlist = ["MIT", "Apache-2.0", "BSD-3-Clause"]
//! avoidlist = ["GPL-3.0-only"]
//! denylist = ["AGPL-3.0-only"]
//! ```
//!
//! The denylist also feeds the evaluator's `allowed` annotation, so denied
//! inbound licenses can only pass through an `OR` with an allowed sibling.
//! List entries may use alias spellings; `resolve_aliases` maps them onto
//! the identifiers the evaluator produces.

use crate::license::alias::AliasResolver;
use crate::license::LicenseId;
use crate::{LicompatError, LicompatResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Project-level policy configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Licenses that may be used. Empty means "anything not denied".
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Licenses that may be used but should be avoided
    #[serde(default)]
    pub avoidlist: Vec<String>,

    /// Licenses that must not be used
    #[serde(default)]
    pub denylist: Vec<String>,
}

/// Policy classification of a single license
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PolicyOutcome {
    Allowed,
    Avoid,
    Denied,
}

impl fmt::Display for PolicyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Avoid => write!(f, "avoid"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub license: LicenseId,
    pub outcome: PolicyOutcome,
}

/// Outbound candidates classified by policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub entries: Vec<PolicyEntry>,
    pub allowed: Vec<LicenseId>,
    pub avoided: Vec<LicenseId>,
    pub denied: Vec<LicenseId>,
    /// Allowed if any candidate is allowed, else Avoid if any is avoided
    pub outcome: PolicyOutcome,
}

/// Applies a `PolicyConfig` to license identifiers
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
    allow_set: HashSet<String>,
    avoid_set: HashSet<String>,
    deny_set: HashSet<String>,
}

impl PolicyEngine {
    /// Load policy from a TOML file
    pub fn from_file(path: &Path) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        let engine = Self::from_toml_str(&content)?;
        tracing::info!("Loaded policy from {}", path.display());
        Ok(engine)
    }

    pub fn from_toml_str(content: &str) -> LicompatResult<Self> {
        let config: PolicyConfig = toml::from_str(content)
            .map_err(|e| LicompatError::InvalidPolicy(e.to_string()))?;
        Self::new(config)
    }

    pub fn new(config: PolicyConfig) -> LicompatResult<Self> {
        Self::build(config, |l| l.to_string())
    }

    /// Rebuild with every list entry alias-resolved, then re-validate
    pub fn resolve_aliases(&self, aliases: &AliasResolver) -> LicompatResult<Self> {
        Self::build(self.config.clone(), |l| aliases.resolve(l))
    }

    fn build<F>(config: PolicyConfig, resolve: F) -> LicompatResult<Self>
    where
        F: Fn(&str) -> String,
    {
        let to_set = |list: &[String]| -> HashSet<String> {
            list.iter().map(|l| resolve(l.trim())).collect()
        };
        let allow_set = to_set(&config.allowlist);
        let avoid_set = to_set(&config.avoidlist);
        let deny_set = to_set(&config.denylist);

        if let Some(both) = deny_set.intersection(&allow_set).next() {
            return Err(LicompatError::InvalidPolicy(format!(
                "'{}' is both allowed and denied",
                both
            )));
        }
        if let Some(both) = deny_set.intersection(&avoid_set).next() {
            return Err(LicompatError::InvalidPolicy(format!(
                "'{}' is both avoided and denied",
                both
            )));
        }

        Ok(Self {
            config,
            allow_set,
            avoid_set,
            deny_set,
        })
    }

    pub fn is_denied(&self, license: &LicenseId) -> bool {
        self.deny_set.contains(license.as_str())
    }

    pub fn is_avoided(&self, license: &LicenseId) -> bool {
        self.avoid_set.contains(license.as_str())
    }

    /// Empty allowlist allows everything not denied
    pub fn is_allowed(&self, license: &LicenseId) -> bool {
        !self.is_denied(license)
            && (self.allow_set.is_empty() || self.allow_set.contains(license.as_str()))
    }

    pub fn classify(&self, license: &LicenseId) -> PolicyOutcome {
        if self.is_denied(license) {
            PolicyOutcome::Denied
        } else if self.is_avoided(license) {
            PolicyOutcome::Avoid
        } else if self.is_allowed(license) {
            PolicyOutcome::Allowed
        } else {
            PolicyOutcome::Denied
        }
    }

    /// Classify outbound candidates and derive an overall outcome
    pub fn report(&self, candidates: &[LicenseId]) -> PolicyReport {
        let mut entries = Vec::with_capacity(candidates.len());
        let mut allowed = Vec::new();
        let mut avoided = Vec::new();
        let mut denied = Vec::new();

        for license in candidates {
            let outcome = self.classify(license);
            match outcome {
                PolicyOutcome::Allowed => allowed.push(license.clone()),
                PolicyOutcome::Avoid => avoided.push(license.clone()),
                PolicyOutcome::Denied => denied.push(license.clone()),
            }
            entries.push(PolicyEntry {
                license: license.clone(),
                outcome,
            });
        }

        let outcome = if !allowed.is_empty() {
            PolicyOutcome::Allowed
        } else if !avoided.is_empty() {
            PolicyOutcome::Avoid
        } else {
            PolicyOutcome::Denied
        };

        PolicyReport {
            entries,
            allowed,
            avoided,
            denied,
            outcome,
        }
    }

    pub fn denylist(&self) -> &[String] {
        &self.config.denylist
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}
