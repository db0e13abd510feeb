//! Alias resolution and later-version relicensing
//!
//! Both tables are plain string substitutions applied to license atoms
//! before any matrix lookup:
//!
//! - `AliasResolver` maps non-canonical spellings (`GPLv2`, `Expat`) to
//!   matrix identifiers.
//! - `Relicenser` expands "or later" licenses into an `OR` over the
//!   versions they permit (`GPL-2.0-or-later` → `GPL-2.0-only OR GPL-3.0-only`).

use super::expression::Expression;
use super::{LicenseId, WITH_SEPARATOR};
use crate::{LicompatError, LicompatResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_ALIASES: &str = include_str!("../../data/aliases.json");
const BUILTIN_RELICENSE: &str = include_str!("../../data/relicense.json");

// ─── Aliases ────────────────────────────────────────────────────────

/// One `{alias, license}` pair from the alias file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub license: String,
}

#[derive(Debug, Deserialize)]
struct AliasFile {
    aliases: Vec<AliasEntry>,
}

/// Exact-match alias table
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    map: HashMap<String, String>,
}

impl AliasResolver {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> LicompatResult<Self> {
        Self::from_json_str(BUILTIN_ALIASES)
    }

    pub fn from_file(path: &Path) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        let resolver = Self::from_json_str(&content)?;
        tracing::info!("Loaded {} aliases from {}", resolver.map.len(), path.display());
        Ok(resolver)
    }

    pub fn from_json_str(content: &str) -> LicompatResult<Self> {
        let file: AliasFile = serde_json::from_str(content)
            .map_err(|e| LicompatError::InvalidAliasFile(e.to_string()))?;
        Self::from_entries(file.aliases)
    }

    pub fn from_entries(entries: Vec<AliasEntry>) -> LicompatResult<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let alias = entry.alias.trim();
            let license = entry.license.trim();
            if alias.is_empty() || license.is_empty() {
                return Err(LicompatError::InvalidAliasFile(format!(
                    "empty alias or license in entry {:?}",
                    entry
                )));
            }
            if let Some(prev) = map.insert(alias.to_string(), license.to_string()) {
                if prev != license {
                    tracing::warn!(
                        "Alias '{}' redefined: '{}' replaced by '{}'",
                        alias,
                        prev,
                        license
                    );
                }
            }
        }
        Ok(Self { map })
    }

    /// Canonical form of one atom. `X WITH Y` resolves as a whole first,
    /// then by its license part.
    pub fn resolve(&self, token: &str) -> String {
        if let Some(canonical) = self.map.get(token) {
            return canonical.clone();
        }
        if let Some((base, exception)) = token.split_once(WITH_SEPARATOR) {
            if let Some(canonical) = self.map.get(base) {
                return format!("{}{}{}", canonical, WITH_SEPARATOR, exception);
            }
        }
        token.to_string()
    }

    pub fn resolve_id(&self, id: &LicenseId) -> LicenseId {
        LicenseId::new(self.resolve(id.as_str()))
    }

    /// Resolve every leaf of an expression into a new tree
    pub fn resolve_expression(&self, expr: &Expression) -> Expression {
        expr.map_leaves(&|id| Expression::License {
            name: self.resolve_id(id),
        })
    }

    /// True when both spellings resolve to the same identifier
    pub fn same_or_alias(&self, a: &str, b: &str) -> bool {
        self.resolve(a) == self.resolve(b)
    }

    /// All entries, sorted by alias
    pub fn entries(&self) -> Vec<AliasEntry> {
        let mut entries: Vec<AliasEntry> = self
            .map
            .iter()
            .map(|(alias, license)| AliasEntry {
                alias: alias.clone(),
                license: license.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.alias.cmp(&b.alias));
        entries
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ─── Relicensing ────────────────────────────────────────────────────

/// One relicensing rule: `license` may be used under any of `later`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelicenseEntry {
    pub license: String,
    pub later: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RelicenseFile {
    relicense: Vec<RelicenseEntry>,
}

/// Later-version expansion table
#[derive(Debug, Clone, Default)]
pub struct Relicenser {
    map: HashMap<String, Vec<LicenseId>>,
}

impl Relicenser {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> LicompatResult<Self> {
        Self::from_json_str(BUILTIN_RELICENSE)
    }

    pub fn from_file(path: &Path) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        let relicenser = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded {} relicense rules from {}",
            relicenser.map.len(),
            path.display()
        );
        Ok(relicenser)
    }

    pub fn from_json_str(content: &str) -> LicompatResult<Self> {
        let file: RelicenseFile = serde_json::from_str(content)
            .map_err(|e| LicompatError::InvalidAliasFile(e.to_string()))?;

        let mut map = HashMap::with_capacity(file.relicense.len());
        for entry in file.relicense {
            if entry.later.is_empty() {
                return Err(LicompatError::InvalidAliasFile(format!(
                    "relicense rule for '{}' lists no licenses",
                    entry.license
                )));
            }
            let later = entry.later.iter().map(|l| LicenseId::new(l.trim())).collect();
            map.insert(entry.license.trim().to_string(), later);
        }
        Ok(Self { map })
    }

    /// Alternatives for one atom, if a rule applies
    pub fn alternatives(&self, id: &LicenseId) -> Option<Vec<LicenseId>> {
        if let Some(later) = self.map.get(id.as_str()) {
            return Some(later.clone());
        }
        let exception = id.exception()?;
        self.map.get(id.base()).map(|later| {
            later
                .iter()
                .map(|l| LicenseId::new(format!("{}{}{}", l, WITH_SEPARATOR, exception)))
                .collect()
        })
    }

    /// Replace every relicensable leaf with an `OR` over its alternatives
    pub fn expand(&self, expr: &Expression) -> Expression {
        self.expand_resolved(expr, &AliasResolver::empty())
    }

    /// Like `expand`, but rules are matched on the alias-resolved atom.
    /// Leaves without a rule keep their original spelling.
    pub fn expand_resolved(&self, expr: &Expression, aliases: &AliasResolver) -> Expression {
        expr.map_leaves(&|id| match self.alternatives(&aliases.resolve_id(id)) {
            Some(mut later) if later.len() == 1 => Expression::License {
                name: later.remove(0),
            },
            Some(later) => Expression::or(
                later
                    .into_iter()
                    .map(|name| Expression::License { name })
                    .collect(),
            ),
            None => Expression::License { name: id.clone() },
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
