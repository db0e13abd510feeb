//! License identifiers, expression handling and compatibility evaluation
//!
//! Leaf-first: `matrix` and `alias` are lookup tables loaded once per
//! process; `expression` parses text into a tree; `normalize` turns trees
//! into set lists; `evaluator` walks trees against the matrix; `outbound`
//! iterates candidate outbound licenses through the evaluator.

pub mod matrix;
pub mod alias;
pub mod expression;
pub mod normalize;
pub mod evaluator;
pub mod outbound;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator that folds a license and its exception into one atom
pub const WITH_SEPARATOR: &str = " WITH ";

// ─── License Identity ───────────────────────────────────────────────

/// Canonical license identifier (SPDX where possible)
///
/// `X WITH Y` exception clauses are stored as a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LicenseId(pub String);

impl LicenseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The license part of an `X WITH Y` atom, or the whole identifier
    pub fn base(&self) -> &str {
        match self.0.split_once(WITH_SEPARATOR) {
            Some((base, _)) => base,
            None => &self.0,
        }
    }

    /// The exception part of an `X WITH Y` atom
    pub fn exception(&self) -> Option<&str> {
        self.0.split_once(WITH_SEPARATOR).map(|(_, exc)| exc)
    }

    pub fn family(&self) -> LicenseFamily {
        LicenseFamily::from_spdx(self.base())
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LicenseId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Case-insensitive ordering used for every user-visible license list
pub fn sort_case_insensitive(ids: &mut [LicenseId]) {
    ids.sort_by(|a, b| {
        a.as_str()
            .to_lowercase()
            .cmp(&b.as_str().to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

// ─── License Families ───────────────────────────────────────────────

/// Broad license classification, used to rank outbound candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseFamily {
    /// Unlicense, CC0, 0BSD: public domain equivalent
    PublicDomain,
    /// MIT, BSD, ISC, Zlib: few obligations beyond attribution
    Permissive,
    /// Apache 2.0: permissive with patent grant
    PermissivePatent,
    /// LGPL, MPL, EPL: modified files must be disclosed
    WeakCopyleft,
    /// GPL: derivative works must use the same license
    StrongCopyleft,
    /// AGPL, SSPL: copyleft that reaches across network boundaries
    NetworkCopyleft,
    /// Proprietary, commercial, all-rights-reserved
    Proprietary,
    /// Anything else
    Custom,
}

impl LicenseFamily {
    pub fn is_copyleft(&self) -> bool {
        matches!(
            self,
            Self::StrongCopyleft | Self::WeakCopyleft | Self::NetworkCopyleft
        )
    }

    pub fn is_permissive(&self) -> bool {
        matches!(
            self,
            Self::Permissive | Self::PermissivePatent | Self::PublicDomain
        )
    }

    /// Lower is preferred when choosing an outbound license
    pub fn preference_rank(&self) -> u8 {
        match self {
            Self::PublicDomain => 0,
            Self::Permissive => 1,
            Self::PermissivePatent => 2,
            Self::WeakCopyleft => 3,
            Self::StrongCopyleft => 4,
            Self::NetworkCopyleft => 5,
            Self::Custom => 6,
            Self::Proprietary => 7,
        }
    }

    /// Determine family from SPDX identifier
    pub fn from_spdx(spdx: &str) -> Self {
        // Normalize: strip -only/-or-later/+ suffixes for family classification
        let upper = spdx.trim().to_uppercase();
        let normalized = upper
            .trim_end_matches("-ONLY")
            .trim_end_matches("-OR-LATER")
            .trim_end_matches('+');

        match normalized {
            // ── Network copyleft ──
            s if s.starts_with("AGPL-") || s == "AGPL" => Self::NetworkCopyleft,
            s if s.contains("SSPL") => Self::NetworkCopyleft,
            s if s.starts_with("OSL-") => Self::NetworkCopyleft,

            // ── Weak copyleft (before GPL: "LGPL-" contains "GPL-") ──
            s if s.starts_with("LGPL-") || s == "LGPL" => Self::WeakCopyleft,
            s if s.starts_with("MPL-") || s == "MPL" => Self::WeakCopyleft,
            s if s.starts_with("EPL-") || s == "EPL" => Self::WeakCopyleft,
            s if s.starts_with("EUPL-") || s.starts_with("CDDL-") => Self::WeakCopyleft,

            // ── Strong copyleft ──
            s if s.starts_with("GPL-") || s == "GPL" => Self::StrongCopyleft,
            s if s == "SLEEPYCAT" || s == "RPL-1.5" => Self::StrongCopyleft,

            // ── Permissive ──
            // BSL-1.0 is Boost (permissive), not Business Source
            s if s.starts_with("BSL-1") => Self::Permissive,
            s if s.starts_with("APACHE-") || s == "APACHE" => Self::PermissivePatent,
            s if s.starts_with("MIT") || s == "X11" || s == "ISC" => Self::Permissive,
            s if s.starts_with("BSD-") || s == "BSD" => Self::Permissive,
            s if s == "ZLIB" || s == "LIBPNG" || s == "CURL" => Self::Permissive,
            s if s.starts_with("ARTISTIC-") || s == "POSTGRESQL" => Self::Permissive,

            // ── Public domain ──
            s if s == "UNLICENSE" || s == "CC0-1.0" || s == "0BSD" || s == "WTFPL" => {
                Self::PublicDomain
            }

            // ── Proprietary ──
            s if s.contains("PROPRIETARY") || s.contains("ALL-RIGHTS-RESERVED") => {
                Self::Proprietary
            }

            _ => Self::Custom,
        }
    }
}

impl fmt::Display for LicenseFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicDomain => write!(f, "Public Domain"),
            Self::Permissive => write!(f, "Permissive (MIT/BSD/ISC)"),
            Self::PermissivePatent => write!(f, "Permissive + Patent (Apache)"),
            Self::WeakCopyleft => write!(f, "Weak Copyleft (LGPL/MPL)"),
            Self::StrongCopyleft => write!(f, "Strong Copyleft (GPL)"),
            Self::NetworkCopyleft => write!(f, "Network Copyleft (AGPL)"),
            Self::Proprietary => write!(f, "Proprietary"),
            Self::Custom => write!(f, "Custom/Unknown"),
        }
    }
}
