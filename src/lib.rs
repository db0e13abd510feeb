//! # licompat: License Compatibility Engine
//!
//! Decides whether combining components under different licenses yields a
//! consistent combined work, and suggests outbound licenses for it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CompatEngine                          │
//! │  ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐   │
//! │  │ Alias    │  │Relicense │  │  Matrix   │  │  Policy    │   │
//! │  │ Resolver │  │ (expand) │  │ (CSV)     │  │ allow/deny │   │
//! │  └────┬─────┘  └────┬─────┘  └─────┬─────┘  └─────┬──────┘   │
//! │       │             │              │              │          │
//! │  text ─► Parser ─► Expression ─► Evaluator ─► annotated tree │
//! │                      │                 ▲                     │
//! │                      ▼                 │                     │
//! │               Normalizer (DNF)   Outbound Selector (rayon)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capabilities
//!
//! - **Expression parsing**: `AND`/`OR`/`WITH`, nested parentheses, legacy comma separators
//! - **Normalization**: simplification and disjunctive set lists with an explosion threshold
//! - **Evaluation**: AND/OR aggregation over a static compatibility matrix with a proof tree
//! - **Outbound suggestion**: every compatible outbound candidate plus a preference chooser
//! - **Project verification**: dependency trees from JSON manifests
//! - **Policy**: allow/avoid/deny lists applied to the suggested outbound licenses

pub mod license;
pub mod policy;
pub mod project;
pub mod engine;
pub mod report;

// Re-exports for convenience
pub use license::{LicenseFamily, LicenseId};
pub use license::matrix::{CompatibilityMatrix, Verdict};
pub use license::expression::{Expression, Operator};
pub use license::evaluator::{EvaluatedNode, Evaluation, Evaluator, Problem};
pub use engine::{CompatConfig, CompatEngine, Diagnostics};
pub use policy::{PolicyConfig, PolicyEngine};
pub use report::{render_report, Report, ReportFormat};

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LicompatError {
    #[error("Invalid license expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid alias file: {0}")]
    InvalidAliasFile(String),

    #[error("Invalid license preference: {0}")]
    InvalidLicensePreference(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Unsupported license: {0}")]
    UnsupportedLicense(String),

    #[error("Too many combinations: {count} exceeds threshold {threshold}")]
    TooManyCombinations { count: u64, threshold: u64 },

    #[error("Compatibility matrix error: {0}")]
    MatrixError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

pub type LicompatResult<T> = Result<T, LicompatError>;

/// Coarse error classification surfaced to CLI users as an exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidExpression,
    InvalidProject,
    FileNotFound,
    InvalidAliasFile,
    InvalidLicensePreference,
    InvalidPolicy,
    UnsupportedLicense,
    InternalError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::InvalidExpression,
        ErrorKind::InvalidProject,
        ErrorKind::FileNotFound,
        ErrorKind::InvalidAliasFile,
        ErrorKind::InvalidLicensePreference,
        ErrorKind::InvalidPolicy,
        ErrorKind::UnsupportedLicense,
        ErrorKind::InternalError,
    ];

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidExpression => 10,
            Self::InvalidProject => 11,
            Self::FileNotFound => 12,
            Self::InvalidAliasFile => 13,
            Self::InvalidLicensePreference => 14,
            Self::InvalidPolicy => 15,
            Self::UnsupportedLicense => 16,
            Self::InternalError => 20,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidExpression => "license expression could not be parsed",
            Self::InvalidProject => "project manifest is malformed",
            Self::FileNotFound => "an input or data file does not exist",
            Self::InvalidAliasFile => "alias or relicense file is malformed",
            Self::InvalidLicensePreference => "license preference list is invalid",
            Self::InvalidPolicy => "policy file is malformed",
            Self::UnsupportedLicense => "license is not known to the compatibility matrix",
            Self::InternalError => "internal error (bad matrix or engine config, too many combinations)",
        }
    }

    /// Static table of exit codes, as shown in `--help`
    pub fn help_table() -> String {
        let mut out = String::from("Exit codes:\n   0  success\n");
        for kind in Self::ALL {
            out.push_str(&format!("  {:>2}  {}\n", kind.exit_code(), kind.description()));
        }
        out
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl LicompatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidExpression(_) => ErrorKind::InvalidExpression,
            Self::InvalidProject(_) => ErrorKind::InvalidProject,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::InvalidAliasFile(_) => ErrorKind::InvalidAliasFile,
            Self::InvalidLicensePreference(_) => ErrorKind::InvalidLicensePreference,
            Self::InvalidPolicy(_) => ErrorKind::InvalidPolicy,
            Self::UnsupportedLicense(_) => ErrorKind::UnsupportedLicense,
            Self::TooManyCombinations { .. }
            | Self::MatrixError(_)
            | Self::Internal(_)
            | Self::Io(_)
            | Self::SerdeError(_)
            | Self::ConfigError(_) => ErrorKind::InternalError,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

/// Read a data file, mapping a missing path to `FileNotFound`
pub(crate) fn read_data_file(path: &std::path::Path) -> LicompatResult<String> {
    if !path.exists() {
        return Err(LicompatError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let mut codes: Vec<i32> = ErrorKind::ALL.iter().map(|k| k.exit_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_error_kind_mapping() {
        let err = LicompatError::TooManyCombinations { count: 20_000, threshold: 10_000 };
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(err.exit_code(), 20);
        assert_eq!(
            LicompatError::InvalidExpression("x".into()).exit_code(),
            10
        );
    }

    #[test]
    fn test_config_error_is_not_a_policy_error() {
        let err: LicompatError = toml::from_str::<toml::Value>("threshold = ")
            .unwrap_err()
            .into();
        assert!(matches!(err, LicompatError::ConfigError(_)));
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(err.exit_code(), 20);
    }

    #[test]
    fn test_help_table_lists_every_kind() {
        let table = ErrorKind::help_table();
        for kind in ErrorKind::ALL {
            assert!(table.contains(kind.description()));
        }
    }
}
