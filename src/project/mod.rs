//! Project verification: license compatibility across a dependency tree
//!
//! Manifest format (JSON), optionally wrapped in `{"project": ...}`:
//!
//! ```json
//! {
//!   "name": "app", "version": "1.0", "license": "GPL-2.0-only",
//!   "dependencies": [
//!     { "name": "libfoo", "license": "MIT OR Apache-2.0", "dependencies": [] }
//!   ]
//! }
//! ```
//!
//! Each package's own license is checked as the outbound license against
//! every direct dependency's license. A package is compatible when all of
//! those checks pass and every dependency is itself compatible.
//!
//! The root's combined expression (`own AND dep₁ AND dep₂ ...`, recursively)
//! is what outbound suggestions are computed for. Its combination count is
//! checked against the threshold before anything is evaluated.

use crate::engine::{in_package, CompatEngine, Diagnostics};
use crate::license::evaluator::Problem;
use crate::license::expression::Expression;
use crate::license::matrix::Verdict;
use crate::license::normalize;
use crate::license::LicenseId;
use crate::{LicompatError, LicompatResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One package in the manifest tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub license: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Package>,
}

/// A parsed project manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub root: Package,
}

impl Project {
    pub fn from_file(path: &Path) -> LicompatResult<Self> {
        let content = crate::read_data_file(path)?;
        let project = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded project '{}' from {} ({} packages)",
            project.root.name,
            path.display(),
            project.package_count()
        );
        Ok(project)
    }

    pub fn from_json_str(content: &str) -> LicompatResult<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| LicompatError::InvalidProject(e.to_string()))?;
        let package = match value.get("project") {
            Some(inner) => inner.clone(),
            None => value,
        };
        let root: Package = serde_json::from_value(package)
            .map_err(|e| LicompatError::InvalidProject(e.to_string()))?;
        Ok(Self { root })
    }

    pub fn package_count(&self) -> usize {
        fn count(p: &Package) -> usize {
            1 + p.dependencies.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

/// Outcome of checking a package's license against one direct dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyCheck {
    pub name: String,
    pub license: String,
    pub verdict: Verdict,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVerification {
    pub name: String,
    pub version: Option<String>,
    pub license: String,
    pub compatible: bool,
    pub checks: Vec<DependencyCheck>,
    pub dependencies: Vec<PackageVerification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectVerification {
    pub project: String,
    pub compatible: bool,
    /// Combined expression of the whole tree
    pub combined: String,
    pub combinations: u64,
    pub outbound_candidates: Vec<LicenseId>,
    pub chosen: Option<LicenseId>,
    pub root: PackageVerification,
    pub problems: Vec<Problem>,
}

/// Own license AND every dependency's combined expression, prepared
fn combined_expression(engine: &CompatEngine, package: &Package) -> LicompatResult<Expression> {
    let own = own_expression(engine, package)?;
    if package.dependencies.is_empty() {
        return Ok(own);
    }
    let mut operands = vec![own];
    for dep in &package.dependencies {
        operands.push(combined_expression(engine, dep)?);
    }
    Ok(normalize::simplify(&Expression::and(operands)))
}

/// The package's declared license as parsed, used on the outbound side
fn declared_expression(package: &Package) -> LicompatResult<Expression> {
    if package.name.trim().is_empty() {
        return Err(LicompatError::InvalidProject("package without a name".into()));
    }
    Expression::parse(&package.license).map_err(|e| in_package(&package.name, e))
}

/// The declared license with "or later" expansion, used on the inbound side
fn own_expression(engine: &CompatEngine, package: &Package) -> LicompatResult<Expression> {
    Ok(engine.prepare(&declared_expression(package)?))
}

fn verify_package(
    engine: &CompatEngine,
    package: &Package,
    diag: &mut Diagnostics,
) -> LicompatResult<PackageVerification> {
    let outbound = declared_expression(package)?;
    let evaluator = engine.evaluator();

    let mut checks = Vec::with_capacity(package.dependencies.len());
    let mut dependencies = Vec::with_capacity(package.dependencies.len());
    for dep in &package.dependencies {
        let inbound = own_expression(engine, dep)?;
        let report = evaluator.check(&outbound, &inbound, diag);
        tracing::debug!(
            "{} ({}) <- {} ({}): {}",
            package.name,
            outbound,
            dep.name,
            inbound,
            report.verdict
        );
        checks.push(DependencyCheck {
            name: dep.name.clone(),
            license: dep.license.clone(),
            verdict: report.verdict,
            allowed: report.allowed,
        });
        dependencies.push(verify_package(engine, dep, diag)?);
    }

    let compatible = checks.iter().all(|c| c.verdict.is_compatible() && c.allowed)
        && dependencies.iter().all(|d| d.compatible);

    Ok(PackageVerification {
        name: package.name.clone(),
        version: package.version.clone(),
        license: package.license.clone(),
        compatible,
        checks,
        dependencies,
    })
}

/// Verify a whole project tree
pub fn verify(
    engine: &CompatEngine,
    project: &Project,
    diag: &mut Diagnostics,
) -> LicompatResult<ProjectVerification> {
    let combined = combined_expression(engine, &project.root)?;
    let combinations =
        normalize::ensure_within_threshold(&combined, engine.config().combination_threshold)?;

    let root = verify_package(engine, &project.root, diag)?;
    let outbound = engine.suggest_for(&combined, diag);

    if !root.compatible {
        tracing::warn!("Project '{}' has incompatible dependencies", project.root.name);
    }

    Ok(ProjectVerification {
        project: project.root.name.clone(),
        compatible: root.compatible,
        combined: combined.to_string(),
        combinations,
        outbound_candidates: outbound.candidates,
        chosen: outbound.chosen,
        root,
        problems: diag.problems().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "project": {
            "name": "app",
            "version": "1.0.0",
            "license": "GPL-2.0-only",
            "dependencies": [
                { "name": "liba", "license": "MIT OR Apache-2.0", "dependencies": [
                    { "name": "libc", "license": "BSD-3-Clause" }
                ]},
                { "name": "libb", "license": "LGPL-2.1-only" }
            ]
        }
    }"#;

    #[test]
    fn test_parse_wrapped_and_bare() {
        let wrapped = Project::from_json_str(PROJECT).unwrap();
        assert_eq!(wrapped.root.name, "app");
        assert_eq!(wrapped.package_count(), 4);

        let bare = Project::from_json_str(r#"{"name": "x", "license": "MIT"}"#).unwrap();
        assert!(bare.root.dependencies.is_empty());
    }

    #[test]
    fn test_malformed_project() {
        for bad in ["[1, 2]", "{\"name\": \"x\"}", "not json", "{\"project\": {\"license\": \"MIT\"}}"] {
            assert!(
                matches!(Project::from_json_str(bad), Err(LicompatError::InvalidProject(_))),
                "expected InvalidProject for {}",
                bad
            );
        }
    }

    #[test]
    fn test_verify_compatible_project() {
        let engine = CompatEngine::builtin().unwrap();
        let project = Project::from_json_str(PROJECT).unwrap();
        let mut diag = engine.diagnostics();
        let result = verify(&engine, &project, &mut diag).unwrap();
        assert!(result.compatible);
        assert_eq!(result.root.checks.len(), 2);
        assert_eq!(result.outbound_candidates, vec![LicenseId::new("GPL-2.0-only")]);
        assert_eq!(result.chosen, Some(LicenseId::new("GPL-2.0-only")));
        assert!(result.problems.is_empty());
    }

    #[test]
    fn test_verify_incompatible_dependency() {
        let engine = CompatEngine::builtin().unwrap();
        let project = Project::from_json_str(
            r#"{"name": "app", "license": "MIT", "dependencies": [
                {"name": "gpl-lib", "license": "GPL-3.0-only"}
            ]}"#,
        )
        .unwrap();
        let mut diag = engine.diagnostics();
        let result = verify(&engine, &project, &mut diag).unwrap();
        assert!(!result.compatible);
        assert_eq!(result.root.checks[0].verdict, Verdict::Incompatible);
    }

    #[test]
    fn test_nested_incompatibility_propagates() {
        let engine = CompatEngine::builtin().unwrap();
        let project = Project::from_json_str(
            r#"{"name": "app", "license": "GPL-3.0-only", "dependencies": [
                {"name": "mid", "license": "MIT", "dependencies": [
                    {"name": "leaf", "license": "GPL-2.0-only"}
                ]}
            ]}"#,
        )
        .unwrap();
        let mut diag = engine.diagnostics();
        let result = verify(&engine, &project, &mut diag).unwrap();
        assert!(result.root.checks[0].verdict.is_compatible());
        assert!(!result.root.dependencies[0].compatible);
        assert!(!result.compatible);
    }

    #[test]
    fn test_or_later_package_checked_under_own_row() {
        let engine = CompatEngine::builtin().unwrap();
        let project = Project::from_json_str(
            r#"{"name": "app", "license": "GPL-2.0-or-later", "dependencies": [
                {"name": "http", "license": "Apache-2.0"},
                {"name": "util", "license": "MIT"}
            ]}"#,
        )
        .unwrap();
        let mut diag = engine.diagnostics();
        let result = verify(&engine, &project, &mut diag).unwrap();
        assert_eq!(result.root.checks[0].verdict, Verdict::Depends);
        assert!(result.root.checks[1].verdict.is_compatible());
        assert!(!result.compatible);
    }

    #[test]
    fn test_bad_license_in_package() {
        let engine = CompatEngine::builtin().unwrap();
        let project =
            Project::from_json_str(r#"{"name": "app", "license": "MIT AND"}"#).unwrap();
        let mut diag = engine.diagnostics();
        assert!(matches!(
            verify(&engine, &project, &mut diag),
            Err(LicompatError::InvalidProject(_))
        ));
    }

    #[test]
    fn test_too_many_combinations_aborts() {
        let deps: Vec<String> = (0..16)
            .map(|i| format!(r#"{{"name": "d{}", "license": "MIT OR Apache-2.0 OR X{}"}}"#, i, i))
            .collect();
        let json = format!(
            r#"{{"name": "app", "license": "MIT", "dependencies": [{}]}}"#,
            deps.join(",")
        );
        let engine = CompatEngine::builtin().unwrap();
        let project = Project::from_json_str(&json).unwrap();
        let mut diag = engine.diagnostics();
        assert!(matches!(
            verify(&engine, &project, &mut diag),
            Err(LicompatError::TooManyCombinations { .. })
        ));
    }
}
