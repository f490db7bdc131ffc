//! Pure predicates that gate every install.
//!
//! The checks run in a fixed order and the first failure wins:
//!
//! 1. existence / version ([`check_installable`])
//! 2. framework compatibility ([`check_framework_compatible`])
//! 3. attribute presence ([`check_attribute_present`])
//! 4. attribute clash ([`check_attribute_free`])
//!
//! None of these touch the store or the filesystem.

use std::cmp::Ordering;

use crate::error::PolicyError;
use crate::record::PluginRecord;
use crate::version::{VersionConstraint, parse_version};

/// The metadata of a plugin about to be installed.
#[derive(Debug, Clone, Copy)]
pub struct InstallCandidate<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub framework_constraint: &'a str,
    pub target_attribute: Option<&'a str>,
}

/// Fail with `AlreadyExists` when `candidate_version` is not newer than the
/// installed one, unless `force` is set.
///
/// `force` lets any version through, including equal and lower ones. When
/// either version cannot be parsed the candidate never counts as newer.
pub fn check_installable(
    existing: Option<&PluginRecord>,
    candidate_version: &str,
    force: bool,
) -> Result<(), PolicyError> {
    let Some(existing) = existing else {
        return Ok(());
    };
    if force || is_newer(candidate_version, &existing.version) {
        return Ok(());
    }

    Err(PolicyError::AlreadyExists {
        name: existing.name.clone(),
        installed: existing.version.clone(),
        candidate: candidate_version.to_string(),
    })
}

/// Whether `candidate` is strictly greater than `installed`.
pub fn is_newer(candidate: &str, installed: &str) -> bool {
    match (parse_version(candidate), parse_version(installed)) {
        (Ok(c), Ok(i)) => c.cmp(&i) == Ordering::Greater,
        _ => false,
    }
}

/// Fail with `Incompatible` when the running framework version does not
/// satisfy `constraint`. An unparseable range is never satisfied.
pub fn check_framework_compatible(
    name: &str,
    constraint: &str,
    framework_version: &str,
) -> Result<(), PolicyError> {
    let satisfied = VersionConstraint::parse(constraint)
        .map(|c| c.satisfies(framework_version))
        .unwrap_or(false);

    if satisfied {
        Ok(())
    } else {
        Err(PolicyError::Incompatible {
            name: name.to_string(),
            constraint: constraint.to_string(),
            framework: framework_version.to_string(),
        })
    }
}

/// Fail with `AttributeMissing` when no non-blank target attribute is declared.
pub fn check_attribute_present(name: &str, target_attribute: Option<&str>) -> Result<(), PolicyError> {
    match target_attribute {
        Some(attr) if !attr.trim().is_empty() => Ok(()),
        _ => Err(PolicyError::AttributeMissing {
            name: name.to_string(),
        }),
    }
}

/// Fail with `AttributeClash` when a record other than `claimant` already
/// holds `target_attribute`.
pub fn check_attribute_free(
    target_attribute: &str,
    claimant: &str,
    records: &[PluginRecord],
) -> Result<(), PolicyError> {
    match records
        .iter()
        .find(|r| r.target_attribute == target_attribute && r.name != claimant)
    {
        Some(owner) => Err(PolicyError::AttributeClash {
            attribute: target_attribute.to_string(),
            owner: owner.name.clone(),
            claimant: claimant.to_string(),
        }),
        None => Ok(()),
    }
}

/// Run every install check in order, stopping at the first failure.
pub fn check_install(
    candidate: &InstallCandidate<'_>,
    records: &[PluginRecord],
    framework_version: &str,
    force: bool,
) -> Result<(), PolicyError> {
    let existing = records.iter().find(|r| r.name == candidate.name);

    check_installable(existing, candidate.version, force)?;
    check_framework_compatible(candidate.name, candidate.framework_constraint, framework_version)?;
    check_attribute_present(candidate.name, candidate.target_attribute)?;
    if let Some(attr) = candidate.target_attribute {
        check_attribute_free(attr, candidate.name, records)?;
    }

    Ok(())
}
