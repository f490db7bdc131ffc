//! Plugin name validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[a-z0-9][a-z0-9._-]*/)?[a-z0-9][a-z0-9._-]*$")
        .expect("Invalid plugin name regex")
});

/// Longest name the package registry accepts.
const MAX_NAME_LEN: usize = 214;

/// Check that `name` is a valid registry package name.
///
/// Names are lowercase, start with a letter or digit, and may carry an
/// `@scope/` prefix.
pub fn validate_plugin_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 214 characters"));
    }
    if name != name.trim() {
        return Err(invalid("name has leading or trailing whitespace"));
    }
    if !NAME_RE.is_match(name) {
        return Err(invalid(
            "must be lowercase and contain only letters, digits, '.', '_' or '-'",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("adapt-contrib-text")]
    #[case("adapt.theme_vanilla")]
    #[case("@scope/plugin")]
    #[case("0plugin")]
    fn test_valid_names(#[case] name: &str) {
        validate_plugin_name(name).unwrap();
    }

    #[rstest]
    #[case("")]
    #[case("Adapt-Contrib")]
    #[case("-leading-dash")]
    #[case(" spaced")]
    #[case("has space")]
    #[case("@scope/")]
    #[case("../escape")]
    fn test_invalid_names(#[case] name: &str) {
        let err = validate_plugin_name(name).unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }), "got {err:?}");
    }

    #[test]
    fn test_too_long() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(validate_plugin_name(&name).is_err());
    }
}
