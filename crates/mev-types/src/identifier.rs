//! Normalization of free-text names into safe identifiers.
//!
//! Surrounding whitespace is trimmed and every internal whitespace run becomes a
//! single underscore. The result must be non-empty ASCII made of letters,
//! digits, `_`, `-`, `.` and `:`. Anything else (including any non-ASCII
//! character) is rejected, since downstream consumers are ASCII-oriented.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::{MevError, Result};

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("constant regex"))
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.:\-]+$").expect("constant regex"))
}

/// Normalize `raw` into an identifier, or fail with [`MevError::StringIdentifier`].
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MevError::StringIdentifier {
            raw: raw.to_string(),
            reason: "identifier is empty".into(),
        });
    }

    let candidate = whitespace_re().replace_all(trimmed, "_");
    if !candidate.is_ascii() {
        return Err(MevError::StringIdentifier {
            raw: raw.to_string(),
            reason: "only ASCII characters are permitted".into(),
        });
    }
    if !identifier_re().is_match(&candidate) {
        return Err(MevError::StringIdentifier {
            raw: raw.to_string(),
            reason: "only letters, numbers, and the characters '_', '-', '.', ':' are permitted"
                .into(),
        });
    }

    Ok(candidate.into_owned())
}

/// Normalize a JSON value; anything that is not a JSON string is rejected.
pub fn normalize_value(raw: &Value) -> Result<String> {
    match raw {
        Value::String(s) => normalize(s),
        other => Err(MevError::StringIdentifier {
            raw: other.to_string(),
            reason: "identifier must be a string".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn internal_whitespace_becomes_underscore() {
        assert_eq!(normalize("9a 9").unwrap(), "9a_9");
        assert_eq!(normalize("a \t b").unwrap(), "a_b");
    }

    #[test]
    fn colon_is_permitted() {
        assert_eq!(normalize("Unnamed: 5").unwrap(), "Unnamed:_5");
    }

    #[test]
    fn leading_dot_is_permitted() {
        assert_eq!(normalize(".abc").unwrap(), ".abc");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(normalize("  gene-1.2  ").unwrap(), "gene-1.2");
    }

    #[test]
    fn non_ascii_is_rejected() {
        let err = normalize("9教育漢字").unwrap_err();
        assert!(matches!(err, MevError::StringIdentifier { .. }));
    }

    #[test]
    fn punctuation_is_rejected() {
        assert!(normalize("a?bc").is_err());
        assert!(normalize("a/b").is_err());
    }

    #[test]
    fn empty_is_rejected() {
        assert!(normalize("").is_err());
        assert!(normalize("   ").is_err());
    }

    #[test]
    fn non_string_values_are_rejected() {
        assert!(normalize_value(&json!(5)).is_err());
        assert!(normalize_value(&json!(null)).is_err());
        assert_eq!(normalize_value(&json!("sample A")).unwrap(), "sample_A");
    }
}
