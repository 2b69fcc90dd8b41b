//! Validation System - Read-only template checks
//!
//! Rules produce violations; the validator runs every rule and never mutates
//! the file.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::templates::{load_template, Document, TemplateError, ID_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    ReadError,
    InvalidJson,
    MissingId,
    IdNotString,
    FilenameMismatch { expected: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadError => f.write_str("read error"),
            Self::InvalidJson => f.write_str("invalid JSON"),
            Self::MissingId => f.write_str("missing id field"),
            Self::IdNotString => f.write_str("id must be a string"),
            Self::FilenameMismatch { expected } => {
                write!(f, "filename mismatch: expected \"{}\"", expected)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub file_name: String,
    pub valid: bool,
    pub violations: Vec<Violation>,
    /// Underlying read or parse error, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationResult {
    pub fn success(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            valid: true,
            violations: vec![],
            detail: None,
        }
    }

    pub fn failure(file_name: &str, violations: Vec<Violation>) -> Self {
        Self {
            file_name: file_name.to_string(),
            valid: false,
            violations,
            detail: None,
        }
    }

    fn from_load_error(file_name: &str, err: &TemplateError) -> Self {
        let violation = if err.is_parse() {
            Violation::InvalidJson
        } else {
            Violation::ReadError
        };
        Self {
            detail: Some(err.to_string()),
            ..Self::failure(file_name, vec![violation])
        }
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, doc: &Document, file_name: &str) -> Vec<Violation>;
}

// --- Concrete Rules ---

pub struct IdPresenceRule;

impl ValidationRule for IdPresenceRule {
    fn name(&self) -> &'static str { "id_presence" }

    fn validate(&self, doc: &Document, _file_name: &str) -> Vec<Violation> {
        if doc.contains_key(ID_KEY) {
            vec![]
        } else {
            vec![Violation::MissingId]
        }
    }
}

pub struct IdTypeRule;

impl ValidationRule for IdTypeRule {
    fn name(&self) -> &'static str { "id_type" }

    fn validate(&self, doc: &Document, _file_name: &str) -> Vec<Violation> {
        match doc.get(ID_KEY) {
            Some(Value::String(_)) | None => vec![],
            Some(_) => vec![Violation::IdNotString],
        }
    }
}

pub struct FilenameRule;

impl ValidationRule for FilenameRule {
    fn name(&self) -> &'static str { "filename" }

    fn validate(&self, doc: &Document, file_name: &str) -> Vec<Violation> {
        let Some(id) = doc.get(ID_KEY).and_then(Value::as_str) else {
            return vec![];
        };
        let expected = format!("{}.json", id);
        if file_name == expected {
            vec![]
        } else {
            vec![Violation::FilenameMismatch { expected }]
        }
    }
}

/// Validator orchestrates rules
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(IdPresenceRule),
                Box::new(IdTypeRule),
                Box::new(FilenameRule),
            ],
        }
    }

    pub fn validate(&self, doc: &Document, file_name: &str) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            let violations = rule.validate(doc, file_name);
            if !violations.is_empty() {
                tracing::debug!(rule = rule.name(), file = file_name, "rule failed");
            }
            all_violations.extend(violations);
        }

        if all_violations.is_empty() {
            ValidationResult::success(file_name)
        } else {
            ValidationResult::failure(file_name, all_violations)
        }
    }

    /// Validate the template at `path` as loaded from disk.
    pub fn validate_file(&self, path: &Path, file_name: &str) -> ValidationResult {
        match load_template(path) {
            Ok(doc) => self.validate(&doc, file_name),
            Err(err) => ValidationResult::from_load_error(file_name, &err),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(value: Value, file_name: &str) -> ValidationResult {
        let doc = value.as_object().cloned().unwrap();
        Validator::new().validate(&doc, file_name)
    }

    #[test]
    fn test_valid_template() {
        let result = check(json!({"id": "promo"}), "promo.json");
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_filename_mismatch() {
        let result = check(json!({"id": "promo-banner"}), "promo.json");
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(
            result.violations[0].to_string(),
            "filename mismatch: expected \"promo-banner.json\""
        );
    }

    #[test]
    fn test_missing_id() {
        let result = check(json!({"name": "x"}), "x.json");
        assert_eq!(result.violations, vec![Violation::MissingId]);
    }

    #[test]
    fn test_non_string_id_skips_filename_check() {
        let result = check(json!({"id": 12}), "12.json");
        assert_eq!(result.violations, vec![Violation::IdNotString]);
        assert_eq!(result.violations[0].to_string(), "id must be a string");
    }
}
