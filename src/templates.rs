//! Template Normalization - Per-file fixes
//!
//! A template is kept as an untyped JSON object: only the identifier and the
//! location section are interpreted, every other key passes through as-is.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::canonical::encode_document;
use crate::location::{self, default_location, LocationFix, LocationFormat};

pub type TemplateId = String;

/// A parsed template document.
pub type Document = Map<String, Value>;

pub const ID_KEY: &str = "id";
pub const LOCATION_KEY: &str = "location";
pub const LOCATIONS_KEY: &str = "locations";
pub const DEPRECATED_KEYS: [&str; 2] = ["docs", "extraOptions"];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to parse JSON in {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("Template {} is not a JSON object", path.display())]
    NotAnObject { path: PathBuf },
}

impl TemplateError {
    /// Content errors, as opposed to I/O failures.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::NotAnObject { .. })
    }
}

/// One modification made by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    AddedId { id: TemplateId },
    CorrectedId { from: String, to: TemplateId },
    RenamedLocations,
    RemovedDeprecated { key: String },
    MigratedLocation { format: LocationFormat, fixes: Vec<LocationFix> },
    RemovedEmptyLocation,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddedId { id } => write!(f, "added missing id '{}'", id),
            Self::CorrectedId { from, to } => write!(f, "corrected id '{}' to '{}'", from, to),
            Self::RenamedLocations => f.write_str("replaced 'locations' with 'location'"),
            Self::RemovedDeprecated { key } => write!(f, "removed deprecated '{}'", key),
            Self::MigratedLocation { format: LocationFormat::Legacy, .. } => {
                f.write_str("converted legacy location structure")
            }
            Self::MigratedLocation { fixes, .. } => {
                let fixes: Vec<_> = fixes.iter().map(ToString::to_string).collect();
                write!(f, "fixed location rules ({})", fixes.join(", "))
            }
            Self::RemovedEmptyLocation => f.write_str("removed location with empty rules"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Normalization {
    pub changes: Vec<Change>,
}

impl Normalization {
    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// The identifier a template file must carry: its name without extension.
pub fn expected_id(file_name: &str) -> TemplateId {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn parse_template(bytes: &[u8], path: &Path) -> Result<Document, TemplateError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| TemplateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(doc) => Ok(doc),
        _ => Err(TemplateError::NotAnObject { path: path.to_path_buf() }),
    }
}

pub fn load_template(path: &Path) -> Result<Document, TemplateError> {
    let bytes = fs::read(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_template(&bytes, path)
}

/// Write `doc` in canonical form, newline-terminated.
pub fn write_template(path: &Path, doc: &Document) -> Result<(), TemplateError> {
    let mut text = encode_document(doc);
    text.push('\n');
    fs::write(path, text).map_err(|source| TemplateError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply every template fix to `doc` in place.
pub fn normalize(doc: &mut Document, file_name: &str) -> Normalization {
    let mut changes = Vec::new();
    let expected = expected_id(file_name);

    // Non-string ids are left for the validator to report.
    let current = doc.get(ID_KEY).map(|id| id.as_str().map(str::to_owned));
    match current {
        None => {
            doc.insert(ID_KEY.to_string(), Value::String(expected.clone()));
            changes.push(Change::AddedId { id: expected });
        }
        Some(Some(from)) if from != expected => {
            doc.insert(ID_KEY.to_string(), Value::String(expected.clone()));
            changes.push(Change::CorrectedId { from, to: expected });
        }
        Some(_) => {}
    }

    let mut inserted_default = false;
    if let Some(locations) = doc.remove(LOCATIONS_KEY) {
        let location = match locations {
            Value::Array(items) if !items.is_empty() => Value::Array(items),
            _ => default_location(),
        };
        doc.insert(LOCATION_KEY.to_string(), location);
        changes.push(Change::RenamedLocations);
    } else if !doc.contains_key(LOCATION_KEY) {
        doc.insert(LOCATION_KEY.to_string(), default_location());
        inserted_default = true;
    }

    for key in DEPRECATED_KEYS {
        if doc.remove(key).is_some() {
            changes.push(Change::RemovedDeprecated { key: key.to_string() });
        }
    }

    if let Some(migration) = doc.get(LOCATION_KEY).and_then(location::migrate) {
        doc.insert(LOCATION_KEY.to_string(), migration.location);
        changes.push(Change::MigratedLocation {
            format: migration.format,
            fixes: migration.fixes,
        });
    }

    if doc.get(LOCATION_KEY).is_some_and(location::has_no_rules) {
        doc.remove(LOCATION_KEY);
        // The default group inserted above always ends up here.
        if !inserted_default {
            changes.push(Change::RemovedEmptyLocation);
        }
    }

    Normalization { changes }
}

/// Load, normalize, and rewrite one template file when it changed.
pub fn normalize_file(path: &Path) -> Result<Normalization, TemplateError> {
    let mut doc = load_template(path)?;
    let normalization = normalize(&mut doc, &file_name_of(path));

    if normalization.is_modified() {
        write_template(path, &doc)?;
    }
    Ok(normalization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_expected_id() {
        assert_eq!(expected_id("checkout-form.json"), "checkout-form");
        assert_eq!(expected_id("a.b.json"), "a.b");
    }

    #[test]
    fn test_corrects_mismatched_id() {
        let mut d = doc(json!({"id": "checkout_form", "location": [{"logic": null, "rules": [{"type": "a", "operator": "==", "value": "1", "logic": "OR"}]}]}));
        let n = normalize(&mut d, "checkout-form.json");
        assert_eq!(
            n.changes,
            vec![Change::CorrectedId { from: "checkout_form".into(), to: "checkout-form".into() }]
        );
        assert_eq!(d["id"], json!("checkout-form"));
    }

    #[test]
    fn test_adds_missing_id() {
        let mut d = doc(json!({"name": "Promo"}));
        let n = normalize(&mut d, "promo.json");
        assert_eq!(n.changes, vec![Change::AddedId { id: "promo".into() }]);
        assert_eq!(d["id"], json!("promo"));
    }

    #[test]
    fn test_non_string_id_is_untouched() {
        let mut d = doc(json!({"id": 7}));
        let n = normalize(&mut d, "promo.json");
        assert!(!n.is_modified());
        assert_eq!(d["id"], json!(7));
    }

    #[test]
    fn test_absent_location_is_not_a_change() {
        let mut d = doc(json!({"id": "promo", "name": "Promo"}));
        let n = normalize(&mut d, "promo.json");
        assert!(!n.is_modified());
        assert!(!d.contains_key(LOCATION_KEY));
    }

    #[test]
    fn test_plural_locations_are_renamed() {
        let mut d = doc(json!({"id": "promo", "locations": [{"id": "page", "operator": "==", "value": "home"}]}));
        let n = normalize(&mut d, "promo.json");
        assert!(!d.contains_key(LOCATIONS_KEY));
        assert_eq!(n.changes[0], Change::RenamedLocations);
        assert_eq!(
            d[LOCATION_KEY],
            json!([{"logic": null, "rules": [{"type": "page", "operator": "==", "value": "home", "logic": "OR"}]}])
        );
    }

    #[test]
    fn test_empty_plural_locations_are_removed() {
        let mut d = doc(json!({"id": "promo", "locations": []}));
        let n = normalize(&mut d, "promo.json");
        assert_eq!(n.changes, vec![Change::RenamedLocations, Change::RemovedEmptyLocation]);
        assert!(!d.contains_key(LOCATION_KEY));
    }

    #[test]
    fn test_deprecated_keys_are_removed() {
        let mut d = doc(json!({"id": "promo", "docs": "x", "extraOptions": {}}));
        let n = normalize(&mut d, "promo.json");
        assert_eq!(
            n.changes,
            vec![
                Change::RemovedDeprecated { key: "docs".into() },
                Change::RemovedDeprecated { key: "extraOptions".into() },
            ]
        );
        assert!(!d.contains_key("docs"));
        assert!(!d.contains_key("extraOptions"));
    }

    #[test]
    fn test_empty_location_groups_are_removed() {
        let mut d = doc(json!({"id": "promo", "location": [{"logic": "AND", "rules": []}]}));
        let n = normalize(&mut d, "promo.json");
        assert_eq!(n.changes, vec![Change::RemovedEmptyLocation]);
        assert!(!d.contains_key(LOCATION_KEY));
    }

    #[test]
    fn test_change_display() {
        let change = Change::CorrectedId { from: "a_b".into(), to: "a-b".into() };
        assert_eq!(change.to_string(), "corrected id 'a_b' to 'a-b'");
    }

    #[test]
    fn test_non_object_document_is_a_parse_error() {
        let err = parse_template(b"[1, 2]", Path::new("x.json")).unwrap_err();
        assert!(err.is_parse());
        let err = parse_template(b"{oops", Path::new("x.json")).unwrap_err();
        assert!(err.is_parse());
    }
}
