//! Location Migration - Legacy and current rule structures
//!
//! Legacy files carry rule fields directly on each `location` entry. Current
//! files nest them under `rules` inside a group. Both are rewritten into the
//! current shape.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::coerce::coerce;

pub const LOGIC_OR: &str = "OR";
pub const LEGACY_BETWEEN: &str = "between";
pub const EQUALS: &str = "==";

/// A single location condition in canonical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub rule_type: Option<Value>,
    pub operator: Option<Value>,
    pub value: String,
    pub logic: Value,
}

impl From<Rule> for Value {
    fn from(rule: Rule) -> Self {
        let mut map = Map::new();
        if let Some(rule_type) = rule.rule_type {
            map.insert("type".to_string(), rule_type);
        }
        if let Some(operator) = rule.operator {
            map.insert("operator".to_string(), operator);
        }
        map.insert("value".to_string(), Value::String(rule.value));
        map.insert("logic".to_string(), rule.logic);
        Value::Object(map)
    }
}

/// A set of rules sharing a `logic` operator.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationGroup {
    pub logic: Value,
    pub rules: Vec<Rule>,
}

impl LocationGroup {
    pub fn empty() -> Self {
        Self { logic: Value::Null, rules: vec![] }
    }
}

impl From<LocationGroup> for Value {
    fn from(group: LocationGroup) -> Self {
        let mut map = Map::new();
        map.insert("logic".to_string(), group.logic);
        map.insert(
            "rules".to_string(),
            Value::Array(group.rules.into_iter().map(Value::from).collect()),
        );
        Value::Object(map)
    }
}

/// The default `location`: one empty group.
pub fn default_location() -> Value {
    Value::Array(vec![LocationGroup::empty().into()])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationFormat {
    Legacy,
    Current,
}

/// One rewrite applied while migrating a `location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFix {
    ConvertedLegacy,
    RenamedRuleId,
    RewroteBetween,
    CoercedValue,
    DefaultedLogic,
    DroppedValueType,
    ReplacedRules,
    DroppedMalformedEntry,
}

impl fmt::Display for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConvertedLegacy => "converted legacy location to a single rule group",
            Self::RenamedRuleId => "renamed rule 'id' to 'type'",
            Self::RewroteBetween => "rewrote 'between' operator to '=='",
            Self::CoercedValue => "converted rule value to string",
            Self::DefaultedLogic => "set missing rule logic to 'OR'",
            Self::DroppedValueType => "removed 'value_type'",
            Self::ReplacedRules => "replaced non-array 'rules' with an empty list",
            Self::DroppedMalformedEntry => "dropped a non-object entry",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub location: Value,
    pub format: LocationFormat,
    pub fixes: Vec<LocationFix>,
}

/// Detect the on-disk revision of a `location` array.
///
/// Any entry with `id`, or with `type` but no `rules` and no non-null
/// `logic`, marks the whole array as legacy, even when other entries (or the
/// same entry) also carry `rules`.
pub fn detect_format(entries: &[Value]) -> LocationFormat {
    let is_legacy = entries.iter().filter_map(Value::as_object).any(|entry| {
        if entry.contains_key("id") {
            return true;
        }
        let has_logic = entry.get("logic").is_some_and(|l| !l.is_null());
        entry.contains_key("type") && !has_logic && !entry.contains_key("rules")
    });

    if is_legacy {
        LocationFormat::Legacy
    } else {
        LocationFormat::Current
    }
}

/// Rewrite a `location` value into canonical shape.
///
/// Returns `None` when nothing needed rewriting (or the value is not an array).
pub fn migrate(location: &Value) -> Option<Migration> {
    let entries = location.as_array()?;

    match detect_format(entries) {
        LocationFormat::Legacy => {
            tracing::debug!(entries = entries.len(), "converting legacy location");
            let rules = entries
                .iter()
                .filter_map(Value::as_object)
                .map(legacy_rule)
                .collect();
            let group = LocationGroup { logic: Value::Null, rules };
            Some(Migration {
                location: Value::Array(vec![group.into()]),
                format: LocationFormat::Legacy,
                fixes: vec![LocationFix::ConvertedLegacy],
            })
        }
        LocationFormat::Current => {
            let mut fixes = Vec::new();
            let mut groups = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry.as_object() {
                    Some(group) => groups.push(fix_group(group, &mut fixes)),
                    None => fixes.push(LocationFix::DroppedMalformedEntry),
                }
            }

            if fixes.is_empty() {
                return None;
            }
            for fix in &fixes {
                tracing::debug!(%fix, "location fix");
            }
            Some(Migration {
                location: Value::Array(groups.into_iter().map(Value::from).collect()),
                format: LocationFormat::Current,
                fixes,
            })
        }
    }
}

/// True when no group in `location` has any rule. Non-array values never count
/// as empty.
pub fn has_no_rules(location: &Value) -> bool {
    let Some(groups) = location.as_array() else {
        return false;
    };
    groups
        .iter()
        .filter_map(Value::as_object)
        .all(|group| match group.get("rules") {
            Some(Value::Array(rules)) => rules.is_empty(),
            _ => true,
        })
}

fn rewrite_operator(operator: &Value) -> (Value, bool) {
    if operator.as_str() == Some(LEGACY_BETWEEN) {
        (Value::String(EQUALS.to_string()), true)
    } else {
        (operator.clone(), false)
    }
}

fn legacy_rule(entry: &Map<String, Value>) -> Rule {
    Rule {
        rule_type: entry.get("id").or_else(|| entry.get("type")).cloned(),
        operator: entry.get("operator").map(|op| rewrite_operator(op).0),
        value: coerce(entry.get("value")).0,
        logic: Value::String(LOGIC_OR.to_string()),
    }
}

fn fix_group(group: &Map<String, Value>, fixes: &mut Vec<LocationFix>) -> LocationGroup {
    let logic = group.get("logic").cloned().unwrap_or(Value::Null);
    let rules = match group.get("rules") {
        Some(Value::Array(rules)) => rules
            .iter()
            .filter_map(|rule| match rule.as_object() {
                Some(rule) => Some(fix_rule(rule, fixes)),
                None => {
                    fixes.push(LocationFix::DroppedMalformedEntry);
                    None
                }
            })
            .collect(),
        Some(_) => {
            fixes.push(LocationFix::ReplacedRules);
            vec![]
        }
        None => vec![],
    };
    LocationGroup { logic, rules }
}

fn fix_rule(rule: &Map<String, Value>, fixes: &mut Vec<LocationFix>) -> Rule {
    let rule_type = match rule.get("id") {
        Some(id) => {
            fixes.push(LocationFix::RenamedRuleId);
            Some(id.clone())
        }
        None => rule.get("type").cloned(),
    };

    let operator = rule.get("operator").map(|op| {
        let (op, rewritten) = rewrite_operator(op);
        if rewritten {
            fixes.push(LocationFix::RewroteBetween);
        }
        op
    });

    let (value, coerced) = coerce(rule.get("value"));
    if coerced {
        fixes.push(LocationFix::CoercedValue);
    }

    let logic = match rule.get("logic") {
        Some(logic) if !logic.is_null() => logic.clone(),
        _ => {
            fixes.push(LocationFix::DefaultedLogic);
            Value::String(LOGIC_OR.to_string())
        }
    };

    if rule.contains_key("value_type") {
        fixes.push(LocationFix::DroppedValueType);
    }

    Rule { rule_type, operator, value, logic }
}
