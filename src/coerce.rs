//! Value Coercion - Rule values are always strings

use serde_json::{Number, Value};

/// Coerce a rule value into its string form.
///
/// Returns the string and whether the representation changed. An absent value
/// coerces like `null`.
pub fn coerce(value: Option<&Value>) -> (String, bool) {
    match value {
        Some(Value::String(s)) => (s.clone(), false),
        Some(Value::Array(items)) => (items.first().map(stringify).unwrap_or_default(), true),
        Some(other) => (stringify(other), true),
        None => (String::new(), true),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Format a JSON number: integers without a decimal point, everything else in
/// general notation.
pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_float(f),
        None => n.to_string(),
    }
}

pub fn format_float(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        return format!("{:.0}", v);
    }
    format_general(v)
}

/// Shortest round-trip digits; scientific when the exponent is below -4 or at
/// least 6, with a signed exponent of at least two digits (`1.5e-05`).
fn format_general(v: f64) -> String {
    let sci = format!("{:e}", v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return v.to_string();
    };
    let exp: i32 = match exp.parse() {
        Ok(exp) => exp,
        Err(_) => return v.to_string(),
    };

    if (-4..6).contains(&exp) {
        v.to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}
