//! `{{name}}` placeholder interpolation.

use crate::variables::{display_value, VariableStore};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_regex() -> Result<&'static Regex, &'static regex::Error> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][\w.\[\]]*)\s*\}\}"))
        .as_ref()
}

/// Replaces every `{{name}}` in `template` with the string form of the
/// matching variable.
///
/// Unresolved placeholders are left exactly as written, and replacement is
/// a single pass, so the output for a given template and store is always
/// the same.
pub fn interpolate(template: &str, variables: &VariableStore) -> String {
    let re = match placeholder_regex() {
        Ok(re) => re,
        Err(e) => {
            tracing::error!(error = %e, "placeholder pattern failed to compile");
            return template.to_string();
        }
    };

    re.replace_all(template, |caps: &Captures| {
        match variables.lookup(&caps[1]) {
            Some(value) => display_value(value),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Interpolates every string leaf of a JSON document, keeping its shape.
pub fn interpolate_value(value: &Value, variables: &VariableStore) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, variables)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_value(item, variables))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Variable names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    match placeholder_regex() {
        Ok(re) => re
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
