//! Run variable construction from job-definition field schemas.
//!
//! Every launch path (interactive, scheduled, webhook) builds the same
//! variable map: schema defaults first, then caller overrides on top.

use serde_json::{Map, Value};

/// JSON object passed to the remote script as `--extra-vars`.
pub type VariableMap = Map<String, Value>;

/// The slice of a variable-field definition needed to build run variables.
/// Everything else about a field (label, options, ordering) is
/// presentation-side and never reaches the core.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub field_type: String,
    pub default_value: String,
}

/// Field type whose defaults follow the `"true"`/other string convention.
const FIELD_TYPE_BOOL: &str = "bool";

/// Build the default variable map from a field schema.
///
/// Boolean fields become JSON booleans (`default_value == "true"`); every
/// other type keeps its default as a string. Fields with an empty name are
/// skipped.
pub fn defaults(specs: &[VariableSpec]) -> VariableMap {
    let mut vars = Map::new();
    for spec in specs {
        if spec.name.is_empty() {
            continue;
        }
        let value = if spec.field_type == FIELD_TYPE_BOOL {
            Value::Bool(spec.default_value == "true")
        } else {
            Value::String(spec.default_value.clone())
        };
        vars.insert(spec.name.clone(), value);
    }
    vars
}

/// Defaults overlaid with caller-supplied values.
///
/// Override keys win whether or not the schema mentions them; the webhook
/// surface deliberately accepts extra keys.
pub fn merged(specs: &[VariableSpec], overrides: &VariableMap) -> VariableMap {
    let mut vars = defaults(specs);
    for (key, value) in overrides {
        vars.insert(key.clone(), value.clone());
    }
    vars
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn spec(name: &str, field_type: &str, default_value: &str) -> VariableSpec {
        VariableSpec {
            name: name.into(),
            field_type: field_type.into(),
            default_value: default_value.into(),
        }
    }

    #[test]
    fn bool_fields_coerce_from_the_true_string() {
        let specs = [
            spec("verbose", "bool", "true"),
            spec("dry_run", "bool", "false"),
            spec("forced", "bool", "yes"),
        ];
        let vars = defaults(&specs);
        assert_eq!(vars["verbose"], json!(true));
        assert_eq!(vars["dry_run"], json!(false));
        assert_eq!(vars["forced"], json!(false));
    }

    #[test]
    fn other_fields_keep_string_defaults() {
        let specs = [spec("target", "text", "web-01"), spec("count", "number", "3")];
        let vars = defaults(&specs);
        assert_eq!(vars["target"], json!("web-01"));
        assert_eq!(vars["count"], json!("3"));
    }

    #[test]
    fn unnamed_fields_are_skipped() {
        let specs = [spec("", "text", "ignored"), spec("kept", "text", "v")];
        let vars = defaults(&specs);
        assert_eq!(vars.len(), 1);
        assert!(vars.contains_key("kept"));
    }

    #[test]
    fn overrides_replace_defaults_and_may_add_keys() {
        let specs = [spec("env", "text", "staging"), spec("verbose", "bool", "false")];
        let mut overrides = VariableMap::new();
        overrides.insert("env".into(), json!("production"));
        overrides.insert("extra".into(), json!(42));

        let vars = merged(&specs, &overrides);
        assert_eq!(vars["env"], json!("production"));
        assert_eq!(vars["verbose"], json!(false));
        assert_eq!(vars["extra"], json!(42));
    }
}
