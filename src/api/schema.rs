//! Structural validation of untrusted JSON against typed response contracts.
//!
//! Every response type derives [`JsonSchema`]; the derived JSON Schema is the
//! contract. A body is checked against the contract first, so that all
//! failing field paths are reported together, and only then deserialized
//! into the typed value.
//!
//! Contracts are open: unknown fields never fail validation, and `Option`
//! fields may be absent. Tagged unions are modelled as ordered `untagged`
//! enums whose last variant is the minimal common base shape, so an
//! undocumented variant degrades to that base instead of failing the whole
//! response.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use jsonschema::Validator;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

/// Compiled validators, keyed by the Rust type name of the contract.
static VALIDATORS: LazyLock<RwLock<HashMap<&'static str, Arc<Validator>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// JSON pointer to the failing value (empty for the document root).
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A response body did not match its contract.
///
/// Carries every failing path, not just the first.
#[derive(Debug, Clone, Error)]
#[error("Unexpected response shape: {}", join_errors(.errors))]
pub struct ValidationError {
    /// All field-level failures.
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Create a validation error from a list of field failures.
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Create a validation error with a single failure.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError {
            path: path.into(),
            message: message.into(),
        }])
    }

    /// The failing paths, in report order.
    pub fn paths(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.path.as_str()).collect()
    }
}

/// Get (or compile and cache) the validator for a contract type.
fn validator_for<T: JsonSchema>() -> Result<Arc<Validator>, ValidationError> {
    let key = std::any::type_name::<T>();

    if let Ok(cache) = VALIDATORS.read() {
        if let Some(validator) = cache.get(key) {
            return Ok(Arc::clone(validator));
        }
    }

    trace!(contract = key, "Compiling response contract");
    let schema = serde_json::to_value(schema_for!(T))
        .map_err(|e| ValidationError::single("", format!("invalid contract {}: {}", key, e)))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| ValidationError::single("", format!("invalid contract {}: {}", key, e)))?;
    let validator = Arc::new(validator);

    if let Ok(mut cache) = VALIDATORS.write() {
        cache.insert(key, Arc::clone(&validator));
    }
    Ok(validator)
}

/// Validate an already-parsed JSON value against the contract of `T`.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every path that violates the
/// contract: a missing required field, or a primitive of the wrong type.
pub fn validate<T>(value: &Value) -> Result<T, ValidationError>
where
    T: JsonSchema + DeserializeOwned,
{
    let validator = validator_for::<T>()?;

    let errors: Vec<FieldError> = validator
        .iter_errors(value)
        .map(|e| FieldError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if !errors.is_empty() {
        debug!(
            contract = std::any::type_name::<T>(),
            failures = errors.len(),
            "Response failed validation"
        );
        return Err(ValidationError::new(errors));
    }

    // The contract has already accepted the shape, so this only fails on
    // constraints JSON Schema cannot express.
    T::deserialize(value).map_err(|e| ValidationError::single("", e.to_string()))
}

/// Parse a raw response body and validate it against the contract of `T`.
///
/// A body that is not JSON at all is reported as a validation failure at
/// the document root.
pub fn parse<T>(body: &str) -> Result<T, ValidationError>
where
    T: JsonSchema + DeserializeOwned,
{
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ValidationError::single("", format!("body is not valid JSON: {}", e)))?;
    validate(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct Widget {
        id: String,
        display_name: String,
        size: i64,
        #[serde(default)]
        color: Option<String>,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    enum CircleTag {
        #[serde(rename = "circle")]
        Circle,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Circle {
        #[serde(rename = "type")]
        #[allow(dead_code)]
        kind: CircleTag,
        radius: f64,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct AnyShape {
        #[serde(rename = "type")]
        kind: String,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(untagged)]
    enum Shape {
        Circle(Circle),
        Other(AnyShape),
    }

    #[test]
    fn test_accepts_valid_value() {
        let widget: Widget =
            validate(&json!({"id": "1", "displayName": "Cog", "size": 3})).unwrap();
        assert_eq!(widget.id, "1");
        assert_eq!(widget.display_name, "Cog");
        assert!(widget.color.is_none());
    }

    #[test]
    fn test_unknown_fields_are_accepted() {
        let widget: Widget = validate(&json!({
            "id": "1",
            "displayName": "Cog",
            "size": 3,
            "introducedLater": {"nested": true}
        }))
        .unwrap();
        assert_eq!(widget.size, 3);
    }

    #[test]
    fn test_null_optional_is_accepted() {
        let widget: Widget =
            validate(&json!({"id": "1", "displayName": "Cog", "size": 3, "color": null}))
                .unwrap();
        assert!(widget.color.is_none());
    }

    #[test]
    fn test_reports_every_failing_path() {
        let err = validate::<Widget>(&json!({"id": 7, "size": "big"})).unwrap_err();
        let paths = err.paths();
        assert!(paths.contains(&"/id"), "paths: {:?}", paths);
        assert!(paths.contains(&"/size"), "paths: {:?}", paths);
        assert!(err
            .errors
            .iter()
            .any(|e| e.message.contains("displayName")));
        assert!(err.errors.len() >= 3);
    }

    #[test]
    fn test_known_variant_is_selected() {
        let shape: Shape = validate(&json!({"type": "circle", "radius": 2.5})).unwrap();
        assert!(matches!(shape, Shape::Circle(c) if c.radius == 2.5));
    }

    #[test]
    fn test_unknown_variant_falls_back_to_base() {
        let shape: Shape = validate(&json!({"type": "hexagon", "sides": 6})).unwrap();
        match shape {
            Shape::Other(base) => assert_eq!(base.kind, "hexagon"),
            other => panic!("Expected fallback variant, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_non_json_body() {
        let err = parse::<Widget>("<html>gateway</html>").unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_display_lists_all_errors() {
        let err = ValidationError::new(vec![
            FieldError {
                path: "/a".to_string(),
                message: "bad".to_string(),
            },
            FieldError {
                path: String::new(),
                message: "missing".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Unexpected response shape: /a: bad; (root): missing"
        );
    }
}
