//! Structural request validation. Every request body is an envelope
//! object (`{"user": {...}}`, `{"article": {...}}`, ...) checked against a
//! declarative shape before deserialization. Compiled shapes are memoized
//! per DTO type in a process-global map with get-or-populate semantics, so
//! concurrent requests share one compiled shape.

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringArray,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Compiled shape of one request type: a single named envelope object with
/// a closed set of fields. Unknown properties are rejected at both levels.
#[derive(Debug)]
pub struct Shape {
    pub envelope: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// Implemented by request DTOs that carry a declarative shape.
pub trait RequestShape: 'static {
    fn shape() -> Shape;
}

static SHAPES: Lazy<RwLock<HashMap<TypeId, Arc<Shape>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Memoized compiled shape for `T`.
fn shape_for<T: RequestShape>() -> Arc<Shape> {
    let key = TypeId::of::<T>();
    {
        let shapes = SHAPES.read().expect("shape cache poisoned");
        if let Some(shape) = shapes.get(&key) {
            return shape.clone();
        }
    }
    let mut shapes = SHAPES.write().expect("shape cache poisoned");
    shapes
        .entry(key)
        .or_insert_with(|| Arc::new(T::shape()))
        .clone()
}

/// Parse and validate a request body. Errors are `"<path>: <kind>"`
/// strings matching the structural-validation response shape.
pub fn parse<T: RequestShape + DeserializeOwned>(body: &str) -> Result<T, Vec<String>> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return Err(vec!["body: InvalidJson".to_string()]),
    };

    let shape = shape_for::<T>();
    let errors = validate(&shape, &value);
    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(value).map_err(|_| vec!["body: InvalidJson".to_string()])
}

fn validate(shape: &Shape, value: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(root) = value.as_object() else {
        errors.push("body: ObjectExpected".to_string());
        return errors;
    };

    for key in root.keys() {
        if key != shape.envelope {
            errors.push(format!("{key}: NoAdditionalPropertiesAllowed"));
        }
    }

    let Some(envelope) = root.get(shape.envelope) else {
        errors.push(format!("{}: PropertyRequired", shape.envelope));
        return errors;
    };
    let Some(fields) = envelope.as_object() else {
        errors.push(format!("{}: ObjectExpected", shape.envelope));
        return errors;
    };

    for key in fields.keys() {
        if !shape.fields.iter().any(|f| f.name == key) {
            errors.push(format!(
                "{}.{key}: NoAdditionalPropertiesAllowed",
                shape.envelope
            ));
        }
    }

    for spec in &shape.fields {
        let path = format!("{}.{}", shape.envelope, spec.name);
        match fields.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    errors.push(format!("{path}: PropertyRequired"));
                }
            }
            Some(present) => match spec.kind {
                FieldKind::String => {
                    if !present.is_string() {
                        errors.push(format!("{path}: StringExpected"));
                    }
                }
                FieldKind::StringArray => match present.as_array() {
                    Some(items) => {
                        if items.iter().any(|item| !item.is_string()) {
                            errors.push(format!("{path}: StringExpected"));
                        }
                    }
                    None => errors.push(format!("{path}: ArrayExpected")),
                },
            },
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct SampleEnvelope {
        sample: Sample,
    }

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        nickname: Option<String>,
        #[serde(default)]
        labels: Vec<String>,
    }

    impl RequestShape for SampleEnvelope {
        fn shape() -> Shape {
            Shape {
                envelope: "sample",
                fields: vec![
                    FieldSpec::required("name", FieldKind::String),
                    FieldSpec::optional("nickname", FieldKind::String),
                    FieldSpec::optional("labels", FieldKind::StringArray),
                ],
            }
        }
    }

    #[test]
    fn valid_body_parses() {
        let parsed: SampleEnvelope =
            parse(r#"{"sample": {"name": "a", "labels": ["x", "y"]}}"#).unwrap();
        assert_eq!(parsed.sample.name, "a");
        assert_eq!(parsed.sample.labels, vec!["x", "y"]);
        assert!(parsed.sample.nickname.is_none());
    }

    #[test]
    fn missing_required_field_is_reported_with_path() {
        let errors = parse::<SampleEnvelope>(r#"{"sample": {}}"#).unwrap_err();
        assert_eq!(errors, vec!["sample.name: PropertyRequired"]);
    }

    #[test]
    fn missing_envelope_is_reported() {
        let errors = parse::<SampleEnvelope>(r#"{}"#).unwrap_err();
        assert_eq!(errors, vec!["sample: PropertyRequired"]);
    }

    #[test]
    fn wrong_types_are_reported() {
        let errors =
            parse::<SampleEnvelope>(r#"{"sample": {"name": 1, "labels": "oops"}}"#).unwrap_err();
        assert!(errors.contains(&"sample.name: StringExpected".to_string()));
        assert!(errors.contains(&"sample.labels: ArrayExpected".to_string()));
    }

    #[test]
    fn unknown_properties_are_rejected() {
        let errors =
            parse::<SampleEnvelope>(r#"{"sample": {"name": "a", "extra": 1}, "other": {}}"#)
                .unwrap_err();
        assert!(errors.contains(&"other: NoAdditionalPropertiesAllowed".to_string()));
        assert!(errors.contains(&"sample.extra: NoAdditionalPropertiesAllowed".to_string()));
    }

    #[test]
    fn malformed_json_is_a_single_error() {
        let errors = parse::<SampleEnvelope>("{not json").unwrap_err();
        assert_eq!(errors, vec!["body: InvalidJson"]);
    }

    #[test]
    fn compiled_shapes_are_memoized() {
        let first = shape_for::<SampleEnvelope>();
        let second = shape_for::<SampleEnvelope>();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
