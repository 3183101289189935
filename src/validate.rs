use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// FieldKind
///
/// The coercion target for a submitted field. Text stays a (trimmed) string,
/// Number coerces to f64, Integer to i64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
}

/// FieldSpec
///
/// One field of a payload schema: its name, coercion target, and constraints.
/// `min`/`max` apply to the coerced numeric value and are inclusive; for Text
/// fields a `required` spec also demands the value be non-empty after trimming.
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Schema
///
/// A named, ordered list of field specs. Schemas are plain data: adding a field
/// to a payload means adding a spec here, not new control flow in a handler.
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// FieldViolation
///
/// A single field-level validation failure, surfaced to the client in the
/// 400-class response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// FieldValue
///
/// A coerced, validated field value. Handlers read these back out through the
/// typed accessors when building domain inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

// --- Payload Schemas ---

/// Campground submission: title and location must be present and non-empty,
/// price must be a non-negative number, description is free text.
pub const CAMPGROUND_SCHEMA: Schema = Schema {
    name: "campground",
    fields: &[
        FieldSpec {
            name: "title",
            kind: FieldKind::Text,
            required: true,
            min: None,
            max: None,
        },
        FieldSpec {
            name: "location",
            kind: FieldKind::Text,
            required: true,
            min: None,
            max: None,
        },
        FieldSpec {
            name: "description",
            kind: FieldKind::Text,
            required: false,
            min: None,
            max: None,
        },
        FieldSpec {
            name: "price",
            kind: FieldKind::Number,
            required: true,
            min: Some(0.0),
            max: None,
        },
    ],
};

/// Review submission: integer rating within 1..=5, non-empty body.
pub const REVIEW_SCHEMA: Schema = Schema {
    name: "review",
    fields: &[
        FieldSpec {
            name: "rating",
            kind: FieldKind::Integer,
            required: true,
            min: Some(1.0),
            max: Some(5.0),
        },
        FieldSpec {
            name: "body",
            kind: FieldKind::Text,
            required: true,
            min: None,
            max: None,
        },
    ],
};

/// Registration form: both fields present and non-empty.
pub const CREDENTIALS_SCHEMA: Schema = Schema {
    name: "credentials",
    fields: &[
        FieldSpec {
            name: "username",
            kind: FieldKind::Text,
            required: true,
            min: None,
            max: None,
        },
        FieldSpec {
            name: "password",
            kind: FieldKind::Text,
            required: true,
            min: None,
            max: None,
        },
    ],
};

/// validate
///
/// Evaluates a raw submitted payload against a schema. Returns the coerced
/// values keyed by field name, or the full list of field-level violations.
/// Fields not named by the schema are ignored; a payload is either accepted
/// whole or rejected whole, never partially applied.
pub fn validate(
    schema: &Schema,
    raw: &HashMap<String, String>,
) -> Result<HashMap<&'static str, FieldValue>, Vec<FieldViolation>> {
    let mut values = HashMap::with_capacity(schema.fields.len());
    let mut violations = Vec::new();

    for spec in schema.fields {
        let submitted = raw.get(spec.name).map(|value| value.trim());

        let Some(submitted) = submitted else {
            if spec.required {
                violations.push(FieldViolation::new(spec.name, "is required"));
            }
            continue;
        };

        match spec.kind {
            FieldKind::Text => {
                if spec.required && submitted.is_empty() {
                    violations.push(FieldViolation::new(spec.name, "must not be empty"));
                } else {
                    values.insert(spec.name, FieldValue::Text(submitted.to_string()));
                }
            }
            FieldKind::Number => match submitted.parse::<f64>() {
                Ok(number) if number.is_finite() => {
                    check_bounds(spec, number, &mut violations);
                    values.insert(spec.name, FieldValue::Number(number));
                }
                _ => violations.push(FieldViolation::new(spec.name, "must be a number")),
            },
            FieldKind::Integer => match submitted.parse::<i64>() {
                Ok(integer) => {
                    check_bounds(spec, integer as f64, &mut violations);
                    values.insert(spec.name, FieldValue::Integer(integer));
                }
                Err(_) => violations.push(FieldViolation::new(spec.name, "must be an integer")),
            },
        }
    }

    if violations.is_empty() {
        Ok(values)
    } else {
        Err(violations)
    }
}

fn check_bounds(spec: &FieldSpec, value: f64, violations: &mut Vec<FieldViolation>) {
    if let Some(min) = spec.min {
        if value < min {
            violations.push(FieldViolation::new(
                spec.name,
                format!("must be at least {min}"),
            ));
        }
    }
    if let Some(max) = spec.max {
        if value > max {
            violations.push(FieldViolation::new(
                spec.name,
                format!("must be at most {max}"),
            ));
        }
    }
}
