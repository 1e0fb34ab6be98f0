//! Declarative per-operation validation schemas.
//!
//! A `Schema` maps field names to a `Rule` (presence, type, nullability,
//! allowed values). Strict schemas reject any key they do not declare.
//! Validation collects every violation instead of stopping at the first one
//! so a client can fix a request in a single round trip.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use validator::ValidationErrors;

use super::field::{as_text, Field, FieldMap};

/// Expected JSON type of a field. Numbers and booleans also accept their
/// string form, matching how query strings and path segments arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Any,
    Number,
    String,
    Date,
    Object,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Required,
    Forbidden,
}

/// Which constraint a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
    Forbidden,
    Unknown,
    Type,
    Empty,
    NotNull,
    Valid,
    /// Content rule from a `validator` derive (email format, length).
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub constraint: Constraint,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            constraint,
            message: message.into(),
        }
    }
}

/// Structured validation failure: one entry per offending field and rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub details: Vec<FieldViolation>,
}

impl ValidationFailure {
    pub fn single(field: &str, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            details: vec![FieldViolation::new(field, constraint, message)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn push(&mut self, violation: FieldViolation) {
        self.details.push(violation);
    }

    pub fn has(&self, field: &str, constraint: Constraint) -> bool {
        self.details
            .iter()
            .any(|v| v.field == field && v.constraint == constraint)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.details.iter().map(|v| v.field.as_str()).collect()
    }

    fn into_result(mut self) -> Result<(), ValidationFailure> {
        if self.is_empty() {
            return Ok(());
        }
        self.details.sort_by(|a, b| a.field.cmp(&b.field));
        Err(self)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let messages: Vec<&str> = self.details.iter().map(|v| v.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationFailure {}

impl From<ValidationErrors> for ValidationFailure {
    fn from(errors: ValidationErrors) -> Self {
        let mut failure = ValidationFailure::default();
        for (field, errors) in errors.field_errors() {
            for error in errors.iter() {
                let message = match &error.message {
                    Some(msg) => msg.to_string(),
                    None => format!("\"{}\" failed the {} check", field, error.code),
                };
                failure.push(FieldViolation::new(field, Constraint::Content, message));
            }
        }
        failure.details.sort_by(|a, b| a.field.cmp(&b.field));
        failure
    }
}

/// Constraint set for a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    field_type: FieldType,
    presence: Presence,
    nullable: bool,
    allowed: Option<Vec<Value>>,
}

impl Rule {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            presence: Presence::Optional,
            nullable: false,
            allowed: None,
        }
    }

    pub fn any() -> Self {
        Self::of(FieldType::Any)
    }

    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn date() -> Self {
        Self::of(FieldType::Date)
    }

    pub fn object() -> Self {
        Self::of(FieldType::Object)
    }

    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.presence = Presence::Forbidden;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn valid<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Rule for the `id` key of an update or patch body.
    ///
    /// When the body declares an id it must equal the id taken from the
    /// path; when it does not, the key stays forbidden.
    pub fn id_matching(path_id: i64, declared: bool) -> Self {
        if declared {
            Rule::number().valid([path_id])
        } else {
            Rule::number().forbidden()
        }
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    fn check(&self, name: &str, field: &Field<Value>) -> Option<FieldViolation> {
        match field {
            Field::Undefined => match self.presence {
                Presence::Required => Some(FieldViolation::new(
                    name,
                    Constraint::Required,
                    format!("\"{}\" is required", name),
                )),
                _ => None,
            },
            _ if self.presence == Presence::Forbidden => Some(FieldViolation::new(
                name,
                Constraint::Forbidden,
                format!("\"{}\" is not allowed", name),
            )),
            Field::Null if self.nullable => None,
            Field::Null => Some(FieldViolation::new(
                name,
                Constraint::NotNull,
                format!("\"{}\" must not be null", name),
            )),
            Field::Value(value) => self.check_value(name, value),
        }
    }

    fn check_value(&self, name: &str, value: &Value) -> Option<FieldViolation> {
        if let Some(violation) = check_type(self.field_type, name, value) {
            return Some(violation);
        }
        match &self.allowed {
            Some(allowed) if !allowed.iter().any(|a| loosely_equal(a, value)) => {
                let listed: Vec<String> = allowed.iter().map(as_text).collect();
                Some(FieldViolation::new(
                    name,
                    Constraint::Valid,
                    format!("\"{}\" must be one of [{}]", name, listed.join(", ")),
                ))
            }
            _ => None,
        }
    }
}

fn check_type(field_type: FieldType, name: &str, value: &Value) -> Option<FieldViolation> {
    let (ok, expected) = match field_type {
        FieldType::Any => (true, "any"),
        FieldType::Number => (as_number(value).is_some(), "a number"),
        FieldType::String => {
            if value.as_str() == Some("") {
                return Some(FieldViolation::new(
                    name,
                    Constraint::Empty,
                    format!("\"{}\" is not allowed to be empty", name),
                ));
            }
            (value.is_string(), "a string")
        }
        FieldType::Date => (value.as_str().map_or(false, is_date), "a valid date"),
        FieldType::Object => (value.is_object(), "of type object"),
        FieldType::Boolean => (
            value.is_boolean() || matches!(value.as_str(), Some("true") | Some("false")),
            "a boolean",
        ),
    };
    if ok {
        None
    } else {
        Some(FieldViolation::new(
            name,
            Constraint::Type,
            format!("\"{}\" must be {}", name, expected),
        ))
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// Integers compare exactly; floats only when either side is non-integral.
fn loosely_equal(allowed: &Value, actual: &Value) -> bool {
    if !allowed.is_number() {
        return allowed == actual;
    }
    match (as_integer(allowed), as_integer(actual)) {
        (Some(a), Some(b)) => a == b,
        _ => match (as_number(allowed), as_number(actual)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

fn is_date(text: &str) -> bool {
    parse_date(text).is_some()
}

/// Field rules for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    rules: BTreeMap<String, Rule>,
    allow_unknown: bool,
}

impl Schema {
    /// Strict object schema: undeclared keys fail validation.
    pub fn object() -> Self {
        Self {
            rules: BTreeMap::new(),
            allow_unknown: false,
        }
    }

    /// Accepts anything. Used where a resource has not declared rules yet.
    pub fn permissive() -> Self {
        Self {
            rules: BTreeMap::new(),
            allow_unknown: true,
        }
    }

    pub fn key(mut self, name: &str, rule: Rule) -> Self {
        self.rules.insert(name.to_string(), rule);
        self
    }

    pub fn unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Rewrites numeric and boolean strings into JSON numbers and booleans
    /// for fields whose rule expects them. Run only after `validate`.
    pub fn coerce(&self, fields: &mut FieldMap) {
        for (name, field) in fields.iter_mut() {
            let (Some(rule), Field::Value(Value::String(text))) = (self.rules.get(name), &*field) else {
                continue;
            };
            let coerced = match rule.field_type {
                FieldType::Number => text
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .ok()
                    .or_else(|| text.trim().parse::<f64>().ok().map(Value::from)),
                FieldType::Boolean => text.parse::<bool>().ok().map(Value::from),
                _ => None,
            };
            if let Some(value) = coerced {
                *field = Field::Value(value);
            }
        }
    }

    pub fn validate(&self, fields: &FieldMap) -> Result<(), ValidationFailure> {
        let mut failure = ValidationFailure::default();

        for (name, rule) in &self.rules {
            let field = fields.get(name).unwrap_or(&Field::Undefined);
            if let Some(violation) = rule.check(name, field) {
                failure.push(violation);
            }
        }

        if !self.allow_unknown {
            for (name, field) in fields {
                if !field.is_undefined() && !self.rules.contains_key(name) {
                    failure.push(FieldViolation::new(
                        name,
                        Constraint::Unknown,
                        format!("\"{}\" is not allowed", name),
                    ));
                }
            }
        }

        failure.into_result()
    }
}
