use cv_inventory_core::{
    FIELD_CONFIG, FIELD_CONFIGLETS, FIELD_FQDN, FIELD_IMAGE_BUNDLE, FIELD_NAME, FIELD_PARENT_ID,
    FIELD_PARENT_NAME, FIELD_SERIAL, FIELD_SYSMAC,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringList,
    /// A single name or a list of names.
    StringOrList,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::StringList => "a list of strings",
            FieldKind::StringOrList => "a string or a list of strings",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::StringList | FieldKind::StringOrList, Value::Array(items)) => {
                items.iter().all(Value::is_string)
            }
            (FieldKind::StringOrList, Value::String(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule { name, required: true, kind }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule { name, required: false, kind }
}

/// How a user document lays out its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    List,
    /// A list of mappings, or an object keyed by entry name. A non-mapping
    /// body is stored under `value_field` when one is set.
    Keyed { value_field: Option<&'static str> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldRule],
    pub allow_unknown: bool,
    pub layout: Layout,
}

impl Schema {
    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == field)
    }
}

pub const SCHEMA_CV_CONTAINER: Schema = Schema {
    name: "container",
    fields: &[
        required(FIELD_NAME, FieldKind::String),
        optional(FIELD_PARENT_NAME, FieldKind::String),
        optional(FIELD_CONFIGLETS, FieldKind::StringList),
        optional(FIELD_IMAGE_BUNDLE, FieldKind::StringOrList),
    ],
    allow_unknown: false,
    layout: Layout::Keyed { value_field: None },
};

pub const SCHEMA_CV_DEVICE: Schema = Schema {
    name: "device",
    fields: &[
        required(FIELD_FQDN, FieldKind::String),
        optional(FIELD_SERIAL, FieldKind::String),
        optional(FIELD_SYSMAC, FieldKind::String),
        optional(FIELD_PARENT_NAME, FieldKind::String),
        optional(FIELD_PARENT_ID, FieldKind::String),
        optional(FIELD_CONFIGLETS, FieldKind::StringList),
        optional(FIELD_IMAGE_BUNDLE, FieldKind::StringOrList),
    ],
    allow_unknown: true,
    layout: Layout::List,
};

pub const SCHEMA_CV_CONFIGLET: Schema = Schema {
    name: "configlet",
    fields: &[
        required(FIELD_NAME, FieldKind::String),
        required(FIELD_CONFIG, FieldKind::String),
    ],
    allow_unknown: false,
    layout: Layout::Keyed { value_field: Some(FIELD_CONFIG) },
};

pub fn schema_by_name(name: &str) -> Option<&'static Schema> {
    match name {
        "container" => Some(&SCHEMA_CV_CONTAINER),
        "device" => Some(&SCHEMA_CV_DEVICE),
        "configlet" => Some(&SCHEMA_CV_CONFIGLET),
        _ => None,
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("{schema} input must be {expected}")]
    Shape {
        schema: &'static str,
        expected: &'static str,
    },

    #[error("entry #{index} is not a mapping")]
    NotAMapping { index: usize },

    #[error("entry #{index}: missing required field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("entry #{index}: field {field} is empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("entry #{index}: field {field} must be {expected}")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("entry #{index}: unknown field {field}")]
    UnknownField { index: usize, field: String },

    #[error("entry #{index}: name {name} does not match key {key}")]
    NameMismatch {
        index: usize,
        key: String,
        name: String,
    },
}

/// Returns the first nonconformity of `entries` against `schema`.
pub fn check(entries: &[Value], schema: &Schema) -> Result<(), SchemaViolation> {
    entries
        .iter()
        .enumerate()
        .try_for_each(|(index, entry)| check_entry(index, entry, schema))
}

pub fn validate(entries: &[Value], schema: &Schema) -> bool {
    report(check(entries, schema), schema)
}

/// Validates a whole user document: either a list of entries, or for keyed
/// schemas an object mapping entry names to their bodies.
pub fn validate_cv_inputs(user_json: &Value, schema: &Schema) -> bool {
    let result = normalize_entries(user_json, schema).and_then(|entries| check(&entries, schema));
    report(result, schema)
}

/// Turns a user document into a flat list of entries for `schema`.
pub fn normalize_entries(user_json: &Value, schema: &Schema) -> Result<Vec<Value>, SchemaViolation> {
    match (user_json, schema.layout) {
        (Value::Array(entries), _) => Ok(entries.clone()),
        (Value::Object(map), Layout::Keyed { value_field }) => map
            .iter()
            .enumerate()
            .map(|(index, (name, body))| keyed_entry(index, name, body, value_field))
            .collect(),
        (_, Layout::List) => Err(SchemaViolation::Shape {
            schema: schema.name,
            expected: "a list of mappings",
        }),
        (_, Layout::Keyed { .. }) => Err(SchemaViolation::Shape {
            schema: schema.name,
            expected: "a list of mappings or an object keyed by name",
        }),
    }
}

fn keyed_entry(
    index: usize,
    name: &str,
    body: &Value,
    value_field: Option<&'static str>,
) -> Result<Value, SchemaViolation> {
    let mut entry = match (body, value_field) {
        (Value::Object(fields), _) => fields.clone(),
        (other, Some(field)) => {
            let mut fields = Map::new();
            fields.insert(field.to_string(), other.clone());
            fields
        }
        (_, None) => return Err(SchemaViolation::NotAMapping { index }),
    };
    match entry.get(FIELD_NAME) {
        None => {
            entry.insert(FIELD_NAME.to_string(), Value::String(name.to_string()));
        }
        Some(Value::String(inner)) if inner == name => {}
        Some(Value::String(inner)) => {
            return Err(SchemaViolation::NameMismatch {
                index,
                key: name.to_string(),
                name: inner.clone(),
            });
        }
        Some(_) => {
            return Err(SchemaViolation::WrongType {
                index,
                field: FIELD_NAME,
                expected: FieldKind::String.describe(),
            });
        }
    }
    Ok(Value::Object(entry))
}

fn check_entry(index: usize, entry: &Value, schema: &Schema) -> Result<(), SchemaViolation> {
    let map = entry.as_object().ok_or(SchemaViolation::NotAMapping { index })?;

    for rule in schema.fields {
        match map.get(rule.name) {
            None if rule.required => {
                return Err(SchemaViolation::MissingField { index, field: rule.name });
            }
            None => {}
            Some(value) if !rule.kind.matches(value) => {
                return Err(SchemaViolation::WrongType {
                    index,
                    field: rule.name,
                    expected: rule.kind.describe(),
                });
            }
            Some(Value::String(value)) if rule.required && value.trim().is_empty() => {
                return Err(SchemaViolation::EmptyField { index, field: rule.name });
            }
            Some(_) => {}
        }
    }

    if !schema.allow_unknown {
        if let Some(field) = map.keys().find(|key| schema.rule(key).is_none()) {
            return Err(SchemaViolation::UnknownField {
                index,
                field: field.clone(),
            });
        }
    }

    Ok(())
}

fn report(result: Result<(), SchemaViolation>, schema: &Schema) -> bool {
    match result {
        Ok(()) => {
            debug!(schema = schema.name, "inventory input is valid");
            true
        }
        Err(violation) => {
            warn!(schema = schema.name, %violation, "inventory input rejected");
            false
        }
    }
}
