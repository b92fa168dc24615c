//! Admin-authored service schemas and the typed data validated against them.
//!
//! DESIGN
//! ======
//! A `ServiceDefinition` is an ordered list of typed form fields. Owner input
//! for a definition arrives as a loose JSON object; the only way to obtain a
//! `ServiceData` is `ServiceDefinition::validate_data`, which checks it
//! against the field list. The stored shape stays a flat JSON object keyed by
//! field name.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::null_as_default;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServiceDefinition {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldDef>,
}

/// A single validated field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    LongText(String),
    Number(f64),
}

/// Field values for one definition, keyed by field name.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceData {
    pub definition_id: Uuid,
    pub values: BTreeMap<String, FieldValue>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("{0} is required")]
    MissingRequired(String),
    #[error("{0} must be a number")]
    NotANumber(String),
    #[error("{0} must be text")]
    NotText(String),
    #[error("definition name is required")]
    EmptyName,
    #[error("slug must be lowercase letters, digits and hyphens: {0:?}")]
    InvalidSlug(String),
    #[error("a definition needs at least one field")]
    NoFields,
    #[error("field {0} needs a name and a label")]
    IncompleteField(usize),
    #[error("duplicate field name: {0}")]
    DuplicateField(String),
}

impl crate::notice::ErrorCode for SchemaError {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }

    fn status(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::UNPROCESSABLE_ENTITY
    }
}

impl ServiceDefinition {
    /// Validate raw form input against this definition's fields.
    ///
    /// Empty strings count as absent. Unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] encountered, in field order.
    pub fn validate_data(&self, raw: &serde_json::Map<String, serde_json::Value>) -> Result<ServiceData, SchemaError> {
        if let Some(unknown) = raw
            .keys()
            .find(|key| !self.fields.iter().any(|f| &f.name == *key))
        {
            return Err(SchemaError::UnknownField(unknown.clone()));
        }

        let mut values = BTreeMap::new();
        for field in &self.fields {
            let Some(value) = raw.get(&field.name).and_then(|v| parse_field(field, v).transpose()) else {
                if field.required {
                    return Err(SchemaError::MissingRequired(field.label.clone()));
                }
                continue;
            };
            values.insert(field.name.clone(), value?);
        }

        Ok(ServiceData { definition_id: self.id, values })
    }
}

/// `Ok(None)` for blank/null input, `Ok(Some)` for a usable value.
fn parse_field(field: &FieldDef, value: &serde_json::Value) -> Result<Option<FieldValue>, SchemaError> {
    use serde_json::Value;

    match (field.field_type, value) {
        (_, Value::Null) => Ok(None),
        (_, Value::String(s)) if s.trim().is_empty() => Ok(None),
        (FieldType::Number, Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| Some(FieldValue::Number(f)))
            .ok_or_else(|| SchemaError::NotANumber(field.label.clone())),
        (FieldType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| Some(FieldValue::Number(f)))
            .ok_or_else(|| SchemaError::NotANumber(field.label.clone())),
        (FieldType::Text, Value::String(s)) => Ok(Some(FieldValue::Text(s.trim().to_owned()))),
        (FieldType::Textarea, Value::String(s)) => Ok(Some(FieldValue::LongText(s.trim().to_owned()))),
        (FieldType::Number, _) => Err(SchemaError::NotANumber(field.label.clone())),
        (FieldType::Text | FieldType::Textarea, _) => Err(SchemaError::NotText(field.label.clone())),
    }
}

#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl NewServiceDefinition {
    /// Trim inputs and check the definition is usable as a form.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] describing the first problem found.
    pub fn normalized(mut self) -> Result<Self, SchemaError> {
        self.name = self.name.trim().to_owned();
        self.slug = self.slug.trim().to_owned();
        self.description = self.description.trim().to_owned();

        if self.name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if !is_valid_slug(&self.slug) {
            return Err(SchemaError::InvalidSlug(self.slug));
        }
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let mut seen = HashSet::new();
        for (index, field) in self.fields.iter_mut().enumerate() {
            field.name = field.name.trim().to_owned();
            field.label = field.label.trim().to_owned();
            if field.name.is_empty() || field.label.is_empty() {
                return Err(SchemaError::IncompleteField(index));
            }
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
