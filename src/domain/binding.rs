//! Bind request values onto an entity through its metadata
//!
//! The entity is serialized to a JSON object, each editable property the caller
//! may edit is converted from its request value according to its
//! [`CustomDataType`], and the object is deserialized back into the entity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::values::ValueProvider;
use crate::core::EntityResource;
use crate::metadata::{CustomDataType, EntityMetadata, PropertyMetadata};
use crate::security::Authentication;
use crate::validation::{ValidationError, ValidationErrors, validators};

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOCAL_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Apply `values` to `item` and validate the result
///
/// Key, read-only and hidden-on-edit properties, and properties the caller may
/// not edit, keep their current value.
///
/// # Errors
///
/// Returns every conversion, required, length and entity-level error found.
pub fn bind_values<T: EntityResource>(
    item: T,
    metadata: &EntityMetadata,
    values: &ValueProvider,
    authentication: &Authentication,
) -> Result<T, ValidationErrors> {
    let mut object = match serde_json::to_value(&item) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            return Err(entity_error(metadata, "could not be read for binding".to_string()));
        }
    };
    let mut errors = ValidationErrors::new();

    for property in metadata.edit_properties() {
        if !property.is_editable() || !property.authorization.can_edit(authentication) {
            continue;
        }

        let supplied = match values.get(&property.clr_name) {
            Some(raw) => Some(raw.clone()),
            None if values.is_form() && property.data_type == CustomDataType::Boolean => {
                Some(Value::Bool(false))
            }
            None => None,
        };
        // password editors never echo the stored value
        let supplied = supplied
            .filter(|raw| property.data_type != CustomDataType::Password || !is_blank(raw));

        if let Some(raw) = supplied {
            match convert_value(property, &raw) {
                Ok(Value::Null)
                    if property.data_type.is_textual()
                        && matches!(object.get(&property.clr_name), Some(Value::String(_))) =>
                {
                    // cleared text on a non-optional field
                    object.insert(property.clr_name.clone(), Value::String(String::new()));
                }
                Ok(converted) => {
                    object.insert(property.clr_name.clone(), converted);
                }
                Err(message) => {
                    errors.add(property_error(property, message));
                    continue;
                }
            }
        }

        if let Err(err) = check_constraints(property, &object) {
            errors.add(err);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let bound: T = serde_json::from_value(Value::Object(object))
        .map_err(|err| entity_error(metadata, format!("has invalid values: {err}")))?;
    bound.validate()?;
    Ok(bound)
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Convert one request value to the JSON representation of its property type
///
/// # Errors
///
/// Returns a user-facing message when the value does not fit the type.
pub fn convert_value(property: &PropertyMetadata, raw: &Value) -> Result<Value, String> {
    let text = match raw {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s.trim(),
        other => return convert_typed(property, other),
    };

    if text.is_empty() {
        return Ok(match property.data_type {
            CustomDataType::Boolean => Value::Bool(false),
            CustomDataType::Other => raw.clone(),
            _ => Value::Null,
        });
    }

    let name = &property.name;
    match property.data_type {
        data_type if data_type.is_textual() => Ok(raw.clone()),
        CustomDataType::Boolean => parse_bool(text)
            .map(Value::Bool)
            .ok_or_else(|| format!("{name} must be true or false")),
        CustomDataType::Integer => text
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("{name} must be a whole number")),
        CustomDataType::Number | CustomDataType::Currency => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("{name} must be a number")),
        CustomDataType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
            .map_err(|_| format!("{name} must be a date (YYYY-MM-DD)")),
        CustomDataType::DateTime => parse_date_time(text)
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
            .ok_or_else(|| format!("{name} must be a date and time")),
        CustomDataType::Time => TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
            .map(|time| Value::String(time.format("%H:%M:%S").to_string()))
            .ok_or_else(|| format!("{name} must be a time (HH:MM)")),
        CustomDataType::Enum => match_enum(property, text),
        CustomDataType::Entity => Uuid::parse_str(text)
            .map(|id| Value::String(id.to_string()))
            .map_err(|_| format!("{name} must reference an existing item")),
        _ => Ok(raw.clone()),
    }
}

fn convert_typed(property: &PropertyMetadata, raw: &Value) -> Result<Value, String> {
    let name = &property.name;
    match (property.data_type, raw) {
        (CustomDataType::Boolean, Value::Bool(_)) => Ok(raw.clone()),
        (CustomDataType::Boolean, Value::Number(n)) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
        (CustomDataType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
        (CustomDataType::Integer, _) => Err(format!("{name} must be a whole number")),
        (CustomDataType::Number | CustomDataType::Currency, Value::Number(_)) => Ok(raw.clone()),
        (CustomDataType::Enum, _) => match_enum(property, &value_text(raw)),
        (data_type, Value::Number(_) | Value::Bool(_)) if data_type.is_textual() => {
            Ok(Value::String(value_text(raw)))
        }
        (CustomDataType::Other, _) => Ok(raw.clone()),
        _ => Err(format!("{name} has an unexpected value")),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// RFC 3339, or an HTML `datetime-local` value read as UTC
fn parse_date_time(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    LOCAL_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn match_enum(property: &PropertyMetadata, text: &str) -> Result<Value, String> {
    let Some(items) = &property.enum_items else {
        return Ok(Value::String(text.to_string()));
    };
    items
        .iter()
        .find(|item| item.value_text() == text)
        .or_else(|| items.iter().find(|item| item.name.eq_ignore_ascii_case(text)))
        .map(|item| item.value.clone())
        .ok_or_else(|| format!("'{text}' is not a valid {}", property.name))
}

fn check_constraints(
    property: &PropertyMetadata,
    object: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let value = object.get(&property.clr_name).unwrap_or(&Value::Null);
    let text = value_text(value);

    if property.is_required {
        validators::validate_required(property, &text)?;
    }
    if let Value::String(s) = value {
        if property.max_length.is_some() {
            validators::validate_length(property, s, None, property.max_length)?;
        }
        if property.data_type == CustomDataType::EmailAddress && !s.is_empty() {
            validators::validate_email(property, s)?;
        }
    }
    Ok(())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn property_error(property: &PropertyMetadata, message: String) -> ValidationError {
    ValidationError::new(property.clr_name.clone(), property.name.clone(), message)
}

fn entity_error(metadata: &EntityMetadata, message: String) -> ValidationErrors {
    ValidationErrors::from(ValidationError::new(
        String::new(),
        metadata.display_name.clone(),
        format!("{} {message}", metadata.display_name),
    ))
}
