//! A single deck object: a typed, ordered list of named fields.
//!
//! Field writes go through [`DeckObject::set_field`], which fails with an
//! open [`FieldError`] instead of silently attaching new attributes. Names
//! are case-insensitive for lookup and case-preserving on write.

use std::fmt;
use thiserror::Error;

/// Why a field write was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldError {
    #[error("object '{object}' has no field '{field}'")]
    UnknownField { object: String, field: String },
    #[error("field '{field}' holds {current}, cannot assign {attempted}")]
    TypeMismatch {
        field: String,
        current: &'static str,
        attempted: &'static str,
    },
    #[error("field '{field}' value {value} outside [{min}, {max}]")]
    OutOfBounds {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A field value. Numbers are kept as `f64`; everything else is text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(f64),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> FieldValue {
        FieldValue::Text(value.into())
    }

    pub fn number(value: f64) -> FieldValue {
        FieldValue::Number(value)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(t) => t.trim().parse().ok(),
            FieldValue::Empty => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Empty => "nothing",
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "a number",
        }
    }

    /// Parse a raw token from deck text.
    pub fn parse_token(token: &str) -> FieldValue {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            FieldValue::Empty
        } else if let Ok(number) = trimmed.parse::<f64>() {
            FieldValue::Number(number)
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(t) => f.write_str(t),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One object in a deck: an object type plus ordered named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckObject {
    object_type: String,
    fields: Vec<(String, FieldValue)>,
}

impl DeckObject {
    /// New empty object. The type is stored uppercase, the engine's
    /// canonical form.
    pub fn new(object_type: impl AsRef<str>) -> DeckObject {
        DeckObject {
            object_type: object_type.as_ref().to_ascii_uppercase(),
            fields: Vec::new(),
        }
    }

    /// New object with a `Name` field.
    pub fn named(object_type: impl AsRef<str>, name: impl Into<String>) -> DeckObject {
        let mut object = DeckObject::new(object_type);
        object.push_field("Name", FieldValue::Text(name.into()));
        object
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// The object's `Name` field, when present.
    pub fn name(&self) -> Option<&str> {
        self.get_field("Name").and_then(FieldValue::as_text)
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(field))
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    pub fn get_field(&self, field: &str) -> Option<&FieldValue> {
        self.position(field).map(|idx| &self.fields[idx].1)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get_field(field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get_field(field).and_then(FieldValue::as_text)
    }

    /// Append a field. Used while building objects; later writes go through
    /// [`DeckObject::set_field`].
    pub fn push_field(&mut self, name: impl Into<String>, value: FieldValue) -> &mut Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Builder-style variant of [`DeckObject::push_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.push_field(name, value);
        self
    }

    /// Write an existing field. A text value cannot replace a number and
    /// vice versa; `Empty` slots accept anything.
    pub fn set_field(&mut self, field: &str, value: FieldValue) -> Result<(), FieldError> {
        let idx = self.position(field).ok_or_else(|| FieldError::UnknownField {
            object: self.describe(),
            field: field.to_string(),
        })?;
        let current = &self.fields[idx].1;
        let compatible = matches!(
            (current, &value),
            (FieldValue::Empty, _)
                | (_, FieldValue::Empty)
                | (FieldValue::Number(_), FieldValue::Number(_))
                | (FieldValue::Text(_), FieldValue::Text(_))
        );
        if !compatible {
            return Err(FieldError::TypeMismatch {
                field: self.fields[idx].0.clone(),
                current: current.kind(),
                attempted: value.kind(),
            });
        }
        self.fields[idx].1 = value;
        Ok(())
    }

    /// Write a field, appending it when absent.
    pub fn set_or_push(&mut self, field: &str, value: FieldValue) {
        match self.position(field) {
            Some(idx) => self.fields[idx].1 = value,
            None => {
                self.fields.push((field.to_string(), value));
            }
        }
    }

    /// Drop every field from `from_index` on. Used when rewriting
    /// variable-length objects such as compact schedules.
    pub fn truncate_fields(&mut self, from_index: usize) {
        self.fields.truncate(from_index);
    }

    fn describe(&self) -> String {
        match self.name() {
            Some(name) => format!("{}:{name}", self.object_type),
            None => self.object_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive_case_preserving() {
        let mut zone = DeckObject::named("Zone", "Zone_Perim_1");
        zone.push_field("Floor_Area", FieldValue::Number(42.0));
        assert_eq!(zone.object_type(), "ZONE");
        assert_eq!(zone.name(), Some("Zone_Perim_1"));
        assert_eq!(zone.number("floor_area"), Some(42.0));
        zone.set_field("FLOOR_AREA", FieldValue::Number(50.0)).unwrap();
        // original spelling kept
        assert_eq!(zone.fields()[1].0, "Floor_Area");
    }

    #[test]
    fn unknown_field_is_an_error_not_an_insert() {
        let mut zone = DeckObject::named("Zone", "Z1");
        let err = zone
            .set_field("Volume", FieldValue::Number(100.0))
            .unwrap_err();
        assert!(matches!(err, FieldError::UnknownField { .. }));
        assert_eq!(zone.field_count(), 1);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut lights = DeckObject::named("Lights", "L1");
        lights.push_field("Watts_per_Zone_Floor_Area", FieldValue::Number(10.0));
        let err = lights
            .set_field("Watts_per_Zone_Floor_Area", FieldValue::text("plenty"))
            .unwrap_err();
        assert!(matches!(err, FieldError::TypeMismatch { .. }));
    }

    #[test]
    fn empty_slots_accept_any_type() {
        let mut obj = DeckObject::named("ZoneHVAC:IdealLoadsAirSystem", "Ideal_Z1");
        obj.push_field("Availability_Schedule_Name", FieldValue::Empty);
        obj.set_field("Availability_Schedule_Name", FieldValue::text("AlwaysOn"))
            .unwrap();
        assert_eq!(obj.text("Availability_Schedule_Name"), Some("AlwaysOn"));
    }

    #[test]
    fn token_parsing_distinguishes_numbers() {
        assert_eq!(FieldValue::parse_token(" 4 "), FieldValue::Number(4.0));
        assert_eq!(
            FieldValue::parse_token("Until: 07:00,16.0"),
            FieldValue::text("Until: 07:00,16.0")
        );
        assert!(FieldValue::parse_token("  ").is_empty());
    }
}
