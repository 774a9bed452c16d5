use serde::{Deserialize, Serialize};
use tempora_id::TemporalId;

use crate::{Error, Result};

// ----------------------------------------------------------------------------

/// Name of the document field holding the serialized type name.
pub const TYPE_FIELD: &str = "_t";

/// Name of the document field holding the record's temporal id.
pub const ID_FIELD: &str = "_id";

/// Name of the document field holding the owning dataset's temporal id.
pub const DATASET_FIELD: &str = "_dataset";

/// Name of the document field holding the record's semicolon-delimited key.
pub const KEY_FIELD: &str = "_key";

// ----------------------------------------------------------------------------

/// Discriminant of a [`Value`], used in error messages and mismatch checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Bool,
    Int,
    Double,
    Id,
    Binary,
    Doc,
    Array,
}

/// A field value as stored in a document.
///
/// Only passthrough scalar types appear here: civil time scalars are encoded
/// to their integer forms before they reach a document, and enums are encoded
/// as member names. Decoding is driven by the declared field type at the
/// call site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    Id(TemporalId),
    Binary(Vec<u8>),
    Doc(Document),
    Array(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Id(_) => ValueKind::Id,
            Self::Binary(_) => ValueKind::Binary,
            Self::Doc(_) => ValueKind::Doc,
            Self::Array(_) => ValueKind::Array,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    #[inline]
    pub fn as_id(&self) -> Option<TemporalId> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_doc(&self) -> Option<&Document> {
        match self {
            Self::Doc(doc) => Some(doc),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Total order over values, used by pipeline `match` and `sort` stages.
    ///
    /// Values of different kinds order by kind rank; doubles use IEEE total
    /// ordering so the comparator never panics on NaN.
    pub fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Id(a), Self::Id(b)) => a.cmp(b),
            (Self::Binary(a), Self::Binary(b)) => a.cmp(b),
            (Self::Doc(_), Self::Doc(_)) | (Self::Array(_), Self::Array(_)) => Ordering::Equal,
            (a, b) => kind_rank(a).cmp(&kind_rank(b)),
        }
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) => 1,
        Value::Double(_) => 2,
        Value::String(_) => 3,
        Value::Id(_) => 4,
        Value::Binary(_) => 5,
        Value::Doc(_) => 6,
        Value::Array(_) => 7,
    }
}

/// Order with missing fields first, the convention the sort stage uses.
pub fn cmp_opt(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(a), Some(b)) => a.total_cmp(b),
    }
}

// --- Conversions into Value ---

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<TemporalId> for Value {
    fn from(v: TemporalId) -> Self {
        Self::Id(v)
    }
}

// Civil time scalars convert straight to their integer storage encodings, so
// query literals pass through the same mapping the serializer uses.

impl From<crate::LocalDate> for Value {
    fn from(v: crate::LocalDate) -> Self {
        Self::Int(v.to_iso_int())
    }
}

impl From<crate::LocalTime> for Value {
    fn from(v: crate::LocalTime) -> Self {
        Self::Int(v.to_iso_int())
    }
}

impl From<crate::LocalMinute> for Value {
    fn from(v: crate::LocalMinute) -> Self {
        Self::Int(v.to_iso_int())
    }
}

impl From<crate::LocalDateTime> for Value {
    fn from(v: crate::LocalDateTime) -> Self {
        Self::Int(v.to_iso_int())
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Self::Doc(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

// ----------------------------------------------------------------------------

/// An ordered collection of named fields.
///
/// Field order is insertion order, matching the stored form; `set` replaces
/// an existing field in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(field, _)| *field == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// The field, or a `MissingField` error naming the type being decoded.
    pub fn expect(&self, type_name: &'static str, field: &'static str) -> Result<&Value> {
        self.get(field)
            .ok_or(Error::MissingField { type_name, field })
    }

    // --- Typed readers used by deserializers ---

    pub fn read_str(&self, type_name: &'static str, field: &'static str) -> Result<String> {
        let value = self.expect(type_name, field)?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| wrong_kind(type_name, field, ValueKind::String, value))
    }

    pub fn read_int(&self, type_name: &'static str, field: &'static str) -> Result<i64> {
        let value = self.expect(type_name, field)?;
        value
            .as_int()
            .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Int, value))
    }

    pub fn read_bool(&self, type_name: &'static str, field: &'static str) -> Result<bool> {
        let value = self.expect(type_name, field)?;
        value
            .as_bool()
            .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Bool, value))
    }

    pub fn read_double(&self, type_name: &'static str, field: &'static str) -> Result<f64> {
        let value = self.expect(type_name, field)?;
        value
            .as_double()
            .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Double, value))
    }

    pub fn read_id(&self, type_name: &'static str, field: &'static str) -> Result<TemporalId> {
        let value = self.expect(type_name, field)?;
        value
            .as_id()
            .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Id, value))
    }

    // --- Optional readers: absent fields decode to None ---

    pub fn read_opt_str(&self, type_name: &'static str, field: &'static str) -> Result<Option<String>> {
        self.get(field)
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| wrong_kind(type_name, field, ValueKind::String, value))
            })
            .transpose()
    }

    pub fn read_opt_int(&self, type_name: &'static str, field: &'static str) -> Result<Option<i64>> {
        self.get(field)
            .map(|value| {
                value
                    .as_int()
                    .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Int, value))
            })
            .transpose()
    }

    pub fn read_opt_bool(&self, type_name: &'static str, field: &'static str) -> Result<Option<bool>> {
        self.get(field)
            .map(|value| {
                value
                    .as_bool()
                    .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Bool, value))
            })
            .transpose()
    }

    pub fn read_opt_double(
        &self,
        type_name: &'static str,
        field: &'static str,
    ) -> Result<Option<f64>> {
        self.get(field)
            .map(|value| {
                value
                    .as_double()
                    .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Double, value))
            })
            .transpose()
    }

    pub fn read_opt_id(
        &self,
        type_name: &'static str,
        field: &'static str,
    ) -> Result<Option<TemporalId>> {
        self.get(field)
            .map(|value| {
                value
                    .as_id()
                    .ok_or_else(|| wrong_kind(type_name, field, ValueKind::Id, value))
            })
            .transpose()
    }
}

fn wrong_kind(
    type_name: &'static str,
    field: &'static str,
    expected: ValueKind,
    actual: &Value,
) -> Error {
    Error::WrongValueKind {
        type_name,
        field,
        expected,
        actual: actual.kind(),
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut doc = Document::new();
        doc.set("A", 1_i64);
        doc.set("B", 2_i64);
        doc.set("A", 3_i64);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("A"), Some(&Value::Int(3)));
        assert_eq!(
            doc.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn typed_readers_report_kind_mismatch() {
        let mut doc = Document::new();
        doc.set("Count", "not an int");
        assert!(matches!(
            doc.read_int("Sample", "Count"),
            Err(Error::WrongValueKind { .. })
        ));
        assert!(matches!(
            doc.read_int("Sample", "Missing"),
            Err(Error::MissingField { .. })
        ));
        assert_eq!(doc.read_opt_int("Sample", "Missing").unwrap(), None);
    }

    #[test]
    fn total_order_is_consistent_with_encodings() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Int(20030501).total_cmp(&Value::Int(20030502)),
            Ordering::Less
        );
        assert_eq!(
            Value::String("A0".into()).total_cmp(&Value::String("A1".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::Double(f64::NAN).total_cmp(&Value::Double(f64::NAN)),
            Ordering::Equal
        );
        assert_eq!(
            Value::Id(TemporalId::ZERO).total_cmp(&Value::Id(TemporalId::MAX)),
            Ordering::Less
        );
    }
}
