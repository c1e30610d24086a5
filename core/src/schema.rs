//! Validate-and-normalize engine for mapping-shaped data.
//!
//! # Design
//! Raw input (usually decoded JSON) is lifted into `Datum`, a small tree of
//! values that can also hold already-coerced timestamps and identifiers. A
//! `Shape` maps field names to `Validator` expressions; validating a mapping
//! against a shape interprets those expressions recursively and produces a
//! new `Record` in declared field order. The input is never modified.
//!
//! Shapes are strict: a key the shape does not declare is an error. Fields
//! declared with `Field::optional` may be absent; everything else must be
//! present, though its validator may still accept null.
//!
//! Entities implement `Schemed`. Their `update` overlays a partial mapping on
//! the current snapshot and re-validates the whole merged record, so a batch
//! of changes either applies completely or not at all.

use std::fmt;

use crate::coerce::{coerce_identifier, coerce_timestamp, Timestamp};
use crate::enumeration::Enum;
use crate::error::{CoercionError, ValidationError};
use uuid::Uuid;

/// A value flowing through validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(Timestamp),
    Identifier(Uuid),
    List(Vec<Datum>),
    Record(Record),
}

impl Datum {
    /// Human name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "boolean",
            Datum::Int(_) => "integer",
            Datum::Float(_) => "float",
            Datum::Str(_) => "string",
            Datum::Timestamp(_) => "timestamp",
            Datum::Identifier(_) => "identifier",
            Datum::List(_) => "list",
            Datum::Record(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Datum {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Datum::Int(i),
                None => Datum::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Datum::Str(s),
            Value::Array(items) => Datum::List(items.into_iter().map(Datum::from).collect()),
            Value::Object(map) => Datum::Record(map.into_iter().map(|(k, v)| (k, Datum::from(v))).collect()),
        }
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Str(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Str(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<Timestamp> for Datum {
    fn from(value: Timestamp) -> Self {
        Datum::Timestamp(value)
    }
}

impl From<Uuid> for Datum {
    fn from(value: Uuid) -> Self {
        Datum::Identifier(value)
    }
}

impl From<Record> for Datum {
    fn from(value: Record) -> Self {
        Datum::Record(value)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Datum::Null, Into::into)
    }
}

impl<T: Into<Datum>> From<Vec<T>> for Datum {
    fn from(value: Vec<T>) -> Self {
        Datum::List(value.into_iter().map(Into::into).collect())
    }
}

/// An ordered mapping from field name to value.
///
/// Keys are unique; inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Datum)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key`, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Datum>) -> Option<Datum> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Datum> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrite fields with those of `changes`; nothing is ever deleted.
    pub fn overlay(&mut self, changes: Record) {
        for (key, value) in changes {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<Datum>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Datum);
    type IntoIter = std::vec::IntoIter<(String, Datum)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Primitive kinds matched exactly by `Validator::Exact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    /// Accepts integers too, widened to floats. A widened value encodes
    /// back with a fraction: `"urgency": 2` comes out as `"urgency": 2.0`.
    Float,
    Str,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "boolean",
            Kind::Int => "integer",
            Kind::Float => "float",
            Kind::Str => "string",
        }
    }
}

/// Nested validation hook, e.g. an entity's own `validate` lowered to a record.
pub type CoerceFn = fn(&Datum) -> Result<Datum, ValidationError>;

/// How a value is turned into its canonical form.
#[derive(Clone, Copy)]
pub enum Coercer {
    Timestamp,
    Identifier,
    Symbol(&'static Enum<String>),
    Function(CoerceFn),
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercer::Timestamp => f.write_str("Timestamp"),
            Coercer::Identifier => f.write_str("Identifier"),
            Coercer::Symbol(e) => write!(f, "Symbol({})", e.name()),
            Coercer::Function(_) => f.write_str("Function"),
        }
    }
}

/// A field validator expression.
#[derive(Debug, Clone)]
pub enum Validator {
    Exact(Kind),
    /// A string with at least one character.
    NonEmptyStr,
    /// The first alternative that accepts the value wins.
    OneOf(Vec<Validator>),
    ListOf(Box<Validator>),
    Use(Coercer),
}

impl Validator {
    /// `OneOf(null, inner)`.
    pub fn nullable(inner: Validator) -> Self {
        Validator::OneOf(vec![Validator::Exact(Kind::Null), inner])
    }

    pub fn list_of(inner: Validator) -> Self {
        Validator::ListOf(Box::new(inner))
    }

    pub fn timestamp() -> Self {
        Validator::Use(Coercer::Timestamp)
    }

    pub fn identifier() -> Self {
        Validator::Use(Coercer::Identifier)
    }

    /// Validate `value`, located at `path`, producing its normalized form.
    pub fn validate(&self, value: &Datum, path: &str) -> Result<Datum, ValidationError> {
        match self {
            Validator::Exact(kind) => match (kind, value) {
                (Kind::Null, Datum::Null)
                | (Kind::Bool, Datum::Bool(_))
                | (Kind::Int, Datum::Int(_))
                | (Kind::Float, Datum::Float(_))
                | (Kind::Str, Datum::Str(_)) => Ok(value.clone()),
                (Kind::Float, Datum::Int(i)) => Ok(Datum::Float(*i as f64)),
                _ => Err(wrong_type(path, kind.name(), value)),
            },
            Validator::NonEmptyStr => match value {
                Datum::Str(s) if s.is_empty() => Err(ValidationError::EmptyString {
                    path: path.to_string(),
                }),
                Datum::Str(_) => Ok(value.clone()),
                _ => Err(wrong_type(path, "string", value)),
            },
            Validator::OneOf(alternatives) => {
                let mut reasons = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    match alternative.validate(value, path) {
                        Ok(normalized) => return Ok(normalized),
                        Err(err) => reasons.push(err.to_string()),
                    }
                }
                Err(ValidationError::NoAlternative {
                    path: path.to_string(),
                    reasons,
                })
            }
            Validator::ListOf(inner) => match value {
                Datum::List(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| inner.validate(item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Datum::List),
                _ => Err(wrong_type(path, "list", value)),
            },
            Validator::Use(coercer) => coerce(*coercer, value, path),
        }
    }
}

fn coerce(coercer: Coercer, value: &Datum, path: &str) -> Result<Datum, ValidationError> {
    let coercion = |source: CoercionError| ValidationError::Coercion {
        path: path.to_string(),
        source,
    };
    match coercer {
        Coercer::Timestamp => coerce_timestamp(value).map(Datum::Timestamp).map_err(coercion),
        Coercer::Identifier => coerce_identifier(value).map(Datum::Identifier).map_err(coercion),
        Coercer::Symbol(symbols) => match value {
            Datum::Str(raw) => symbols.coerce(raw).map(Datum::Str).map_err(coercion),
            _ => Err(wrong_type(path, "string", value)),
        },
        Coercer::Function(apply) => apply(value).map_err(|source| ValidationError::Nested {
            path: path.to_string(),
            source: Box::new(source),
        }),
    }
}

fn wrong_type(path: &str, expected: &'static str, found: &Datum) -> ValidationError {
    ValidationError::WrongType {
        path: path.to_string(),
        expected,
        found: found.kind(),
    }
}

/// One declared field of a shape.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub validator: Validator,
    /// Whether the key may be absent altogether.
    pub optional: bool,
}

impl Field {
    pub fn required(name: &'static str, validator: Validator) -> Self {
        Self {
            name,
            validator,
            optional: false,
        }
    }

    pub fn optional(name: &'static str, validator: Validator) -> Self {
        Self {
            name,
            validator,
            optional: true,
        }
    }
}

/// The declared set of field validators for an entity.
#[derive(Debug, Clone)]
pub struct Shape {
    entity: &'static str,
    fields: Vec<Field>,
}

impl Shape {
    pub fn new(entity: &'static str, fields: Vec<Field>) -> Self {
        Self { entity, fields }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a mapping, returning a normalized record in declared order.
    pub fn validate(&self, input: &Datum) -> Result<Record, ValidationError> {
        let Datum::Record(record) = input else {
            return Err(ValidationError::NotAMapping {
                entity: self.entity,
                found: input.kind(),
            });
        };

        if let Some(unknown) = record.keys().find(|key| self.field(key).is_none()) {
            return Err(ValidationError::UnexpectedField {
                entity: self.entity,
                field: unknown.to_string(),
            });
        }

        let mut normalized = Record::new();
        for field in &self.fields {
            match record.get(field.name) {
                Some(value) => {
                    normalized.insert(field.name, field.validator.validate(value, field.name)?);
                }
                None if field.optional => {}
                None => {
                    return Err(ValidationError::MissingField {
                        entity: self.entity,
                        field: field.name,
                    })
                }
            }
        }
        Ok(normalized)
    }
}

/// Input to `Schemed::validate`: raw data, or an entity that is already valid.
#[derive(Debug, Clone)]
pub enum Source<E> {
    Raw(Datum),
    Instance(E),
}

impl<E> From<Datum> for Source<E> {
    fn from(value: Datum) -> Self {
        Source::Raw(value)
    }
}

impl<E> From<Record> for Source<E> {
    fn from(value: Record) -> Self {
        Source::Raw(Datum::Record(value))
    }
}

impl<E> From<serde_json::Value> for Source<E> {
    fn from(value: serde_json::Value) -> Self {
        Source::Raw(value.into())
    }
}

impl<E> From<&str> for Source<E> {
    fn from(value: &str) -> Self {
        Source::Raw(value.into())
    }
}

/// A schema-governed entity backed by a validated snapshot.
pub trait Schemed: Sized {
    /// The entity's declared shape.
    fn shape() -> &'static Shape;

    /// Build the entity from a record that already passed `shape()`.
    fn from_record(record: Record) -> Result<Self, ValidationError>;

    /// The entity's current snapshot, in declared field order.
    fn to_record(&self) -> Record;

    /// Validate raw data into an entity; an existing instance is returned as is.
    fn validate(source: impl Into<Source<Self>>) -> Result<Self, ValidationError> {
        match source.into() {
            Source::Instance(entity) => Ok(entity),
            Source::Raw(datum) => Self::from_record(Self::shape().validate(&datum)?),
        }
    }

    /// The snapshot with `changes` overlaid, re-validated as a whole.
    fn merged(&self, changes: impl Into<Datum>) -> Result<Record, ValidationError> {
        let changes = match changes.into() {
            Datum::Record(record) => record,
            other => {
                return Err(ValidationError::NotAMapping {
                    entity: Self::shape().entity(),
                    found: other.kind(),
                })
            }
        };
        let mut merged = self.to_record();
        merged.overlay(changes);
        Self::shape().validate(&Datum::Record(merged))
    }

    /// A new snapshot with `changes` applied, or an error and no change.
    fn update(&self, changes: impl Into<Datum>) -> Result<Self, ValidationError> {
        Self::from_record(self.merged(changes)?)
    }

    /// Field names present in the snapshot.
    fn keys(&self) -> Vec<String> {
        self.to_record().keys().map(str::to_string).collect()
    }
}

/// Typed accessors used by `Schemed::from_record` implementations.
///
/// A record that went through its shape always has the expected variants;
/// a mismatch means the shape and the entity disagree, reported as a type
/// error rather than a panic.
pub(crate) struct Fields {
    record: Record,
}

impl Fields {
    pub(crate) fn new(record: Record) -> Self {
        Self { record }
    }

    fn take(&mut self, name: &'static str) -> Datum {
        self.record.remove(name).unwrap_or(Datum::Null)
    }

    pub(crate) fn string(&mut self, name: &'static str) -> Result<String, ValidationError> {
        match self.take(name) {
            Datum::Str(s) => Ok(s),
            other => Err(wrong_type(name, "string", &other)),
        }
    }

    pub(crate) fn opt_string(&mut self, name: &'static str) -> Result<Option<String>, ValidationError> {
        match self.take(name) {
            Datum::Null => Ok(None),
            Datum::Str(s) => Ok(Some(s)),
            other => Err(wrong_type(name, "string", &other)),
        }
    }

    pub(crate) fn int(&mut self, name: &'static str) -> Result<i64, ValidationError> {
        match self.take(name) {
            Datum::Int(i) => Ok(i),
            other => Err(wrong_type(name, "integer", &other)),
        }
    }

    pub(crate) fn float(&mut self, name: &'static str) -> Result<f64, ValidationError> {
        match self.take(name) {
            Datum::Float(f) => Ok(f),
            other => Err(wrong_type(name, "float", &other)),
        }
    }

    pub(crate) fn opt_float(&mut self, name: &'static str) -> Result<Option<f64>, ValidationError> {
        match self.take(name) {
            Datum::Null => Ok(None),
            Datum::Float(f) => Ok(Some(f)),
            other => Err(wrong_type(name, "float", &other)),
        }
    }

    pub(crate) fn timestamp(&mut self, name: &'static str) -> Result<Timestamp, ValidationError> {
        match self.take(name) {
            Datum::Timestamp(t) => Ok(t),
            other => Err(wrong_type(name, "timestamp", &other)),
        }
    }

    pub(crate) fn opt_timestamp(
        &mut self,
        name: &'static str,
    ) -> Result<Option<Timestamp>, ValidationError> {
        match self.take(name) {
            Datum::Null => Ok(None),
            Datum::Timestamp(t) => Ok(Some(t)),
            other => Err(wrong_type(name, "timestamp", &other)),
        }
    }

    pub(crate) fn identifier(&mut self, name: &'static str) -> Result<Uuid, ValidationError> {
        match self.take(name) {
            Datum::Identifier(id) => Ok(id),
            other => Err(wrong_type(name, "identifier", &other)),
        }
    }

    pub(crate) fn list(&mut self, name: &'static str) -> Result<Vec<Datum>, ValidationError> {
        match self.take(name) {
            Datum::List(items) => Ok(items),
            other => Err(wrong_type(name, "list", &other)),
        }
    }

    /// Whatever fields were not taken, in their original order.
    pub(crate) fn rest(self) -> Record {
        self.record
    }
}
