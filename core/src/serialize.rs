//! Canonical JSON encoding of entities.
//!
//! Fields are written in declared order, or sorted by key when asked.
//! Timestamps render in the RFC 2822 style layout, identifiers as lowercase
//! hyphenated strings, nested records as objects. Separators are `", "` and
//! `": "`, so `{"description": "Foo bar", "entry": null}` is the canonical
//! form rather than the compact one. Non-finite floats have no JSON form and
//! fail the encoding.
//!
//! There is no caller-supplied encoder for unknown value types: `Datum` is a
//! closed set, and every variant has a fixed encoding here.

use std::io;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::ser::{Formatter, PrettyFormatter};

use crate::coerce::format_timestamp;
use crate::schema::{Datum, Record, Schemed};

/// Encoding options for `to_json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Emit object keys in lexicographic order instead of declared order.
    pub sort_keys: bool,
    /// Pretty-print with this many spaces per level.
    pub indent: Option<usize>,
}

impl JsonOptions {
    pub fn sorted() -> Self {
        Self {
            sort_keys: true,
            indent: None,
        }
    }
}

/// Encode an entity's snapshot as JSON.
pub fn to_json<E: Schemed>(entity: &E, options: JsonOptions) -> Result<String, serde_json::Error> {
    record_to_json(&entity.to_record(), options)
}

/// Encode a record as JSON.
pub fn record_to_json(record: &Record, options: JsonOptions) -> Result<String, serde_json::Error> {
    let value = Canonical {
        datum: CanonicalRef::Record(record),
        sort_keys: options.sort_keys,
    };
    let mut out = Vec::with_capacity(128);
    match options.indent {
        Some(width) => {
            let indent = vec![b' '; width];
            let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
            value.serialize(&mut ser)?;
        }
        None => {
            let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
            value.serialize(&mut ser)?;
        }
    }
    String::from_utf8(out).map_err(serde_json::Error::custom)
}

/// Compact layout with a space after every `,` and `:`; everything else
/// uses the `Formatter` defaults.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

#[derive(Clone, Copy)]
enum CanonicalRef<'a> {
    Datum(&'a Datum),
    Record(&'a Record),
}

struct Canonical<'a> {
    datum: CanonicalRef<'a>,
    sort_keys: bool,
}

impl Canonical<'_> {
    fn nested<'b>(&self, datum: &'b Datum) -> Canonical<'b> {
        Canonical {
            datum: CanonicalRef::Datum(datum),
            sort_keys: self.sort_keys,
        }
    }

    fn serialize_record<S: Serializer>(&self, record: &Record, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&str, &Datum)> = record.iter().collect();
        if self.sort_keys {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, &self.nested(value))?;
        }
        map.end()
    }
}

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let datum = match self.datum {
            CanonicalRef::Record(record) => return self.serialize_record(record, serializer),
            CanonicalRef::Datum(datum) => datum,
        };
        match datum {
            Datum::Null => serializer.serialize_unit(),
            Datum::Bool(b) => serializer.serialize_bool(*b),
            Datum::Int(i) => serializer.serialize_i64(*i),
            Datum::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Datum::Float(f) => Err(S::Error::custom(format!("{f} has no JSON representation"))),
            Datum::Str(s) => serializer.serialize_str(s),
            Datum::Timestamp(ts) => serializer.serialize_str(&format_timestamp(ts)),
            Datum::Identifier(id) => serializer.serialize_str(&id.hyphenated().to_string()),
            Datum::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.nested(item))?;
                }
                seq.end()
            }
            Datum::Record(record) => self.serialize_record(record, serializer),
        }
    }
}
