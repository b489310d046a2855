//! Document identifiers and their canonical string form.
//!
//! Every keyed container in liveset indexes documents by the canonical string
//! produced by [`Id::encode`]. The encoding is type-tagged so that, for
//! example, the number `1`, the string `"1"` and a timestamp at epoch
//! millisecond `1` never share a key.
//!
//! Encoding rules:
//!
//! - A string encodes as itself, unless it begins with `{`, `[` or `"`; those
//!   are written as a JSON string literal so they cannot be mistaken for a
//!   structured encoding.
//! - A top-level number encodes as `{"$type":"number","$value":n}`.
//! - A timestamp encodes as `{"$type":"date","$value":millis}`.
//! - An object id encodes as `{"$type":"oid","$value":"<hex>"}`.
//! - Arrays and objects encode as JSON; nested strings and numbers are plain
//!   JSON values, nested timestamps and object ids use their tags. An object
//!   with its own `$type` key is wrapped as `{"$type":"object","$value":{..}}`.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

const TYPE_KEY: &str = "$type";
const VALUE_KEY: &str = "$value";

const TAG_DATE: &str = "date";
const TAG_OID: &str = "oid";
const TAG_NUMBER: &str = "number";
const TAG_OBJECT: &str = "object";

/// A document identifier.
#[derive(Clone, Debug, PartialEq)]
pub enum Id {
    /// A plain string id.
    String(String),
    /// A numeric id.
    Number(Number),
    /// A point in time, in milliseconds since the Unix epoch.
    Timestamp(i64),
    /// A database object id in hex form.
    ObjectId(String),
    /// A positional composite id.
    Array(Vec<Id>),
    /// A keyed composite id.
    Object(BTreeMap<String, Id>),
}

impl Id {
    /// Creates a numeric id from a float. Returns `None` for NaN or infinity.
    /// Negative zero becomes zero.
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(|n| Id::Number(canonical(n)))
    }

    /// Creates a timestamp id from epoch milliseconds.
    #[inline]
    pub fn timestamp(millis: i64) -> Self {
        Id::Timestamp(millis)
    }

    /// Creates a timestamp id, truncating to millisecond precision.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Id::Timestamp(datetime.timestamp_millis())
    }

    /// Creates an object id from its hex representation.
    pub fn object_id(hex: impl Into<String>) -> Self {
        Id::ObjectId(hex.into())
    }

    /// Returns the timestamp as a `DateTime`, if this is a timestamp id.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Id::Timestamp(millis) => DateTime::from_timestamp_millis(*millis),
            _ => None,
        }
    }

    /// Returns the string, if this is a string id.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Id::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the canonical string form of this id.
    pub fn encode(&self) -> String {
        match self {
            Id::String(s) if !needs_quoting(s) => s.clone(),
            Id::String(s) => Value::String(s.clone()).to_string(),
            Id::Number(n) => tagged(TAG_NUMBER, Value::Number(canonical(n.clone()))).to_string(),
            other => to_json(other).to_string(),
        }
    }

    /// Reconstructs an id from its canonical string form.
    pub fn decode(encoded: &str) -> Result<Self> {
        if !needs_quoting(encoded) {
            return Ok(Id::String(encoded.to_string()));
        }
        let value: Value = serde_json::from_str(encoded)
            .map_err(|e| Error::malformed_id(encoded, e.to_string()))?;
        from_json(value).map_err(|e| match e {
            Error::MalformedId { message, .. } => Error::malformed_id(encoded, message),
            other => other,
        })
    }
}

fn needs_quoting(s: &str) -> bool {
    matches!(s.as_bytes().first(), Some(b'{' | b'[' | b'"'))
}

fn tagged(tag: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), Value::String(tag.to_string()));
    map.insert(VALUE_KEY.to_string(), value);
    Value::Object(map)
}

fn to_json(id: &Id) -> Value {
    match id {
        Id::String(s) => Value::String(s.clone()),
        Id::Number(n) => Value::Number(canonical(n.clone())),
        Id::Timestamp(millis) => tagged(TAG_DATE, Value::from(*millis)),
        Id::ObjectId(hex) => tagged(TAG_OID, Value::String(hex.clone())),
        Id::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        Id::Object(fields) => {
            let map: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect();
            if fields.contains_key(TYPE_KEY) {
                tagged(TAG_OBJECT, Value::Object(map))
            } else {
                Value::Object(map)
            }
        }
    }
}

/// Folds `-0.0` into `0.0`; the two compare equal and must encode alike.
fn canonical(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => Number::from_f64(0.0).unwrap_or(n),
        _ => n,
    }
}

fn from_json(value: Value) -> Result<Id> {
    match value {
        Value::String(s) => Ok(Id::String(s)),
        Value::Number(n) => Ok(Id::Number(canonical(n))),
        Value::Array(items) => items
            .into_iter()
            .map(from_json)
            .collect::<Result<Vec<_>>>()
            .map(Id::Array),
        Value::Object(map) if map.contains_key(TYPE_KEY) => from_tagged(map),
        Value::Object(map) => object_from_json(map),
        Value::Bool(_) | Value::Null => Err(Error::malformed_id(
            "",
            "booleans and null cannot be identifiers",
        )),
    }
}

fn object_from_json(map: Map<String, Value>) -> Result<Id> {
    map.into_iter()
        .map(|(k, v)| from_json(v).map(|id| (k, id)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map(Id::Object)
}

fn from_tagged(mut map: Map<String, Value>) -> Result<Id> {
    let tag = match map.remove(TYPE_KEY) {
        Some(Value::String(tag)) => tag,
        _ => return Err(Error::malformed_id("", "$type must be a string")),
    };
    let value = map
        .remove(VALUE_KEY)
        .ok_or_else(|| Error::malformed_id("", "tagged identifier without $value"))?;
    if !map.is_empty() {
        return Err(Error::malformed_id("", "unexpected keys next to $type"));
    }
    match (tag.as_str(), value) {
        (TAG_DATE, Value::Number(n)) => n
            .as_i64()
            .map(Id::Timestamp)
            .ok_or_else(|| Error::malformed_id("", "date value must be an integer")),
        (TAG_OID, Value::String(hex)) => Ok(Id::ObjectId(hex)),
        (TAG_NUMBER, Value::Number(n)) => Ok(Id::Number(canonical(n))),
        (TAG_OBJECT, Value::Object(inner)) => object_from_json(inner),
        (TAG_DATE | TAG_OID | TAG_NUMBER | TAG_OBJECT, _) => Err(Error::malformed_id(
            "",
            format!("wrong value type for ${tag}"),
        )),
        _ => Err(Error::unsupported_id_tag(tag)),
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<&str> for Id {
    fn from(v: &str) -> Self {
        Id::String(v.to_string())
    }
}

impl From<String> for Id {
    fn from(v: String) -> Self {
        Id::String(v)
    }
}

impl From<i64> for Id {
    fn from(v: i64) -> Self {
        Id::Number(Number::from(v))
    }
}

impl From<u64> for Id {
    fn from(v: u64) -> Self {
        Id::Number(Number::from(v))
    }
}

impl From<DateTime<Utc>> for Id {
    fn from(v: DateTime<Utc>) -> Self {
        Id::from_datetime(v)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Id::decode(&encoded).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(id: Id) {
        let encoded = id.encode();
        assert_eq!(Id::decode(&encoded), Ok(id), "roundtrip of {}", encoded);
    }

    #[test]
    fn test_plain_string_encodes_as_itself() {
        assert_eq!(Id::from("abc").encode(), "abc");
        assert_eq!(Id::from("").encode(), "");
        assert_eq!(Id::from("1").encode(), "1");
    }

    #[test]
    fn test_string_roundtrip() {
        roundtrip(Id::from("abc"));
        roundtrip(Id::from(""));
        roundtrip(Id::from("{not json"));
        roundtrip(Id::from("[1,2]"));
        roundtrip(Id::from("\"quoted\""));
    }

    #[test]
    fn test_number_roundtrip() {
        roundtrip(Id::from(1i64));
        roundtrip(Id::from(-42i64));
        roundtrip(Id::from(u64::MAX));
        roundtrip(Id::float(1.5).unwrap());
    }

    #[test]
    fn test_float_rejects_nan() {
        assert!(Id::float(f64::NAN).is_none());
        assert!(Id::float(f64::INFINITY).is_none());
    }

    #[test]
    fn test_negative_zero_encodes_as_zero() {
        let neg = Id::float(-0.0).unwrap();
        let pos = Id::float(0.0).unwrap();
        assert_eq!(neg, pos);
        assert_eq!(neg.encode(), pos.encode());

        let decoded = Id::decode(r#"{"$type":"number","$value":-0.0}"#).unwrap();
        assert_eq!(decoded.encode(), pos.encode());
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let id = Id::timestamp(1_700_000_000_123);
        assert_eq!(id.encode(), r#"{"$type":"date","$value":1700000000123}"#);
        roundtrip(id);
    }

    #[test]
    fn test_datetime_conversion() {
        let dt = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let id = Id::from(dt);
        assert_eq!(id, Id::Timestamp(1_700_000_000_123));
        assert_eq!(id.as_datetime(), Some(dt));
        assert_eq!(Id::from("x").as_datetime(), None);
    }

    #[test]
    fn test_composite_roundtrip() {
        let mut fields = BTreeMap::new();
        fields.insert("tenant".to_string(), Id::from("acme"));
        fields.insert("seq".to_string(), Id::from(7i64));
        fields.insert("at".to_string(), Id::timestamp(5));
        roundtrip(Id::Object(fields));

        roundtrip(Id::Array(vec![
            Id::from("a"),
            Id::from(1i64),
            Id::object_id("65a1f0c2e4b0a1b2c3d4e5f6"),
        ]));
    }

    #[test]
    fn test_object_with_type_key_is_wrapped() {
        let mut fields = BTreeMap::new();
        fields.insert("$type".to_string(), Id::from("date"));
        fields.insert("$value".to_string(), Id::from(5i64));
        let id = Id::Object(fields);
        assert!(id.encode().contains(r#""$type":"object""#));
        assert_ne!(id.encode(), Id::timestamp(5).encode());
        roundtrip(id);
    }

    #[test]
    fn test_no_collisions_between_kinds() {
        let ids = vec![
            Id::from("1"),
            Id::from(1i64),
            Id::timestamp(1),
            Id::object_id("1"),
            Id::Array(vec![Id::from(1i64)]),
            Id::from("[1]"),
            Id::from(r#"{"$type":"date","$value":1}"#),
        ];
        let encoded: Vec<String> = ids.iter().map(Id::encode).collect();
        for (i, a) in encoded.iter().enumerate() {
            for b in encoded.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_decode_unsupported_tag() {
        let err = Id::decode(r#"{"$type":"regex","$value":"a+"}"#).unwrap_err();
        assert_eq!(err, Error::unsupported_id_tag("regex"));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            Id::decode("{broken"),
            Err(Error::MalformedId { .. })
        ));
        assert!(matches!(
            Id::decode("[true]"),
            Err(Error::MalformedId { .. })
        ));
        assert!(matches!(
            Id::decode(r#"{"$type":"date","$value":"soon"}"#),
            Err(Error::MalformedId { .. })
        ));
    }

    #[test]
    fn test_serde_uses_canonical_form() {
        let id = Id::timestamp(9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, serde_json::to_string(&id.encode()).unwrap());
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_display_matches_encode() {
        let id = Id::from(3i64);
        assert_eq!(id.to_string(), id.encode());
    }
}
