// used for date scalars
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
// used for regex scalars
use regex::{Regex, RegexBuilder};
// used to move literals in and out of JSON
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// used to print out readable forms of a literal
use std::fmt;
// used when parsing a literal from its notation
use std::str::FromStr;

use crate::error::{Result, SiftError};
use crate::notation;

/// A structured value as produced by the rule notation: a scalar, an ordered
/// sequence or a mapping from field names to literals.
///
/// Mapping keys are unique. Their order is kept for serialization but plays no
/// role in equality or matching.
#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Regex(RegexLiteral),
    Binary(Vec<u8>),
    Sequence(Vec<Literal>),
    Mapping(Vec<(String, Literal)>),
}

impl Literal {
    /// The not-a-number sentinel that failed reference lookups degrade to.
    pub fn nan() -> Self {
        Literal::Number(f64::NAN)
    }
    /// Builds a mapping, keeping the first position of a repeated key and its last value.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Literal)>,
    {
        let mut kept: Vec<(String, Literal)> = Vec::new();
        for (key, value) in entries {
            let key = key.into();
            match kept.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => kept.push((key, value)),
            }
        }
        Literal::Mapping(kept)
    }
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
    /// Resolves a JSON pointer (`/a/0/b`) inside this literal.
    pub fn pointer(&self, pointer: &str) -> Result<&Literal> {
        crate::pointer::get(self, pointer)
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            _ => None,
        }
    }
    /// The number as an integer, when it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Number(n) if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => Some(*n as i64),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Literal::Date(d) => Some(d),
            _ => None,
        }
    }
    pub fn as_regex(&self) -> Option<&RegexLiteral> {
        match self {
            Literal::Regex(r) => Some(r),
            _ => None,
        }
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
    /// The name `$type` compares against.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "boolean",
            Literal::Number(_) => "number",
            Literal::String(_) => "string",
            Literal::Date(_) => "date",
            Literal::Regex(_) => "regex",
            Literal::Binary(_) => "binary",
            Literal::Sequence(_) => "array",
            Literal::Mapping(_) => "object",
        }
    }
}

// Structural equality: mappings compare regardless of key order and NaN equals
// NaN, so that a parsed literal equals its re-parsed serialization. Matching
// uses its own comparison where NaN never equals anything.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Number(a), Literal::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Literal::String(a), Literal::String(b)) => a == b,
            (Literal::Date(a), Literal::Date(b)) => a == b,
            (Literal::Regex(a), Literal::Regex(b)) => a == b,
            (Literal::Binary(a), Literal::Binary(b)) => a == b,
            (Literal::Sequence(a), Literal::Sequence(b)) => a == b,
            (Literal::Mapping(a), Literal::Mapping(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| other.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", notation::stringify(self))
    }
}

impl FromStr for Literal {
    type Err = SiftError;
    fn from_str(s: &str) -> Result<Self> {
        notation::parse(s)
    }
}

// ------------- Regex -------------
/// A regular expression scalar written as `/source/flags`.
///
/// The flags `i`, `m`, `s` and `x` change how the pattern compiles, while `d`,
/// `g`, `u`, `v` and `y` are accepted and kept for serialization only.
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    source: String,
    flags: String,
    regex: Regex,
}

impl RegexLiteral {
    pub const FLAGS: &'static str = "dgimsuvxy";

    pub fn new(source: &str, flags: &str) -> Result<Self> {
        if let Some(flag) = flags.chars().find(|c| !Self::FLAGS.contains(*c)) {
            return Err(SiftError::parse(format!("unknown regex flag '{flag}' in /{source}/{flags}")));
        }
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()
            .map_err(|e| SiftError::parse(format!("invalid regex /{source}/{flags}: {e}")))?;
        Ok(Self { source: source.to_string(), flags: flags.to_string(), regex })
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn flags(&self) -> &str {
        &self.flags
    }
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl fmt::Display for RegexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", notation::stringify_regex(self))
    }
}

// ------------- Conversions -------------
impl From<bool> for Literal {
    fn from(b: bool) -> Self { Literal::Bool(b) }
}
impl From<f64> for Literal {
    fn from(n: f64) -> Self { Literal::Number(n) }
}
impl From<i64> for Literal {
    fn from(n: i64) -> Self { Literal::Number(n as f64) }
}
impl From<i32> for Literal {
    fn from(n: i32) -> Self { Literal::Number(n as f64) }
}
impl From<&str> for Literal {
    fn from(s: &str) -> Self { Literal::String(s.to_string()) }
}
impl From<String> for Literal {
    fn from(s: String) -> Self { Literal::String(s) }
}
impl From<DateTime<Utc>> for Literal {
    fn from(d: DateTime<Utc>) -> Self { Literal::Date(d) }
}
impl From<RegexLiteral> for Literal {
    fn from(r: RegexLiteral) -> Self { Literal::Regex(r) }
}
impl From<Vec<Literal>> for Literal {
    fn from(items: Vec<Literal>) -> Self { Literal::Sequence(items) }
}

impl From<serde_json::Value> for Literal {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Literal::Null,
            serde_json::Value::Bool(b) => Literal::Bool(b),
            serde_json::Value::Number(n) => Literal::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Literal::String(s),
            serde_json::Value::Array(items) => Literal::Sequence(items.into_iter().map(Literal::from).collect()),
            serde_json::Value::Object(entries) => Literal::mapping(entries.into_iter().map(|(k, v)| (k, Literal::from(v)))),
        }
    }
}

impl From<&Literal> for serde_json::Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => serde_json::Value::Null,
            Literal::Bool(b) => serde_json::Value::Bool(*b),
            Literal::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Literal::String(s) => serde_json::Value::String(s.clone()),
            Literal::Date(d) => serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Literal::Regex(r) => serde_json::Value::String(r.to_string()),
            Literal::Binary(bytes) => serde_json::Value::Array(bytes.iter().map(|b| serde_json::Value::from(*b)).collect()),
            Literal::Sequence(items) => serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect()),
            Literal::Mapping(entries) => serde_json::Value::Object(
                entries.iter().map(|(k, v)| (k.clone(), serde_json::Value::from(v))).collect(),
            ),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Literal::Null => serializer.serialize_unit(),
            Literal::Bool(b) => serializer.serialize_bool(*b),
            Literal::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Literal::Number(_) => serializer.serialize_unit(),
            Literal::String(s) => serializer.serialize_str(s),
            Literal::Date(d) => serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Literal::Regex(r) => serializer.serialize_str(&r.to_string()),
            Literal::Binary(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for b in bytes {
                    seq.serialize_element(b)?;
                }
                seq.end()
            }
            Literal::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Literal::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Literal::from)
    }
}

/// Milliseconds since the epoch as a date, the way numeric timestamps are read.
pub(crate) fn date_from_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}
