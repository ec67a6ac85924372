//! Evaluates a head literal as a predicate over a record.
//!
//! A head compiles into a [`Predicate`] tree once and is then tested against
//! any number of records:
//!
//! * a mapping head treats every plain key as a dot delimited field path and
//!   every `$` key as an [`Operator`] applied to the value at hand; all of them
//!   must hold, fields of the record the head does not mention are ignored
//! * any other head must equal the record
//!
//! A field that does not resolve is *undefined*. Only `null` equality, `$in`
//! with a `null` member, `$exists: false` and the negating operators hold for
//! an undefined field. When a field holds a sequence, scalar tests hold if the
//! whole sequence or any of its elements satisfies them.

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, SiftError};
use crate::literal::{Literal, RegexLiteral, date_from_millis};
use crate::notation::parse_date;
use crate::reference::REFERENCE_KEY;

lazy_static! {
    static ref DURATION: Regex = Regex::new(
        r"^\s*(\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?|d|days?|w|weeks?|y|years?)\s*$"
    ).unwrap();
}

// ------------- Options -------------
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Log every dereferenced head at debug level.
    pub trace_references: bool,
    /// The instant relative date operators measure from. The clock is read
    /// on every match when unset.
    #[serde(skip)]
    pub now: Option<DateTime<Utc>>,
}

impl MatchOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now), ..Self::default() }
    }
}

// ------------- Operators -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Regex,
    Options,
    Exists,
    Not,
    And,
    Or,
    Nor,
    All,
    Size,
    ElemMatch,
    Mod,
    Type,
    OlderThan,
    NewerThan,
}

impl Operator {
    pub const PREFIX: char = '$';
    pub const ALL: [Operator; 22] = [
        Operator::Eq, Operator::Ne, Operator::Gt, Operator::Gte, Operator::Lt, Operator::Lte,
        Operator::In, Operator::Nin, Operator::Regex, Operator::Options, Operator::Exists,
        Operator::Not, Operator::And, Operator::Or, Operator::Nor, Operator::All, Operator::Size,
        Operator::ElemMatch, Operator::Mod, Operator::Type, Operator::OlderThan, Operator::NewerThan,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Nin => "$nin",
            Operator::Regex => "$regex",
            Operator::Options => "$options",
            Operator::Exists => "$exists",
            Operator::Not => "$not",
            Operator::And => "$and",
            Operator::Or => "$or",
            Operator::Nor => "$nor",
            Operator::All => "$all",
            Operator::Size => "$size",
            Operator::ElemMatch => "$elemMatch",
            Operator::Mod => "$mod",
            Operator::Type => "$type",
            Operator::OlderThan => "$olderThan",
            Operator::NewerThan => "$newerThan",
        }
    }
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }
    fn lookup(key: &str) -> Result<Self> {
        Self::from_key(key).ok_or_else(|| SiftError::UnsupportedOperator(key.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Age {
    OlderThan,
    NewerThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Measured back from "now".
    Relative(TimeDelta),
    Absolute(DateTime<Utc>),
}

impl Cutoff {
    fn instant(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Cutoff::Relative(delta) => now.checked_sub_signed(*delta),
            Cutoff::Absolute(instant) => Some(*instant),
        }
    }
}

// ------------- Predicate -------------
#[derive(Debug, Clone)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Nor(Vec<Predicate>),
    Not(Box<Predicate>),
    Field(Vec<String>, Box<Predicate>),
    Equals(Literal),
    Compare(Comparison, Literal),
    In(Vec<Literal>),
    Matches(RegexLiteral),
    Exists(bool),
    All(Vec<Literal>),
    Size(usize),
    ElemMatch(Box<Predicate>),
    Mod(f64, f64),
    Type(String),
    Age(Age, Cutoff),
}

impl Predicate {
    pub fn compile(head: &Literal) -> Result<Predicate> {
        match head {
            Literal::Mapping(entries) => Self::compile_mapping(entries),
            other => Ok(Self::equals(other)),
        }
    }

    fn compile_mapping(entries: &[(String, Literal)]) -> Result<Predicate> {
        let mut conjuncts = Vec::with_capacity(entries.len());
        for (key, operand) in entries {
            if key.starts_with(Operator::PREFIX) {
                let operator = Operator::lookup(key)?;
                if let Some(predicate) = Self::compile_operator(operator, operand, entries)? {
                    conjuncts.push(predicate);
                }
            } else {
                let path = key.split('.').map(str::to_string).collect();
                // an empty sub-head still needs something to be there
                let predicate = match operand {
                    Literal::Mapping(nested) if nested.is_empty() => Predicate::Exists(true),
                    other => Self::compile(other)?,
                };
                conjuncts.push(Predicate::Field(path, Box::new(predicate)));
            }
        }
        Ok(match conjuncts.len() {
            1 => conjuncts.remove(0),
            _ => Predicate::And(conjuncts),
        })
    }

    // `siblings` are the other keys of the mapping the operator appears in.
    fn compile_operator(operator: Operator, operand: &Literal, siblings: &[(String, Literal)]) -> Result<Option<Predicate>> {
        let predicate = match operator {
            Operator::Eq => Self::equals(operand),
            Operator::Ne => Predicate::Not(Box::new(Self::equals(operand))),
            Operator::Gt => Predicate::Compare(Comparison::Gt, operand.clone()),
            Operator::Gte => Predicate::Compare(Comparison::Gte, operand.clone()),
            Operator::Lt => Predicate::Compare(Comparison::Lt, operand.clone()),
            Operator::Lte => Predicate::Compare(Comparison::Lte, operand.clone()),
            Operator::In => Predicate::In(sequence(operator, operand)?.to_vec()),
            Operator::Nin => Predicate::Not(Box::new(Predicate::In(sequence(operator, operand)?.to_vec()))),
            Operator::Regex => {
                let options = siblings
                    .iter()
                    .find(|(k, _)| k == Operator::Options.key())
                    .map(|(_, v)| v);
                Predicate::Matches(compile_regex(operand, options)?)
            }
            // read together with $regex
            Operator::Options => return Ok(None),
            Operator::Exists => Predicate::Exists(truthy(operator, operand)?),
            Operator::Not => Predicate::Not(Box::new(Self::compile(operand)?)),
            Operator::And => Predicate::And(Self::compile_all(operator, operand)?),
            Operator::Or => Predicate::Or(Self::compile_all(operator, operand)?),
            Operator::Nor => Predicate::Nor(Self::compile_all(operator, operand)?),
            Operator::All => Predicate::All(sequence(operator, operand)?.to_vec()),
            Operator::Size => match operand.as_f64() {
                Some(n) if n >= 0.0 && n.fract() == 0.0 => Predicate::Size(n as usize),
                _ => return Err(SiftError::operand(operator.key(), "expected a non-negative integer")),
            },
            Operator::ElemMatch => Predicate::ElemMatch(Box::new(Self::compile(operand)?)),
            Operator::Mod => match sequence(operator, operand)? {
                [Literal::Number(divisor), Literal::Number(remainder)] => Predicate::Mod(*divisor, *remainder),
                _ => return Err(SiftError::operand(operator.key(), "expected [divisor, remainder]")),
            },
            Operator::Type => match operand.as_str() {
                Some(name) if TYPE_NAMES.contains(&name) => Predicate::Type(name.to_string()),
                _ => return Err(SiftError::operand(operator.key(), format!("expected one of {}", TYPE_NAMES.join(", ")))),
            },
            Operator::OlderThan => Predicate::Age(Age::OlderThan, cutoff(operator, operand)?),
            Operator::NewerThan => Predicate::Age(Age::NewerThan, cutoff(operator, operand)?),
        };
        Ok(Some(predicate))
    }

    fn compile_all(operator: Operator, operand: &Literal) -> Result<Vec<Predicate>> {
        sequence(operator, operand)?.iter().map(Self::compile).collect()
    }

    fn equals(expected: &Literal) -> Predicate {
        match expected {
            Literal::Regex(r) => Predicate::Matches(r.clone()),
            other => Predicate::Equals(other.clone()),
        }
    }

    /// Fails on the first `$` key that is not an operator. Reference markers
    /// are skipped, since what they resolve to is only known per record.
    pub fn check_operators(head: &Literal) -> Result<()> {
        match head {
            Literal::Mapping(entries) if entries.iter().any(|(k, _)| k == REFERENCE_KEY) => Ok(()),
            Literal::Mapping(entries) => {
                for (key, value) in entries {
                    if key.starts_with(Operator::PREFIX) {
                        Operator::lookup(key)?;
                    }
                    Self::check_operators(value)?;
                }
                Ok(())
            }
            Literal::Sequence(items) => items.iter().try_for_each(Self::check_operators),
            _ => Ok(()),
        }
    }

    pub fn test(&self, record: &Literal, options: &MatchOptions) -> bool {
        let now = options.now.unwrap_or_else(Utc::now);
        self.holds(&[record], now)
    }

    // `values` is everything a field path selected; empty means undefined.
    fn holds(&self, values: &[&Literal], now: DateTime<Utc>) -> bool {
        match self {
            Predicate::And(all) => all.iter().all(|p| p.holds(values, now)),
            Predicate::Or(any) => any.iter().any(|p| p.holds(values, now)),
            Predicate::Nor(none) => !none.iter().any(|p| p.holds(values, now)),
            Predicate::Not(inner) => !inner.holds(values, now),
            Predicate::Field(path, inner) => inner.holds(&select(values, path), now),
            Predicate::Exists(expected) => !values.is_empty() == *expected,
            Predicate::Size(n) => values.iter().any(|v| matches!(v, Literal::Sequence(items) if items.len() == *n)),
            Predicate::All(expected) => values.iter().any(|v| match v {
                Literal::Sequence(items) => expected.iter().all(|e| items.iter().any(|i| equal_or_match(e, i))),
                _ => false,
            }),
            Predicate::ElemMatch(inner) => values.iter().any(|v| match v {
                Literal::Sequence(items) => items.iter().any(|i| inner.holds(&[i], now)),
                _ => false,
            }),
            leaf if values.is_empty() => leaf.accepts_undefined(),
            leaf => values.iter().any(|v| {
                leaf.accepts(v, now)
                    || matches!(v, Literal::Sequence(items) if items.iter().any(|i| leaf.accepts(i, now)))
            }),
        }
    }

    fn accepts(&self, value: &Literal, now: DateTime<Utc>) -> bool {
        match self {
            Predicate::Equals(expected) => same(expected, value),
            Predicate::Compare(comparison, expected) => compare(value, expected).is_some_and(|o| comparison.holds(o)),
            Predicate::In(candidates) => candidates.iter().any(|c| equal_or_match(c, value)),
            Predicate::Matches(regex) => match value {
                Literal::String(s) => regex.is_match(s),
                Literal::Regex(r) => r == regex,
                _ => false,
            },
            Predicate::Mod(divisor, remainder) => value.as_f64().is_some_and(|n| n % divisor == *remainder),
            Predicate::Type(name) => value.type_name() == name,
            Predicate::Age(age, cutoff) => match (date_of(value), cutoff.instant(now)) {
                (Some(date), Some(instant)) => match age {
                    Age::OlderThan => date < instant,
                    Age::NewerThan => date > instant,
                },
                _ => false,
            },
            _ => false,
        }
    }

    fn accepts_undefined(&self) -> bool {
        match self {
            Predicate::Equals(expected) => expected.is_null(),
            Predicate::In(candidates) => candidates.iter().any(Literal::is_null),
            _ => false,
        }
    }
}

/// Compiles `head` and tests it against `record` with default options.
pub fn matches(head: &Literal, record: &Literal) -> Result<bool> {
    matches_with(head, record, &MatchOptions::default())
}

pub fn matches_with(head: &Literal, record: &Literal, options: &MatchOptions) -> Result<bool> {
    Ok(Predicate::compile(head)?.test(record, options))
}

// ------------- Helpers -------------
const TYPE_NAMES: [&str; 9] = ["null", "boolean", "number", "string", "date", "regex", "binary", "array", "object"];

fn select<'a>(values: &[&'a Literal], path: &[String]) -> Vec<&'a Literal> {
    let mut current: Vec<&'a Literal> = values.to_vec();
    for segment in path {
        let mut next = Vec::new();
        for value in current {
            match value {
                Literal::Mapping(_) => next.extend(value.get(segment)),
                Literal::Sequence(items) => match segment.parse::<usize>() {
                    Ok(index) => next.extend(items.get(index)),
                    Err(_) => next.extend(items.iter().filter_map(|item| item.get(segment))),
                },
                _ => {}
            }
        }
        current = next;
    }
    current
}

// Deep equality where NaN equals nothing, not even itself.
fn same(a: &Literal, b: &Literal) -> bool {
    match (a, b) {
        (Literal::Number(x), Literal::Number(y)) => x == y,
        (Literal::Sequence(xs), Literal::Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same(x, y))
        }
        (Literal::Mapping(xs), Literal::Mapping(ys)) => {
            xs.len() == ys.len() && xs.iter().all(|(k, x)| b.get(k).is_some_and(|y| same(x, y)))
        }
        _ => a == b,
    }
}

fn equal_or_match(expected: &Literal, value: &Literal) -> bool {
    match (expected, value) {
        (Literal::Regex(r), Literal::String(s)) => r.is_match(s),
        _ => same(expected, value),
    }
}

fn compare(value: &Literal, expected: &Literal) -> Option<Ordering> {
    match (value, expected) {
        (Literal::Number(a), Literal::Number(b)) => a.partial_cmp(b),
        (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
        (Literal::Date(a), Literal::Date(b)) => Some(a.cmp(b)),
        (Literal::String(a), Literal::Date(b)) => parse_date(a).map(|a| a.cmp(b)),
        (Literal::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn date_of(value: &Literal) -> Option<DateTime<Utc>> {
    match value {
        Literal::Date(d) => Some(*d),
        Literal::String(s) => parse_date(s),
        Literal::Number(ms) => date_from_millis(*ms),
        _ => None,
    }
}

fn sequence(operator: Operator, operand: &Literal) -> Result<&[Literal]> {
    match operand {
        Literal::Sequence(items) => Ok(items),
        _ => Err(SiftError::operand(operator.key(), "expected an array")),
    }
}

fn truthy(operator: Operator, operand: &Literal) -> Result<bool> {
    match operand {
        Literal::Bool(b) => Ok(*b),
        Literal::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
        _ => Err(SiftError::operand(operator.key(), "expected a boolean")),
    }
}

fn compile_regex(operand: &Literal, options: Option<&Literal>) -> Result<RegexLiteral> {
    let options = match options {
        None => "",
        Some(Literal::String(s)) => s.as_str(),
        Some(_) => return Err(SiftError::operand(Operator::Options.key(), "expected a string")),
    };
    let (source, flags) = match operand {
        Literal::String(s) => (s.as_str(), options.to_string()),
        Literal::Regex(r) if options.is_empty() => return Ok(r.clone()),
        Literal::Regex(r) => (r.source(), format!("{}{}", r.flags(), options)),
        _ => return Err(SiftError::operand(Operator::Regex.key(), "expected a string or regex")),
    };
    RegexLiteral::new(source, &flags).map_err(|e| SiftError::operand(Operator::Regex.key(), e.to_string()))
}

fn cutoff(operator: Operator, operand: &Literal) -> Result<Cutoff> {
    let delta = match operand {
        Literal::Date(d) => return Ok(Cutoff::Absolute(*d)),
        Literal::Number(ms) if ms.is_finite() => TimeDelta::try_milliseconds(*ms as i64),
        Literal::String(s) => match parse_date(s) {
            Some(d) => return Ok(Cutoff::Absolute(d)),
            None => parse_duration(s),
        },
        _ => None,
    };
    delta
        .map(Cutoff::Relative)
        .ok_or_else(|| SiftError::operand(operator.key(), format!("expected a duration or date, got {operand}")))
}

/// `"90 minutes"`, `"2h"`, `"1.5 days"`.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let captures = DURATION.captures(text)?;
    let amount: f64 = captures[1].parse().ok()?;
    let unit_ms = match &captures[2] {
        "ms" | "millisecond" | "milliseconds" => 1.0,
        u if u.starts_with('s') => 1_000.0,
        u if u.starts_with('m') => 60_000.0,
        u if u.starts_with('h') => 3_600_000.0,
        u if u.starts_with('d') => 86_400_000.0,
        u if u.starts_with('w') => 604_800_000.0,
        _ => 31_557_600_000.0,
    };
    TimeDelta::try_milliseconds((amount * unit_ms) as i64)
}
