use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

// used to print out readable forms of a rule
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SiftError};
use crate::literal::Literal;
use crate::matcher::{MatchOptions, Predicate};
use crate::notation;
use crate::reference;

// ------------- Notation -------------
/// The separator tokens of the rule text notation,
/// `<head> --> <tail> #== <name>` with rules joined by `;\n`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Notation {
    pub head_tail_separator: String,
    pub name_separator: String,
    pub rule_separator: String,
}

impl Default for Notation {
    fn default() -> Self {
        Self {
            head_tail_separator: String::from("-->"),
            name_separator: String::from("#=="),
            rule_separator: String::from(";\n"),
        }
    }
}

// ------------- Head -------------
/// A head given either as a literal or as notation text still to be parsed.
#[derive(Debug, Clone)]
pub enum Head {
    Literal(Literal),
    Text(String),
}

impl From<Literal> for Head {
    fn from(literal: Literal) -> Self { Head::Literal(literal) }
}
impl From<&str> for Head {
    fn from(text: &str) -> Self { Head::Text(text.to_string()) }
}
impl From<String> for Head {
    fn from(text: String) -> Self { Head::Text(text) }
}

// ------------- Rule -------------
/// A head predicate paired with the tail it yields when the head matches.
///
/// Heads without `$ref` markers compile once, at construction. Heads with
/// markers are checked for unknown operators at construction and are
/// dereferenced and compiled on every match.
#[derive(Debug, Clone)]
pub struct Rule {
    head: Literal,
    tail: Literal,
    name: String,
    contains_references: bool,
    predicate: Option<Predicate>,
    options: MatchOptions,
}

impl Rule {
    pub fn new(head: Literal, tail: Option<Literal>, name: &str) -> Result<Self> {
        Self::build(head, tail, name.to_string())
    }
    /// Parses `<head> --> <tail> #== <name>`; tail and name are optional.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_text_with(text, None, "", &Notation::default())
    }
    pub fn from_head_text(head: &str, tail: Option<Literal>, name: &str) -> Result<Self> {
        Self::from_text_with(head, tail, name, &Notation::default())
    }
    /// Head text may still carry a tail or a name. A tail in the text wins
    /// over `tail`, a name in the text is only used when `name` is empty.
    pub fn from_text_with(text: &str, tail: Option<Literal>, name: &str, notation: &Notation) -> Result<Self> {
        let (head, embedded_tail, embedded_name) = match split_head(text, &notation.head_tail_separator) {
            Some((head, rest)) => {
                let (tail, embedded_name) = split_named(rest, &notation.name_separator)?;
                (head, Some(tail), embedded_name)
            }
            None => {
                let (head, embedded_name) = split_named(text, &notation.name_separator)?;
                (head, None, embedded_name)
            }
        };
        let name = match embedded_name {
            Some(embedded) if name.is_empty() => embedded,
            _ => name,
        };
        Self::build(head, embedded_tail.or(tail), name.to_string())
    }
    pub fn from_head(head: Head, tail: Option<Literal>, name: &str, notation: &Notation) -> Result<Self> {
        match head {
            Head::Literal(head) => Self::new(head, tail, name),
            Head::Text(text) => Self::from_text_with(&text, tail, name, notation),
        }
    }
    /// Reads `[head, tail, name?]`, where a string head is notation text.
    pub fn from_sequence(parts: &Literal) -> Result<Self> {
        Self::from_sequence_with(parts, &Notation::default())
    }
    pub fn from_sequence_with(parts: &Literal, notation: &Notation) -> Result<Self> {
        let Literal::Sequence(items) = parts else {
            return Err(SiftError::InvalidRule(format!("expected [head, tail, name?], got {parts}")));
        };
        let name = match items.get(2) {
            None => "",
            Some(Literal::String(name)) => name.as_str(),
            Some(other) => return Err(SiftError::InvalidRule(format!("rule name must be a string, got {other}"))),
        };
        let tail = items.get(1).cloned();
        match items.first() {
            Some(Literal::String(text)) if items.len() <= 3 => Self::from_text_with(text, tail, name, notation),
            Some(head) if items.len() <= 3 => Self::new(head.clone(), tail, name),
            _ => Err(SiftError::InvalidRule(format!("expected [head, tail, name?], got {parts}"))),
        }
    }

    fn build(head: Literal, tail: Option<Literal>, name: String) -> Result<Self> {
        let contains_references = reference::contains_references(&head);
        let predicate = if contains_references {
            Predicate::check_operators(&head)?;
            None
        } else {
            Some(Predicate::compile(&head)?)
        };
        Ok(Self {
            head,
            tail: tail.unwrap_or(Literal::Bool(true)),
            name: name.trim().to_string(),
            contains_references,
            predicate,
            options: MatchOptions::default(),
        })
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }
    pub fn head(&self) -> &Literal {
        &self.head
    }
    pub fn tail(&self) -> &Literal {
        &self.tail
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn contains_references(&self) -> bool {
        self.contains_references
    }
    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn matches(&self, record: &Literal) -> Result<bool> {
        match &self.predicate {
            Some(predicate) => Ok(predicate.test(record, &self.options)),
            None => {
                let resolved = reference::dereference(&self.head, record);
                if self.options.trace_references {
                    debug!(rule = %self, head = %resolved, "dereferenced head");
                }
                Ok(Predicate::compile(&resolved)?.test(record, &self.options))
            }
        }
    }
    /// The tail when the head matches `record`.
    pub fn apply(&self, record: &Literal) -> Result<Option<&Literal>> {
        Ok(self.matches(record)?.then_some(&self.tail))
    }

    pub fn to_text(&self) -> String {
        self.to_text_with(&Notation::default())
    }
    pub fn to_text_with(&self, notation: &Notation) -> String {
        let mut text = format!(
            "{} {} {}",
            notation::stringify(&self.head),
            notation.head_tail_separator,
            notation::stringify(&self.tail)
        )
        .replace('\n', "");
        if !self.name.is_empty() {
            text.push_str(&format!(" {} {}", notation.name_separator, self.name));
        }
        text
    }
    pub fn to_pair(&self) -> (&Literal, &Literal) {
        (&self.head, &self.tail)
    }
}

// A separator only counts where the text before it reads as a literal, so
// the same token inside a string or a regex is left alone.
fn split_head<'t>(text: &'t str, separator: &str) -> Option<(Literal, &'t str)> {
    if separator.is_empty() {
        return None;
    }
    text.match_indices(separator).find_map(|(at, _)| {
        let head = notation::parse(text[..at].trim()).ok()?;
        Some((head, &text[at + separator.len()..]))
    })
}

fn split_named<'t>(text: &'t str, separator: &str) -> Result<(Literal, Option<&'t str>)> {
    match split_head(text, separator) {
        Some((literal, name)) => Ok((literal, Some(name.trim()))),
        None => Ok((notation::parse(text.trim())?, None)),
    }
}

// Rules are interchangeable when they read the same.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.to_text() == other.to_text()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl FromStr for Rule {
    type Err = SiftError;
    fn from_str(s: &str) -> Result<Self> {
        Rule::from_text(s)
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.head)?;
        pair.serialize_element(&self.tail)?;
        pair.end()
    }
}
