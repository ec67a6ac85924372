use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, SiftError};
use crate::literal::Literal;
use crate::matcher::MatchOptions;
use crate::rule::{Head, Notation, Rule};

// ------------- Specs -------------
/// Anything a single rule can be built from.
#[derive(Debug, Clone)]
pub enum RuleSpec {
    /// Stored as is, shared with whoever else holds it.
    Rule(Arc<Rule>),
    Text(String),
    Parts { head: Head, tail: Option<Literal>, name: String },
    /// `[head, tail, name?]`
    Sequence(Literal),
}

impl From<Rule> for RuleSpec {
    fn from(rule: Rule) -> Self { RuleSpec::Rule(Arc::new(rule)) }
}
impl From<Arc<Rule>> for RuleSpec {
    fn from(rule: Arc<Rule>) -> Self { RuleSpec::Rule(rule) }
}
impl From<&Arc<Rule>> for RuleSpec {
    fn from(rule: &Arc<Rule>) -> Self { RuleSpec::Rule(Arc::clone(rule)) }
}
impl From<&str> for RuleSpec {
    fn from(text: &str) -> Self { RuleSpec::Text(text.to_string()) }
}
impl From<String> for RuleSpec {
    fn from(text: String) -> Self { RuleSpec::Text(text) }
}
// a sequence literal is read as [head, tail, name?], anything else as a bare head
impl From<Literal> for RuleSpec {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Sequence(_) => RuleSpec::Sequence(literal),
            head => RuleSpec::Parts { head: Head::Literal(head), tail: None, name: String::new() },
        }
    }
}
impl<H: Into<Head>> From<(H, Literal)> for RuleSpec {
    fn from((head, tail): (H, Literal)) -> Self {
        RuleSpec::Parts { head: head.into(), tail: Some(tail), name: String::new() }
    }
}
impl<H: Into<Head>> From<(H, Literal, &str)> for RuleSpec {
    fn from((head, tail, name): (H, Literal, &str)) -> Self {
        RuleSpec::Parts { head: head.into(), tail: Some(tail), name: name.to_string() }
    }
}

/// Where bulk operations take their rules from.
#[derive(Debug, Clone)]
pub enum RuleSource<'a> {
    Set(&'a RuleSet),
    /// Rules joined by the rule separator.
    Text(&'a str),
    Specs(Vec<RuleSpec>),
}

impl<'a> From<&'a RuleSet> for RuleSource<'a> {
    fn from(set: &'a RuleSet) -> Self { RuleSource::Set(set) }
}
impl<'a> From<&'a str> for RuleSource<'a> {
    fn from(text: &'a str) -> Self { RuleSource::Text(text) }
}
impl<'a> From<&'a String> for RuleSource<'a> {
    fn from(text: &'a String) -> Self { RuleSource::Text(text) }
}
impl<'a, S: Into<RuleSpec>> From<Vec<S>> for RuleSource<'a> {
    fn from(specs: Vec<S>) -> Self { RuleSource::Specs(specs.into_iter().map(Into::into).collect()) }
}

// ------------- RuleSet -------------
/// An ordered collection of rules. Insertion order is priority: when several
/// rules match, [`RuleSet::first`] and [`RuleSet::first_apply`] pick the one
/// added earliest.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    rules: Vec<Arc<Rule>>,
    notation: Notation,
    options: MatchOptions,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            name: String::from(Self::UNTITLED),
            rules: Vec::new(),
            notation: Notation::default(),
            options: MatchOptions::default(),
        }
    }
}

impl RuleSet {
    pub const UNTITLED: &'static str = "untitled";

    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_source<'a, S: Into<RuleSource<'a>>>(source: S) -> Result<Self> {
        let mut set = Self::new();
        set.add_all(source)?;
        Ok(set)
    }
    pub fn named<'a, S: Into<RuleSource<'a>>>(name: &str, source: S) -> Result<Self> {
        let mut set = Self::new();
        set.name = name.to_string();
        set.add_all(source)?;
        Ok(set)
    }
    /// Separators used for text added from now on and for [`RuleSet::to_text`].
    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }
    /// Options given to rules built by this set from now on.
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
    pub fn notation(&self) -> &Notation {
        &self.notation
    }
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Rule>> {
        self.rules.iter()
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn build(&self, spec: RuleSpec) -> Result<Arc<Rule>> {
        let rule = match spec {
            RuleSpec::Rule(rule) => return Ok(rule),
            RuleSpec::Text(text) => Rule::from_text_with(&text, None, "", &self.notation)?,
            RuleSpec::Parts { head, tail, name } => Rule::from_head(head, tail, &name, &self.notation)?,
            RuleSpec::Sequence(parts) => Rule::from_sequence_with(&parts, &self.notation)?,
        };
        Ok(Arc::new(rule.with_options(self.options.clone())))
    }

    fn specs(&self, source: RuleSource<'_>) -> Vec<RuleSpec> {
        match source {
            RuleSource::Set(set) => set.rules.iter().map(RuleSpec::from).collect(),
            RuleSource::Text(text) => text
                .split(self.notation.rule_separator.as_str())
                .filter(|segment| !segment.trim().is_empty())
                .map(RuleSpec::from)
                .collect(),
            RuleSource::Specs(specs) => specs,
        }
    }

    // ------------- Managing rules -------------
    /// Appends a rule and returns what was stored.
    pub fn add<S: Into<RuleSpec>>(&mut self, spec: S) -> Result<Arc<Rule>> {
        let rule = self.build(spec.into())?;
        debug!(set = %self.name, rule = %rule.to_text_with(&self.notation), "adding rule");
        self.rules.push(Arc::clone(&rule));
        Ok(rule)
    }
    /// Appends every rule of `source` in order, returning how many were added.
    /// Nothing is added when one of them fails to build.
    pub fn add_all<'a, S: Into<RuleSource<'a>>>(&mut self, source: S) -> Result<usize> {
        let rules = self
            .specs(source.into())
            .into_iter()
            .map(|spec| self.build(spec))
            .collect::<Result<Vec<_>>>()?;
        let added = rules.len();
        for rule in rules {
            debug!(set = %self.name, rule = %rule.to_text_with(&self.notation), "adding rule");
            self.rules.push(rule);
        }
        Ok(added)
    }
    /// Appends the rules of `other`, sharing them.
    pub fn merge(&mut self, other: &RuleSet) -> usize {
        self.rules.extend(other.rules.iter().cloned());
        debug!(set = %self.name, from = %other.name, count = other.len(), "merged rules");
        other.len()
    }
    /// Removes the first rule that reads the same as `spec`.
    pub fn delete<S: Into<RuleSpec>>(&mut self, spec: S) -> Result<bool> {
        let text = self.build(spec.into())?.to_text_with(&self.notation);
        match self.rules.iter().position(|rule| rule.to_text_with(&self.notation) == text) {
            Some(index) => {
                self.rules.remove(index);
                debug!(set = %self.name, rule = %text, "deleted rule");
                Ok(true)
            }
            None => Ok(false),
        }
    }
    /// Deletes every rule of `source`, returning how many were found.
    pub fn delete_all<'a, S: Into<RuleSource<'a>>>(&mut self, source: S) -> Result<usize> {
        let mut deleted = 0;
        for spec in self.specs(source.into()) {
            if self.delete(spec)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
    pub fn clear(&mut self) {
        debug!(set = %self.name, count = self.rules.len(), "clearing rules");
        self.rules.clear();
    }

    // ------------- Processing rules -------------
    /// True when the head of every rule matches `record`.
    pub fn every(&self, record: &Literal) -> Result<bool> {
        for rule in &self.rules {
            if !self.matches(rule, record)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
    /// True when the head of any rule matches `record`.
    pub fn some(&self, record: &Literal) -> Result<bool> {
        Ok(self.first(record)?.is_some())
    }
    /// The rules whose head matches `record`, in insertion order.
    pub fn filter(&self, record: &Literal) -> Result<Vec<Arc<Rule>>> {
        let mut matched = Vec::new();
        for rule in &self.rules {
            if self.matches(rule, record)? {
                matched.push(Arc::clone(rule));
            }
        }
        Ok(matched)
    }
    /// The tails of the rules whose head matches `record`, in insertion order.
    pub fn filter_apply(&self, record: &Literal) -> Result<Vec<&Literal>> {
        let mut tails = Vec::new();
        for rule in &self.rules {
            if self.matches(rule, record)? {
                tails.push(rule.tail());
            }
        }
        Ok(tails)
    }
    /// The earliest added rule whose head matches `record`.
    pub fn first(&self, record: &Literal) -> Result<Option<&Arc<Rule>>> {
        for rule in &self.rules {
            if self.matches(rule, record)? {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }
    pub fn first_apply(&self, record: &Literal) -> Result<Option<&Literal>> {
        Ok(self.first(record)?.map(|rule| rule.tail()))
    }

    fn matches(&self, rule: &Rule, record: &Literal) -> Result<bool> {
        let matched = rule.matches(record)?;
        trace!(set = %self.name, rule = %rule, matched, "evaluated rule");
        Ok(matched)
    }

    pub fn to_text(&self) -> String {
        self.rules
            .iter()
            .map(|rule| rule.to_text_with(&self.notation))
            .collect::<Vec<_>>()
            .join(&self.notation.rule_separator)
    }
    pub fn to_pairs(&self) -> Vec<(&Literal, &Literal)> {
        self.rules.iter().map(|rule| rule.to_pair()).collect()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Arc<Rule>;
    type IntoIter = std::slice::Iter<'a, Arc<Rule>>;
    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl FromStr for RuleSet {
    type Err = SiftError;
    fn from_str(s: &str) -> Result<Self> {
        RuleSet::from_source(s)
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rules.len()))?;
        for rule in &self.rules {
            seq.serialize_element(rule.as_ref())?;
        }
        seq.end()
    }
}
