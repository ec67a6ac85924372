//! Siftrule – declarative `head --> tail` rules over structured records.
//!
//! A rule pairs a *head*, a predicate written as a relaxed-JSON literal, with
//! a *tail*, the value the rule yields when its head matches a record:
//! * A [`literal::Literal`] is a scalar, a sequence or a mapping, as produced by
//!   the [`notation`] parser.
//! * A [`rule::Rule`] couples a head, a tail (`true` unless given) and an
//!   optional name.
//! * A [`ruleset::RuleSet`] keeps rules in insertion order and answers which of
//!   them match, which is the first to match, and what they yield.
//!
//! ## Modules
//! * [`notation`] – Parser and serializer for the literal notation, including
//!   regex, hex, date and arithmetic literals.
//! * [`matcher`] – Compiles heads into predicates (`$gt`, `$in`, `$regex`,
//!   `$olderThan`, ...) and tests them against records.
//! * [`reference`] – `{"$ref": "/pointer"}` markers resolved against the record
//!   being matched, through [`pointer`].
//! * [`rule`] / [`ruleset`] – The rule text notation and the combinators.
//! * [`settings`] – Configuration for the command line front end.
//!
//! ## Rule Notation
//! A rule reads `<head> --> <tail> #== <name>`, rule sets join rules with `;\n`.
//! Separators are configurable through [`rule::Notation`].
//!
//! ## Quick Start
//! ```
//! use siftrule::{Literal, RuleSet};
//! let rules: RuleSet = "{filename: /js$/} --> \"JS\";\n{filename: /css$/} --> \"CSS\"".parse().unwrap();
//! let record: Literal = "{filename: \"app.js\"}".parse().unwrap();
//! assert_eq!(rules.first_apply(&record).unwrap(), Some(&Literal::from("JS")));
//! assert!(!rules.every(&record).unwrap());
//! ```
//!
//! ## Errors
//! Malformed notation fails with [`SiftError::Parse`], unknown `$` operators
//! with [`SiftError::UnsupportedOperator`]. A `$ref` that does not resolve is
//! not an error: it becomes NaN and the comparison it appears in fails.

pub mod error;
pub mod literal;
pub mod matcher;
pub mod notation;
pub mod pointer;
pub mod reference;
pub mod rule;
pub mod ruleset;
pub mod settings;

pub use error::{Result, SiftError};
pub use literal::{Literal, RegexLiteral};
pub use matcher::{MatchOptions, Operator, Predicate, matches, matches_with};
pub use rule::{Head, Notation, Rule};
pub use ruleset::{RuleSet, RuleSource, RuleSpec};
pub use settings::Settings;
