//! Self-referential heads.
//!
//! A head may contain markers of the form `{"$ref": "/pointer"}`. Right before
//! a match the marker is replaced by the value the pointer finds in the record
//! being matched, so `{max: {$gte: {$ref: "/min"}}}` compares two fields of
//! the same record.

use tracing::trace;

use crate::literal::Literal;
use crate::pointer;

pub const REFERENCE_KEY: &str = "$ref";

/// True when any mapping in `head` has a `$ref` key.
pub fn contains_references(head: &Literal) -> bool {
    match head {
        Literal::Mapping(entries) => entries
            .iter()
            .any(|(key, value)| key == REFERENCE_KEY || contains_references(value)),
        Literal::Sequence(items) => items.iter().any(contains_references),
        _ => false,
    }
}

/// Returns a copy of `head` where every marker mapping is replaced by what
/// `resolve` makes of its `$ref` value. Replacements are not rewritten again.
pub fn rewrite<F>(head: &Literal, resolve: &F) -> Literal
where
    F: Fn(&Literal) -> Literal,
{
    match head {
        Literal::Mapping(entries) => match entries.iter().find(|(key, _)| key == REFERENCE_KEY) {
            Some((_, target)) => resolve(target),
            None => Literal::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), rewrite(value, resolve)))
                    .collect(),
            ),
        },
        Literal::Sequence(items) => Literal::Sequence(items.iter().map(|item| rewrite(item, resolve)).collect()),
        other => other.clone(),
    }
}

/// Resolves the markers of `head` against `record`. A pointer that does not
/// resolve becomes NaN, which fails every comparison it takes part in.
pub fn dereference(head: &Literal, record: &Literal) -> Literal {
    rewrite(head, &|target| match target {
        Literal::String(path) => match pointer::get(record, path) {
            Ok(value) => value.clone(),
            Err(e) => {
                trace!(error = %e, "unresolved reference");
                Literal::nan()
            }
        },
        _ => Literal::nan(),
    })
}
