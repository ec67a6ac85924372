use chrono::{TimeZone, Utc};
use siftrule::notation::parse;
use siftrule::{Literal, MatchOptions, Predicate, SiftError, matches, matches_with};

fn setup() -> Literal {
    parse(
        "{
  name: 'John Smith'
  age: 42
  address: {city: Stockholm, zip: '11122'}
  tags: [web, api]
  items: [{sku: a, qty: 1}, {sku: b, qty: 10}]
  created: 2020-01-01
  updated: '2020-01-08T12:00:00Z'
  rate: NaN
}",
    )
    .unwrap()
}

fn check(head: &str) -> bool {
    matches(&parse(head).unwrap(), &setup()).unwrap()
}

#[test]
fn scalar_heads_compare_by_equality() {
    assert!(matches(&parse("5").unwrap(), &parse("5").unwrap()).unwrap());
    assert!(!matches(&parse("5").unwrap(), &parse("'5'").unwrap()).unwrap());
    // an array record matches when one of its elements does
    assert!(matches(&parse("5").unwrap(), &parse("[1, 5]").unwrap()).unwrap());
    assert!(matches(&parse("[1, 5]").unwrap(), &parse("[1, 5]").unwrap()).unwrap());
    assert!(matches(&parse("/^ab/").unwrap(), &parse("abc").unwrap()).unwrap());
}

#[test]
fn mapping_heads_are_subsets() {
    assert!(check("{age: 42}"));
    assert!(check("{address: {city: Stockholm}}"));
    assert!(check("{address.zip: '11122'}"));
    assert!(check("{}"));
    assert!(!check("{age: 43}"));
    assert!(!check("{address: {city: Uppsala}}"));
    // key order plays no part
    assert_eq!(check("{age: 42, name: 'John Smith'}"), check("{name: 'John Smith', age: 42}"));
}

#[test]
fn comparison_operators() {
    assert!(check("{age: {$gt: 18, $lte: 42}}"));
    assert!(!check("{age: {$lt: 42}}"));
    assert!(check("{age: {$gte: 42}}"));
    assert!(check("{age: {$eq: 42}}"));
    assert!(check("{age: {$ne: 41}}"));
    assert!(check("{name: {$gt: 'J', $lt: 'K'}}"));
    // no ordering between a number and a string
    assert!(!check("{age: {$gt: 'a'}}"));
    assert!(!check("{age: {$lt: 'a'}}"));
}

#[test]
fn set_operators() {
    assert!(check("{age: {$in: [41, 42]}}"));
    assert!(!check("{age: {$nin: [41, 42]}}"));
    assert!(check("{name: {$in: [/^john/i, Jane]}}"));
    assert!(check("{tags: {$in: [api]}}"));
    assert!(check("{tags: {$all: [api, web]}}"));
    assert!(!check("{tags: {$all: [api, mobile]}}"));
    assert!(check("{tags: {$size: 2}}"));
    assert!(!check("{tags: {$size: 3}}"));
}

#[test]
fn regex_operators() {
    assert!(check("{name: /smith$/i}"));
    assert!(!check("{name: /smith$/}"));
    assert!(check("{name: {$regex: '^jo', $options: i}}"));
    assert!(check(r#"{address.zip: {$regex: "^\d+$"}}"#));
    assert!(!check("{age: /42/}"));
}

#[test]
fn logical_operators() {
    assert!(check("{$or: [{age: 1}, {name: 'John Smith'}]}"));
    assert!(!check("{$and: [{age: 42}, {name: Jane}]}"));
    assert!(check("{$nor: [{age: 1}, {name: Jane}]}"));
    assert!(check("{age: {$not: {$gt: 50}}}"));
    assert!(!check("{age: {$not: 42}}"));
}

#[test]
fn undefined_fields() {
    // only explicit absence tests and negations hold
    assert!(check("{missing: null}"));
    assert!(check("{missing: {$exists: false}}"));
    assert!(check("{missing: {$in: [null, 1]}}"));
    assert!(check("{missing: {$ne: 1}}"));
    assert!(check("{missing: {$nin: [1]}}"));
    assert!(check("{missing: {$not: {$gt: 0}}}"));
    assert!(check("{$nor: [{missing: 1}]}"));
    assert!(!check("{missing: 1}"));
    assert!(!check("{missing: /x/}"));
    assert!(!check("{missing: {$gt: 0}}"));
    assert!(!check("{missing: {$lt: 0}}"));
    assert!(!check("{missing: {$exists: true}}"));
    assert!(!check("{address.missing: ''}"));
    assert!(check("{age: {$exists: true}}"));
    assert!(!check("{age: null}"));
}

#[test]
fn empty_sub_heads_need_the_field() {
    assert!(!check("{missing: {}}"));
    assert!(!check("{address: {missing: {}}}"));
    assert!(!check("{address.missing: {}}"));
    assert!(check("{address: {}}"));
    assert!(check("{age: {}}"));
    assert!(check("{}"));
}

#[test]
fn array_fields() {
    assert!(check("{tags: web}"));
    assert!(check("{tags: [web, api]}"));
    assert!(!check("{tags: [api, web]}"));
    assert!(check("{items.qty: 10}"));
    assert!(check("{items.1.sku: b}"));
    assert!(check("{items: {$elemMatch: {qty: {$gt: 5}, sku: b}}}"));
    assert!(!check("{items: {$elemMatch: {qty: {$gt: 5}, sku: a}}}"));
}

#[test]
fn other_operators() {
    assert!(check("{age: {$mod: [5, 2]}}"));
    assert!(!check("{age: {$mod: [5, 0]}}"));
    assert!(check("{age: {$type: number}}"));
    assert!(check("{tags: {$type: array}}"));
    assert!(check("{created: {$type: date}}"));
    assert!(!check("{name: {$type: number}}"));
}

#[test]
fn nan_matches_nothing() {
    assert!(!check("{rate: NaN}"));
    assert!(!check("{rate: {$gte: 0}}"));
    assert!(check("{rate: {$ne: NaN}}"));
    assert!(check("{rate: {$type: number}}"));
}

#[test]
fn dates() {
    assert!(check("{created: {$gte: 2020-01-01, $lt: 2020-01-02}}"));
    assert!(check("{created: 2020-01-01}"));
    // strings are read as dates when compared with one
    assert!(check("{updated: {$gt: 2020-01-08}}"));
    assert!(!check("{updated: {$gt: 2020-01-09}}"));
}

#[test]
fn relative_dates() {
    let record = setup();
    let options = MatchOptions::at(Utc.with_ymd_and_hms(2020, 1, 10, 0, 0, 0).unwrap());
    let check_at = |head: &str| matches_with(&parse(head).unwrap(), &record, &options).unwrap();
    assert!(check_at("{created: {$olderThan: '3 days'}}"));
    assert!(!check_at("{created: {$newerThan: '3 days'}}"));
    assert!(check_at("{updated: {$newerThan: 2d}}"));
    assert!(!check_at("{updated: {$newerThan: 1h}}"));
    // a number is milliseconds
    assert!(check_at("{created: {$olderThan: 60 * 60 * 1000}}"));
    // a date is an absolute cut-off
    assert!(check_at("{created: {$olderThan: 2020-01-02}}"));
    assert!(!check_at("{created: {$newerThan: 2020-01-02}}"));
    assert!(!check_at("{missing: {$olderThan: 1}}"));
}

#[test]
fn unknown_operators_fail() {
    let err = matches(&parse("{age: {$near: 1}}").unwrap(), &setup()).unwrap_err();
    assert!(matches!(err, SiftError::UnsupportedOperator(ref op) if op == "$near"), "{err:?}");
    assert!(Predicate::compile(&parse("{$where: 1}").unwrap()).is_err());
}

#[test]
fn invalid_operands_fail() {
    for head in ["{age: {$in: 42}}", "{age: {$size: -1}}", "{age: {$mod: [2]}}", "{age: {$type: thing}}", "{age: {$olderThan: soon}}"] {
        let err = matches(&parse(head).unwrap(), &setup()).unwrap_err();
        assert!(matches!(err, SiftError::InvalidOperand { .. }), "{head}: {err:?}");
    }
}

#[test]
fn matching_is_pure() {
    let record = setup();
    let head = parse("{age: {$gt: 18}, tags: web}").unwrap();
    let predicate = Predicate::compile(&head).unwrap();
    let options = MatchOptions::default();
    let first = predicate.test(&record, &options);
    for _ in 0..3 {
        assert_eq!(predicate.test(&record, &options), first);
    }
    assert!(first);
    assert_eq!(record, setup());
    assert_eq!(head, parse("{age: {$gt: 18}, tags: web}").unwrap());
}
