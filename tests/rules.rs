use siftrule::notation::parse;
use siftrule::{Literal, Notation, Rule, SiftError};

fn setup() -> Vec<Rule> {
    vec![
        Rule::from_text("{filename: /\\.js$/} --> \"JS\" #== scripts ").unwrap(),
        Rule::from_text("{size: {$gt: 1024 * 1024}} --> {warn: large}").unwrap(),
        Rule::from_text("{filename: /\\.css$/}").unwrap(),
    ]
}

#[test]
fn tail_defaults_to_true() {
    let rules = setup();
    assert_eq!(rules[2].tail(), &Literal::Bool(true));
    assert_eq!(rules[2].name(), "");
    let rule = Rule::new(parse("{a: 1}").unwrap(), None, "").unwrap();
    assert_eq!(rule.tail(), &Literal::Bool(true));
    assert_eq!(rule.apply(&parse("{a: 1}").unwrap()).unwrap(), Some(&Literal::Bool(true)));
}

#[test]
fn text_parts() {
    let rules = setup();
    assert_eq!(rules[0].head(), &parse("{filename: /\\.js$/}").unwrap());
    assert_eq!(rules[0].tail(), &Literal::from("JS"));
    // names are trimmed
    assert_eq!(rules[0].name(), "scripts");
    assert_eq!(rules[1].head(), &parse("{size: {$gt: 1048576}}").unwrap());
    assert_eq!(rules[1].tail(), &parse("{warn: large}").unwrap());
    assert_eq!(rules[1].name(), "");
}

#[test]
fn apply_yields_the_tail() {
    let rules = setup();
    let script = parse("{filename: 'app.js', size: 10}").unwrap();
    assert!(rules[0].matches(&script).unwrap());
    assert_eq!(rules[0].apply(&script).unwrap(), Some(&Literal::from("JS")));
    assert_eq!(rules[1].apply(&script).unwrap(), None);
    assert_eq!(rules[2].apply(&script).unwrap(), None);
    let big = parse("{filename: 'site.css', size: 2000000}").unwrap();
    assert_eq!(rules[1].apply(&big).unwrap().and_then(|t| t.get("warn")), Some(&Literal::from("large")));
}

#[test]
fn to_text() {
    let rules = setup();
    assert_eq!(rules[0].to_text(), r#"{filename: /\.js$/} --> "JS" #== scripts"#);
    assert_eq!(rules[1].to_text(), r#"{size: {$gt: 1048576}} --> {warn: "large"}"#);
    assert_eq!(rules[2].to_string(), r#"{filename: /\.css$/} --> true"#);
    // a multi line head is written on one line
    let rule = Rule::from_text("{\n  a: 1\n  b: 2\n} --> 3").unwrap();
    assert_eq!(rule.to_text(), "{a: 1, b: 2} --> 3");
}

#[test]
fn text_round_trip() {
    for rule in setup() {
        let again = Rule::from_text(&rule.to_text()).unwrap();
        assert_eq!(again, rule);
        assert_eq!(again.head(), rule.head());
        assert_eq!(again.tail(), rule.tail());
        assert_eq!(again.name(), rule.name());
    }
    let parsed: Rule = "{n: {$in: [1, 2]}} --> [a, b] #== pair".parse().unwrap();
    assert_eq!(parsed.to_text(), r#"{n: {$in: [1, 2]}} --> ["a", "b"] #== pair"#);
}

#[test]
fn head_text_constructors() {
    let rule = Rule::from_head_text("{a: 1}", Some(Literal::from(2)), "two").unwrap();
    assert_eq!(rule.to_text(), "{a: 1} --> 2 #== two");
    // a tail in the text wins, an embedded name only fills an empty one
    let rule = Rule::from_head_text("{a: 1} --> 3 #== three", Some(Literal::from(2)), "").unwrap();
    assert_eq!(rule.tail(), &Literal::from(3));
    assert_eq!(rule.name(), "three");
    let rule = Rule::from_head_text("{a: 1} #== embedded", None, "given").unwrap();
    assert_eq!(rule.name(), "given");
    assert_eq!(rule.tail(), &Literal::Bool(true));
}

#[test]
fn raw_backslashes() {
    let rule = Rule::from_text(r#"{file: {$regex: "^\d+\.js$"}} --> numbered"#).unwrap();
    assert!(rule.matches(&parse("{file: '123.js'}").unwrap()).unwrap());
    assert!(!rule.matches(&parse("{file: 'a123.js'}").unwrap()).unwrap());
    assert!(!rule.matches(&parse("{file: '123xjs'}").unwrap()).unwrap());
}

#[test]
fn sequence_constructors() {
    let rule = Rule::from_sequence(&parse("[{a: 1}, 2, named]").unwrap()).unwrap();
    assert_eq!(rule.to_text(), "{a: 1} --> 2 #== named");
    let rule = Rule::from_sequence(&parse("['{a: 1}', 2]").unwrap()).unwrap();
    assert_eq!(rule.head(), &parse("{a: 1}").unwrap());
    assert_eq!(rule.tail(), &Literal::from(2));
    let rule = Rule::from_sequence(&parse("[{a: 1}]").unwrap()).unwrap();
    assert_eq!(rule.tail(), &Literal::Bool(true));
    for bad in ["[]", "[{a: 1}, 2, 3]", "[{a: 1}, 2, x, y]", "{a: 1}"] {
        let err = Rule::from_sequence(&parse(bad).unwrap()).unwrap_err();
        assert!(matches!(err, SiftError::InvalidRule(_)), "{bad}: {err:?}");
    }
}

#[test]
fn custom_notation() {
    let notation = Notation {
        head_tail_separator: String::from("=>"),
        name_separator: String::from("@"),
        rule_separator: String::from("\n"),
    };
    let rule = Rule::from_text_with("{a: 1} => one @ first", None, "", &notation).unwrap();
    assert_eq!(rule.name(), "first");
    assert_eq!(rule.to_text_with(&notation), "{a: 1} => \"one\" @ first");
    assert_eq!(rule.to_text(), "{a: 1} --> \"one\" #== first");
}

#[test]
fn construction_errors() {
    assert!(matches!(Rule::from_text("{a: 1 --> 2"), Err(SiftError::Parse { .. })));
    assert!(matches!(Rule::from_text("{a: {$bogus: 1}} --> 2"), Err(SiftError::UnsupportedOperator(_))));
}

#[test]
fn equality_and_json() {
    let a = Rule::from_text("{a: 1, b: 2} --> x").unwrap();
    let b = Rule::from_text("{ a : 1 , b : 2 }-->'x'").unwrap();
    let c = Rule::from_text("{b: 2, a: 1} --> x").unwrap();
    assert_eq!(a, b);
    // equality is by text, so key order counts here
    assert_ne!(a, c);
    let (head, tail) = a.to_pair();
    assert_eq!(head, &parse("{a: 1, b: 2}").unwrap());
    assert_eq!(tail, &Literal::from("x"));
    assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::json!([{"a": 1.0, "b": 2.0}, "x"]));
}

#[test]
fn rules_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Rule>();
}

#[test]
fn empty_head_matches_anything() {
    let rule = Rule::new(Literal::Mapping(Vec::new()), None, "").unwrap();
    for record in ["{}", "{a: 1}", "42", "[1, 2]"] {
        assert_eq!(rule.apply(&parse(record).unwrap()).unwrap(), Some(&Literal::Bool(true)));
    }
}

#[test]
fn separators_inside_literals() {
    let rule = Rule::new(parse("{a: \"x --> y\"}").unwrap(), Some(Literal::from("t")), "").unwrap();
    assert_eq!(rule.to_text(), r#"{a: "x --> y"} --> "t""#);
    let again = Rule::from_text(&rule.to_text()).unwrap();
    assert_eq!(again, rule);
    assert_eq!(again.head().get("a"), Some(&Literal::from("x --> y")));

    let rule = Rule::from_text(r#"{lang: "C"} --> "C#== sharp""#).unwrap();
    assert_eq!(rule.tail(), &Literal::from("C#== sharp"));
    assert_eq!(rule.name(), "");
    let rule = Rule::from_text(r#"{lang: 'C#== sharp'} --> 'C --> sharp' #== csharp"#).unwrap();
    assert_eq!(rule.head().get("lang"), Some(&Literal::from("C#== sharp")));
    assert_eq!(rule.tail(), &Literal::from("C --> sharp"));
    assert_eq!(rule.name(), "csharp");

    let rule = Rule::from_text("{arrow: /-->$/} --> arrow").unwrap();
    assert!(rule.matches(&parse("{arrow: 'a -->'}").unwrap()).unwrap());
    assert_eq!(Rule::from_text(&rule.to_text()).unwrap(), rule);
}

#[test]
fn names_are_trimmed_everywhere() {
    let rule = Rule::new(parse("{a: 1}").unwrap(), None, " padded ").unwrap();
    assert_eq!(rule.name(), "padded");
    assert_eq!(rule.to_text(), "{a: 1} --> true #== padded");
    assert_eq!(Rule::from_text(&rule.to_text()).unwrap().name(), rule.name());
    let rule = Rule::from_head_text("{a: 1}", None, "\tgiven\n").unwrap();
    assert_eq!(rule.name(), "given");
}
