use std::path::PathBuf;

use siftrule::notation::parse;
use siftrule::{Literal, Notation, Settings, SiftError};

fn setup(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("siftrule-{}-{name}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn defaults() {
    let settings = Settings::default();
    assert_eq!(settings.notation, Notation::default());
    assert_eq!(settings.notation.head_tail_separator, "-->");
    assert_eq!(settings.notation.name_separator, "#==");
    assert_eq!(settings.notation.rule_separator, ";\n");
    assert!(!settings.matching.trace_references);
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn file_values_override_defaults() {
    let path = setup(
        "override",
        "log_filter = \"siftrule=debug\"\n\n[notation]\nhead_tail_separator = \"=>\"\n\n[matching]\ntrace_references = true\n",
    );
    let settings = Settings::load(path.to_str()).unwrap();
    assert_eq!(settings.log_filter, "siftrule=debug");
    assert_eq!(settings.notation.head_tail_separator, "=>");
    // unset keys keep their defaults
    assert_eq!(settings.notation.name_separator, "#==");
    assert!(settings.matching.trace_references);
    assert!(settings.matching.now.is_none());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn configured_rule_sets() {
    let path = setup("rules", "[notation]\nhead_tail_separator = \"=>\"\nrule_separator = \"|\"\n");
    let settings = Settings::load(path.to_str()).unwrap();
    let mut rules = settings.rule_set();
    assert_eq!(rules.add_all("{a: 1} => one | {a: 2} => two").unwrap(), 2);
    assert_eq!(rules.first_apply(&parse("{a: 2}").unwrap()).unwrap(), Some(&Literal::from("two")));
    assert!(rules.first(&parse("{a: 2}").unwrap()).unwrap().is_some_and(|r| r.options().trace_references == settings.matching.trace_references));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn missing_file_is_an_error() {
    let err = Settings::load(Some("/nonexistent/siftrule-settings.toml")).unwrap_err();
    assert!(matches!(err, SiftError::Config(_)));
}
