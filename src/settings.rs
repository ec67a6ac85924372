//! Settings for the command line front end.
//!
//! Read from an optional `siftrule.toml` (or any format the `config` crate
//! knows) and overridden by `SIFTRULE__*` environment variables, e.g.
//! `SIFTRULE__MATCHING__TRACE_REFERENCES=true`. The library itself never
//! reads settings; a [`RuleSet`] receives them through [`Settings::rule_set`].

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::matcher::MatchOptions;
use crate::rule::Notation;
use crate::ruleset::RuleSet;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notation: Notation,
    pub matching: MatchOptions,
    /// A `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notation: Notation::default(),
            matching: MatchOptions::default(),
            log_filter: String::from("info"),
        }
    }
}

impl Settings {
    pub const DEFAULT_FILE: &'static str = "siftrule";
    pub const ENV_PREFIX: &'static str = "SIFTRULE";

    /// Loads `path` when given (it must exist), otherwise the optional default file.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(Self::DEFAULT_FILE).required(false),
        };
        let config = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// An empty rule set using these separators and match options.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::new()
            .with_notation(self.notation.clone())
            .with_options(self.matching.clone())
    }
}
