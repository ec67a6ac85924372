//! Applies a rule set to JSON records read from stdin, one record per line.
//!
//! ```text
//! siftrule [--config FILE] [--all] RULES_FILE < records.jsonl
//! ```
//!
//! For every record the tail of the first matching rule is printed in the
//! literal notation (every matching tail with `--all`), or `undefined` when
//! no rule matches.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use siftrule::{Literal, Result, RuleSet, Settings, SiftError};

struct Arguments {
    config: Option<String>,
    all: bool,
    rules: String,
}

fn arguments() -> std::result::Result<Arguments, String> {
    let mut config = None;
    let mut all = false;
    let mut rules = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(args.next().ok_or("--config needs a file")?),
            "--all" => all = true,
            _ if arg.starts_with("--") => return Err(format!("unknown option {arg}")),
            _ => rules = Some(arg),
        }
    }
    let rules = rules.ok_or("usage: siftrule [--config FILE] [--all] RULES_FILE")?;
    Ok(Arguments { config, all, rules })
}

fn main() -> ExitCode {
    let arguments = match arguments() {
        Ok(arguments) => arguments,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };
    let settings = match Settings::load(arguments.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    match run(&settings, &arguments) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "giving up");
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings, arguments: &Arguments) -> Result<()> {
    let text = std::fs::read_to_string(&arguments.rules)?;
    let mut rules: RuleSet = settings.rule_set();
    rules.set_name(&arguments.rules);
    let count = rules.add_all(text.as_str())?;
    info!(rules = count, file = %arguments.rules, "loaded rule set");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (number, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Literal = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = number + 1, error = %SiftError::from(e), "skipping record");
                continue;
            }
        };
        let output = if arguments.all {
            Literal::Sequence(rules.filter_apply(&record)?.into_iter().cloned().collect()).to_string()
        } else {
            match rules.first_apply(&record)? {
                Some(tail) => tail.to_string(),
                None => String::from("undefined"),
            }
        };
        writeln!(out, "{output}")?;
    }
    Ok(())
}
