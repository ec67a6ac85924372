//! The relaxed-JSON notation rule heads and tails are written in.
//!
//! [`parse`] accepts unquoted keys, comments (`#`, `//`, `/* */`), trailing
//! commas, newline separated members, single, double and `'''` quoted strings
//! and quoteless strings. Four extension literals are recognized before the
//! base grammar is consulted, in this order:
//!
//! 1. regular expressions, `/js$/i`
//! 2. hexadecimal integers, `0xDECAF`
//! 3. dates, `2017-01-01` or `2017-01-01T10:00:00.250Z`
//! 4. arithmetic, `60 * 60 * 24`, including `inf`, `-inf` and `NaN`
//!
//! Inside strings a backslash that does not start one of the escapes
//! `\" \' \\ \/ \n \r \t \uXXXX` is kept as is, so `"\d+\.js"` reads as the
//! regex source it looks like.
//!
//! [`stringify`] writes a literal back on a single line in a form [`parse`]
//! accepts again.

use chrono::{DateTime, NaiveDate, SecondsFormat, Timelike, Utc};
use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;

use crate::error::{Result, SiftError};
use crate::literal::{Literal, RegexLiteral};

#[derive(Parser)]
#[grammar = "notation.pest"]
struct NotationParser;

lazy_static! {
    static ref BARE_KEY: Regex = Regex::new(r#"^[^\s,:\[\]{}"'#/][^\s,:\[\]{}"']*$"#).unwrap();
}

pub fn parse(text: &str) -> Result<Literal> {
    let literal = NotationParser::parse(Rule::literal, text)?
        .next()
        .ok_or_else(|| SiftError::parse("empty input"))?;
    let value = literal
        .into_inner()
        .find(|pair| pair.as_rule() != Rule::EOI)
        .ok_or_else(|| SiftError::parse("no value found"))?;
    build(value)
}

fn build(pair: Pair<Rule>) -> Result<Literal> {
    match pair.as_rule() {
        Rule::object => {
            let mut entries = Vec::new();
            for member in pair.into_inner() {
                let mut inner = member.into_inner();
                let (Some(key), Some(value)) = (inner.next(), inner.next()) else {
                    return Err(SiftError::parse("incomplete member"));
                };
                entries.push((key_text(key), build(value)?));
            }
            Ok(Literal::mapping(entries))
        }
        Rule::array => pair.into_inner().map(build).collect::<Result<Vec<_>>>().map(Literal::Sequence),
        Rule::dq_string | Rule::sq_string | Rule::ml_string => Ok(Literal::String(string_text(pair))),
        Rule::constant => Ok(match pair.as_str() {
            "true" => Literal::Bool(true),
            "false" => Literal::Bool(false),
            _ => Literal::Null,
        }),
        Rule::number => parse_number(pair.as_str()).map(Literal::Number),
        Rule::hex => parse_hex(pair.as_str()).map(Literal::Number),
        // an impossible calendar date reads as the text it is
        Rule::date => Ok(parse_date(pair.as_str())
            .map(Literal::Date)
            .unwrap_or_else(|| Literal::String(pair.as_str().to_string()))),
        Rule::regex => {
            let mut inner = pair.into_inner();
            let source = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let flags = inner.next().map(|p| p.as_str()).unwrap_or_default();
            RegexLiteral::new(source, flags).map(Literal::Regex)
        }
        Rule::math => evaluate(pair).map(Literal::Number),
        Rule::quoteless | Rule::root_string => Ok(Literal::String(pair.as_str().trim_end().to_string())),
        other => Err(SiftError::parse(format!("unexpected {other:?}"))),
    }
}

fn key_text(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::bare_key => pair.as_str().to_string(),
        _ => string_text(pair),
    }
}

fn string_text(pair: Pair<Rule>) -> String {
    let multiline = pair.as_rule() == Rule::ml_string;
    let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
    if multiline {
        let inner = inner.strip_prefix('\n').unwrap_or(inner);
        inner.strip_suffix('\n').unwrap_or(inner).to_string()
    } else {
        unescape(inner)
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(e @ ('"' | '\'' | '\\' | '/')) => {
                chars.next();
                out.push(e);
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('u') => {
                let digits: String = chars.clone().skip(1).take(4).collect();
                match u32::from_str_radix(&digits, 16).ok().filter(|_| digits.len() == 4) {
                    Some(code) => {
                        for _ in 0..5 {
                            chars.next();
                        }
                        out.push(decode_unit(code, &mut chars));
                    }
                    None => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

// Joins a UTF-16 surrogate pair written as two `\u` escapes.
fn decode_unit(high: u32, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if (0xD800..0xDC00).contains(&high) {
        let rest: String = chars.clone().take(6).collect();
        if let Some(low) = rest.strip_prefix("\\u").and_then(|d| u32::from_str_radix(d, 16).ok()) {
            if (0xDC00..0xE000).contains(&low) {
                for _ in 0..6 {
                    chars.next();
                }
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
            }
        }
    }
    char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn parse_number(text: &str) -> Result<f64> {
    text.parse::<f64>().map_err(|e| SiftError::parse(format!("invalid number {text}: {e}")))
}

fn parse_hex(text: &str) -> Result<f64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = i64::from_str_radix(&digits[2..], 16)
        .map_err(|e| SiftError::parse(format!("invalid hex literal {text}: {e}")))?;
    Ok(if negative { -(magnitude as f64) } else { magnitude as f64 })
}

/// Reads `YYYY-MM-DD` as midnight UTC, or a full RFC 3339 timestamp.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if text.len() == 10 {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.with_timezone(&Utc))
}

fn evaluate(pair: Pair<Rule>) -> Result<f64> {
    match pair.as_rule() {
        Rule::math | Rule::math_group => match pair.into_inner().next() {
            Some(inner) => evaluate(inner),
            None => Err(SiftError::parse("empty expression")),
        },
        Rule::math_special => Ok(match pair.as_str() {
            "NaN" => f64::NAN,
            "-inf" => f64::NEG_INFINITY,
            _ => f64::INFINITY,
        }),
        Rule::math_sum | Rule::math_product => {
            let mut inner = pair.into_inner();
            let mut acc = match inner.next() {
                Some(first) => evaluate(first)?,
                None => return Err(SiftError::parse("empty expression")),
            };
            while let (Some(op), Some(operand)) = (inner.next(), inner.next()) {
                let rhs = evaluate(operand)?;
                acc = match op.as_str() {
                    "+" => acc + rhs,
                    "-" => acc - rhs,
                    "*" => acc * rhs,
                    "/" => acc / rhs,
                    _ => acc % rhs,
                };
            }
            Ok(acc)
        }
        Rule::math_factor => {
            let mut sign = 1.0;
            let mut value = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::negate => sign = -sign,
                    _ => value = Some(evaluate(inner)?),
                }
            }
            value.map(|v| sign * v).ok_or_else(|| SiftError::parse("missing operand"))
        }
        Rule::number => parse_number(pair.as_str()),
        Rule::hex => parse_hex(pair.as_str()),
        other => Err(SiftError::parse(format!("unexpected {other:?} in expression"))),
    }
}

// ------------- Stringify -------------
pub fn stringify(literal: &Literal) -> String {
    let mut out = String::new();
    write_literal(&mut out, literal);
    out
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Null => out.push_str("null"),
        Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Number(n) => out.push_str(&stringify_number(*n)),
        Literal::String(s) => write_quoted(out, s),
        Literal::Date(d) => out.push_str(&stringify_date(d)),
        Literal::Regex(r) => out.push_str(&stringify_regex(r)),
        Literal::Binary(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            write_quoted(out, &hex);
        }
        Literal::Sequence(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Literal::Mapping(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if BARE_KEY.is_match(key) {
                    out.push_str(key);
                } else {
                    write_quoted(out, key);
                }
                out.push_str(": ");
                write_literal(out, value);
            }
            out.push('}');
        }
    }
}

fn stringify_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "+inf".to_string()
    } else if n == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{n}")
    }
}

fn stringify_date(d: &DateTime<Utc>) -> String {
    if d.num_seconds_from_midnight() == 0 && d.nanosecond() == 0 {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// `/source/flags`, escaping any `/` that would otherwise end the literal early.
pub(crate) fn stringify_regex(r: &RegexLiteral) -> String {
    let mut out = String::from("/");
    if r.source().is_empty() {
        out.push_str("(?:)");
    }
    let mut escaped = false;
    let mut in_class = false;
    for c in r.source().chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => out.push('\\'),
            _ => {}
        }
        out.push(c);
    }
    out.push('/');
    out.push_str(r.flags());
    out
}

// Double quoted, with control characters escaped so nothing spans lines.
fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
