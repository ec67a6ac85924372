//! RFC 6901 JSON pointers over literals.

use crate::error::{Result, SiftError};
use crate::literal::Literal;

/// Looks up `pointer` in `document`. The empty pointer is the document itself,
/// anything else must start with `/`. Tokens are unescaped (`~1` is `/`, `~0`
/// is `~`) and index sequences when they are decimal.
pub fn get<'a>(document: &'a Literal, pointer: &str) -> Result<&'a Literal> {
    if pointer.is_empty() {
        return Ok(document);
    }
    let Some(path) = pointer.strip_prefix('/') else {
        return Err(SiftError::PointerNotFound(pointer.to_string()));
    };
    let mut current = document;
    for token in path.split('/') {
        let token = unescape(token);
        let next = match current {
            Literal::Mapping(_) => current.get(&token),
            Literal::Sequence(items) => index(&token).and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| SiftError::PointerNotFound(pointer.to_string()))?;
    }
    Ok(current)
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // leading zeros are not array indexes
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}
