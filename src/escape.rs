//! Reversible escaping of serialized state at the store boundary.
//!
//! Document stores commonly reserve `$` as an operator prefix, so it may not
//! appear in stored field content. Before insertion each reserved character
//! is replaced by `%XX` (its two-digit uppercase hex code), and the escape
//! character `%` itself becomes `%25`. Decoding reverses exactly that and
//! rejects any other `%` sequence, so `decode(encode(s)) == s` for every
//! input.

use crate::error::{PersistenceError, Result};
use std::borrow::Cow;

/// Escape character introducing an encoded sequence.
pub const ESCAPE: char = '%';

/// Characters that never reach the store unescaped (besides [`ESCAPE`]).
pub const RESERVED: &[char] = &['$'];

fn needs_escape(c: char) -> bool {
    c == ESCAPE || RESERVED.contains(&c)
}

/// Escape reserved characters. Borrows when nothing needs escaping.
pub fn encode(input: &str) -> Cow<'_, str> {
    if !input.chars().any(needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if needs_escape(c) {
            out.push(ESCAPE);
            out.push_str(&format!("{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Undo [`encode`].
///
/// Fails with a corruption error on an escape sequence `encode` never
/// produces.
pub fn decode(input: &str) -> Result<Cow<'_, str>> {
    if !input.contains(ESCAPE) {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((pos, c)) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }

        let code = input
            .get(pos + 1..pos + 3)
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32)
            .filter(|decoded| needs_escape(*decoded))
            .ok_or_else(|| {
                PersistenceError::Corruption(format!("invalid escape sequence at byte {pos}"))
            })?;

        out.push(code);
        chars.next();
        chars.next();
    }

    Ok(Cow::Owned(out))
}
