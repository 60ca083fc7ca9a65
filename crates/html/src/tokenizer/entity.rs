//! Character reference matching.
//!
//! The matcher works on the text following `&` and is shared by the
//! streaming tokenizer (which may run out of lookahead) and the lazy
//! attribute value decoder (which always sees the complete value).

use crate::tables::{MAX_ENTITY_LEN, lookup_entity, numeric_reference};

/// Upper bound on the digits read by a numeric reference.
pub(crate) const MAX_NUMERIC_DIGITS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EntityMode {
    /// Text content: legacy prefix matching.
    Text,
    /// Attribute values: whole names only.
    Attribute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefMatch {
    /// `consumed` bytes after the `&` form the reference.
    Matched { ch: char, consumed: usize },
    NeedMoreInput,
    NoMatch,
}

/// Match a character reference at the start of `rest` (the input right
/// after `&`). `at_eof` is true when `rest` is known to be complete.
pub(crate) fn match_reference(rest: &str, mode: EntityMode, at_eof: bool) -> RefMatch {
    let bytes = rest.as_bytes();
    match bytes.first() {
        None if at_eof => RefMatch::NoMatch,
        None => RefMatch::NeedMoreInput,
        Some(b'#') => match_numeric(bytes, at_eof),
        Some(b) if b.is_ascii_alphanumeric() => match_named(rest, mode, at_eof),
        Some(_) => RefMatch::NoMatch,
    }
}

fn match_numeric(bytes: &[u8], at_eof: bool) -> RefMatch {
    let hex = match bytes.get(1) {
        None if at_eof => return RefMatch::NoMatch,
        None => return RefMatch::NeedMoreInput,
        Some(b'x' | b'X') => true,
        Some(_) => false,
    };
    let digits_start = if hex { 2 } else { 1 };
    let mut end = digits_start;
    let mut value: u32 = 0;
    while end < bytes.len() && end - digits_start < MAX_NUMERIC_DIGITS {
        let digit = match (hex, bytes[end]) {
            (true, b) if b.is_ascii_hexdigit() => (b as char).to_digit(16),
            (false, b) if b.is_ascii_digit() => (b as char).to_digit(10),
            _ => None,
        };
        let Some(digit) = digit else {
            break;
        };
        value = value
            .saturating_mul(if hex { 16 } else { 10 })
            .saturating_add(digit);
        end += 1;
    }
    if end == bytes.len() && !at_eof {
        // More digits or the `;` may follow.
        return RefMatch::NeedMoreInput;
    }
    if end == digits_start {
        return RefMatch::NoMatch;
    }
    let consumed = if bytes.get(end) == Some(&b';') { end + 1 } else { end };
    RefMatch::Matched {
        ch: numeric_reference(value),
        consumed,
    }
}

fn match_named(rest: &str, mode: EntityMode, at_eof: bool) -> RefMatch {
    let bytes = rest.as_bytes();
    // One past the longest name tells "too long" apart from "complete".
    let limit = MAX_ENTITY_LEN + 1;
    let len = bytes
        .iter()
        .take(limit)
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if len == bytes.len() && len < limit && !at_eof {
        return RefMatch::NeedMoreInput;
    }
    let next = bytes.get(len).copied();
    if len <= MAX_ENTITY_LEN
        && let Some(ch) = lookup_entity(&rest[..len])
    {
        if next == Some(b';') {
            return RefMatch::Matched {
                ch,
                consumed: len + 1,
            };
        }
        if mode == EntityMode::Attribute && next == Some(b'=') {
            return RefMatch::NoMatch;
        }
        return RefMatch::Matched { ch, consumed: len };
    }
    if mode == EntityMode::Attribute {
        return RefMatch::NoMatch;
    }
    for prefix in (1..len.min(MAX_ENTITY_LEN + 1)).rev() {
        if let Some(ch) = lookup_entity(&rest[..prefix]) {
            return RefMatch::Matched {
                ch,
                consumed: prefix,
            };
        }
    }
    RefMatch::NoMatch
}
