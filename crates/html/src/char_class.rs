//! Per-character classification used by the tokenizer and normalizer.
//!
//! ASCII is answered from a 128-entry table; everything else is computed.

use crate::token::RunKind;
use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CharClass: u16 {
        const WHITESPACE = 1 << 0;
        const NEWLINE = 1 << 1;
        const ALPHA = 1 << 2;
        const DIGIT = 1 << 3;
        const HEX = 1 << 4;
        /// Continues a tag or attribute name.
        const NAME = 1 << 5;
        /// Ends an unquoted attribute value.
        const VALUE_END = 1 << 6;
        /// Starts markup or a character reference in text.
        const MARKUP = 1 << 7;
        const QUOTE = 1 << 8;
    }
}

const fn ascii_class(b: u8) -> CharClass {
    let mut bits = 0u16;
    if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C) {
        bits |= CharClass::WHITESPACE.bits() | CharClass::VALUE_END.bits();
    }
    if matches!(b, b'\n' | b'\r') {
        bits |= CharClass::NEWLINE.bits();
    }
    if b.is_ascii_alphabetic() {
        bits |= CharClass::ALPHA.bits();
    }
    if b.is_ascii_digit() {
        bits |= CharClass::DIGIT.bits();
    }
    if b.is_ascii_hexdigit() {
        bits |= CharClass::HEX.bits();
    }
    // Anything that is not whitespace, a delimiter or a control code may
    // appear inside a name.
    if b > b' '
        && b < 0x7F
        && !matches!(b, b'/' | b'>' | b'=' | b'<' | b'"' | b'\'' | b'`')
    {
        bits |= CharClass::NAME.bits();
    }
    if b == b'>' {
        bits |= CharClass::VALUE_END.bits();
    }
    if matches!(b, b'<' | b'&') {
        bits |= CharClass::MARKUP.bits();
    }
    if matches!(b, b'"' | b'\'') {
        bits |= CharClass::QUOTE.bits();
    }
    CharClass::from_bits_retain(bits)
}

const ASCII_TABLE: [CharClass; 128] = {
    let mut table = [CharClass::empty(); 128];
    let mut i = 0;
    while i < 128 {
        table[i] = ascii_class(i as u8);
        i += 1;
    }
    table
};

#[inline]
pub fn classify(ch: char) -> CharClass {
    if ch.is_ascii() {
        ASCII_TABLE[ch as usize]
    } else if is_unusual_whitespace(ch) || ch == '\u{A0}' {
        CharClass::empty()
    } else {
        // Non-ASCII letters are legal (if unusual) inside names.
        CharClass::NAME
    }
}

#[inline]
pub fn classify_byte(b: u8) -> CharClass {
    if b < 0x80 {
        ASCII_TABLE[b as usize]
    } else {
        CharClass::NAME
    }
}

#[inline]
pub fn is_whitespace(ch: char) -> bool {
    classify(ch).contains(CharClass::WHITESPACE)
}

fn is_unusual_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\u{0B}'
            | '\u{0C}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Run classification of a single character.
#[inline]
pub fn run_kind(ch: char) -> RunKind {
    match ch {
        ' ' => RunKind::Space,
        '\n' | '\r' => RunKind::NewLine,
        '\t' => RunKind::Tabulation,
        '\u{A0}' => RunKind::Nbsp,
        ch if is_unusual_whitespace(ch) => RunKind::UnusualWhitespace,
        _ => RunKind::NonSpace,
    }
}

/// East-Asian scripts written without inter-word spaces. A single line
/// break between two of these characters carries no space.
pub fn is_cjk(ch: char) -> bool {
    matches!(
        ch,
        '\u{3000}'..='\u{303F}'
            | '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FF00}'..='\u{FFEF}'
            | '\u{20000}'..='\u{3FFFF}'
    )
}

/// Characters removed from the buffer before tokenization: NUL and the
/// Unicode noncharacters.
#[inline]
pub fn is_invalid(ch: char) -> bool {
    let cp = ch as u32;
    cp == 0 || (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_table_matches_expectations() {
        assert!(classify(' ').contains(CharClass::WHITESPACE));
        assert!(classify('\n').contains(CharClass::NEWLINE));
        assert!(classify('a').contains(CharClass::ALPHA | CharClass::NAME | CharClass::HEX));
        assert!(classify('7').contains(CharClass::DIGIT | CharClass::NAME));
        assert!(!classify('=').contains(CharClass::NAME));
        assert!(classify('>').contains(CharClass::VALUE_END));
        assert!(classify('&').contains(CharClass::MARKUP));
        assert!(classify('\'').contains(CharClass::QUOTE));
        assert_eq!(classify_byte(b'-'), classify('-'));
    }

    #[test]
    fn run_kinds() {
        assert_eq!(run_kind(' '), RunKind::Space);
        assert_eq!(run_kind('\r'), RunKind::NewLine);
        assert_eq!(run_kind('\t'), RunKind::Tabulation);
        assert_eq!(run_kind('\u{A0}'), RunKind::Nbsp);
        assert_eq!(run_kind('\u{2003}'), RunKind::UnusualWhitespace);
        assert_eq!(run_kind('\u{0C}'), RunKind::UnusualWhitespace);
        assert_eq!(run_kind('x'), RunKind::NonSpace);
    }

    #[test]
    fn cjk_and_invalid() {
        assert!(is_cjk('\u{6F22}'));
        assert!(is_cjk('\u{3072}'));
        assert!(!is_cjk('\u{D55C}'));
        assert!(!is_cjk('a'));
        assert!(is_invalid('\0'));
        assert!(is_invalid('\u{FFFE}'));
        assert!(is_invalid('\u{1FFFF}'));
        assert!(is_invalid('\u{FDD0}'));
        assert!(!is_invalid('\u{FFFD}'));
    }
}
