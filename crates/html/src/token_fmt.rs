//! Deterministic token formatting for golden tests and the CLI.
//!
//! One line per event. Attribute order is preserved as encountered.

use crate::tables::TagId;
use crate::token::{Token, TokenKind};
use std::fmt::Write;

/// Format one event as a single line.
pub fn format_token(token: &Token) -> String {
    match token.kind() {
        TokenKind::Text => format!("Text(\"{}\")", escape_text(token.text())),
        TokenKind::Space => "Space".to_string(),
        TokenKind::Tag => format_tag(token),
        TokenKind::Comment => format!("Comment(\"{}\")", escape_text(token.text())),
        TokenKind::Doctype => format!("Doctype(\"{}\")", escape_text(token.text().trim())),
        TokenKind::Bang => format!("Bang(\"{}\")", escape_text(token.text())),
        TokenKind::Pi => format!("Pi(\"{}\")", escape_text(token.text())),
        TokenKind::Asp => format!("Asp(\"{}\")", escape_text(token.text())),
        TokenKind::EncodingChange => format!("EncodingChange({})", token.text()),
        TokenKind::Restart => "Restart".to_string(),
        TokenKind::OverlappedClose => format!("OverlappedClose({})", token.count()),
        TokenKind::OverlappedReopen => format!("OverlappedReopen({})", token.count()),
        TokenKind::InjectionBegin => "InjectionBegin".to_string(),
        TokenKind::InjectionEnd => "InjectionEnd".to_string(),
        TokenKind::EndOfFile => "EOF".to_string(),
    }
}

fn format_tag(token: &Token) -> String {
    let mut out = String::new();
    out.push_str(if token.is_end_tag() { "End(" } else { "Begin(" });
    if token.tag() == TagId::Unknown {
        out.push('?');
        out.push_str(&token.tag_name().to_ascii_lowercase());
    } else {
        out.push_str(token.tag().name());
    }
    if !token.is_end_tag() {
        for (i, attr) in token.attributes().iter().enumerate() {
            out.push(' ');
            if attr.name.is_unknown() {
                out.push_str(&token.attribute_name(i).to_ascii_lowercase());
            } else {
                out.push_str(attr.name.text());
            }
            if attr.value.is_some() {
                let _ = write!(out, "=\"{}\"", escape_text(&token.attribute_value(i)));
            }
        }
        if token.is_empty_scope() {
            out.push_str(" /");
        }
    }
    out.push(')');
    let fragment = token.fragment();
    match (fragment.first, fragment.last) {
        (true, true) => {}
        (true, false) => out.push_str("[first]"),
        (false, false) => out.push_str("[middle]"),
        (false, true) => out.push_str("[last]"),
    }
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{A0}' => out.push_str("\\u{A0}"),
            ch if ch < ' ' || ch == '\u{7f}' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}
