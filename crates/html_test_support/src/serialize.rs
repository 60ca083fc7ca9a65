//! Writes a normalized event stream back out as HTML.
//!
//! The output of a well-formed stream re-parses to the same structure,
//! which is what the idempotence tests check.

use html::tables::{Dtd, LiteralMode, Scope};
use html::{InputSource, Normalizer, TagId, Token, TokenKind, TokenizeResult};

#[derive(Debug)]
struct OpenTag {
    tag: TagId,
    name: String,
    /// The begin tag as written, replayed on reopen.
    markup: String,
}

#[derive(Debug, Default)]
pub struct HtmlWriter {
    out: String,
    /// Outermost first.
    open: Vec<OpenTag>,
    /// Elements closed by the last `OverlappedClose`, outermost first.
    reopen: Vec<OpenTag>,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(&mut self, token: &Token) {
        match token.kind() {
            TokenKind::Text => {
                if self.in_raw_text() {
                    self.out.push_str(token.text());
                } else {
                    escape_into(&mut self.out, token.text(), false);
                }
            }
            TokenKind::Space => self.out.push(' '),
            TokenKind::Tag if token.is_end_tag() => {
                let tag = token.tag();
                self.out.push_str("</");
                self.out.push_str(&tag_name(token));
                self.out.push('>');
                if let Some(index) = self.open.iter().rposition(|open| open.tag == tag) {
                    self.open.remove(index);
                }
            }
            TokenKind::Tag => {
                let markup = begin_markup(token);
                self.out.push_str(&markup);
                if stacked(token) {
                    self.open.push(OpenTag {
                        tag: token.tag(),
                        name: tag_name(token),
                        markup,
                    });
                }
            }
            TokenKind::Comment => self.wrap("<!--", token.text(), "-->"),
            TokenKind::Doctype => self.wrap("<!DOCTYPE ", token.text().trim(), ">"),
            TokenKind::Bang => self.wrap("<!", token.text(), ">"),
            TokenKind::Pi => self.wrap("<?", token.text(), "?>"),
            TokenKind::Asp => self.wrap("<%", token.text(), "%>"),
            TokenKind::OverlappedClose => {
                let keep = self.open.len().saturating_sub(token.count() as usize);
                self.reopen = self.open.split_off(keep);
                for open in self.reopen.iter().rev() {
                    self.out.push_str("</");
                    self.out.push_str(&open.name);
                    self.out.push('>');
                }
            }
            TokenKind::OverlappedReopen => {
                for open in std::mem::take(&mut self.reopen) {
                    self.out.push_str(&open.markup);
                    self.open.push(open);
                }
            }
            TokenKind::Restart => {
                self.out.clear();
                self.open.clear();
                self.reopen.clear();
            }
            TokenKind::EncodingChange
            | TokenKind::InjectionBegin
            | TokenKind::InjectionEnd
            | TokenKind::EndOfFile => {}
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn wrap(&mut self, open: &str, text: &str, close: &str) {
        self.out.push_str(open);
        self.out.push_str(text);
        self.out.push_str(close);
    }

    fn in_raw_text(&self) -> bool {
        self.open
            .last()
            .is_some_and(|open| Dtd::get().tag(open.tag).literal == LiteralMode::Raw)
    }
}

/// Normalize a complete source and serialize the events.
pub fn normalize_to_html<S: InputSource>(normalizer: &mut Normalizer<S>) -> String {
    let mut writer = HtmlWriter::new();
    loop {
        match normalizer.parse() {
            Ok(TokenizeResult::Token(kind)) => {
                writer.event(normalizer.token());
                if kind == TokenKind::EndOfFile {
                    break;
                }
            }
            Ok(TokenizeResult::NeedMoreInput) => panic!("complete source starved"),
            Err(err) => panic!("normalization failed: {err}"),
        }
    }
    writer.finish()
}

fn stacked(token: &Token) -> bool {
    let tag = token.tag();
    tag.is_element() && !token.is_empty_scope() && Dtd::get().tag(tag).scope != Scope::Empty
}

fn tag_name(token: &Token) -> String {
    if token.tag() == TagId::Unknown {
        token.tag_name().to_ascii_lowercase()
    } else {
        token.tag().name().to_string()
    }
}

fn begin_markup(token: &Token) -> String {
    let mut out = String::from("<");
    out.push_str(&tag_name(token));
    for (i, attr) in token.attributes().iter().enumerate() {
        out.push(' ');
        if attr.name.is_unknown() {
            out.push_str(&token.attribute_name(i).to_ascii_lowercase());
        } else {
            out.push_str(attr.name.text());
        }
        if attr.value.is_some() {
            out.push_str("=\"");
            escape_into(&mut out, &token.attribute_value(i), true);
            out.push('"');
        }
    }
    if token.is_empty_scope() {
        out.push_str(" /");
    }
    out.push('>');
    out
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
