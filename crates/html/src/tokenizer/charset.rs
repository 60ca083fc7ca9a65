//! `<meta>` charset sniffing.

use super::{Step, Tokenizer};
use crate::input::{InputSource, Restartable};
use crate::tables::AttrId;
use crate::token::{Token, TokenKind};

/// Extract the label from a `content` value such as
/// `text/html; charset=UTF-8`.
pub fn charset_from_content(content: &str) -> Option<&str> {
    let bytes = content.as_bytes();
    let mut from = 0;
    while let Some(at) = find_ascii_ci(&bytes[from..], b"charset") {
        let mut i = from + at + b"charset".len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            from = from + at + 1;
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let (start, end) = match bytes.get(i) {
            Some(&quote @ (b'"' | b'\'')) => {
                let start = i + 1;
                let len = bytes[start..].iter().position(|b| *b == quote)?;
                (start, start + len)
            }
            Some(_) => {
                let len = bytes[i..]
                    .iter()
                    .position(|b| *b == b';' || b.is_ascii_whitespace())
                    .unwrap_or(bytes.len() - i);
                (i, i + len)
            }
            None => return None,
        };
        return (end > start).then(|| &content[start..end]);
    }
    None
}

fn find_ascii_ci(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// The encoding label a `<meta>` tag declares, if any.
fn declared_charset(token: &Token) -> Option<String> {
    if let Some(i) = token.find_attribute(AttrId::Charset) {
        let value = token.attribute_value(i);
        let label = value.trim();
        if !label.is_empty() {
            return Some(label.to_owned());
        }
    }
    let http_equiv = token.find_attribute(AttrId::HttpEquiv)?;
    if !token
        .attribute_value(http_equiv)
        .trim()
        .eq_ignore_ascii_case("content-type")
    {
        return None;
    }
    let content = token.find_attribute(AttrId::Content)?;
    let value = token.attribute_value(content);
    charset_from_content(&value).map(str::to_owned)
}

impl<S: InputSource> Tokenizer<S> {
    /// A complete `<meta>` start tag is in the token. Returns the step to
    /// take instead of emitting it when the stream restarts.
    pub(super) fn sniff_charset(&mut self) -> Option<Step> {
        if self.sniffed {
            return None;
        }
        let label = declared_charset(&self.token)?;
        if self.offset > self.config.sniff_window {
            log::debug!(
                target: "html.tokenizer",
                "ignoring charset {label:?}: declared past the sniff window"
            );
            return None;
        }
        if !self.can_restart() {
            log::debug!(
                target: "html.tokenizer",
                "ignoring charset {label:?}: restart no longer possible"
            );
            return None;
        }
        if !self.source.restart_with_encoding(&label) {
            return None;
        }
        self.sniffed = true;
        self.stats.restarts = self.stats.restarts.saturating_add(1);
        let name = self
            .source
            .encoding_name()
            .map_or(label, str::to_ascii_lowercase);
        log::debug!(target: "html.tokenizer", "restart for charset {name}");
        self.reset_scan();
        self.pending_encoding = Some(name);
        self.token.reset(TokenKind::Restart);
        Some(Step::Emit(TokenKind::Restart))
    }
}
