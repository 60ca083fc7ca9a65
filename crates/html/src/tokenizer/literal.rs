//! Content of literal elements (script, style, title, textarea, xmp,
//! plaintext). Markup is not recognized until the matching end tag.

use super::markup::MatchResult;
use super::{Step, Tokenizer};
use crate::char_class::is_whitespace;
use crate::input::InputSource;
use crate::tables::{LiteralMode, TagId};
use crate::tokenizer::entity::EntityMode;
use crate::tokenizer::states::TokenizerState;
use memchr::{memchr, memchr2};

impl<S: InputSource> Tokenizer<S> {
    pub(super) fn step_literal(&mut self) -> Step {
        let decode = self.literal_mode == LiteralMode::Escapable && self.config.decode_entities;
        let endless = self.literal_tag == TagId::PlainText;
        loop {
            if self.token.text_len() >= self.config.max_text_bytes {
                return self.emit_text();
            }
            let Some(ch) = self.peek() else {
                if !self.eof {
                    return Step::NeedInput;
                }
                if self.token.runs().is_empty() {
                    self.transition_to(TokenizerState::Text);
                    return Step::Continue;
                }
                return self.emit_text();
            };
            match ch {
                '<' if !endless => match self.literal_end_lookahead() {
                    MatchResult::NeedMoreInput => return Step::NeedInput,
                    MatchResult::Matched => {
                        self.transition_to(TokenizerState::Text);
                        if self.token.runs().is_empty() {
                            return Step::Continue;
                        }
                        return self.emit_text();
                    }
                    MatchResult::NoMatch => {
                        self.token.push_char('<');
                        self.advance(1);
                    }
                },
                '&' if decode => {
                    if self.push_reference(EntityMode::Text) == Step::NeedInput {
                        return Step::NeedInput;
                    }
                }
                _ => {
                    let bytes = self.rest().as_bytes();
                    let first = ch.len_utf8();
                    let tail = &bytes[first..];
                    let found = match (endless, decode) {
                        (true, _) => None,
                        (false, true) => memchr2(b'<', b'&', tail),
                        (false, false) => memchr(b'<', tail),
                    };
                    let end = found.map_or(bytes.len(), |i| first + i);
                    self.push_content(end);
                }
            }
        }
    }

    /// Does the scan position hold `</name` followed by whitespace, `/` or
    /// `>`, where name is the open literal element?
    fn literal_end_lookahead(&self) -> MatchResult {
        let name = self.literal_tag.name().as_bytes();
        let bytes = self.rest().as_bytes();
        let prefix_len = 2 + name.len();
        let n = bytes.len().min(prefix_len);
        let candidate = bytes[..n]
            .iter()
            .enumerate()
            .all(|(i, b)| match i {
                0 => *b == b'<',
                1 => *b == b'/',
                i => b.eq_ignore_ascii_case(&name[i - 2]),
            });
        if !candidate {
            return MatchResult::NoMatch;
        }
        match bytes.get(prefix_len) {
            None if self.eof => MatchResult::NoMatch,
            None => MatchResult::NeedMoreInput,
            Some(b'/' | b'>') => MatchResult::Matched,
            Some(b) if is_whitespace(*b as char) => MatchResult::Matched,
            Some(_) => MatchResult::NoMatch,
        }
    }
}
