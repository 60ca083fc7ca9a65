//! Element tag states: name, attributes, values, self-closing.

use super::{AfterEmit, Step, Tokenizer};
use crate::char_class::{CharClass, classify, classify_byte, is_invalid, is_whitespace};
use crate::input::InputSource;
use crate::tables::{Dtd, LiteralMode, TagId};
use crate::token::TokenKind;
use crate::tokenizer::states::TokenizerState;
use memchr::memchr;

#[inline]
fn is_name_char(ch: char) -> bool {
    classify(ch).contains(CharClass::NAME)
}

impl<S: InputSource> Tokenizer<S> {
    pub(super) fn begin_element_tag(&mut self, end_tag: bool) {
        self.begin_construct(TokenKind::Tag);
        self.token.begin_tag(end_tag);
        let opener = if end_tag { "</" } else { "<" };
        self.raw.push_str(opener);
        self.advance(opener.len());
        self.transition_to(TokenizerState::TagName);
    }

    /// Consume one character of tag input, keeping the raw copy.
    fn consume_tag_char(&mut self, ch: char) {
        if self.raw_complete {
            if self.raw.len() + ch.len_utf8() > self.config.max_tag_bytes {
                self.raw_complete = false;
                self.raw.clear();
            } else {
                self.raw.push(ch);
            }
        }
        self.advance(ch.len_utf8());
    }

    /// The buffer ran dry inside a tag.
    fn tag_exhausted(&mut self) -> Step {
        if !self.eof {
            return Step::NeedInput;
        }
        match self.state {
            TokenizerState::TagName => self.token.finish_name(),
            TokenizerState::AttrName => self.token.finish_attr_name(),
            _ => {}
        }
        if self.raw_complete && !self.fragment_emitted {
            return self.reemit_raw_as_text();
        }
        // Part of the tag is already out; close it where the input ends.
        self.token.set_fragment(self.fragment(true));
        self.token.set_source_end(self.offset);
        self.transition_to(TokenizerState::Text);
        Step::Emit(TokenKind::Tag)
    }

    pub(super) fn step_tag_name(&mut self) -> Step {
        loop {
            let Some(ch) = self.peek() else {
                return self.tag_exhausted();
            };
            if !is_name_char(ch) {
                self.token.finish_name();
                self.transition_to(TokenizerState::BeforeAttrName);
                return Step::Continue;
            }
            if self.token.tag_name().len() < self.config.max_tag_bytes {
                self.token.push_name_char(ch);
            }
            self.consume_tag_char(ch);
        }
    }

    pub(super) fn step_before_attr_name(&mut self) -> Step {
        loop {
            let Some(ch) = self.peek() else {
                return self.tag_exhausted();
            };
            match ch {
                '>' => {
                    self.consume_tag_char(ch);
                    return self.finish_tag();
                }
                '/' => {
                    self.consume_tag_char(ch);
                    self.transition_to(TokenizerState::SelfClosing);
                    return Step::Continue;
                }
                ch if is_name_char(ch) => {
                    if self.token.text_len() >= self.config.max_tag_bytes {
                        return self.emit_tag_fragment();
                    }
                    self.token.start_attribute();
                    self.transition_to(TokenizerState::AttrName);
                    return Step::Continue;
                }
                // Whitespace and stray delimiters between attributes.
                ch => self.consume_tag_char(ch),
            }
        }
    }

    pub(super) fn step_attr_name(&mut self) -> Step {
        let mut name_len = self
            .token
            .attributes()
            .last()
            .map_or(0, |attr| attr.name_range.len());
        loop {
            let Some(ch) = self.peek() else {
                return self.tag_exhausted();
            };
            if !is_name_char(ch) {
                self.token.finish_attr_name();
                self.transition_to(TokenizerState::AfterAttrName);
                return Step::Continue;
            }
            if name_len < self.config.max_tag_bytes {
                self.token.push_attr_name_char(ch);
                name_len += ch.len_utf8();
            }
            self.consume_tag_char(ch);
        }
    }

    pub(super) fn step_after_attr_name(&mut self) -> Step {
        loop {
            let Some(ch) = self.peek() else {
                return self.tag_exhausted();
            };
            match ch {
                '=' => {
                    self.consume_tag_char(ch);
                    self.transition_to(TokenizerState::BeforeAttrValue);
                    return Step::Continue;
                }
                ch if is_whitespace(ch) => self.consume_tag_char(ch),
                _ => {
                    // A bare attribute; reprocess the character.
                    self.transition_to(TokenizerState::BeforeAttrName);
                    return Step::Continue;
                }
            }
        }
    }

    pub(super) fn step_before_attr_value(&mut self) -> Step {
        loop {
            let Some(ch) = self.peek() else {
                return self.tag_exhausted();
            };
            match ch {
                '"' | '\'' => {
                    self.consume_tag_char(ch);
                    self.token.start_value(Some(ch));
                    self.transition_to(TokenizerState::AttrValueQuoted(ch));
                    return Step::Continue;
                }
                ch if is_whitespace(ch) => self.consume_tag_char(ch),
                '>' => {
                    self.token.start_value(None);
                    self.transition_to(TokenizerState::BeforeAttrName);
                    return Step::Continue;
                }
                _ => {
                    self.token.start_value(None);
                    self.transition_to(TokenizerState::AttrValueUnquoted);
                    return Step::Continue;
                }
            }
        }
    }

    pub(super) fn step_attr_value_quoted(&mut self, quote: char) -> Step {
        loop {
            let bytes = self.rest().as_bytes();
            if bytes.is_empty() {
                return self.tag_exhausted();
            }
            let available = bytes.len();
            match memchr(quote as u8, bytes) {
                Some(0) => {
                    self.consume_tag_char(quote);
                    self.transition_to(TokenizerState::BeforeAttrName);
                    return Step::Continue;
                }
                Some(end) => self.take_value(end),
                None => self.take_value(available),
            }
        }
    }

    pub(super) fn step_attr_value_unquoted(&mut self) -> Step {
        loop {
            let bytes = self.rest().as_bytes();
            if bytes.is_empty() {
                return self.tag_exhausted();
            }
            let end = bytes
                .iter()
                .position(|b| classify_byte(*b).contains(CharClass::VALUE_END))
                .unwrap_or(bytes.len());
            if end == 0 {
                self.transition_to(TokenizerState::BeforeAttrName);
                return Step::Continue;
            }
            self.take_value(end);
        }
    }

    /// Move `len` bytes of attribute value into the token. Values longer
    /// than `max_tag_bytes` are truncated; invalid characters are removed.
    fn take_value(&mut self, len: usize) {
        let segment = &self.buffer.as_str()[self.pos..self.pos + len];
        let clean = segment
            .char_indices()
            .find(|(_, ch)| is_invalid(*ch))
            .map_or(len, |(i, _)| i);
        let value_len = self
            .token
            .attributes()
            .last()
            .and_then(|attr| attr.value)
            .map_or(0, |range| range.len());
        let mut keep = clean.min(self.config.max_tag_bytes.saturating_sub(value_len));
        while !segment.is_char_boundary(keep) {
            keep -= 1;
        }
        let segment = &self.buffer.as_str()[self.pos..self.pos + clean];
        self.token.push_value_str(&segment[..keep]);
        if self.raw_complete {
            if self.raw.len() + clean > self.config.max_tag_bytes {
                self.raw_complete = false;
                self.raw.clear();
            } else {
                self.raw.push_str(segment);
            }
        }
        self.advance(clean);
        if clean < len {
            let ch_len = self.rest().chars().next().map_or(1, char::len_utf8);
            self.remove_invalid(ch_len);
        }
    }

    pub(super) fn step_self_closing(&mut self) -> Step {
        let Some(ch) = self.peek() else {
            return self.tag_exhausted();
        };
        if ch == '>' {
            // A literal element keeps its content whatever the `/` says.
            if self.token.is_end_tag() || Dtd::get().tag(self.token.tag()).literal == LiteralMode::None
            {
                self.token.set_empty_scope();
            }
            self.consume_tag_char(ch);
            return self.finish_tag();
        }
        self.transition_to(TokenizerState::BeforeAttrName);
        Step::Continue
    }

    fn emit_tag_fragment(&mut self) -> Step {
        self.token.set_fragment(self.fragment(false));
        self.token.set_source_end(self.offset);
        self.fragment_emitted = true;
        self.raw_complete = false;
        self.raw.clear();
        self.after_emit = AfterEmit::ContinueTag;
        Step::Emit(TokenKind::Tag)
    }

    /// `>` was consumed: the tag is complete.
    fn finish_tag(&mut self) -> Step {
        self.token.set_fragment(self.fragment(true));
        self.token.set_source_end(self.offset);
        self.raw.clear();
        self.transition_to(TokenizerState::Text);
        let tag = self.token.tag();
        if !self.token.is_end_tag() {
            let literal = Dtd::get().tag(tag).literal;
            if literal != LiteralMode::None {
                self.literal_tag = tag;
                self.literal_mode = literal;
                self.transition_to(TokenizerState::Literal);
            }
            if tag == TagId::Meta
                && self.config.sniff_charset
                && !self.fragment_emitted
                && let Some(step) = self.sniff_charset()
            {
                return step;
            }
        }
        Step::Emit(TokenKind::Tag)
    }
}
