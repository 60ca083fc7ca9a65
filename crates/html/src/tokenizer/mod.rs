//! Streaming tokenizer.
//!
//! A pull-based state machine over the bounded character buffer it owns.
//! `parse()` yields one token per call, or `NeedMoreInput` when the source
//! has nothing more right now. The state machine is resumable at any
//! buffer refill.
//!
//! Invariants:
//! - Chunk-equivalence: feeding input in one chunk or many chunks yields the
//!   same token sequence. Token boundaries depend only on content, EOF and
//!   the configured size limits, never on refill timing.
//! - Committed output is copied into the token as it is scanned; only
//!   undecided lookahead (markup openers, reference names, literal end-tag
//!   candidates, terminators) stays in the buffer across a refill.
//! - The token is valid until the next `parse()` call.

use crate::char_class::is_invalid;
use crate::error::ParseError;
use crate::input::{CharBuffer, InputSource, ReadStatus, Restartable};
use crate::tables::{LiteralMode, TagId};
use crate::token::{Fragment, Token, TokenKind};
use entity::{EntityMode, RefMatch, match_reference};
use memchr::memchr2;
use states::TokenizerState;

mod charset;
pub(crate) mod entity;
mod literal;
mod markup;
mod states;
mod tag;

pub use charset::charset_from_content;

pub const MIN_BUFFER_CAPACITY: usize = 256;

/// Configuration for the tokenizer.
#[derive(Clone, Debug)]
pub struct TokenizerConfig {
    /// Size of the character buffer; clamped to [`MIN_BUFFER_CAPACITY`].
    pub buffer_capacity: usize,
    /// A text token is cut once its content reaches this many bytes.
    pub max_text_bytes: usize,
    /// A tag is emitted in fragments once its content reaches this size.
    pub max_tag_bytes: usize,
    /// Restart with the encoding declared by a `<meta>` tag.
    pub sniff_charset: bool,
    /// A `<meta>` tag ending past this decoded offset no longer restarts,
    /// and the source stops retaining input once reading passes it.
    pub sniff_window: usize,
    pub decode_entities: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 32 * 1024,
            max_text_bytes: 16 * 1024,
            max_tag_bytes: 8 * 1024,
            sniff_charset: true,
            sniff_window: 1024,
            decode_entities: true,
        }
    }
}

/// Streaming tokenizer result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenizeResult {
    /// A token of this kind is available through `token()`.
    Token(TokenKind),
    /// The source has no more input right now.
    NeedMoreInput,
}

/// Minimal tokenizer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub steps: u64,
    pub state_transitions: u64,
    pub tokens_emitted: u64,
    pub refills: u64,
    pub invalid_removed: u64,
    pub restarts: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Emit(TokenKind),
    NeedInput,
}

/// How the token is prepared after the previous one was handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterEmit {
    Reset,
    /// Next fragment of the same element tag.
    ContinueTag,
    /// Next fragment of the same declaration.
    ContinueDeclaration(TokenKind),
}

/// What a `<` at the scan position starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookahead {
    Markup,
    Text,
    NeedMore,
}

pub struct Tokenizer<S> {
    config: TokenizerConfig,
    source: S,
    buffer: CharBuffer,
    /// Scan position in `buffer`.
    pos: usize,
    /// Absolute stream offset of `buffer[pos]`, counting removed characters.
    offset: usize,
    eof: bool,
    state: TokenizerState,
    token: Token,
    emitted: bool,
    after_emit: AfterEmit,
    /// Input text of the current construct, for re-emission as text when
    /// it is still unterminated at EOF.
    raw: String,
    raw_complete: bool,
    fragment_emitted: bool,
    literal_tag: TagId,
    literal_mode: LiteralMode,
    sniffed: bool,
    restart_disabled: bool,
    pending_encoding: Option<String>,
    finished: bool,
    stats: TokenizerStats,
}

impl<S: InputSource> Tokenizer<S> {
    pub fn new(source: S, config: TokenizerConfig) -> Self {
        let capacity = config.buffer_capacity.max(MIN_BUFFER_CAPACITY);
        Self {
            config,
            source,
            buffer: CharBuffer::with_capacity(capacity),
            pos: 0,
            offset: 0,
            eof: false,
            state: TokenizerState::Text,
            token: Token::new(),
            emitted: true,
            after_emit: AfterEmit::Reset,
            raw: String::new(),
            raw_complete: true,
            fragment_emitted: false,
            literal_tag: TagId::Unknown,
            literal_mode: LiteralMode::None,
            sniffed: false,
            restart_disabled: false,
            pending_encoding: None,
            finished: false,
            stats: TokenizerStats::default(),
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// The token described by the last `Token(..)` result.
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub(crate) fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Return a copy of current instrumentation counters.
    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Advance to the next token.
    ///
    /// After `EndOfFile` every further call returns `EndOfFile` again.
    pub fn parse(&mut self) -> Result<TokenizeResult, ParseError> {
        if self.finished {
            return Ok(TokenizeResult::Token(TokenKind::EndOfFile));
        }
        if let Some(name) = self.pending_encoding.take() {
            self.token.reset(TokenKind::EncodingChange);
            self.token.set_text(&name);
            self.token.set_source(0..0);
            self.emitted = true;
            self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
            return Ok(TokenizeResult::Token(TokenKind::EncodingChange));
        }
        if self.emitted {
            self.emitted = false;
            self.begin_next_token();
        }
        loop {
            self.stats.steps = self.stats.steps.saturating_add(1);
            match self.step() {
                Step::Continue => {}
                Step::Emit(kind) => {
                    self.emitted = true;
                    self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
                    #[cfg(any(test, feature = "debug-stats"))]
                    log::trace!(
                        target: "html.tokenizer",
                        "emit {:?} source={:?} state={:?}",
                        kind,
                        self.token.source(),
                        self.state
                    );
                    return Ok(TokenizeResult::Token(kind));
                }
                Step::NeedInput => {
                    if !self.fill()? {
                        return Ok(TokenizeResult::NeedMoreInput);
                    }
                }
            }
        }
    }

    fn begin_next_token(&mut self) {
        match std::mem::replace(&mut self.after_emit, AfterEmit::Reset) {
            AfterEmit::Reset => self.token.reset(TokenKind::Text),
            AfterEmit::ContinueTag => self.token.clear_attributes(),
            AfterEmit::ContinueDeclaration(kind) => self.token.reset(kind),
        }
        self.token.set_source(self.offset..self.offset);
    }

    /// Discard consumed input and read more. Returns false when the source
    /// has nothing to offer yet.
    fn fill(&mut self) -> Result<bool, ParseError> {
        debug_assert!(!self.eof, "no state asks for input after EOF");
        if self.eof {
            return Ok(false);
        }
        if self.pos > 0 {
            self.buffer.discard_prefix(self.pos);
            self.pos = 0;
            self.source.report_processed(self.offset);
        }
        if !self.config.sniff_charset || self.sniffed || self.offset > self.config.sniff_window {
            self.close_restart_window();
        }
        self.stats.refills = self.stats.refills.saturating_add(1);
        match self.source.read(&mut self.buffer)? {
            ReadStatus::Data => Ok(true),
            ReadStatus::Pending => Ok(false),
            ReadStatus::Eof => {
                self.eof = true;
                Ok(true)
            }
        }
    }

    fn step(&mut self) -> Step {
        match self.state {
            TokenizerState::Text => self.step_text(),
            TokenizerState::TagOpen => self.step_tag_open(),
            TokenizerState::TagName => self.step_tag_name(),
            TokenizerState::BeforeAttrName => self.step_before_attr_name(),
            TokenizerState::AttrName => self.step_attr_name(),
            TokenizerState::AfterAttrName => self.step_after_attr_name(),
            TokenizerState::BeforeAttrValue => self.step_before_attr_value(),
            TokenizerState::AttrValueQuoted(quote) => self.step_attr_value_quoted(quote),
            TokenizerState::AttrValueUnquoted => self.step_attr_value_unquoted(),
            TokenizerState::SelfClosing => self.step_self_closing(),
            TokenizerState::Comment
            | TokenizerState::Bang
            | TokenizerState::Doctype
            | TokenizerState::Pi
            | TokenizerState::Asp => self.step_declaration(),
            TokenizerState::Literal => self.step_literal(),
        }
    }

    fn transition_to(&mut self, next: TokenizerState) {
        if self.state == next {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        {
            log::trace!(
                target: "html.tokenizer",
                "state {:?} -> {:?} @{}",
                self.state,
                next,
                self.offset
            );
        }
        self.state = next;
        self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
    }

    // Buffer access.

    #[inline]
    fn rest(&self) -> &str {
        &self.buffer.as_str()[self.pos..]
    }

    #[inline]
    fn advance(&mut self, len: usize) {
        self.pos += len;
        self.offset += len;
    }

    /// Next character, compacting invalid characters out of the buffer.
    fn peek(&mut self) -> Option<char> {
        loop {
            let ch = self.rest().chars().next()?;
            if !is_invalid(ch) {
                return Some(ch);
            }
            self.remove_invalid(ch.len_utf8());
        }
    }

    fn remove_invalid(&mut self, len: usize) {
        self.buffer.remove_gap(self.pos..self.pos + len);
        self.offset += len;
        self.token.skip_source(len);
        self.stats.invalid_removed = self.stats.invalid_removed.saturating_add(1);
    }

    /// Copy up to `len` bytes of plain content into the token's runs,
    /// stopping early once the token reaches `max_text_bytes`.
    fn push_content(&mut self, len: usize) {
        let mut left = len;
        while left > 0 && self.token.text_len() < self.config.max_text_bytes {
            let Some(ch) = self.rest().chars().next() else {
                break;
            };
            let ch_len = ch.len_utf8();
            if is_invalid(ch) {
                self.remove_invalid(ch_len);
            } else {
                self.token.push_char(ch);
                self.advance(ch_len);
            }
            left = left.saturating_sub(ch_len);
        }
    }

    /// Decode a character reference at the scan position (on `&`).
    fn push_reference(&mut self, mode: EntityMode) -> Step {
        match match_reference(&self.rest()[1..], mode, self.eof) {
            RefMatch::Matched { ch, consumed } => {
                self.token.push_literal(ch, consumed + 1);
                self.advance(consumed + 1);
                Step::Continue
            }
            RefMatch::NeedMoreInput => Step::NeedInput,
            RefMatch::NoMatch => {
                self.token.push_char('&');
                self.advance(1);
                Step::Continue
            }
        }
    }

    fn emit_text(&mut self) -> Step {
        debug_assert!(!self.token.runs().is_empty());
        self.token.set_source_end(self.offset);
        Step::Emit(TokenKind::Text)
    }

    fn emit_eof(&mut self) -> Step {
        self.token.reset(TokenKind::EndOfFile);
        self.token.set_source(self.offset..self.offset);
        self.finished = true;
        Step::Emit(TokenKind::EndOfFile)
    }

    fn step_text(&mut self) -> Step {
        loop {
            if self.token.text_len() >= self.config.max_text_bytes {
                return self.emit_text();
            }
            let Some(ch) = self.peek() else {
                if !self.eof {
                    return Step::NeedInput;
                }
                if self.token.runs().is_empty() {
                    return self.emit_eof();
                }
                return self.emit_text();
            };
            match ch {
                '<' => match self.markup_lookahead() {
                    Lookahead::NeedMore => return Step::NeedInput,
                    Lookahead::Markup => {
                        if !self.token.runs().is_empty() {
                            return self.emit_text();
                        }
                        self.transition_to(TokenizerState::TagOpen);
                        return Step::Continue;
                    }
                    Lookahead::Text => {
                        self.token.push_char('<');
                        self.advance(1);
                    }
                },
                '&' if self.config.decode_entities => {
                    if self.push_reference(EntityMode::Text) == Step::NeedInput {
                        return Step::NeedInput;
                    }
                }
                _ => {
                    let bytes = self.rest().as_bytes();
                    let first = ch.len_utf8();
                    let end = memchr2(b'<', b'&', &bytes[first..])
                        .map_or(bytes.len(), |i| first + i);
                    self.push_content(end);
                }
            }
        }
    }

    fn markup_lookahead(&self) -> Lookahead {
        let bytes = self.rest().as_bytes();
        debug_assert_eq!(bytes.first(), Some(&b'<'));
        let undecided = if self.eof {
            Lookahead::Text
        } else {
            Lookahead::NeedMore
        };
        match bytes.get(1) {
            None => undecided,
            Some(b) if b.is_ascii_alphabetic() => Lookahead::Markup,
            Some(b'!' | b'?' | b'%') => Lookahead::Markup,
            Some(b'/') => match bytes.get(2) {
                None => undecided,
                Some(b) if b.is_ascii_alphabetic() || *b == b'>' => Lookahead::Markup,
                Some(_) => Lookahead::Text,
            },
            Some(_) => Lookahead::Text,
        }
    }

    fn step_tag_open(&mut self) -> Step {
        let bytes = self.rest().as_bytes();
        let (second, third) = (bytes.get(1).copied(), bytes.get(2).copied());
        match (second, third) {
            (Some(b'/'), Some(b'>')) => {
                // `</>` carries nothing.
                self.advance(3);
                self.token.set_source(self.offset..self.offset);
                self.transition_to(TokenizerState::Text);
                Step::Continue
            }
            (Some(b'/'), None) => Step::NeedInput,
            (Some(b'/'), Some(_)) => {
                self.begin_element_tag(true);
                Step::Continue
            }
            (Some(b'!'), _) => self.begin_bang(),
            (Some(b'?'), _) => self.begin_declaration(TokenizerState::Pi, 2),
            (Some(b'%'), _) => self.begin_declaration(TokenizerState::Asp, 2),
            (Some(_), _) => {
                self.begin_element_tag(false);
                Step::Continue
            }
            (None, _) => {
                // Lookahead was decided in Text; nothing else can land here.
                self.transition_to(TokenizerState::Text);
                Step::Continue
            }
        }
    }

    /// Start a fresh construct token at the scan position.
    fn begin_construct(&mut self, kind: TokenKind) {
        self.token.reset(kind);
        self.token.set_source(self.offset..self.offset);
        self.raw.clear();
        self.raw_complete = true;
        self.fragment_emitted = false;
    }

    /// Fragment position of the token about to be emitted.
    fn fragment(&self, last: bool) -> Fragment {
        Fragment {
            first: !self.fragment_emitted,
            last,
        }
    }

    /// Replace the current construct with its raw input as a text token.
    fn reemit_raw_as_text(&mut self) -> Step {
        let start = self.token.source().start;
        self.token.reset(TokenKind::Text);
        self.token.set_source(start..start);
        self.token.push_str(&self.raw);
        let extent = self.offset - start;
        let len = self.token.text_len();
        if extent > len {
            self.token.skip_source(extent - len);
        }
        self.raw.clear();
        self.transition_to(TokenizerState::Text);
        self.emit_text()
    }

    /// Give up restart for good so the source can release retained input.
    fn close_restart_window(&mut self) {
        if !self.restart_disabled {
            log::debug!(
                target: "html.tokenizer",
                "restart window closed at offset {}",
                self.offset
            );
            self.disable_restart();
        }
    }

    /// Reset all scan state so parsing starts over from offset 0.
    fn reset_scan(&mut self) {
        self.buffer.clear();
        self.pos = 0;
        self.offset = 0;
        self.eof = false;
        self.state = TokenizerState::Text;
        self.after_emit = AfterEmit::Reset;
        self.raw.clear();
        self.raw_complete = true;
        self.fragment_emitted = false;
        self.literal_tag = TagId::Unknown;
        self.literal_mode = LiteralMode::None;
        self.finished = false;
        self.emitted = true;
    }
}

impl<S: InputSource> Restartable for Tokenizer<S> {
    fn can_restart(&self) -> bool {
        !self.restart_disabled && self.source.can_restart()
    }

    fn restart(&mut self) -> Result<(), ParseError> {
        if self.restart_disabled {
            return Err(ParseError::RestartDisabled);
        }
        self.source.restart()?;
        self.reset_scan();
        self.pending_encoding = None;
        self.stats.restarts = self.stats.restarts.saturating_add(1);
        log::debug!(target: "html.tokenizer", "restarted");
        Ok(())
    }

    fn disable_restart(&mut self) {
        self.restart_disabled = true;
        self.source.disable_restart();
    }
}

#[cfg(test)]
mod tests;
