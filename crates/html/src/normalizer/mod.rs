//! Structural normalizer.
//!
//! Pulls tokens from a [`Tokenizer`] and applies the tag containment rules
//! of [`Dtd`] so the output is always well-formed: every begin of a stacked
//! element is matched by exactly one end, in order, whatever the input.
//! Repairs happen by dropping tags, synthesizing containers and ends, and
//! overlap correction for mis-nested phrasing elements.
//!
//! Invariants:
//! - The element stack never exceeds `max_depth`; reaching it is fatal and
//!   poisons the normalizer.
//! - Events drain in FIFO order, one per `parse()` call. A partially read
//!   tag is held behind a `Suspend` sentinel and never exposed.
//! - Events that refer to the tokenizer's token are drained before the
//!   tokenizer is advanced.

use crate::error::ParseError;
use crate::input::{ByteSource, InputSource, Restartable, StringSource};
use crate::tables::{Dtd, FillCode, TagId};
use crate::token::{Fragment, Token, TokenKind};
use crate::tokenizer::{TokenizeResult, Tokenizer, TokenizerConfig};
use context::Context;
use queue::{Event, EventQueue};
use tools::Encoding;

mod context;
mod injection;
mod queue;
mod stack;
mod whitespace;

#[derive(Clone, Debug)]
pub struct NormalizerConfig {
    /// Maximum number of open elements.
    pub max_depth: usize,
    pub collapse_whitespace: bool,
    /// Content injected before the first body content.
    pub header: Option<String>,
    /// Content injected at the end of the body.
    pub footer: Option<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            collapse_whitespace: true,
            header: None,
            footer: None,
        }
    }
}

/// Configuration of the whole tokenizer + normalizer pipeline.
#[derive(Clone, Debug, Default)]
pub struct ParserConfig {
    pub tokenizer: TokenizerConfig,
    pub normalizer: NormalizerConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizerStats {
    pub events: u64,
    pub synthesized: u64,
    pub dropped: u64,
    pub overlaps: u64,
    pub injections: u64,
    /// Deepest element nesting reached.
    pub max_depth: usize,
}

/// Where the data of a tag event lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagSource {
    /// The tokenizer's current token.
    Input,
    /// The tag assembled from fragments.
    Held,
    Synthetic,
}

/// Which token `token()` shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shown {
    Tokenizer,
    Held,
    Own,
    /// The token of the injection at the queue head.
    Nested,
}

fn space_flags(tag: TagId, end_tag: bool) -> (bool, bool) {
    let fill = Dtd::get().tag(tag).fill;
    (
        fill.left(end_tag) != FillCode::Eat,
        fill.right(end_tag) != FillCode::Eat,
    )
}

pub struct Normalizer<S> {
    config: NormalizerConfig,
    tokenizer: Tokenizer<S>,
    elements: Vec<TagId>,
    /// Never empty: the base context sits at the bottom.
    contexts: Vec<Context>,
    base: Context,
    queue: EventQueue,
    out: Token,
    shown: Shown,
    held: Token,
    holding: bool,
    /// Injections requested while a tag was held.
    deferred: Vec<String>,
    /// Per tag: dropped begins whose end tag is still to be swallowed.
    swallowed: Vec<u32>,
    header_done: bool,
    finished: bool,
    poisoned: bool,
    stats: NormalizerStats,
}

impl<S: InputSource> Normalizer<S> {
    pub fn new(tokenizer: Tokenizer<S>, config: NormalizerConfig) -> Self {
        Self::with_base(tokenizer, config, Context::root())
    }

    fn with_base(tokenizer: Tokenizer<S>, config: NormalizerConfig, base: Context) -> Self {
        Self {
            config,
            tokenizer,
            elements: Vec::new(),
            contexts: vec![base],
            base,
            queue: EventQueue::default(),
            out: Token::new(),
            shown: Shown::Own,
            held: Token::new(),
            holding: false,
            deferred: Vec::new(),
            swallowed: vec![0; TagId::COUNT],
            header_done: false,
            finished: false,
            poisoned: false,
            stats: NormalizerStats::default(),
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer<S> {
        &self.tokenizer
    }

    pub fn source_mut(&mut self) -> &mut S {
        self.tokenizer.source_mut()
    }

    pub fn stats(&self) -> NormalizerStats {
        self.stats
    }

    /// Elements currently open, outermost first.
    pub fn open_elements(&self) -> &[TagId] {
        &self.elements
    }

    /// The token described by the last `Token(..)` result.
    pub fn token(&self) -> &Token {
        match self.shown {
            Shown::Tokenizer => self.tokenizer.token(),
            Shown::Held => &self.held,
            Shown::Own => &self.out,
            Shown::Nested => match self.queue.front() {
                Some(Event::Nested(nested)) => nested.token(),
                _ => &self.out,
            },
        }
    }

    /// Advance to the next normalized event.
    ///
    /// After `EndOfFile` every further call returns `EndOfFile` again. A
    /// fatal error poisons the normalizer.
    pub fn parse(&mut self) -> Result<TokenizeResult, ParseError> {
        if self.poisoned {
            return Err(ParseError::Poisoned);
        }
        match self.advance() {
            Err(err) if err.is_fatal() => {
                log::warn!(target: "html.normalizer", "{err}");
                self.poisoned = true;
                Err(err)
            }
            result => result,
        }
    }

    fn advance(&mut self) -> Result<TokenizeResult, ParseError> {
        loop {
            if let Some(kind) = self.drain()? {
                self.stats.events = self.stats.events.saturating_add(1);
                return Ok(TokenizeResult::Token(kind));
            }
            if self.finished {
                self.out.reset(TokenKind::EndOfFile);
                self.shown = Shown::Own;
                return Ok(TokenizeResult::Token(TokenKind::EndOfFile));
            }
            match self.tokenizer.parse()? {
                TokenizeResult::NeedMoreInput => return Ok(TokenizeResult::NeedMoreInput),
                TokenizeResult::Token(kind) => self.process(kind)?,
            }
        }
    }

    /// Hand out the next queued event, if one is ready.
    fn drain(&mut self) -> Result<Option<TokenKind>, ParseError> {
        loop {
            let Some(event) = self.queue.pop() else {
                return Ok(None);
            };
            let kind = match event {
                Event::Suspend => {
                    self.queue.push_front(Event::Suspend);
                    return Ok(None);
                }
                Event::Nested(mut nested) => match nested.parse()? {
                    TokenizeResult::Token(TokenKind::EndOfFile) | TokenizeResult::NeedMoreInput => {
                        continue;
                    }
                    TokenizeResult::Token(kind) => {
                        self.queue.push_front(Event::Nested(nested));
                        self.shown = Shown::Nested;
                        kind
                    }
                },
                Event::Input => {
                    let token = self.tokenizer.token_mut();
                    if token.kind() == TokenKind::Tag {
                        let (before, after) = space_flags(token.tag(), token.is_end_tag());
                        token.set_space_flags(before, after);
                    }
                    self.shown = Shown::Tokenizer;
                    token.kind()
                }
                Event::Runs(runs) => {
                    self.out.reset(TokenKind::Text);
                    self.out.copy_runs_from(self.tokenizer.token(), runs);
                    self.shown = Shown::Own;
                    TokenKind::Text
                }
                Event::Held => {
                    let (before, after) = space_flags(self.held.tag(), self.held.is_end_tag());
                    self.held.set_space_flags(before, after);
                    self.shown = Shown::Held;
                    TokenKind::Tag
                }
                Event::Synthetic { tag, end_tag, at } => {
                    self.out.set_synthetic_tag(tag, end_tag, at);
                    let (before, after) = space_flags(tag, end_tag);
                    self.out.set_space_flags(before, after);
                    self.shown = Shown::Own;
                    TokenKind::Tag
                }
                Event::Space { at } => self.show(TokenKind::Space, at),
                Event::OverlappedClose(count) => {
                    let kind = self.show(TokenKind::OverlappedClose, self.position());
                    self.out.set_count(count);
                    kind
                }
                Event::OverlappedReopen(count) => {
                    let kind = self.show(TokenKind::OverlappedReopen, self.position());
                    self.out.set_count(count);
                    kind
                }
                Event::InjectionBegin => self.show(TokenKind::InjectionBegin, self.position()),
                Event::InjectionEnd => self.show(TokenKind::InjectionEnd, self.position()),
                Event::EndOfFile => {
                    self.finished = true;
                    self.show(TokenKind::EndOfFile, self.position())
                }
            };
            return Ok(Some(kind));
        }
    }

    /// Show an event without content.
    fn show(&mut self, kind: TokenKind, at: usize) -> TokenKind {
        self.out.reset(kind);
        self.out.set_source(at..at);
        self.shown = Shown::Own;
        kind
    }

    /// Stream offset of the input being placed.
    fn position(&self) -> usize {
        if self.holding {
            self.held.source().start
        } else {
            self.tokenizer.token().source().start
        }
    }

    fn process(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "html.normalizer",
            "input {:?} depth={} contexts={}",
            kind,
            self.elements.len(),
            self.contexts.len()
        );
        match kind {
            TokenKind::Text => self.place_text(),
            TokenKind::Tag => self.place_tag_token(),
            TokenKind::Restart => {
                log::debug!(target: "html.normalizer", "stream restarted");
                self.reset_structure();
                self.queue.push(Event::Input);
                Ok(())
            }
            TokenKind::EndOfFile => {
                if self.holding {
                    self.release_held()?;
                }
                self.finish_document();
                Ok(())
            }
            _ => {
                self.queue.push(Event::Input);
                Ok(())
            }
        }
    }

    fn place_tag_token(&mut self) -> Result<(), ParseError> {
        let token = self.tokenizer.token();
        let tag = token.tag();
        let end_tag = token.is_end_tag();
        let fragment = token.fragment();
        if !tag.is_element() {
            // Unknown tags are content, never stacked.
            if !end_tag && self.header_due() {
                self.inject_header();
            }
            self.queue.push(Event::Input);
            return Ok(());
        }
        if fragment.is_whole() {
            return self.place_tag(tag, end_tag, TagSource::Input);
        }
        if fragment.first {
            self.held.clone_from(token);
            self.holding = true;
            self.queue.push(Event::Suspend);
            return Ok(());
        }
        self.held.merge_attributes(token);
        if fragment.last {
            self.release_held()?;
        }
        Ok(())
    }

    /// The held tag is complete: place it and re-insert its events at the
    /// queue head.
    fn release_held(&mut self) -> Result<(), ParseError> {
        self.holding = false;
        self.held.set_fragment(Fragment::WHOLE);
        let mut tail = self.queue.take();
        if matches!(tail.front(), Some(Event::Suspend)) {
            tail.pop_front();
        }
        let result = self.place_tag(self.held.tag(), self.held.is_end_tag(), TagSource::Held);
        self.queue.restore(tail);
        result?;
        for html in std::mem::take(&mut self.deferred) {
            self.queue_injection(&html);
        }
        Ok(())
    }

    fn place_tag(&mut self, tag: TagId, end_tag: bool, source: TagSource) -> Result<(), ParseError> {
        if end_tag {
            self.close(tag, source)
        } else {
            self.open(tag, source).map(|_| ())
        }
    }

    /// Forget all structure; the stream starts over.
    fn reset_structure(&mut self) {
        self.elements.clear();
        self.contexts.clear();
        self.contexts.push(self.base);
        self.queue.clear();
        self.holding = false;
        self.deferred.clear();
        self.swallowed.fill(0);
        self.header_done = false;
        self.finished = false;
    }
}

impl Normalizer<StringSource> {
    /// Normalize a complete, already decoded document.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(html: &str, config: ParserConfig) -> Self {
        let tokenizer = Tokenizer::new(StringSource::complete(html), config.tokenizer);
        Self::new(tokenizer, config.normalizer)
    }
}

impl Normalizer<ByteSource> {
    /// Normalize a complete byte document, starting with `encoding`.
    pub fn from_bytes(bytes: &[u8], encoding: Encoding, config: ParserConfig) -> Self {
        let tokenizer = Tokenizer::new(ByteSource::complete(bytes, encoding), config.tokenizer);
        Self::new(tokenizer, config.normalizer)
    }
}

impl<S: InputSource> Restartable for Normalizer<S> {
    fn can_restart(&self) -> bool {
        !self.poisoned && self.tokenizer.can_restart()
    }

    fn restart(&mut self) -> Result<(), ParseError> {
        if self.poisoned {
            return Err(ParseError::Poisoned);
        }
        self.tokenizer.restart()?;
        self.reset_structure();
        self.shown = Shown::Own;
        self.out.reset(TokenKind::Restart);
        Ok(())
    }

    fn disable_restart(&mut self) {
        self.tokenizer.disable_restart();
    }
}
