//! Text placement and whitespace collapsing.
//!
//! In a `Full` context collapsible whitespace becomes at most one `Space`
//! event between pieces of content. Tag boundaries apply their fill codes:
//! left codes before the tag's event, right codes after it.

use super::queue::Event;
use super::Normalizer;
use crate::char_class::is_cjk;
use crate::error::ParseError;
use crate::input::InputSource;
use crate::tables::{ContextText, FillCode};
use crate::token::RunKind;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextMode {
    /// Text passes through unchanged.
    Pass,
    Collapse,
    /// Whitespace is dropped; content needs a text container.
    Discard,
}

fn is_single_newline(text: &str) -> bool {
    matches!(text, "\n" | "\r" | "\r\n")
}

impl<S: InputSource> Normalizer<S> {
    fn text_mode(&self) -> TextMode {
        match self.context().def.text {
            ContextText::Literal => TextMode::Pass,
            ContextText::Full if self.config.collapse_whitespace => TextMode::Collapse,
            ContextText::Full => TextMode::Pass,
            ContextText::Discard => TextMode::Discard,
        }
    }

    fn collapsing(&self) -> bool {
        self.text_mode() == TextMode::Collapse
    }

    pub(super) fn fill_left(&mut self, code: FillCode) {
        if !self.collapsing() {
            return;
        }
        let at = self.position();
        let Some(ctx) = self.contexts.last_mut() else {
            return;
        };
        match code {
            FillCode::Put => {
                if ctx.space.take_pending() {
                    self.queue.push(Event::Space { at });
                }
            }
            FillCode::Eat => ctx.space.eat(),
            FillCode::Nul => {}
        }
    }

    pub(super) fn fill_right(&mut self, code: FillCode) {
        if !self.collapsing() {
            return;
        }
        let Some(ctx) = self.contexts.last_mut() else {
            return;
        };
        match code {
            FillCode::Eat => ctx.space.eat(),
            FillCode::Put => ctx.space.eat = false,
            FillCode::Nul => {}
        }
    }

    /// Queue the pending runs of the current text token as one event.
    fn flush_runs(&mut self, group: &mut Range<usize>, total: usize) {
        if group.start == group.end {
            return;
        }
        if group.start == 0 && group.end == total {
            self.queue.push(Event::Input);
        } else {
            self.queue.push(Event::Runs(group.clone()));
        }
        *group = group.end..group.end;
    }

    /// Place the tokenizer's current text token.
    pub(super) fn place_text(&mut self) -> Result<(), ParseError> {
        let total = self.tokenizer.token().runs().len();
        let mut at = self.tokenizer.token().source().start;
        let mut group = 0..0;
        let mut index = 0;
        while index < total {
            let token = self.tokenizer.token();
            let run = token.runs()[index];
            let text = token.run_text(&run);
            let first = text.chars().next();
            let last = text.chars().next_back();
            let single_newline = run.kind == RunKind::NewLine && is_single_newline(text);
            let collapsible = run.kind.is_collapsible();

            if !collapsible && self.header_due() {
                self.flush_runs(&mut group, total);
                self.inject_header();
            }
            match self.text_mode() {
                TextMode::Pass => {}
                TextMode::Collapse if collapsible => {
                    self.flush_runs(&mut group, total);
                    if let Some(ctx) = self.contexts.last_mut() {
                        ctx.space.whitespace(single_newline);
                    }
                    at += run.source_len as usize;
                    index += 1;
                    group = index..index;
                    continue;
                }
                TextMode::Collapse => {
                    let space = self.context().space;
                    // One line break between two CJK characters is no space.
                    let joined = space.one_newline
                        && space.last_char.is_some_and(is_cjk)
                        && first.is_some_and(is_cjk);
                    if space.pending && !joined {
                        self.flush_runs(&mut group, total);
                        self.queue.push(Event::Space { at });
                    }
                    if let Some(ctx) = self.contexts.last_mut() {
                        ctx.space.content(last);
                    }
                }
                TextMode::Discard => {
                    self.flush_runs(&mut group, total);
                    if collapsible || !self.request_text_container()? {
                        at += run.source_len as usize;
                        index += 1;
                        group = index..index;
                    }
                    // Otherwise retry the run in the container.
                    continue;
                }
            }
            if group.start == group.end {
                group = index..index + 1;
            } else {
                group.end = index + 1;
            }
            at += run.source_len as usize;
            index += 1;
        }
        self.flush_runs(&mut group, total);
        Ok(())
    }

    /// Drop the pending whitespace of every context; nothing follows.
    pub(super) fn drop_pending_space(&mut self) {
        for ctx in &mut self.contexts {
            ctx.space.take_pending();
        }
    }
}
