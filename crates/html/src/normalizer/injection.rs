//! Splicing extra content into the stream at a safe point.
//!
//! Injected content is parsed by a nested normalizer that starts in the
//! innermost root or body context and closes everything it opened at its
//! end. Elements open above that context are bracketed by an
//! `OverlappedClose`/`OverlappedReopen` pair.

use super::context::Context;
use super::queue::Event;
use super::{Normalizer, NormalizerConfig, TagSource};
use crate::input::{InputSource, Restartable, StringSource};
use crate::tokenizer::{Tokenizer, TokenizerConfig};

impl<S: InputSource> Normalizer<S> {
    /// Queue `html` to be spliced in at the current point of the stream.
    pub fn inject(&mut self, html: &str) {
        if self.finished {
            log::debug!(target: "html.normalizer", "injection after end of input ignored");
            return;
        }
        if self.holding {
            // The held tag has not been placed yet; splice behind it.
            self.deferred.push(html.to_owned());
            return;
        }
        self.queue_injection(html);
    }

    /// The innermost context injected content may go in.
    fn safe_context(&self) -> Context {
        self.contexts
            .iter()
            .rev()
            .find(|ctx| ctx.is_safe())
            .copied()
            .unwrap_or_else(Context::root)
    }

    /// Number of open elements up to and including the safe context's.
    fn safe_depth(&self) -> usize {
        self.safe_context().element.map_or(0, |index| index + 1)
    }

    pub(super) fn queue_injection(&mut self, html: &str) {
        let safe = self.safe_context();
        let depth = self.safe_depth();
        let above = u32::try_from(self.elements.len() - depth).unwrap_or(u32::MAX);
        log::debug!(
            target: "html.normalizer",
            "injecting {} bytes into <{}> ({above} elements above)",
            html.len(),
            safe.tag.name()
        );
        let nested = self.nested(html, safe, depth);
        if above > 0 {
            self.queue.push(Event::OverlappedClose(above));
        }
        self.queue.push(Event::InjectionBegin);
        self.queue.push(Event::Nested(Box::new(nested)));
        self.queue.push(Event::InjectionEnd);
        if above > 0 {
            self.queue.push(Event::OverlappedReopen(above));
        }
        self.stats.injections = self.stats.injections.saturating_add(1);
    }

    fn nested(&self, html: &str, safe: Context, depth: usize) -> Normalizer<StringSource> {
        let tokenizer_config = TokenizerConfig {
            sniff_charset: false,
            ..self.tokenizer.config().clone()
        };
        let config = NormalizerConfig {
            max_depth: self.config.max_depth.saturating_sub(depth),
            collapse_whitespace: self.config.collapse_whitespace,
            header: None,
            footer: None,
        };
        let tokenizer = Tokenizer::new(StringSource::complete(html), tokenizer_config);
        let mut nested = Normalizer::with_base(tokenizer, config, Context::base(safe.tag, safe.def));
        nested.disable_restart();
        nested
    }

    /// The configured header is still to be placed and the stream is at a
    /// content position.
    pub(super) fn header_due(&self) -> bool {
        !self.header_done && self.config.header.is_some() && self.context().is_safe()
    }

    pub(super) fn inject_header(&mut self) {
        self.header_done = true;
        if let Some(header) = self.config.header.take() {
            self.queue_injection(&header);
            self.config.header = Some(header);
        }
    }

    /// End of input: place the footer (and a header nothing triggered),
    /// then close everything.
    pub(super) fn finish_document(&mut self) {
        self.drop_pending_space();
        let header = !self.header_done && self.config.header.is_some();
        if header || self.config.footer.is_some() {
            let depth = self.safe_depth();
            while self.elements.len() > depth {
                self.pop_element(TagSource::Synthetic);
            }
            self.drop_pending_space();
            if header {
                self.inject_header();
            }
            if let Some(footer) = self.config.footer.take() {
                self.queue_injection(&footer);
                self.config.footer = Some(footer);
            }
        }
        while !self.elements.is_empty() {
            self.pop_element(TagSource::Synthetic);
        }
        self.queue.push(Event::EndOfFile);
    }
}
