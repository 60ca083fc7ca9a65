//! Tag open and close procedures over the element and context stacks.

use super::context::Context;
use super::queue::Event;
use super::{Normalizer, TagSource};
use crate::error::ParseError;
use crate::input::InputSource;
use crate::tables::{ContextText, Dtd, Scope, TagDefinition, TagId, TagSetId, TextContainer, TextType};

/// Upper bound on text-container synthesis steps for one request.
const MAX_CONTAINER_STEPS: usize = 32;

impl<S: InputSource> Normalizer<S> {
    pub(super) fn context(&self) -> &Context {
        // The base context is never popped.
        &self.contexts[self.contexts.len() - 1]
    }

    /// The innermost context with containment rules. Contexts without any
    /// only govern text and whitespace.
    fn governing(&self) -> &Context {
        self.contexts
            .iter()
            .rev()
            .find(|ctx| {
                let def = &ctx.def;
                def.accept.is_some()
                    || def.reject.is_some()
                    || def.ignore_end.is_some()
                    || def.close_on.is_some()
            })
            .unwrap_or(&self.contexts[0])
    }

    /// Search the open elements from the top for a member of `set`.
    /// Reaching a member of `stop`, or a context-defining element when
    /// `stop_at_context`, ends the search.
    fn find(
        &self,
        set: Option<TagSetId>,
        stop: Option<TagSetId>,
        stop_at_context: bool,
    ) -> Option<usize> {
        let set = set?;
        let dtd = Dtd::get();
        for (index, &tag) in self.elements.iter().enumerate().rev() {
            if dtd.set(set).contains(tag) {
                return Some(index);
            }
            if dtd.in_set(tag, stop) || (stop_at_context && dtd.tag(tag).context.is_some()) {
                return None;
            }
        }
        None
    }

    /// The open element an end tag for `def` closes.
    fn find_end(&self, def: &TagDefinition) -> Option<usize> {
        let dtd = Dtd::get();
        for (index, &open) in self.elements.iter().enumerate().rev() {
            if open == def.tag || dtd.in_set(open, def.end_match) {
                return Some(index);
            }
            if dtd.in_set(open, def.ignore_end) {
                return None;
            }
        }
        None
    }

    fn has_context_above(&self, index: usize) -> bool {
        let dtd = Dtd::get();
        self.elements[index + 1..]
            .iter()
            .any(|tag| dtd.tag(*tag).context.is_some())
    }

    fn tag_event(&self, source: TagSource, tag: TagId, end_tag: bool) -> Event {
        match source {
            TagSource::Input => Event::Input,
            TagSource::Held => Event::Held,
            TagSource::Synthetic => Event::Synthetic {
                tag,
                end_tag,
                at: self.position(),
            },
        }
    }

    fn drop_begin(&mut self, tag: TagId, source: TagSource) {
        log::debug!(target: "html.normalizer", "dropped <{}>", tag.name());
        self.stats.dropped = self.stats.dropped.saturating_add(1);
        if source != TagSource::Synthetic {
            let count = &mut self.swallowed[tag.index()];
            *count = count.saturating_add(1);
        }
    }

    fn drop_end(&mut self, tag: TagId) {
        log::debug!(target: "html.normalizer", "dropped </{}>", tag.name());
        self.stats.dropped = self.stats.dropped.saturating_add(1);
    }

    /// Consume one swallowed-end record for `tag`, if there is one.
    fn unswallow(&mut self, tag: TagId) -> bool {
        let count = &mut self.swallowed[tag.index()];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    // Open.

    /// Place a begin tag. Returns whether it ended up in the output.
    pub(super) fn open(&mut self, tag: TagId, source: TagSource) -> Result<bool, ParseError> {
        let dtd = Dtd::get();
        let def = dtd.tag(tag);

        loop {
            let ctx = self.governing();
            let Some(index) = ctx.element else { break };
            if !dtd.in_set(tag, ctx.def.close_on) {
                break;
            }
            let closing = ctx.tag;
            self.close_to(index, TagSource::Synthetic);
            if closing == tag {
                // `<select>` inside `select` only closes it.
                log::debug!(target: "html.normalizer", "<{}> closed the open one", tag.name());
                return Ok(false);
            }
        }

        let ctx = self.governing();
        let rejected = dtd.in_set(tag, ctx.def.reject)
            || ctx.def.accept.is_some_and(|set| !dtd.set(set).contains(tag))
            || (def.document_level
                && self.elements.iter().any(|open| !dtd.tag(*open).document_level));
        if rejected {
            self.drop_begin(tag, source);
            return Ok(false);
        }

        if let Some(index) = self.find(def.masking, None, false) {
            if self.has_context_above(index) {
                self.drop_begin(tag, source);
                return Ok(false);
            }
            self.close_to(index, TagSource::Synthetic);
        }

        while let Some(index) = self.find(def.prohibited, def.begin_scope, true) {
            self.close_to(index, TagSource::Synthetic);
        }

        let needs_text = match def.text {
            TextType::Never => false,
            TextType::Always => true,
            TextType::Query => !self.context().def.holds_query,
        };
        if needs_text && !self.request_text_container()? {
            self.drop_begin(tag, source);
            return Ok(false);
        }

        if def.required.is_some()
            && self.find(def.required, def.begin_scope, true).is_none()
            && let Some(container) = def.default_container
        {
            self.open(container, TagSource::Synthetic)?;
        }

        self.place_begin(def, source)?;
        Ok(true)
    }

    fn place_begin(&mut self, def: &'static TagDefinition, source: TagSource) -> Result<(), ParseError> {
        let tag = def.tag;
        if !def.document_level && self.header_due() {
            self.inject_header();
        }
        let empty = def.scope == Scope::Empty
            || match source {
                TagSource::Input => self.tokenizer.token().is_empty_scope(),
                TagSource::Held => self.held.is_empty_scope(),
                TagSource::Synthetic => false,
            };
        if !empty && self.elements.len() >= self.config.max_depth {
            return Err(ParseError::DepthExceeded {
                max: self.config.max_depth,
            });
        }

        self.fill_left(def.fill.begin_left);
        let event = self.tag_event(source, tag, false);
        self.queue.push(event);
        if source == TagSource::Synthetic {
            self.stats.synthesized = self.stats.synthesized.saturating_add(1);
        }
        if !empty {
            let index = self.elements.len();
            self.elements.push(tag);
            self.stats.max_depth = self.stats.max_depth.max(self.elements.len());
            if let Some(ctx) = def.context {
                self.contexts.push(Context::for_element(tag, index, ctx));
            }
        }
        self.fill_right(def.fill.begin_right);
        Ok(())
    }

    /// Walk the contexts until one takes text, synthesizing or closing
    /// containers on the way. Returns false when the content is dropped.
    pub(super) fn request_text_container(&mut self) -> Result<bool, ParseError> {
        for _ in 0..MAX_CONTAINER_STEPS {
            let ctx = *self.context();
            if ctx.def.text != ContextText::Discard {
                return Ok(true);
            }
            match ctx.def.text_container {
                TextContainer::Drop => return Ok(false),
                TextContainer::Close => match ctx.element {
                    Some(index) => self.close_to(index, TagSource::Synthetic),
                    None => return Ok(false),
                },
                TextContainer::Open(container) => {
                    let before = (self.contexts.len(), ctx.element);
                    self.open(container, TagSource::Synthetic)?;
                    if before == (self.contexts.len(), self.context().element) {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(false)
    }

    // Close.

    /// Pop and close the top element.
    pub(super) fn pop_element(&mut self, source: TagSource) {
        let Some(&tag) = self.elements.last() else {
            return;
        };
        let def = Dtd::get().tag(tag);
        self.fill_left(def.fill.end_left);
        let event = self.tag_event(source, tag, true);
        self.queue.push(event);
        if source == TagSource::Synthetic {
            self.stats.synthesized = self.stats.synthesized.saturating_add(1);
        }
        self.elements.pop();
        let depth = self.elements.len();
        if self.context().element == Some(depth) {
            self.contexts.pop();
        }
        self.fill_right(def.fill.end_right);
    }

    /// Close every element above `index`, then the element at `index`.
    pub(super) fn close_to(&mut self, index: usize, last: TagSource) {
        while self.elements.len() > index + 1 {
            self.pop_element(TagSource::Synthetic);
        }
        self.pop_element(last);
    }

    /// Place an end tag.
    pub(super) fn close(&mut self, tag: TagId, source: TagSource) -> Result<(), ParseError> {
        let dtd = Dtd::get();
        let def = dtd.tag(tag);
        if self.unswallow(tag) || dtd.in_set(tag, self.governing().def.ignore_end) {
            self.drop_end(tag);
            return Ok(());
        }

        let Some(index) = self.find_end(def) else {
            match def.implicit_begin {
                // `</p>` reads as `<p></p>`, `</br>` as `<br>`.
                Some(substitute) => {
                    let placed = self.open(substitute, TagSource::Synthetic)?;
                    if placed
                        && dtd.tag(substitute).scope != Scope::Empty
                        && self.elements.last() == Some(&substitute)
                    {
                        self.pop_element(source);
                    }
                }
                None => self.drop_end(tag),
            }
            return Ok(());
        };

        let target = self.elements[index];
        let last = if target == tag { source } else { TagSource::Synthetic };
        if index + 1 == self.elements.len() {
            self.pop_element(last);
        } else if dtd.tag(target).scope == Scope::Overlap && !self.has_context_above(index) {
            self.overlap_close(index, last);
        } else {
            self.close_to(index, last);
        }
        Ok(())
    }

    /// Close the element at `index` out of order. The elements above it
    /// stay open; the events around the end tell sinks to close and reopen
    /// them.
    fn overlap_close(&mut self, index: usize, last: TagSource) {
        let tag = self.elements[index];
        let def = Dtd::get().tag(tag);
        let above = u32::try_from(self.elements.len() - index - 1).unwrap_or(u32::MAX);
        self.queue.push(Event::OverlappedClose(above));
        self.fill_left(def.fill.end_left);
        let event = self.tag_event(last, tag, true);
        self.queue.push(event);
        self.elements.remove(index);
        self.fill_right(def.fill.end_right);
        self.queue.push(Event::OverlappedReopen(above));
        self.stats.overlaps = self.stats.overlaps.saturating_add(1);
    }
}
