//! Containment contexts and their whitespace state.

use crate::tables::{ContextDef, Dtd, TagId};

/// Whitespace collapsing state of one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct SpaceState {
    /// Collapsible whitespace was seen since the last content.
    pub(super) pending: bool,
    /// Whitespace is suppressed until the next content.
    pub(super) eat: bool,
    /// Last content character emitted in this context.
    pub(super) last_char: Option<char>,
    /// The pending whitespace is exactly one line break.
    pub(super) one_newline: bool,
}

impl SpaceState {
    pub(super) const fn new() -> Self {
        Self {
            pending: false,
            eat: true,
            last_char: None,
            one_newline: false,
        }
    }

    /// Clear the pending space, reporting whether there was one.
    pub(super) fn take_pending(&mut self) -> bool {
        let pending = self.pending;
        self.pending = false;
        self.one_newline = false;
        pending
    }

    pub(super) fn eat(&mut self) {
        self.take_pending();
        self.eat = true;
    }

    /// Record a collapsible run; `single_newline` when the run is one line
    /// break.
    pub(super) fn whitespace(&mut self, single_newline: bool) {
        if self.eat {
            return;
        }
        if self.pending {
            self.one_newline = false;
        } else {
            self.pending = true;
            self.one_newline = single_newline;
        }
    }

    pub(super) fn content(&mut self, last: Option<char>) {
        self.take_pending();
        self.eat = false;
        if last.is_some() {
            self.last_char = last;
        }
    }
}

/// A region governed by one [`ContextDef`].
#[derive(Clone, Copy, Debug)]
pub(super) struct Context {
    pub(super) tag: TagId,
    /// Stack index of the element that opened the context; `None` for the
    /// base context.
    pub(super) element: Option<usize>,
    pub(super) def: ContextDef,
    pub(super) space: SpaceState,
}

impl Context {
    pub(super) fn root() -> Self {
        Self::base(TagId::Root, *Dtd::get().root_context())
    }

    /// A base context with no element behind it.
    pub(super) fn base(tag: TagId, def: ContextDef) -> Self {
        Self {
            tag,
            element: None,
            def,
            space: SpaceState::new(),
        }
    }

    pub(super) fn for_element(tag: TagId, index: usize, def: ContextDef) -> Self {
        Self {
            tag,
            element: Some(index),
            def,
            space: SpaceState::new(),
        }
    }

    /// Root and body contexts are where injected content may go.
    pub(super) fn is_safe(&self) -> bool {
        matches!(self.tag, TagId::Root | TagId::Body)
    }
}
