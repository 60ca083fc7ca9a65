//! Output events waiting to be handed out.

use super::Normalizer;
use crate::input::StringSource;
use crate::tables::TagId;
use std::collections::VecDeque;
use std::ops::Range;

/// One queued output event.
///
/// `Input` and `Runs` refer to the tokenizer's current token, so the queue
/// is drained of them before the tokenizer is advanced.
pub(super) enum Event {
    /// The tokenizer's current token, forwarded as read.
    Input,
    /// A slice of the current text token's runs.
    Runs(Range<usize>),
    /// The tag assembled from held fragments.
    Held,
    /// A tag made up by the normalizer.
    Synthetic { tag: TagId, end_tag: bool, at: usize },
    Space { at: usize },
    OverlappedClose(u32),
    OverlappedReopen(u32),
    InjectionBegin,
    /// Events of injected content, pulled one by one.
    Nested(Box<Normalizer<StringSource>>),
    InjectionEnd,
    /// Draining stops here until a held tag is complete.
    Suspend,
    EndOfFile,
}

#[derive(Default)]
pub(super) struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub(super) fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub(super) fn front(&self) -> Option<&Event> {
        self.events.front()
    }

    /// Put an event back at the head.
    pub(super) fn push_front(&mut self, event: Event) {
        self.events.push_front(event);
    }

    pub(super) fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Take everything queued so far; used to re-insert events at the head.
    pub(super) fn take(&mut self) -> VecDeque<Event> {
        std::mem::take(&mut self.events)
    }

    /// Append `tail` behind the events queued since [`take`](Self::take).
    pub(super) fn restore(&mut self, tail: VecDeque<Event>) {
        self.events.extend(tail);
    }

    pub(super) fn clear(&mut self) {
        self.events.clear();
    }
}
