//! The token cursor shared by the tokenizer, the normalizer and sinks.
//!
//! A [`Token`] is reset and refilled on every `parse()` call; its buffers
//! keep their capacity so steady-state parsing does not allocate. Callers
//! must copy anything they need before the next call.
//!
//! Text content is a gapless sequence of [`Run`]s over the token's own text
//! store; the runs' `source_len` values add up to the token's source extent
//! so sinks can copy original input through byte-exactly.

use crate::char_class::run_kind;
use crate::tables::{AttrId, NameId, TagId, lookup_name};
use crate::tokenizer::entity::{EntityMode, RefMatch, match_reference};
use std::borrow::Cow;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    /// One collapsed whitespace run, produced by the normalizer.
    Space,
    Tag,
    Comment,
    Doctype,
    Bang,
    Pi,
    Asp,
    /// The input encoding changed; the new label is the token text.
    EncodingChange,
    /// Everything emitted so far must be discarded.
    Restart,
    OverlappedClose,
    OverlappedReopen,
    InjectionBegin,
    InjectionEnd,
    EndOfFile,
}

impl TokenKind {
    pub fn declaration_tag(self) -> Option<TagId> {
        match self {
            Self::Comment => Some(TagId::Comment),
            Self::Doctype => Some(TagId::Doctype),
            Self::Bang => Some(TagId::Bang),
            Self::Pi => Some(TagId::Pi),
            Self::Asp => Some(TagId::Asp),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunKind {
    NonSpace,
    Space,
    NewLine,
    Tabulation,
    Nbsp,
    UnusualWhitespace,
}

impl RunKind {
    /// Whitespace that a Full context may collapse.
    #[inline]
    pub fn is_collapsible(self) -> bool {
        matches!(self, Self::Space | Self::NewLine | Self::Tabulation)
    }
}

/// Half-open byte range into a token's text store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    #[inline]
    pub fn as_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    #[inline]
    pub fn len(self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub kind: RunKind,
    pub range: TextRange,
    /// Length of the input this run was produced from.
    pub source_len: u32,
    /// Decoded scalar when the run is a single character reference.
    pub literal: Option<char>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: NameId,
    pub name_range: TextRange,
    /// Raw (undecoded) value; `None` for a bare attribute.
    pub value: Option<TextRange>,
    pub quote: Option<char>,
}

impl Attribute {
    pub fn id(&self) -> AttrId {
        self.name.attr()
    }
}

/// Position of a token within a tag split across several tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub first: bool,
    pub last: bool,
}

impl Fragment {
    pub const WHOLE: Fragment = Fragment {
        first: true,
        last: true,
    };

    pub fn is_whole(self) -> bool {
        self.first && self.last
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    kind: TokenKind,
    tag: TagId,
    name: NameId,
    name_range: TextRange,
    end_tag: bool,
    empty_scope: bool,
    synthetic: bool,
    fragment: Fragment,
    allow_space_before: bool,
    allow_space_after: bool,
    attributes: Vec<Attribute>,
    runs: Vec<Run>,
    text: String,
    count: u32,
    source: Range<usize>,
    pending_skip: u32,
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl Token {
    pub fn new() -> Self {
        Self {
            kind: TokenKind::EndOfFile,
            tag: TagId::Unknown,
            name: NameId::UNKNOWN,
            name_range: TextRange::default(),
            end_tag: false,
            empty_scope: false,
            synthetic: false,
            fragment: Fragment::WHOLE,
            allow_space_before: true,
            allow_space_after: true,
            attributes: Vec::new(),
            runs: Vec::new(),
            text: String::new(),
            count: 0,
            source: 0..0,
            pending_skip: 0,
        }
    }

    /// Clear the cursor for a new event, keeping buffer capacity.
    pub fn reset(&mut self, kind: TokenKind) {
        self.kind = kind;
        self.tag = TagId::Unknown;
        self.name = NameId::UNKNOWN;
        self.name_range = TextRange::default();
        self.end_tag = false;
        self.empty_scope = false;
        self.synthetic = false;
        self.fragment = Fragment::WHOLE;
        self.allow_space_before = true;
        self.allow_space_after = true;
        self.attributes.clear();
        self.runs.clear();
        self.text.clear();
        self.count = 0;
        self.source = 0..0;
        self.pending_skip = 0;
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn tag(&self) -> TagId {
        self.tag
    }

    pub fn name(&self) -> NameId {
        self.name
    }

    /// Tag name as written in the input (canonical for synthesized tags).
    pub fn tag_name(&self) -> &str {
        &self.text[self.name_range.as_range()]
    }

    pub fn is_end_tag(&self) -> bool {
        self.end_tag
    }

    pub fn is_empty_scope(&self) -> bool {
        self.empty_scope
    }

    /// Inserted by the normalizer rather than read from the input.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn fragment(&self) -> Fragment {
        self.fragment
    }

    pub fn allow_space_before(&self) -> bool {
        self.allow_space_before
    }

    pub fn allow_space_after(&self) -> bool {
        self.allow_space_after
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_name(&self, index: usize) -> &str {
        &self.text[self.attributes[index].name_range.as_range()]
    }

    pub fn find_attribute(&self, id: AttrId) -> Option<usize> {
        self.attributes.iter().position(|attr| attr.id() == id)
    }

    /// Raw attribute value as written, without character reference decoding.
    pub fn raw_attribute_value(&self, index: usize) -> Option<&str> {
        self.attributes[index]
            .value
            .map(|range| &self.text[range.as_range()])
    }

    /// Decoded attribute value. Bare attributes decode to the empty string.
    pub fn attribute_value(&self, index: usize) -> Cow<'_, str> {
        let Some(raw) = self.raw_attribute_value(index) else {
            return Cow::Borrowed("");
        };
        if !raw.contains('&') {
            return Cow::Borrowed(raw);
        }
        let mut out = String::with_capacity(raw.len());
        for run in self.attribute_value_runs(index) {
            match run.literal {
                Some(ch) => out.push(ch),
                None => out.push_str(run.source),
            }
        }
        Cow::Owned(out)
    }

    /// Attribute value as a run sequence, decoded on demand.
    pub fn attribute_value_runs(&self, index: usize) -> ValueRuns<'_> {
        ValueRuns {
            rest: self.raw_attribute_value(index).unwrap_or(""),
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn run_text(&self, run: &Run) -> &str {
        &self.text[run.range.as_range()]
    }

    /// The token's text store: decoded content for text and declaration
    /// tokens, the label for `EncodingChange`.
    pub fn text(&self) -> &str {
        match self.kind {
            TokenKind::Tag => "",
            _ => &self.text,
        }
    }

    /// Element count of an overlapped close/reopen event.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Absolute character-stream offsets of the input this token covers.
    pub fn source(&self) -> Range<usize> {
        self.source.clone()
    }

    pub(crate) fn set_source(&mut self, source: Range<usize>) {
        self.source = source;
    }

    pub(crate) fn set_source_end(&mut self, end: usize) {
        self.source.end = end;
    }

    pub(crate) fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub(crate) fn set_fragment(&mut self, fragment: Fragment) {
        self.fragment = fragment;
    }

    pub(crate) fn set_space_flags(&mut self, before: bool, after: bool) {
        self.allow_space_before = before;
        self.allow_space_after = after;
    }

    pub(crate) fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    pub(crate) fn text_len(&self) -> usize {
        self.text.len()
    }

    // Runs.

    /// Append one character, extending the last run when it has the same
    /// kind.
    pub(crate) fn push_char(&mut self, ch: char) {
        let kind = run_kind(ch);
        let start = self.text.len() as u32;
        self.text.push(ch);
        let len = ch.len_utf8() as u32;
        let skip = std::mem::take(&mut self.pending_skip);
        if let Some(last) = self.runs.last_mut()
            && last.kind == kind
            && last.literal.is_none()
            && last.range.end == start
        {
            last.range.end += len;
            last.source_len += len + skip;
            return;
        }
        self.runs.push(Run {
            kind,
            range: TextRange {
                start,
                end: start + len,
            },
            source_len: len + skip,
            literal: None,
        });
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    /// Append a decoded character reference as its own run.
    pub(crate) fn push_literal(&mut self, ch: char, source_len: usize) {
        let start = self.text.len() as u32;
        self.text.push(ch);
        let skip = std::mem::take(&mut self.pending_skip);
        self.runs.push(Run {
            kind: run_kind(ch),
            range: TextRange {
                start,
                end: self.text.len() as u32,
            },
            source_len: source_len as u32 + skip,
            literal: Some(ch),
        });
    }

    /// Account for input removed from the buffer (invalid characters).
    pub(crate) fn skip_source(&mut self, len: usize) {
        match self.runs.last_mut() {
            Some(last) => last.source_len += len as u32,
            None => self.pending_skip += len as u32,
        }
    }

    /// Copy `runs` of `other` (a text token) into this text token.
    pub(crate) fn copy_runs_from(&mut self, other: &Token, runs: Range<usize>) {
        let mut source_start = other.source.start;
        for run in &other.runs[..runs.start] {
            source_start += run.source_len as usize;
        }
        let mut source_len = 0usize;
        for run in &other.runs[runs] {
            let start = self.text.len() as u32;
            self.text.push_str(other.run_text(run));
            self.runs.push(Run {
                range: TextRange {
                    start,
                    end: self.text.len() as u32,
                },
                ..*run
            });
            source_len += run.source_len as usize;
        }
        self.source = source_start..source_start + source_len;
    }

    // Tags.

    pub(crate) fn begin_tag(&mut self, end_tag: bool) {
        self.kind = TokenKind::Tag;
        self.end_tag = end_tag;
        let at = self.text.len() as u32;
        self.name_range = TextRange { start: at, end: at };
    }

    pub(crate) fn push_name_char(&mut self, ch: char) {
        self.text.push(ch);
        self.name_range.end = self.text.len() as u32;
    }

    pub(crate) fn finish_name(&mut self) {
        self.name = lookup_name(&self.text[self.name_range.as_range()]);
        self.tag = self.name.tag();
    }

    /// Turn this token into a normalizer-made tag with no attributes.
    pub(crate) fn set_synthetic_tag(&mut self, tag: TagId, end_tag: bool, at: usize) {
        self.reset(TokenKind::Tag);
        self.begin_tag(end_tag);
        self.text.push_str(tag.name());
        self.name_range.end = self.text.len() as u32;
        self.name = NameId::of_tag(tag);
        self.tag = tag;
        self.synthetic = true;
        self.source = at..at;
    }

    pub(crate) fn set_empty_scope(&mut self) {
        self.empty_scope = true;
    }

    pub(crate) fn start_attribute(&mut self) {
        let at = self.text.len() as u32;
        self.attributes.push(Attribute {
            name: NameId::UNKNOWN,
            name_range: TextRange { start: at, end: at },
            value: None,
            quote: None,
        });
    }

    pub(crate) fn push_attr_name_char(&mut self, ch: char) {
        self.text.push(ch);
        let end = self.text.len() as u32;
        if let Some(attr) = self.attributes.last_mut() {
            attr.name_range.end = end;
        }
    }

    pub(crate) fn finish_attr_name(&mut self) {
        if let Some(attr) = self.attributes.last() {
            let name = lookup_name(&self.text[attr.name_range.as_range()]);
            if let Some(attr) = self.attributes.last_mut() {
                attr.name = name;
            }
        }
    }

    pub(crate) fn start_value(&mut self, quote: Option<char>) {
        let at = self.text.len() as u32;
        if let Some(attr) = self.attributes.last_mut() {
            attr.value = Some(TextRange { start: at, end: at });
            attr.quote = quote;
        }
    }

    pub(crate) fn push_value_str(&mut self, text: &str) {
        self.text.push_str(text);
        let end = self.text.len() as u32;
        if let Some(TextRange { end: value_end, .. }) =
            self.attributes.last_mut().and_then(|attr| attr.value.as_mut())
        {
            *value_end = end;
        }
    }

    /// Drop attributes (keeping the name) after emitting a fragment.
    pub(crate) fn clear_attributes(&mut self) {
        self.attributes.clear();
        self.text.truncate(self.name_range.end as usize);
    }

    /// Append the attributes of a continuation fragment.
    pub(crate) fn merge_attributes(&mut self, other: &Token) {
        for attr in &other.attributes {
            let name_start = self.text.len() as u32;
            self.text.push_str(&other.text[attr.name_range.as_range()]);
            let name_range = TextRange {
                start: name_start,
                end: self.text.len() as u32,
            };
            let value = attr.value.map(|range| {
                let start = self.text.len() as u32;
                self.text.push_str(&other.text[range.as_range()]);
                TextRange {
                    start,
                    end: self.text.len() as u32,
                }
            });
            self.attributes.push(Attribute {
                name: attr.name,
                name_range,
                value,
                quote: attr.quote,
            });
        }
        self.empty_scope |= other.empty_scope;
        self.source.end = other.source.end;
    }
}

/// One piece of a lazily decoded attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueRun<'a> {
    pub kind: RunKind,
    /// Input text of the piece (the whole reference for a literal).
    pub source: &'a str,
    pub literal: Option<char>,
}

pub struct ValueRuns<'a> {
    rest: &'a str,
}

impl<'a> Iterator for ValueRuns<'a> {
    type Item = ValueRun<'a>;

    fn next(&mut self) -> Option<ValueRun<'a>> {
        let first = self.rest.chars().next()?;
        if first == '&'
            && let RefMatch::Matched { ch, consumed } =
                match_reference(&self.rest[1..], EntityMode::Attribute, true)
        {
            let (source, rest) = self.rest.split_at(consumed + 1);
            self.rest = rest;
            return Some(ValueRun {
                kind: run_kind(ch),
                source,
                literal: Some(ch),
            });
        }
        let kind = run_kind(first);
        let mut end = first.len_utf8();
        for ch in self.rest[end..].chars() {
            if ch == '&' || run_kind(ch) != kind {
                break;
            }
            end += ch.len_utf8();
        }
        let (source, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(ValueRun {
            kind,
            source,
            literal: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_merge_by_kind_and_track_source() {
        let mut token = Token::new();
        token.reset(TokenKind::Text);
        token.push_str("ab  c");
        token.push_literal('&', 5);
        token.push_char('d');
        let kinds: Vec<_> = token.runs().iter().map(|run| run.kind).collect();
        assert_eq!(
            kinds,
            [RunKind::NonSpace, RunKind::Space, RunKind::NonSpace, RunKind::NonSpace, RunKind::NonSpace]
        );
        assert_eq!(token.run_text(&token.runs()[0]), "ab");
        assert_eq!(token.runs()[3].literal, Some('&'));
        let total: u32 = token.runs().iter().map(|run| run.source_len).sum();
        assert_eq!(total, 11);
        assert_eq!(token.text(), "ab  c&d");
    }

    #[test]
    fn skipped_input_is_attributed_to_a_run() {
        let mut token = Token::new();
        token.reset(TokenKind::Text);
        token.skip_source(1);
        token.push_char('a');
        token.skip_source(3);
        assert_eq!(token.runs().len(), 1);
        assert_eq!(token.runs()[0].source_len, 5);
    }

    #[test]
    fn attribute_values_decode_lazily() {
        let mut token = Token::new();
        token.reset(TokenKind::Tag);
        token.begin_tag(false);
        for ch in "A".chars() {
            token.push_name_char(ch);
        }
        token.finish_name();
        token.start_attribute();
        for ch in "HREF".chars() {
            token.push_attr_name_char(ch);
        }
        token.finish_attr_name();
        token.start_value(Some('"'));
        token.push_value_str("?a=1&amp;copy=2&copy;");
        assert_eq!(token.tag(), TagId::A);
        assert_eq!(token.attributes()[0].id(), AttrId::Href);
        assert_eq!(token.attribute_name(0), "HREF");
        assert_eq!(token.raw_attribute_value(0), Some("?a=1&amp;copy=2&copy;"));
        assert_eq!(token.attribute_value(0), "?a=1&copy=2\u{a9}");
        let literals: Vec<_> = token
            .attribute_value_runs(0)
            .filter_map(|run| run.literal)
            .collect();
        assert_eq!(literals, ['&', '\u{a9}']);
    }

    #[test]
    fn reset_keeps_capacity_and_clears_state() {
        let mut token = Token::new();
        token.reset(TokenKind::Text);
        token.push_str("some text");
        let capacity = token.runs.capacity();
        token.reset(TokenKind::Space);
        assert!(token.runs().is_empty());
        assert_eq!(token.runs.capacity(), capacity);
        assert_eq!(token.kind(), TokenKind::Space);
        assert!(token.fragment().is_whole());
    }

    #[test]
    fn synthetic_tags_use_canonical_names() {
        let mut token = Token::new();
        token.set_synthetic_tag(TagId::Tbody, false, 12);
        assert_eq!(token.tag_name(), "tbody");
        assert!(token.is_synthetic());
        assert_eq!(token.source(), 12..12);
    }
}
