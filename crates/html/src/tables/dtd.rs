//! Tag containment rules ("DTD").
//!
//! Built once from the declarative rule list in [`super::rules`] and
//! validated before first use: every set handle resolves, every synthesized
//! container is a real element and default-container chains terminate.

use super::rules::{ContextRule, ROOT_CONTEXT, Rule, rules};
use super::tag_set::{TagSet, TagSetId};
use super::tags::TagId;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Whitespace policy at one side of a tag boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillCode {
    /// Pending whitespace becomes one space event.
    Put,
    /// Whitespace is suppressed.
    Eat,
    /// Whitespace passes the boundary untouched.
    Nul,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    pub begin_left: FillCode,
    pub begin_right: FillCode,
    pub end_left: FillCode,
    pub end_right: FillCode,
}

impl Fill {
    pub const fn uniform(code: FillCode) -> Self {
        Self {
            begin_left: code,
            begin_right: code,
            end_left: code,
            end_right: code,
        }
    }

    pub fn left(&self, end_tag: bool) -> FillCode {
        if end_tag { self.end_left } else { self.begin_left }
    }

    pub fn right(&self, end_tag: bool) -> FillCode {
        if end_tag { self.end_right } else { self.begin_right }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Void element; never pushed.
    Empty,
    /// May be closed out of order; mis-nesting is corrected by close/reopen.
    Overlap,
    /// Closing forces everything above it closed.
    Nested,
}

/// Whether a tag needs an open text container before it can be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextType {
    Never,
    Always,
    /// Needed unless the current context holds query tags.
    Query,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralMode {
    None,
    /// Content is scanned verbatim without entity decoding.
    Raw,
    /// Content is scanned verbatim but character references are decoded.
    Escapable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextText {
    /// Text is accepted and whitespace is collapsed.
    Full,
    /// Text passes through unmodified.
    Literal,
    /// Whitespace is dropped; content asks for a text container.
    Discard,
}

/// What a `Discard` context does when content needs a text container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextContainer {
    /// The content is dropped.
    Drop,
    /// The context's tag is closed and the request retried outside it.
    Close,
    /// The tag is synthesized inside the context.
    Open(TagId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextDef {
    pub text: ContextText,
    pub text_container: TextContainer,
    pub accept: Option<TagSetId>,
    pub reject: Option<TagSetId>,
    pub ignore_end: Option<TagSetId>,
    /// Begin tags reinterpreted as a close of the context's tag.
    pub close_on: Option<TagSetId>,
    pub holds_query: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagDefinition {
    pub tag: TagId,
    pub literal: LiteralMode,
    pub block: bool,
    pub fill: Fill,
    pub scope: Scope,
    pub text: TextType,
    pub end_match: Option<TagSetId>,
    /// Stop set for the masking/prohibited/required searches done on begin.
    pub begin_scope: Option<TagSetId>,
    pub masking: Option<TagSetId>,
    pub prohibited: Option<TagSetId>,
    pub required: Option<TagSetId>,
    pub default_container: Option<TagId>,
    /// Stop set for end-tag matching; reaching one ignores the end tag.
    pub ignore_end: Option<TagSetId>,
    pub implicit_begin: Option<TagId>,
    pub context: Option<ContextDef>,
    pub document_level: bool,
}

#[derive(Debug)]
pub struct Dtd {
    defs: Vec<TagDefinition>,
    sets: Vec<TagSet>,
    root: ContextDef,
}

static DTD: LazyLock<Dtd> = LazyLock::new(|| {
    let dtd = DtdBuilder::default().build();
    dtd.validate();
    dtd
});

impl Dtd {
    pub fn get() -> &'static Dtd {
        &DTD
    }

    #[inline]
    pub fn tag(&self, tag: TagId) -> &TagDefinition {
        &self.defs[tag.index()]
    }

    #[inline]
    pub fn set(&self, id: TagSetId) -> &TagSet {
        &self.sets[id.index()]
    }

    /// Membership test where an absent set contains nothing.
    #[inline]
    pub fn in_set(&self, tag: TagId, set: Option<TagSetId>) -> bool {
        set.is_some_and(|id| self.set(id).contains(tag))
    }

    pub fn root_context(&self) -> &ContextDef {
        &self.root
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    fn validate(&self) {
        assert_eq!(self.defs.len(), TagId::COUNT, "tag table is incomplete");
        for (idx, def) in self.defs.iter().enumerate() {
            assert_eq!(def.tag.index(), idx, "tag table out of order at {idx}");
            let handles = [
                def.end_match,
                def.begin_scope,
                def.masking,
                def.prohibited,
                def.required,
                def.ignore_end,
            ];
            for id in handles.into_iter().flatten() {
                self.validate_handle(id, def.tag);
            }
            if let Some(ctx) = &def.context {
                self.validate_context(ctx, def.tag);
            }
            if let Some(tag) = def.default_container {
                assert!(tag.is_element(), "{:?}: default container {tag:?}", def.tag);
                assert!(def.required.is_some(), "{:?}: default container without required set", def.tag);
            }
            if let Some(tag) = def.implicit_begin {
                assert!(tag.is_element(), "{:?}: implicit begin {tag:?}", def.tag);
            }
            self.validate_chain(def.tag);
        }
        self.validate_context(&self.root, TagId::Root);
    }

    fn validate_handle(&self, id: TagSetId, owner: TagId) {
        assert!(
            id.index() < self.sets.len(),
            "{owner:?}: set handle {} out of range ({} sets)",
            id.index(),
            self.sets.len()
        );
    }

    fn validate_context(&self, ctx: &ContextDef, owner: TagId) {
        for id in [ctx.accept, ctx.reject, ctx.ignore_end, ctx.close_on].into_iter().flatten() {
            self.validate_handle(id, owner);
        }
        if let TextContainer::Open(tag) = ctx.text_container {
            assert!(tag.is_element(), "{owner:?}: text container {tag:?}");
        }
    }

    /// Default-container synthesis must terminate, and text-container
    /// synthesis must reach a context that takes text.
    fn validate_chain(&self, start: TagId) {
        let mut seen = TagSet::EMPTY;
        let mut current = Some(start);
        while let Some(tag) = current {
            assert!(!seen.contains(tag), "container chain from {start:?} cycles at {tag:?}");
            seen.insert(tag);
            current = self.tag(tag).default_container;
        }

        let mut seen = TagSet::EMPTY;
        let mut current = Some(start);
        while let Some(tag) = current {
            assert!(!seen.contains(tag), "text container chain from {start:?} cycles at {tag:?}");
            seen.insert(tag);
            current = match self.tag(tag).context {
                Some(ContextDef {
                    text: ContextText::Discard,
                    text_container: TextContainer::Open(next),
                    ..
                }) => Some(next),
                _ => None,
            };
        }
    }
}

/// Membership test against a set handle.
pub fn is_tag_in_set(tag: TagId, set: TagSetId) -> bool {
    Dtd::get().set(set).contains(tag)
}

#[derive(Default)]
struct DtdBuilder {
    sets: Vec<TagSet>,
    interned: HashMap<TagSet, TagSetId>,
}

impl DtdBuilder {
    fn build(mut self) -> Dtd {
        let mut slots: Vec<Option<TagDefinition>> = vec![None; TagId::COUNT];
        for (tag, rule) in rules() {
            let def = self.definition(tag, &rule);
            assert!(slots[tag.index()].is_none(), "duplicate rule for {tag:?}");
            slots[tag.index()] = Some(def);
        }
        let fallback = Rule::DECLARATION;
        let defs = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.unwrap_or_else(|| self.definition(TagId::ALL[idx], &fallback)))
            .collect();
        let root = self.context(&ROOT_CONTEXT);
        Dtd {
            defs,
            sets: self.sets,
            root,
        }
    }

    fn definition(&mut self, tag: TagId, rule: &Rule) -> TagDefinition {
        TagDefinition {
            tag,
            literal: rule.literal,
            block: rule.block,
            fill: rule.fill,
            scope: rule.scope,
            text: rule.text,
            end_match: self.set(rule.end_match),
            begin_scope: self.set(rule.begin_scope),
            masking: self.set(rule.masking),
            prohibited: self.set(rule.prohibited),
            required: self.set(rule.required),
            default_container: rule.default_container,
            ignore_end: self.set(rule.ignore_end),
            implicit_begin: rule.implicit_begin,
            context: rule.context.as_ref().map(|ctx| self.context(ctx)),
            document_level: rule.document_level,
        }
    }

    fn context(&mut self, rule: &ContextRule) -> ContextDef {
        ContextDef {
            text: rule.text,
            text_container: rule.text_container,
            accept: self.set(rule.accept),
            reject: self.set(rule.reject),
            ignore_end: self.set(rule.ignore_end),
            close_on: self.set(rule.close_on),
            holds_query: rule.holds_query,
        }
    }

    fn set(&mut self, tags: &[TagId]) -> Option<TagSetId> {
        if tags.is_empty() {
            return None;
        }
        let set = TagSet::from_tags(tags);
        if let Some(id) = self.interned.get(&set) {
            return Some(*id);
        }
        let id = TagSetId(u16::try_from(self.sets.len()).unwrap_or(u16::MAX));
        self.sets.push(set);
        self.interned.insert(set, id);
        Some(id)
    }
}
