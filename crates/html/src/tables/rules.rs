//! Declarative per-tag containment rules.
//!
//! Each rule names plain tag lists; the builder in [`super::dtd`] interns
//! them into shared sets.

use super::dtd::{ContextText, Fill, FillCode, LiteralMode, Scope, TextContainer, TextType};
use super::tags::TagId;
// `TagId::Option` shadows the prelude type here; spell it out where needed.
use TagId::*;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ContextRule {
    pub text: ContextText,
    pub text_container: TextContainer,
    pub accept: &'static [TagId],
    pub reject: &'static [TagId],
    pub ignore_end: &'static [TagId],
    pub close_on: &'static [TagId],
    pub holds_query: bool,
}

impl ContextRule {
    const FULL: ContextRule = ContextRule {
        text: ContextText::Full,
        text_container: TextContainer::Drop,
        accept: &[],
        reject: &[],
        ignore_end: &[],
        close_on: &[],
        holds_query: false,
    };

    const LITERAL: ContextRule = ContextRule {
        text: ContextText::Literal,
        ..Self::FULL
    };
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Rule {
    pub literal: LiteralMode,
    pub block: bool,
    pub fill: Fill,
    pub scope: Scope,
    pub text: TextType,
    pub end_match: &'static [TagId],
    pub begin_scope: &'static [TagId],
    pub masking: &'static [TagId],
    pub prohibited: &'static [TagId],
    pub required: &'static [TagId],
    pub default_container: std::option::Option<TagId>,
    pub ignore_end: &'static [TagId],
    pub implicit_begin: std::option::Option<TagId>,
    pub context: std::option::Option<ContextRule>,
    pub document_level: bool,
}

/// Elements whose end tags stop a search for an outer match.
const BARRIERS: &[TagId] = &[
    Applet, Button, Caption, Marquee, Object, Select, Table, Td, Th,
];
const HEADINGS: &[TagId] = &[H1, H2, H3, H4, H5, H6];
const LISTS: &[TagId] = &[Ul, Ol, Dir, Menu];
const LIST_ITEM_END: &[TagId] = &[
    Applet, Button, Caption, Marquee, Object, Select, Table, Td, Th, Ul, Ol, Dir, Menu,
];
const DL_ITEM_END: &[TagId] = &[
    Applet, Button, Caption, Marquee, Object, Select, Table, Td, Th, Dl,
];
const TABLE_ONLY: &[TagId] = &[Table];
const TABLE_SECTIONS: &[TagId] = &[Tbody, Thead, Tfoot];
const CLOSED_BY_SECTION: &[TagId] = &[
    Caption, ColGroup, Col, Tbody, Thead, Tfoot, Tr, Td, Th,
];
const CLOSED_BY_ROW: &[TagId] = &[Caption, ColGroup, Tr, Td, Th];
const CELLS: &[TagId] = &[Td, Th];
const DOCUMENT_LEVEL: &[TagId] = &[Html, Head, Body, FrameSet];

const INLINE_FILL: Fill = Fill {
    begin_left: FillCode::Put,
    begin_right: FillCode::Nul,
    end_left: FillCode::Nul,
    end_right: FillCode::Nul,
};

impl Rule {
    /// Declarations and anything without a rule: structurally inert.
    pub(crate) const DECLARATION: Rule = Rule {
        literal: LiteralMode::None,
        block: false,
        fill: Fill::uniform(FillCode::Nul),
        scope: Scope::Empty,
        text: TextType::Never,
        end_match: &[],
        begin_scope: &[],
        masking: &[],
        prohibited: &[],
        required: &[],
        default_container: None,
        ignore_end: &[],
        implicit_begin: None,
        context: None,
        document_level: false,
    };

    const INLINE: Rule = Rule {
        fill: INLINE_FILL,
        scope: Scope::Overlap,
        text: TextType::Always,
        ignore_end: BARRIERS,
        ..Self::DECLARATION
    };

    const INLINE_EMPTY: Rule = Rule {
        fill: INLINE_FILL,
        text: TextType::Always,
        ..Self::DECLARATION
    };

    const INLINE_NESTED: Rule = Rule {
        scope: Scope::Nested,
        ..Self::INLINE
    };

    const BLOCK: Rule = Rule {
        block: true,
        fill: Fill::uniform(FillCode::Eat),
        scope: Scope::Nested,
        text: TextType::Always,
        prohibited: &[P],
        ignore_end: BARRIERS,
        ..Self::DECLARATION
    };

    const HEAD_EMPTY: Rule = Self::DECLARATION;

    const LITERAL_HEAD: Rule = Rule {
        literal: LiteralMode::Raw,
        scope: Scope::Nested,
        context: Some(ContextRule::LITERAL),
        ..Self::DECLARATION
    };

    const TABLE_PART: Rule = Rule {
        block: true,
        fill: Fill::uniform(FillCode::Eat),
        scope: Scope::Nested,
        text: TextType::Never,
        begin_scope: TABLE_ONLY,
        ignore_end: TABLE_ONLY,
        ..Self::DECLARATION
    };

    const DOCUMENT: Rule = Rule {
        block: true,
        fill: Fill::uniform(FillCode::Eat),
        scope: Scope::Nested,
        ignore_end: BARRIERS,
        document_level: true,
        ..Self::DECLARATION
    };
}

pub(crate) const ROOT_CONTEXT: ContextRule = ContextRule::FULL;

const HTML_CONTEXT: ContextRule = ContextRule {
    text: ContextText::Discard,
    text_container: TextContainer::Open(Body),
    reject: &[Html],
    ignore_end: &[Html],
    ..ContextRule::FULL
};

const HEAD_CONTEXT: ContextRule = ContextRule {
    text: ContextText::Discard,
    text_container: TextContainer::Close,
    reject: &[Html, Head],
    ignore_end: &[Html, Body],
    holds_query: true,
    ..ContextRule::FULL
};

const BODY_CONTEXT: ContextRule = ContextRule {
    reject: DOCUMENT_LEVEL,
    ignore_end: &[Html, Body],
    ..ContextRule::FULL
};

const FRAMESET_CONTEXT: ContextRule = ContextRule {
    text: ContextText::Discard,
    text_container: TextContainer::Drop,
    accept: &[FrameSet, Frame, NoFrames],
    ..ContextRule::FULL
};

const TABLE_CONTEXT: ContextRule = ContextRule {
    text: ContextText::Discard,
    text_container: TextContainer::Open(Td),
    reject: DOCUMENT_LEVEL,
    ..ContextRule::FULL
};

const COLGROUP_CONTEXT: ContextRule = ContextRule {
    text: ContextText::Discard,
    text_container: TextContainer::Close,
    ..ContextRule::FULL
};

const CELL_CONTEXT: ContextRule = ContextRule {
    reject: DOCUMENT_LEVEL,
    ..ContextRule::FULL
};

const SELECT_CONTEXT: ContextRule = ContextRule {
    text: ContextText::Discard,
    text_container: TextContainer::Open(Option),
    accept: &[Option, OptGroup, Script, Select, Input, TextArea, Keygen],
    close_on: &[Select, Input, TextArea, Keygen],
    ..ContextRule::FULL
};

const OBJECT_CONTEXT: ContextRule = ContextRule {
    holds_query: true,
    ..ContextRule::FULL
};

const PRE_CONTEXT: ContextRule = ContextRule::LITERAL;

pub(crate) fn rules() -> Vec<(TagId, Rule)> {
    vec![
        (Unknown, Rule::DECLARATION),
        (Root, Rule::DECLARATION),
        (Comment, Rule::DECLARATION),
        (Bang, Rule::DECLARATION),
        (Doctype, Rule::DECLARATION),
        (Pi, Rule::DECLARATION),
        (Asp, Rule::DECLARATION),
        // Document structure.
        (
            Html,
            Rule {
                context: Some(HTML_CONTEXT),
                ..Rule::DOCUMENT
            },
        ),
        (
            Head,
            Rule {
                context: Some(HEAD_CONTEXT),
                ..Rule::DOCUMENT
            },
        ),
        (
            Body,
            Rule {
                prohibited: &[Head],
                context: Some(BODY_CONTEXT),
                ..Rule::DOCUMENT
            },
        ),
        (
            FrameSet,
            Rule {
                prohibited: &[Head],
                context: Some(FRAMESET_CONTEXT),
                ..Rule::DOCUMENT
            },
        ),
        (Frame, Rule::HEAD_EMPTY),
        (
            NoFrames,
            Rule {
                text: TextType::Query,
                ..Rule::INLINE_NESTED
            },
        ),
        // Head content.
        (
            Title,
            Rule {
                literal: LiteralMode::Escapable,
                ..Rule::LITERAL_HEAD
            },
        ),
        (Script, Rule::LITERAL_HEAD),
        (Style, Rule::LITERAL_HEAD),
        (Meta, Rule::HEAD_EMPTY),
        (Link, Rule::HEAD_EMPTY),
        (Base, Rule::HEAD_EMPTY),
        (BaseFont, Rule::HEAD_EMPTY),
        (BgSound, Rule::HEAD_EMPTY),
        (NextId, Rule::HEAD_EMPTY),
        (
            Xml,
            Rule {
                scope: Scope::Nested,
                ..Rule::DECLARATION
            },
        ),
        // Phrasing elements that close out of order.
        (
            A,
            Rule {
                masking: &[A],
                ..Rule::INLINE
            },
        ),
        (Abbr, Rule::INLINE),
        (Acronym, Rule::INLINE),
        (B, Rule::INLINE),
        (Bdo, Rule::INLINE),
        (Big, Rule::INLINE),
        (Blink, Rule::INLINE),
        (Cite, Rule::INLINE),
        (Code, Rule::INLINE),
        (Del, Rule::INLINE),
        (Dfn, Rule::INLINE),
        (Em, Rule::INLINE),
        (Font, Rule::INLINE),
        (I, Rule::INLINE),
        (Ins, Rule::INLINE),
        (Kbd, Rule::INLINE),
        (Label, Rule::INLINE),
        (
            NoBr,
            Rule {
                masking: &[NoBr],
                ..Rule::INLINE
            },
        ),
        (Q, Rule::INLINE),
        (Ruby, Rule::INLINE),
        (
            Rp,
            Rule {
                prohibited: &[Rp, Rt],
                begin_scope: &[Ruby],
                ..Rule::INLINE
            },
        ),
        (
            Rt,
            Rule {
                prohibited: &[Rp, Rt],
                begin_scope: &[Ruby],
                ..Rule::INLINE
            },
        ),
        (S, Rule::INLINE),
        (Samp, Rule::INLINE),
        (Small, Rule::INLINE),
        (Span, Rule::INLINE),
        (Strike, Rule::INLINE),
        (Strong, Rule::INLINE),
        (Sub, Rule::INLINE),
        (Sup, Rule::INLINE),
        (Tt, Rule::INLINE),
        (U, Rule::INLINE),
        (Var, Rule::INLINE),
        // Phrasing elements with strict nesting.
        (
            Button,
            Rule {
                masking: &[Button],
                context: Some(ContextRule::FULL),
                ..Rule::INLINE_NESTED
            },
        ),
        (Iframe, Rule::INLINE_NESTED),
        (Map, Rule::INLINE_NESTED),
        (
            Object,
            Rule {
                text: TextType::Query,
                context: Some(OBJECT_CONTEXT),
                ..Rule::INLINE_NESTED
            },
        ),
        (
            Applet,
            Rule {
                context: Some(OBJECT_CONTEXT),
                ..Rule::INLINE_NESTED
            },
        ),
        (
            NoScript,
            Rule {
                text: TextType::Query,
                ..Rule::INLINE_NESTED
            },
        ),
        (NoEmbed, Rule::INLINE_NESTED),
        (
            Marquee,
            Rule {
                context: Some(ContextRule::FULL),
                ..Rule::BLOCK
            },
        ),
        (
            TextArea,
            Rule {
                literal: LiteralMode::Escapable,
                context: Some(ContextRule::LITERAL),
                ..Rule::INLINE_NESTED
            },
        ),
        (
            Select,
            Rule {
                context: Some(SELECT_CONTEXT),
                ..Rule::INLINE_NESTED
            },
        ),
        (
            OptGroup,
            Rule {
                fill: Fill::uniform(FillCode::Eat),
                text: TextType::Never,
                prohibited: &[Option, OptGroup],
                begin_scope: &[Select],
                context: Some(ContextRule::FULL),
                ..Rule::INLINE_NESTED
            },
        ),
        (
            Option,
            Rule {
                fill: Fill::uniform(FillCode::Eat),
                text: TextType::Never,
                prohibited: &[Option],
                begin_scope: &[Select, OptGroup],
                context: Some(ContextRule::FULL),
                ..Rule::INLINE_NESTED
            },
        ),
        // Void phrasing elements.
        (
            Br,
            Rule {
                fill: Fill::uniform(FillCode::Eat),
                implicit_begin: Some(Br),
                ..Rule::INLINE_EMPTY
            },
        ),
        (Img, Rule::INLINE_EMPTY),
        (Image, Rule::INLINE_EMPTY),
        (Input, Rule::INLINE_EMPTY),
        (Keygen, Rule::INLINE_EMPTY),
        (Embed, Rule::INLINE_EMPTY),
        (Spacer, Rule::INLINE_EMPTY),
        (Wbr, Rule::INLINE_EMPTY),
        (IsIndex, Rule::INLINE_EMPTY),
        (Area, Rule::HEAD_EMPTY),
        (Param, Rule::HEAD_EMPTY),
        // Blocks.
        (Address, Rule::BLOCK),
        (Article, Rule::BLOCK),
        (Aside, Rule::BLOCK),
        (BlockQuote, Rule::BLOCK),
        (Center, Rule::BLOCK),
        (Div, Rule::BLOCK),
        (FieldSet, Rule::BLOCK),
        (Figure, Rule::BLOCK),
        (FigCaption, Rule::BLOCK),
        (Footer, Rule::BLOCK),
        (Header, Rule::BLOCK),
        (Legend, Rule::BLOCK),
        (Main, Rule::BLOCK),
        (Nav, Rule::BLOCK),
        (Section, Rule::BLOCK),
        (
            Form,
            Rule {
                masking: &[Form],
                ..Rule::BLOCK
            },
        ),
        (
            P,
            Rule {
                implicit_begin: Some(P),
                ..Rule::BLOCK
            },
        ),
        (H1, heading()),
        (H2, heading()),
        (H3, heading()),
        (H4, heading()),
        (H5, heading()),
        (H6, heading()),
        (
            Hr,
            Rule {
                scope: Scope::Empty,
                ..Rule::BLOCK
            },
        ),
        (
            Pre,
            Rule {
                context: Some(PRE_CONTEXT),
                ..Rule::BLOCK
            },
        ),
        (
            Listing,
            Rule {
                context: Some(PRE_CONTEXT),
                ..Rule::BLOCK
            },
        ),
        (
            Xmp,
            Rule {
                literal: LiteralMode::Raw,
                context: Some(ContextRule::LITERAL),
                ..Rule::BLOCK
            },
        ),
        (
            PlainText,
            Rule {
                literal: LiteralMode::Raw,
                context: Some(ContextRule::LITERAL),
                ..Rule::BLOCK
            },
        ),
        // Lists.
        (Ul, Rule::BLOCK),
        (Ol, Rule::BLOCK),
        (Dir, Rule::BLOCK),
        (Menu, Rule::BLOCK),
        (
            Li,
            Rule {
                prohibited: &[Li, P],
                begin_scope: LISTS,
                required: LISTS,
                default_container: Some(Ul),
                ignore_end: LIST_ITEM_END,
                ..Rule::BLOCK
            },
        ),
        (Dl, Rule::BLOCK),
        (Dt, definition_item()),
        (Dd, definition_item()),
        // Tables.
        (
            Table,
            Rule {
                ignore_end: &[],
                context: Some(TABLE_CONTEXT),
                ..Rule::BLOCK
            },
        ),
        (
            Caption,
            Rule {
                prohibited: CLOSED_BY_SECTION,
                required: TABLE_ONLY,
                default_container: Some(Table),
                context: Some(CELL_CONTEXT),
                ..Rule::TABLE_PART
            },
        ),
        (
            ColGroup,
            Rule {
                prohibited: CLOSED_BY_SECTION,
                required: TABLE_ONLY,
                default_container: Some(Table),
                context: Some(COLGROUP_CONTEXT),
                ..Rule::TABLE_PART
            },
        ),
        (
            Col,
            Rule {
                scope: Scope::Empty,
                required: &[ColGroup],
                default_container: Some(ColGroup),
                ..Rule::TABLE_PART
            },
        ),
        (Thead, table_section()),
        (Tbody, table_section()),
        (Tfoot, table_section()),
        (
            Tr,
            Rule {
                prohibited: CLOSED_BY_ROW,
                required: TABLE_SECTIONS,
                default_container: Some(Tbody),
                context: Some(ContextRule {
                    text: ContextText::Discard,
                    text_container: TextContainer::Open(Td),
                    reject: DOCUMENT_LEVEL,
                    ..ContextRule::FULL
                }),
                ..Rule::TABLE_PART
            },
        ),
        (Td, table_cell()),
        (Th, table_cell()),
    ]
}

fn heading() -> Rule {
    Rule {
        end_match: HEADINGS,
        prohibited: &[P, H1, H2, H3, H4, H5, H6],
        ..Rule::BLOCK
    }
}

fn definition_item() -> Rule {
    Rule {
        prohibited: &[Dt, Dd, P],
        begin_scope: &[Dl],
        required: &[Dl],
        default_container: Some(Dl),
        ignore_end: DL_ITEM_END,
        ..Rule::BLOCK
    }
}

fn table_section() -> Rule {
    Rule {
        prohibited: CLOSED_BY_SECTION,
        required: TABLE_ONLY,
        default_container: Some(Table),
        context: Some(ContextRule {
            text: ContextText::Discard,
            text_container: TextContainer::Open(Td),
            reject: DOCUMENT_LEVEL,
            ..ContextRule::FULL
        }),
        ..Rule::TABLE_PART
    }
}

fn table_cell() -> Rule {
    Rule {
        prohibited: CELLS,
        required: &[Tr],
        default_container: Some(Tr),
        context: Some(CELL_CONTEXT),
        ..Rule::TABLE_PART
    }
}
