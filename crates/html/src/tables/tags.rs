//! Canonical tag ids.

macro_rules! tag_ids {
    ($($variant:ident => $name:literal,)*) => {
        /// Canonical tag id. Pseudo ids precede the element set.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum TagId {
            $($variant,)*
        }

        impl TagId {
            pub const ALL: &'static [TagId] = &[$(TagId::$variant,)*];
            pub const COUNT: usize = Self::ALL.len();

            /// Lowercase canonical name. Pseudo ids use a marker spelling
            /// that never collides with an element name.
            pub fn name(self) -> &'static str {
                match self {
                    $(TagId::$variant => $name,)*
                }
            }
        }
    };
}

tag_ids! {
    Unknown => "?",
    Root => "#root",
    Comment => "!--",
    Bang => "!",
    Doctype => "!doctype",
    Pi => "?pi",
    Asp => "%",
    A => "a",
    Abbr => "abbr",
    Acronym => "acronym",
    Address => "address",
    Applet => "applet",
    Area => "area",
    Article => "article",
    Aside => "aside",
    B => "b",
    Base => "base",
    BaseFont => "basefont",
    Bdo => "bdo",
    BgSound => "bgsound",
    Big => "big",
    Blink => "blink",
    BlockQuote => "blockquote",
    Body => "body",
    Br => "br",
    Button => "button",
    Caption => "caption",
    Center => "center",
    Cite => "cite",
    Code => "code",
    Col => "col",
    ColGroup => "colgroup",
    Dd => "dd",
    Del => "del",
    Dfn => "dfn",
    Dir => "dir",
    Div => "div",
    Dl => "dl",
    Dt => "dt",
    Em => "em",
    Embed => "embed",
    FieldSet => "fieldset",
    FigCaption => "figcaption",
    Figure => "figure",
    Font => "font",
    Footer => "footer",
    Form => "form",
    Frame => "frame",
    FrameSet => "frameset",
    H1 => "h1",
    H2 => "h2",
    H3 => "h3",
    H4 => "h4",
    H5 => "h5",
    H6 => "h6",
    Head => "head",
    Header => "header",
    Hr => "hr",
    Html => "html",
    I => "i",
    Iframe => "iframe",
    Image => "image",
    Img => "img",
    Input => "input",
    Ins => "ins",
    IsIndex => "isindex",
    Kbd => "kbd",
    Keygen => "keygen",
    Label => "label",
    Legend => "legend",
    Li => "li",
    Link => "link",
    Listing => "listing",
    Main => "main",
    Map => "map",
    Marquee => "marquee",
    Menu => "menu",
    Meta => "meta",
    Nav => "nav",
    NextId => "nextid",
    NoBr => "nobr",
    NoEmbed => "noembed",
    NoFrames => "noframes",
    NoScript => "noscript",
    Object => "object",
    Ol => "ol",
    OptGroup => "optgroup",
    Option => "option",
    P => "p",
    Param => "param",
    PlainText => "plaintext",
    Pre => "pre",
    Q => "q",
    Rp => "rp",
    Rt => "rt",
    Ruby => "ruby",
    S => "s",
    Samp => "samp",
    Script => "script",
    Section => "section",
    Select => "select",
    Small => "small",
    Spacer => "spacer",
    Span => "span",
    Strike => "strike",
    Strong => "strong",
    Style => "style",
    Sub => "sub",
    Sup => "sup",
    Table => "table",
    Tbody => "tbody",
    Td => "td",
    TextArea => "textarea",
    Tfoot => "tfoot",
    Th => "th",
    Thead => "thead",
    Title => "title",
    Tr => "tr",
    Tt => "tt",
    U => "u",
    Ul => "ul",
    Var => "var",
    Wbr => "wbr",
    Xml => "xml",
    Xmp => "xmp",
}

impl TagId {
    /// First id that names a real element.
    pub const FIRST_ELEMENT: TagId = TagId::A;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_element(self) -> bool {
        self >= Self::FIRST_ELEMENT
    }

    /// Comments, doctypes and the other `<!`/`<?`/`<%` declarations.
    #[inline]
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            TagId::Comment | TagId::Bang | TagId::Doctype | TagId::Pi | TagId::Asp
        )
    }
}
