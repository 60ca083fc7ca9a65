//! Tag and attribute name resolution.
//!
//! One name table covers both vocabularies; an entry knows the tag and the
//! attribute it names (either may be `Unknown`, `title` is both).

use super::tags::TagId;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Names longer than this never resolve.
pub const MAX_NAME_LEN: usize = 14;

macro_rules! attr_ids {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum AttrId {
            Unknown,
            $($variant,)*
        }

        impl AttrId {
            pub const ALL: &'static [AttrId] = &[$(AttrId::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    AttrId::Unknown => "?",
                    $(AttrId::$variant => $name,)*
                }
            }
        }
    };
}

attr_ids! {
    Abbr => "abbr",
    Accept => "accept",
    AcceptCharset => "accept-charset",
    AccessKey => "accesskey",
    Action => "action",
    Align => "align",
    ALink => "alink",
    Alt => "alt",
    Archive => "archive",
    Axis => "axis",
    Background => "background",
    BgColor => "bgcolor",
    Border => "border",
    CellPadding => "cellpadding",
    CellSpacing => "cellspacing",
    Char => "char",
    CharOff => "charoff",
    Charset => "charset",
    Checked => "checked",
    Cite => "cite",
    Class => "class",
    ClassId => "classid",
    Clear => "clear",
    Code => "code",
    CodeBase => "codebase",
    CodeType => "codetype",
    Color => "color",
    Cols => "cols",
    ColSpan => "colspan",
    Compact => "compact",
    Content => "content",
    Coords => "coords",
    Data => "data",
    DateTime => "datetime",
    Declare => "declare",
    Defer => "defer",
    Dir => "dir",
    Disabled => "disabled",
    DynSrc => "dynsrc",
    EncType => "enctype",
    Face => "face",
    For => "for",
    Frame => "frame",
    FrameBorder => "frameborder",
    Headers => "headers",
    Height => "height",
    Href => "href",
    HrefLang => "hreflang",
    HSpace => "hspace",
    HttpEquiv => "http-equiv",
    Id => "id",
    IsMap => "ismap",
    Label => "label",
    Lang => "lang",
    Language => "language",
    Link => "link",
    LongDesc => "longdesc",
    LowSrc => "lowsrc",
    MarginHeight => "marginheight",
    MarginWidth => "marginwidth",
    MaxLength => "maxlength",
    Media => "media",
    Method => "method",
    Multiple => "multiple",
    Name => "name",
    NoHref => "nohref",
    NoResize => "noresize",
    NoShade => "noshade",
    NoWrap => "nowrap",
    Object => "object",
    OnAbort => "onabort",
    OnBlur => "onblur",
    OnChange => "onchange",
    OnClick => "onclick",
    OnDblClick => "ondblclick",
    OnError => "onerror",
    OnFocus => "onfocus",
    OnKeyDown => "onkeydown",
    OnKeyPress => "onkeypress",
    OnKeyUp => "onkeyup",
    OnLoad => "onload",
    OnMouseDown => "onmousedown",
    OnMouseMove => "onmousemove",
    OnMouseOut => "onmouseout",
    OnMouseOver => "onmouseover",
    OnMouseUp => "onmouseup",
    OnReset => "onreset",
    OnSelect => "onselect",
    OnSubmit => "onsubmit",
    OnUnload => "onunload",
    Profile => "profile",
    Prompt => "prompt",
    ReadOnly => "readonly",
    Rel => "rel",
    Rev => "rev",
    Rows => "rows",
    RowSpan => "rowspan",
    Rules => "rules",
    Scheme => "scheme",
    Scope => "scope",
    Scrolling => "scrolling",
    Selected => "selected",
    Shape => "shape",
    Size => "size",
    Span => "span",
    Src => "src",
    SrcSet => "srcset",
    Standby => "standby",
    Start => "start",
    Style => "style",
    Summary => "summary",
    TabIndex => "tabindex",
    Target => "target",
    Text => "text",
    Title => "title",
    Type => "type",
    UseMap => "usemap",
    VAlign => "valign",
    Value => "value",
    ValueType => "valuetype",
    Version => "version",
    VLink => "vlink",
    VSpace => "vspace",
    Width => "width",
    Xmlns => "xmlns",
}

/// Dense index into the shared name table. `NameId::UNKNOWN` is index 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NameId(u16);

#[derive(Debug)]
struct NameEntry {
    text: &'static str,
    tag: TagId,
    attr: AttrId,
}

struct NameTable {
    entries: Vec<NameEntry>,
    index: HashMap<&'static str, NameId>,
    by_tag: Vec<NameId>,
}

static NAMES: LazyLock<NameTable> = LazyLock::new(NameTable::build);

impl NameTable {
    fn build() -> Self {
        let mut table = NameTable {
            entries: vec![NameEntry {
                text: "",
                tag: TagId::Unknown,
                attr: AttrId::Unknown,
            }],
            index: HashMap::new(),
            by_tag: vec![NameId::UNKNOWN; TagId::COUNT],
        };
        for &tag in TagId::ALL.iter().filter(|tag| tag.is_element()) {
            let id = table.intern(tag.name());
            table.entries[usize::from(id.0)].tag = tag;
            table.by_tag[tag.index()] = id;
        }
        for &attr in AttrId::ALL {
            let id = table.intern(attr.name());
            table.entries[usize::from(id.0)].attr = attr;
        }
        table
    }

    fn intern(&mut self, text: &'static str) -> NameId {
        assert!(
            text.len() <= MAX_NAME_LEN,
            "name table entry '{text}' exceeds {MAX_NAME_LEN} bytes"
        );
        if let Some(id) = self.index.get(text) {
            return *id;
        }
        let id = NameId(u16::try_from(self.entries.len()).unwrap_or(u16::MAX));
        self.entries.push(NameEntry {
            text,
            tag: TagId::Unknown,
            attr: AttrId::Unknown,
        });
        self.index.insert(text, id);
        id
    }
}

impl NameId {
    pub const UNKNOWN: NameId = NameId(0);

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    /// Canonical lowercase spelling; empty for `UNKNOWN`.
    pub fn text(self) -> &'static str {
        NAMES.entries[usize::from(self.0)].text
    }

    pub fn tag(self) -> TagId {
        NAMES.entries[usize::from(self.0)].tag
    }

    pub fn attr(self) -> AttrId {
        NAMES.entries[usize::from(self.0)].attr
    }

    /// Name id of an element's canonical spelling.
    pub fn of_tag(tag: TagId) -> NameId {
        NAMES.by_tag[tag.index()]
    }
}

/// Resolve a lexical tag or attribute name.
///
/// Matching is ASCII case-insensitive and exact. Names over
/// [`MAX_NAME_LEN`] bytes or with non-ASCII characters are unknown.
pub fn lookup_name(text: &str) -> NameId {
    let bytes = text.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_LEN || !bytes.is_ascii() {
        return NameId::UNKNOWN;
    }
    let mut folded = [0u8; MAX_NAME_LEN];
    for (dst, src) in folded.iter_mut().zip(bytes) {
        *dst = src.to_ascii_lowercase();
    }
    let Ok(key) = std::str::from_utf8(&folded[..bytes.len()]) else {
        return NameId::UNKNOWN;
    };
    NAMES.index.get(key).copied().unwrap_or(NameId::UNKNOWN)
}
