//! Tokenizer state machine definitions.

use crate::token::TokenKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenizerState {
    Text,
    TagOpen,
    TagName,
    BeforeAttrName,
    AttrName,
    AfterAttrName,
    BeforeAttrValue,
    AttrValueQuoted(char),
    AttrValueUnquoted,
    SelfClosing,
    Comment,
    Bang,
    Doctype,
    Pi,
    Asp,
    /// Raw or escapable content of a literal element.
    Literal,
}

impl TokenizerState {
    /// Declaration states: the token kind they produce and their terminator.
    pub(crate) fn declaration(self) -> Option<(TokenKind, &'static str)> {
        match self {
            Self::Comment => Some((TokenKind::Comment, "-->")),
            Self::Bang => Some((TokenKind::Bang, ">")),
            Self::Doctype => Some((TokenKind::Doctype, ">")),
            Self::Pi => Some((TokenKind::Pi, "?>")),
            Self::Asp => Some((TokenKind::Asp, "%>")),
            _ => None,
        }
    }
}
