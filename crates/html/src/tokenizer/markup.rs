//! Markup declarations: comments, doctype, bang, processing instructions
//! and ASP blocks. Each is a single token with its content in runs.

use super::{AfterEmit, Step, Tokenizer};
use crate::input::InputSource;
use crate::token::TokenKind;
use crate::tokenizer::states::TokenizerState;
use memchr::memchr;

const COMMENT_OPEN: &[u8] = b"<!--";
const DOCTYPE_OPEN: &[u8] = b"<!doctype";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum MatchResult {
    Matched,
    NeedMoreInput,
    NoMatch,
}

impl<S: InputSource> Tokenizer<S> {
    /// ASCII case-insensitive prefix test at the scan position.
    pub(super) fn match_ascii_prefix(&self, needle: &[u8]) -> MatchResult {
        let bytes = self.rest().as_bytes();
        let n = needle.len().min(bytes.len());
        if !bytes[..n].eq_ignore_ascii_case(&needle[..n]) {
            return MatchResult::NoMatch;
        }
        if n == needle.len() {
            MatchResult::Matched
        } else if self.eof {
            MatchResult::NoMatch
        } else {
            MatchResult::NeedMoreInput
        }
    }

    pub(super) fn begin_bang(&mut self) -> Step {
        match self.match_ascii_prefix(COMMENT_OPEN) {
            MatchResult::Matched => {
                return self.begin_declaration(TokenizerState::Comment, COMMENT_OPEN.len());
            }
            MatchResult::NeedMoreInput => return Step::NeedInput,
            MatchResult::NoMatch => {}
        }
        match self.match_ascii_prefix(DOCTYPE_OPEN) {
            MatchResult::Matched => {
                self.begin_declaration(TokenizerState::Doctype, DOCTYPE_OPEN.len())
            }
            MatchResult::NeedMoreInput => Step::NeedInput,
            MatchResult::NoMatch => self.begin_declaration(TokenizerState::Bang, 2),
        }
    }

    pub(super) fn begin_declaration(&mut self, state: TokenizerState, opener_len: usize) -> Step {
        let Some((kind, _)) = state.declaration() else {
            debug_assert!(false, "{state:?} is not a declaration state");
            return Step::Continue;
        };
        self.begin_construct(kind);
        let opener = &self.buffer.as_str()[self.pos..self.pos + opener_len];
        self.raw.push_str(opener);
        self.advance(opener_len);
        self.transition_to(state);
        Step::Continue
    }

    pub(super) fn step_declaration(&mut self) -> Step {
        let Some((kind, terminator)) = self.state.declaration() else {
            unreachable!("declaration step outside a declaration state");
        };
        let term = terminator.as_bytes();
        loop {
            if self.token.text_len() >= self.config.max_text_bytes {
                self.token.set_fragment(self.fragment(false));
                self.token.set_source_end(self.offset);
                self.fragment_emitted = true;
                self.after_emit = AfterEmit::ContinueDeclaration(kind);
                return Step::Emit(kind);
            }
            let bytes = self.rest().as_bytes();
            if bytes.is_empty() {
                if !self.eof {
                    return Step::NeedInput;
                }
                return self.unterminated_declaration(kind);
            }
            let available = bytes.len();
            match memchr(term[0], bytes) {
                Some(0) => {
                    if bytes.len() < term.len() && !self.eof {
                        return Step::NeedInput;
                    }
                    if bytes.starts_with(term) {
                        self.advance(term.len());
                        self.token.set_fragment(self.fragment(true));
                        self.token.set_source_end(self.offset);
                        self.raw.clear();
                        self.transition_to(TokenizerState::Text);
                        return Step::Emit(kind);
                    }
                    self.push_content(1);
                }
                Some(end) => self.push_content(end),
                None => self.push_content(available),
            }
        }
    }

    fn unterminated_declaration(&mut self, kind: TokenKind) -> Step {
        if self.fragment_emitted {
            self.token.set_fragment(self.fragment(true));
            self.token.set_source_end(self.offset);
            self.transition_to(TokenizerState::Text);
            return Step::Emit(kind);
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "html.tokenizer", "unterminated {kind:?} at EOF becomes text");
        self.raw.push_str(self.token.text());
        self.reemit_raw_as_text()
    }
}
