#![no_main]

use html::tables::{Dtd, Scope};
use html::{Normalizer, NormalizerConfig, ParserConfig, TagId, TokenKind, TokenizeResult};
use libfuzzer_sys::fuzz_target;
use tools::Encoding;

const MAX_DEPTH: usize = 24;

fuzz_target!(|data: &[u8]| {
    let config = ParserConfig {
        normalizer: NormalizerConfig {
            max_depth: MAX_DEPTH,
            ..NormalizerConfig::default()
        },
        ..ParserConfig::default()
    };
    let mut normalizer = Normalizer::from_bytes(data, Encoding::utf8(), config);
    let mut open: Vec<TagId> = Vec::new();
    let mut set_aside: Vec<Vec<TagId>> = Vec::new();
    loop {
        let kind = match normalizer.parse() {
            Ok(TokenizeResult::Token(kind)) => kind,
            Ok(TokenizeResult::NeedMoreInput) => panic!("complete source starved"),
            Err(err) => {
                assert!(err.is_fatal(), "{err}");
                break;
            }
        };
        let token = normalizer.token();
        match kind {
            TokenKind::Tag if !token.tag().is_element() => {}
            TokenKind::Tag if token.is_end_tag() => {
                assert_eq!(open.pop(), Some(token.tag()), "unbalanced end tag");
            }
            TokenKind::Tag => {
                if !token.is_empty_scope() && Dtd::get().tag(token.tag()).scope != Scope::Empty {
                    open.push(token.tag());
                }
            }
            TokenKind::OverlappedClose => {
                let keep = open.len() - token.count() as usize;
                set_aside.push(open.split_off(keep));
            }
            TokenKind::OverlappedReopen => open.extend(set_aside.pop().expect("reopen after close")),
            TokenKind::Restart => {
                open.clear();
                set_aside.clear();
            }
            TokenKind::EndOfFile => {
                assert!(open.is_empty() && set_aside.is_empty());
                break;
            }
            _ => {}
        }
        assert!(normalizer.open_elements().len() <= MAX_DEPTH);
    }
});
