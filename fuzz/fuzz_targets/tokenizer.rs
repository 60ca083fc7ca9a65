#![no_main]

use html::{ByteSource, TokenKind, TokenizeResult, Tokenizer, TokenizerConfig};
use libfuzzer_sys::fuzz_target;
use tools::Encoding;

fuzz_target!(|data: &[u8]| {
    // Small limits so fragmenting paths are reached.
    let config = TokenizerConfig {
        max_text_bytes: 64,
        max_tag_bytes: 64,
        ..TokenizerConfig::default()
    };
    let mut tokenizer = Tokenizer::new(ByteSource::new(Encoding::windows_1252()), config);
    let mut chunks = data.chunks(7);
    loop {
        match tokenizer.parse() {
            Ok(TokenizeResult::Token(TokenKind::EndOfFile)) | Err(_) => break,
            Ok(TokenizeResult::Token(_)) => {
                let source = tokenizer.token().source();
                assert!(source.start <= source.end);
            }
            Ok(TokenizeResult::NeedMoreInput) => match chunks.next() {
                Some(chunk) => tokenizer.source_mut().push_bytes(chunk),
                None => tokenizer.source_mut().finish(),
            },
        }
    }
});
