//! Running golden cases through the normalizer.

use crate::golden::{CaseConfig, GoldenCase};
use html::{InputSource, Normalizer, ParserConfig, TokenKind, TokenizeResult, format_token};
use tools::Encoding;

pub fn parser_config(config: &CaseConfig) -> ParserConfig {
    let mut out = ParserConfig::default();
    if let Some(max_depth) = config.max_depth {
        out.normalizer.max_depth = max_depth;
    }
    if let Some(collapse) = config.collapse_whitespace {
        out.normalizer.collapse_whitespace = collapse;
    }
    out.normalizer.header = config.header.clone();
    out.normalizer.footer = config.footer.clone();
    if let Some(max_text_bytes) = config.max_text_bytes {
        out.tokenizer.max_text_bytes = max_text_bytes;
    }
    if let Some(max_tag_bytes) = config.max_tag_bytes {
        out.tokenizer.max_tag_bytes = max_tag_bytes;
    }
    if let Some(decode) = config.decode_entities {
        out.tokenizer.decode_entities = decode;
    }
    if let Some(sniff) = config.sniff_charset {
        out.tokenizer.sniff_charset = sniff;
    }
    out
}

/// Pull every event of a complete source, formatted one per line. A
/// failure ends the list with `Error(..)`.
pub fn drain<S: InputSource>(normalizer: &mut Normalizer<S>) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        match normalizer.parse() {
            Ok(TokenizeResult::Token(kind)) => {
                out.push(format_token(normalizer.token()));
                if kind == TokenKind::EndOfFile {
                    break;
                }
            }
            Ok(TokenizeResult::NeedMoreInput) => panic!("complete source starved"),
            Err(err) => {
                out.push(format!("Error({err:?})"));
                break;
            }
        }
    }
    out
}

pub fn run_case(case: &GoldenCase) -> Vec<String> {
    let config = parser_config(&case.config);
    match case.config.encoding.as_deref() {
        Some(label) => {
            let encoding = Encoding::for_label(label)
                .unwrap_or_else(|| panic!("case '{}': unknown encoding {label:?}", case.id));
            drain(&mut Normalizer::from_bytes(case.input.as_bytes(), encoding, config))
        }
        None => drain(&mut Normalizer::from_str(&case.input, config)),
    }
}
