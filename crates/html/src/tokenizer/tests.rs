use super::{TokenizeResult, Tokenizer, TokenizerConfig};
use crate::input::{ByteSource, InputSource, Restartable, StringSource};
use crate::token::TokenKind;
use crate::token_fmt::format_token;
use tools::Encoding;

fn drain<S: InputSource>(
    tokenizer: &mut Tokenizer<S>,
    mut feed: impl FnMut(&mut S) -> bool,
) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        match tokenizer.parse().expect("tokenizer parse") {
            TokenizeResult::Token(TokenKind::EndOfFile) => {
                out.push("EOF".to_string());
                break;
            }
            TokenizeResult::Token(_) => out.push(format_token(tokenizer.token())),
            TokenizeResult::NeedMoreInput => {
                assert!(feed(tokenizer.source_mut()), "tokenizer starved after finish");
            }
        }
    }
    out
}

fn run_chunks_with(chunks: &[&str], config: TokenizerConfig) -> Vec<String> {
    let mut tokenizer = Tokenizer::new(StringSource::new(), config);
    let mut chunks = chunks.iter();
    drain(&mut tokenizer, |source| {
        match chunks.next() {
            Some(chunk) => source.push_str(chunk),
            None if source.is_finished() => return false,
            None => source.finish(),
        }
        true
    })
}

fn run_chunks(chunks: &[&str]) -> Vec<String> {
    run_chunks_with(chunks, TokenizerConfig::default())
}

fn tokens(input: &str) -> Vec<String> {
    run_chunks(&[input])
}

fn run_bytes(chunks: &[&[u8]], encoding: Encoding) -> Vec<String> {
    let mut tokenizer = Tokenizer::new(ByteSource::new(encoding), TokenizerConfig::default());
    let mut chunks = chunks.iter();
    let mut finished = false;
    drain(&mut tokenizer, |source| {
        match chunks.next() {
            Some(chunk) => source.push_bytes(chunk),
            None if finished => return false,
            None => {
                source.finish();
                finished = true;
            }
        }
        true
    })
}

const DOC: &str = "<!DOCTYPE html><html><head><title>T &amp; U</title>\
<script>if (a<b && c) x('</scr' + 'ipt>')</script></head>\
<body class=x id='y' hidden>Hello &copy; world&#33; <!-- c --> <br/>caf\u{e9} \
<p>x&ampy<?pi?><%a%>&#x20AC; &notit;</body></html>";

#[test]
fn tokenizes_tags_and_text() {
    assert_eq!(
        tokens("<div class=\"a\">Hello</div>"),
        ["Begin(div class=\"a\")", "Text(\"Hello\")", "End(div)", "EOF"]
    );
}

#[test]
fn names_are_case_insensitive_and_unknown_tags_keep_their_name() {
    assert_eq!(
        tokens("<A HREF=x><Weird-Tag Data-X=1></A>"),
        [
            "Begin(a href=\"x\")",
            "Begin(?weird-tag data-x=\"1\")",
            "End(a)",
            "EOF"
        ]
    );
}

#[test]
fn decodes_character_references_in_text() {
    assert_eq!(
        tokens("a&amp;b&#65;&#xea;&foo;&am"),
        ["Text(\"a&bA\u{ea}&foo;&am\")", "EOF"]
    );
}

#[test]
fn attribute_references_only_match_whole_names() {
    assert_eq!(
        tokens("<a href=\"?x=1&copy=2&amp;y&notit;\" title=&lt;>"),
        ["Begin(a href=\"?x=1&copy=2&y&notit;\" title=\"<\")", "EOF"]
    );
}

#[test]
fn bare_and_empty_attributes() {
    assert_eq!(
        tokens("<input disabled value= name=''>"),
        ["Begin(input disabled value=\"name=''\")", "EOF"]
    );
    assert_eq!(
        tokens("<input value=>"),
        ["Begin(input value=\"\")", "EOF"]
    );
}

#[test]
fn entity_decoding_can_be_disabled() {
    let config = TokenizerConfig {
        decode_entities: false,
        ..TokenizerConfig::default()
    };
    assert_eq!(
        run_chunks_with(&["a&amp;b&&"], config),
        ["Text(\"a&amp;b&&\")", "EOF"]
    );
}

#[test]
fn stray_angle_brackets_are_text() {
    assert_eq!(tokens("a < b <1 </ c"), ["Text(\"a < b <1 </ c\")", "EOF"]);
    assert_eq!(tokens("x</>y"), ["Text(\"x\")", "Text(\"y\")", "EOF"]);
    assert_eq!(tokens("<"), ["Text(\"<\")", "EOF"]);
}

#[test]
fn declarations_are_single_tokens() {
    assert_eq!(
        tokens("<!DOCTYPE html><!-- x --><?php echo ?><% code %><![CDATA[x]]><!--->-->"),
        [
            "Doctype(\"html\")",
            "Comment(\" x \")",
            "Pi(\"php echo \")",
            "Asp(\" code \")",
            "Bang(\"[CDATA[x]]\")",
            "Comment(\"->\")",
            "EOF"
        ]
    );
}

#[test]
fn unterminated_constructs_at_eof_become_text() {
    assert_eq!(
        tokens("a<!-- never &amp;"),
        ["Text(\"a\")", "Text(\"<!-- never &amp;\")", "EOF"]
    );
    assert_eq!(tokens("<?pi"), ["Text(\"<?pi\")", "EOF"]);
    assert_eq!(tokens("<%x%"), ["Text(\"<%x%\")", "EOF"]);
    assert_eq!(tokens("<!doctype"), ["Text(\"<!doctype\")", "EOF"]);
    assert_eq!(
        tokens("<b class=\"x"),
        ["Text(\"<b class=\\\"x\")", "EOF"]
    );
}

#[test]
fn script_content_is_raw_until_its_end_tag() {
    assert_eq!(
        tokens("<script>if (a < b && c) w('</scr' + 'ipt>')</SCRIPT >x"),
        [
            "Begin(script)",
            "Text(\"if (a < b && c) w('</scr' + 'ipt>')\")",
            "End(script)",
            "Text(\"x\")",
            "EOF"
        ]
    );
}

#[test]
fn escapable_content_decodes_and_ignores_self_closing() {
    assert_eq!(
        tokens("<title/>a &amp; <b></title>"),
        ["Begin(title)", "Text(\"a & <b>\")", "End(title)", "EOF"]
    );
    assert_eq!(tokens("<br/>"), ["Begin(br /)", "EOF"]);
}

#[test]
fn literal_content_at_eof() {
    assert_eq!(
        tokens("<style>a</sty"),
        ["Begin(style)", "Text(\"a</sty\")", "EOF"]
    );
    assert_eq!(
        tokens("<plaintext><b>x</plaintext>"),
        ["Begin(plaintext)", "Text(\"<b>x</plaintext>\")", "EOF"]
    );
    assert_eq!(tokens("<xmp></xmp>"), ["Begin(xmp)", "End(xmp)", "EOF"]);
}

#[test]
fn invalid_characters_are_removed_but_counted() {
    let mut tokenizer = Tokenizer::new(
        StringSource::complete("a\u{0}b\u{fdd0}c<p\u{0}>"),
        TokenizerConfig::default(),
    );
    assert_eq!(
        tokenizer.parse().unwrap(),
        TokenizeResult::Token(TokenKind::Text)
    );
    let token = tokenizer.token();
    assert_eq!(token.text(), "abc");
    assert_eq!(token.source(), 0..7);
    let total: u32 = token.runs().iter().map(|run| run.source_len).sum();
    assert_eq!(total, 7);
    assert_eq!(
        tokenizer.parse().unwrap(),
        TokenizeResult::Token(TokenKind::Tag)
    );
    assert_eq!(format_token(tokenizer.token()), "Begin(p)");
    assert_eq!(tokenizer.stats().invalid_removed, 3);
}

#[test]
fn run_source_lengths_cover_the_token() {
    let mut tokenizer = Tokenizer::new(
        StringSource::complete("x &amp; y&#65;\t\n&nbsp;z<b>"),
        TokenizerConfig::default(),
    );
    tokenizer.parse().unwrap();
    let token = tokenizer.token();
    let total: usize = token.runs().iter().map(|run| run.source_len as usize).sum();
    assert_eq!(total, token.source().len());
    assert_eq!(token.source(), 0..23);
    assert!(token.runs().iter().any(|run| run.literal == Some('\u{a0}')));
}

#[test]
fn long_text_is_cut_at_the_limit() {
    let config = TokenizerConfig {
        max_text_bytes: 256,
        ..TokenizerConfig::default()
    };
    let text = "x".repeat(600);
    let out = run_chunks_with(&[&text], config);
    let lens: Vec<usize> = out
        .iter()
        .filter(|line| line.starts_with("Text"))
        .map(|line| line.len() - "Text(\"\")".len())
        .collect();
    assert_eq!(lens, [256, 256, 88]);
}

#[test]
fn long_tags_are_emitted_in_fragments() {
    let config = TokenizerConfig {
        max_tag_bytes: 16,
        ..TokenizerConfig::default()
    };
    assert_eq!(
        run_chunks_with(&["<a b=\"1234567890\" c=\"1234567890\" d=x>t"], config.clone()),
        [
            "Begin(a b=\"1234567890\" c=\"1234567890\")[first]",
            "Begin(a d=\"x\")[last]",
            "Text(\"t\")",
            "EOF"
        ]
    );
    // Once a fragment is out, EOF closes the tag instead of re-emitting it.
    assert_eq!(
        run_chunks_with(&["<a b=\"1234567890\" c=\"1234567890\" d=x"], config),
        [
            "Begin(a b=\"1234567890\" c=\"1234567890\")[first]",
            "Begin(a d=\"x\")[last]",
            "EOF"
        ]
    );
}

#[test]
fn eof_is_sticky() {
    let mut tokenizer = Tokenizer::new(StringSource::complete(""), TokenizerConfig::default());
    for _ in 0..3 {
        assert_eq!(
            tokenizer.parse().unwrap(),
            TokenizeResult::Token(TokenKind::EndOfFile)
        );
    }
}

#[test]
fn two_chunk_splits_match_single_chunk_sequence() {
    let whole = tokens(DOC);
    for (split, _) in DOC.char_indices().skip(1) {
        let chunked = run_chunks(&[&DOC[..split], &DOC[split..]]);
        assert_eq!(whole, chunked, "token sequence must be chunk-invariant (split at {split})");
    }
}

#[test]
fn byte_splits_inside_utf8_match_single_chunk_sequence() {
    let bytes = DOC.as_bytes();
    let whole = run_bytes(&[bytes], Encoding::utf8());
    assert_eq!(whole, tokens(DOC));
    for split in 1..bytes.len() {
        let chunked = run_bytes(&[&bytes[..split], &bytes[split..]], Encoding::utf8());
        assert_eq!(whole, chunked, "byte split at {split}");
    }
}

#[test]
fn meta_charset_restarts_once_with_the_new_encoding() {
    let input: &[u8] = b"<meta charset=utf-8><p>caf\xc3\xa9";
    assert_eq!(
        run_bytes(&[input], Encoding::windows_1252()),
        [
            "Restart",
            "EncodingChange(utf-8)",
            "Begin(meta charset=\"utf-8\")",
            "Begin(p)",
            "Text(\"caf\u{e9}\")",
            "EOF"
        ]
    );
}

#[test]
fn meta_http_equiv_content_type_restarts() {
    let input: &[u8] =
        b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\">\xc3\xa9";
    let out = run_bytes(&[input], Encoding::windows_1252());
    assert_eq!(out[..2], ["Restart", "EncodingChange(utf-8)"]);
    assert_eq!(out[3..], ["Text(\"\u{e9}\")", "EOF"]);
}

#[test]
fn meta_charset_is_ignored_when_restart_is_disabled() {
    let mut tokenizer = Tokenizer::new(
        ByteSource::complete(b"<meta charset=utf-8>\xc3\xa9", Encoding::windows_1252()),
        TokenizerConfig::default(),
    );
    tokenizer.disable_restart();
    assert!(!tokenizer.can_restart());
    let out = drain(&mut tokenizer, |_| false);
    assert_eq!(
        out,
        ["Begin(meta charset=\"utf-8\")", "Text(\"\u{c3}\u{a9}\")", "EOF"]
    );
}

#[test]
fn meta_charset_matching_the_current_encoding_does_not_restart() {
    let out = run_bytes(&[b"<meta charset=utf-8>x"], Encoding::utf8());
    assert_eq!(out, ["Begin(meta charset=\"utf-8\")", "Text(\"x\")", "EOF"]);
}

#[test]
fn meta_charset_past_the_sniff_window_is_ignored() {
    let mut input = "x".repeat(2000).into_bytes();
    input.extend_from_slice(b"<meta charset=utf-8>\xc3\xa9");
    let out = run_bytes(&[&input], Encoding::windows_1252());
    assert!(!out.iter().any(|line| line == "Restart"), "{:?}", &out[1..]);
    assert_eq!(
        out[1..],
        ["Begin(meta charset=\"utf-8\")", "Text(\"\u{c3}\u{a9}\")", "EOF"]
    );
}

#[test]
fn input_is_released_once_the_sniff_window_passes() {
    let chunk = "<p>filler text</p>\n".repeat(1500);
    let mut tokenizer = Tokenizer::new(
        ByteSource::new(Encoding::windows_1252()),
        TokenizerConfig::default(),
    );
    let mut pushed = 0;
    let mut peak = 0;
    let out = drain(&mut tokenizer, |source| {
        peak = peak.max(source.retained_len());
        if pushed < 200 {
            source.push_bytes(chunk.as_bytes());
            pushed += 1;
        } else if source.is_finished() {
            return false;
        } else {
            source.finish();
        }
        true
    });
    assert_eq!(out.last().map(String::as_str), Some("EOF"));
    assert!(!tokenizer.can_restart());
    assert!(peak <= chunk.len(), "retained {peak} bytes");
    assert_eq!(tokenizer.source().retained_len(), 0);
}

#[test]
fn pushed_text_is_released_once_the_sniff_window_passes() {
    let chunk = "<i>more text</i> ".repeat(1600);
    let mut tokenizer = Tokenizer::new(StringSource::new(), TokenizerConfig::default());
    let mut pushed = 0;
    let mut peak = 0;
    drain(&mut tokenizer, |source| {
        peak = peak.max(source.retained_len());
        if pushed < 100 {
            source.push_str(&chunk);
            pushed += 1;
        } else if source.is_finished() {
            return false;
        } else {
            source.finish();
        }
        true
    });
    assert!(!tokenizer.can_restart());
    assert!(peak <= 2 * chunk.len(), "retained {peak} bytes");
}

#[test]
fn input_is_released_when_sniffing_is_off() {
    let config = TokenizerConfig {
        sniff_charset: false,
        ..TokenizerConfig::default()
    };
    let mut tokenizer = Tokenizer::new(ByteSource::new(Encoding::utf8()), config);
    tokenizer.source_mut().push_bytes(b"<b>x</b>");
    assert_eq!(
        tokenizer.parse().unwrap(),
        TokenizeResult::Token(TokenKind::Tag)
    );
    assert!(!tokenizer.can_restart());
    assert_eq!(tokenizer.source().retained_len(), 0);
}

#[test]
fn sniffed_restart_closes_the_restart_window() {
    let mut tokenizer = Tokenizer::new(
        ByteSource::complete(b"<meta charset=utf-8><p>caf\xc3\xa9", Encoding::windows_1252()),
        TokenizerConfig::default(),
    );
    let out = drain(&mut tokenizer, |_| false);
    assert_eq!(out[..2], ["Restart", "EncodingChange(utf-8)"]);
    assert!(!tokenizer.can_restart());
    assert_eq!(tokenizer.source().retained_len(), 0);
}

#[test]
fn shift_jis_declaration_restarts_into_shift_jis() {
    let input: &[u8] = b"<meta charset=shift_jis><p>\x93\xfa\x96\x7b";
    assert_eq!(
        run_bytes(&[input], Encoding::windows_1252()),
        [
            "Restart",
            "EncodingChange(shift_jis)",
            "Begin(meta charset=\"shift_jis\")",
            "Begin(p)",
            "Text(\"\u{65e5}\u{672c}\")",
            "EOF"
        ]
    );
}

#[test]
fn explicit_restart_replays_the_stream() {
    let mut tokenizer = Tokenizer::new(StringSource::complete("<b>x</b>"), TokenizerConfig::default());
    assert_eq!(
        tokenizer.parse().unwrap(),
        TokenizeResult::Token(TokenKind::Tag)
    );
    tokenizer.restart().unwrap();
    let out = drain(&mut tokenizer, |_| false);
    assert_eq!(out, ["Begin(b)", "Text(\"x\")", "End(b)", "EOF"]);
    tokenizer.disable_restart();
    assert!(tokenizer.restart().is_err());
}
