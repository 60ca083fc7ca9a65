//! Hostile inputs: random tag soup, nesting bombs and oversized
//! constructs. Whatever the input, the event stream stays balanced and
//! bounded.

use html::tables::{Dtd, Scope};
use html::{
    Normalizer, NormalizerConfig, ParseError, ParserConfig, TagId, Token, TokenKind,
    TokenizeResult,
};
use html_test_support::parse_u64;

const SOUP_RUNS_ENV: &str = "MARKGUARD_SOUP_RUNS";
const SOUP_SEED_ENV: &str = "MARKGUARD_SOUP_SEED";

/// Replays structural events and checks they nest.
#[derive(Default)]
struct Balance {
    open: Vec<TagId>,
    /// Elements set aside by each pending `OverlappedClose`.
    set_aside: Vec<Vec<TagId>>,
    deepest: usize,
}

impl Balance {
    fn event(&mut self, token: &Token) -> Result<(), String> {
        match token.kind() {
            TokenKind::Tag if !token.tag().is_element() => {}
            TokenKind::Tag if token.is_end_tag() => match self.open.pop() {
                Some(top) if top == token.tag() => {}
                top => return Err(format!("End({}) with {top:?} on top", token.tag().name())),
            },
            TokenKind::Tag => {
                let tag = token.tag();
                if !token.is_empty_scope() && Dtd::get().tag(tag).scope != Scope::Empty {
                    self.open.push(tag);
                    self.deepest = self.deepest.max(self.depth());
                }
            }
            TokenKind::OverlappedClose => {
                let count = token.count() as usize;
                if count > self.open.len() {
                    return Err(format!("OverlappedClose({count}) with {} open", self.open.len()));
                }
                let keep = self.open.len() - count;
                self.set_aside.push(self.open.split_off(keep));
            }
            TokenKind::OverlappedReopen => {
                let restored = self.set_aside.pop().ok_or("OverlappedReopen without a close")?;
                if restored.len() != token.count() as usize {
                    return Err(format!(
                        "OverlappedReopen({}) after closing {}",
                        token.count(),
                        restored.len()
                    ));
                }
                self.open.extend(restored);
            }
            TokenKind::Restart => {
                self.open.clear();
                self.set_aside.clear();
            }
            TokenKind::EndOfFile => {
                if !self.open.is_empty() || !self.set_aside.is_empty() {
                    return Err(format!("still open at EOF: {:?}", self.open));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn depth(&self) -> usize {
        self.open.len() + self.set_aside.iter().map(Vec::len).sum::<usize>()
    }
}

/// Normalize a complete input, checking balance and the depth bound after
/// every event. A depth error is the only failure allowed.
fn check(input: &str, config: ParserConfig) -> Result<Balance, String> {
    let max_depth = config.normalizer.max_depth;
    let mut normalizer = Normalizer::from_str(input, config);
    let mut balance = Balance::default();
    loop {
        match normalizer.parse() {
            Ok(TokenizeResult::Token(kind)) => {
                balance.event(normalizer.token())?;
                if normalizer.open_elements().len() > max_depth || balance.depth() > max_depth {
                    return Err(format!("depth above {max_depth}"));
                }
                if kind == TokenKind::EndOfFile {
                    return Ok(balance);
                }
            }
            Ok(TokenizeResult::NeedMoreInput) => return Err("complete source starved".to_string()),
            // Injected content reports its own remaining depth.
            Err(ParseError::DepthExceeded { max }) if max <= max_depth => return Ok(balance),
            Err(err) => return Err(format!("unexpected error: {err}")),
        }
    }
}

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.next() as usize % items.len()]
    }
}

const SOUP_TAGS: &[&str] = &[
    "a", "b", "i", "u", "span", "font", "nobr", "div", "p", "h1", "h3", "pre", "form", "ul", "ol",
    "li", "dl", "dt", "dd", "table", "caption", "colgroup", "col", "thead", "tbody", "tr", "td",
    "th", "select", "optgroup", "option", "button", "object", "applet", "marquee", "textarea",
    "title", "script", "style", "xmp", "html", "head", "body", "frameset", "frame", "noframes",
    "meta", "br", "hr", "img", "input", "ruby", "rt", "rp", "foo",
];

const SOUP_TEXT: &[&str] = &[
    "x", "word", " ", "  \n ", "\t", "&amp;", "&lt;", "&", "&#", "&#x41;", "&nbsp;", "\u{4e2d}",
    "\n", "caf\u{e9}", "<", "</", "<!", "<!--", "-->", ">", "\"", "'", "<?", "<%", "%>",
];

fn soup(rng: &mut Lcg, pieces: usize) -> String {
    let mut out = String::new();
    for _ in 0..pieces {
        match rng.next() % 8 {
            0..=2 => {
                out.push('<');
                out.push_str(rng.pick(SOUP_TAGS));
                if rng.next() % 4 == 0 {
                    out.push_str(" class=\"c\"");
                }
                if rng.next() % 8 == 0 {
                    out.push('/');
                }
                out.push('>');
            }
            3 | 4 => {
                out.push_str("</");
                out.push_str(rng.pick(SOUP_TAGS));
                out.push('>');
            }
            5 => out.push_str("<!-- c -->"),
            _ => out.push_str(rng.pick(SOUP_TEXT)),
        }
    }
    out
}

fn soup_settings() -> (u64, u64) {
    let read = |key: &str, default: u64| {
        std::env::var(key)
            .ok()
            .map(|raw| parse_u64(&raw).unwrap_or_else(|| panic!("invalid {key} value '{raw}'")))
            .unwrap_or(default)
    };
    (read(SOUP_RUNS_ENV, 200), read(SOUP_SEED_ENV, 0x5eed_50a9))
}

fn with_depth(max_depth: usize) -> ParserConfig {
    ParserConfig {
        normalizer: NormalizerConfig {
            max_depth,
            ..NormalizerConfig::default()
        },
        ..ParserConfig::default()
    }
}

#[test]
fn random_tag_soup_stays_balanced() {
    let (runs, seed) = soup_settings();
    for run in 0..runs {
        let mut rng = Lcg(seed.wrapping_add(run));
        let pieces = 40 + (rng.next() % 200) as usize;
        let input = soup(&mut rng, pieces);
        let max_depth = [4usize, 16, 256][(run % 3) as usize];
        if let Err(problem) = check(&input, with_depth(max_depth)) {
            panic!(
                "run {run} (seed {:#x}, max_depth {max_depth}): {problem}\ninput: {input:?}",
                seed.wrapping_add(run)
            );
        }
    }
}

#[test]
fn random_tag_soup_with_injections_stays_balanced() {
    let (runs, seed) = soup_settings();
    let config = ParserConfig {
        normalizer: NormalizerConfig {
            max_depth: 32,
            header: Some("<div><b>head</div>".to_string()),
            footer: Some("<p>foot<table><td>x".to_string()),
            ..NormalizerConfig::default()
        },
        ..ParserConfig::default()
    };
    for run in 0..runs / 4 {
        let mut rng = Lcg(seed ^ run.wrapping_mul(0x9e37_79b9));
        let input = soup(&mut rng, 120);
        if let Err(problem) = check(&input, config.clone()) {
            panic!("run {run}: {problem}\ninput: {input:?}");
        }
    }
}

#[test]
fn nesting_bombs_stop_at_the_limit() {
    for tag in ["div", "b", "span", "blockquote", "object"] {
        let input = format!("<{tag}>").repeat(100_000);
        let balance = check(&input, ParserConfig::default())
            .unwrap_or_else(|problem| panic!("<{tag}>: {problem}"));
        assert_eq!(balance.deepest, 256, "<{tag}> bomb");
    }
    // Each table synthesizes a cell for the next one; the chain cut by the
    // limit is never shown.
    let input = "<table>".repeat(100_000);
    let balance = check(&input, ParserConfig::default())
        .unwrap_or_else(|problem| panic!("<table>: {problem}"));
    assert!((250..=256).contains(&balance.deepest), "<table> bomb reached {}", balance.deepest);
}

#[test]
fn self_closing_bombs_stay_shallow() {
    for (tag, depth) in [("select", 2usize), ("li", 2), ("p", 1), ("a", 1), ("td", 4), ("option", 1)] {
        let input = format!("<{tag}>x").repeat(20_000);
        let balance = check(&input, ParserConfig::default())
            .unwrap_or_else(|problem| panic!("<{tag}>: {problem}"));
        assert_eq!(balance.deepest, depth, "<{tag}> repeated");
    }
}

#[test]
fn huge_attribute_value_is_truncated() {
    let config = ParserConfig::default();
    let limit = config.tokenizer.max_tag_bytes;
    let input = format!("<div title=\"{}\" id=x>body</div>", "v".repeat(1 << 20));
    let mut normalizer = Normalizer::from_str(&input, config);
    let mut saw_div = false;
    loop {
        match normalizer.parse().expect("no error") {
            TokenizeResult::Token(TokenKind::EndOfFile) => break,
            TokenizeResult::Token(TokenKind::Tag) if !normalizer.token().is_end_tag() => {
                let token = normalizer.token();
                assert_eq!(token.tag(), TagId::Div);
                assert!(token.attribute_value(0).len() <= limit);
                saw_div = true;
            }
            TokenizeResult::Token(_) => {}
            TokenizeResult::NeedMoreInput => panic!("complete source starved"),
        }
    }
    assert!(saw_div);
}

#[test]
fn huge_text_is_cut_into_bounded_tokens() {
    let config = ParserConfig::default();
    let limit = config.tokenizer.max_text_bytes;
    let input = "x".repeat(1 << 20);
    let mut normalizer = Normalizer::from_str(&input, config);
    let mut total = 0usize;
    loop {
        match normalizer.parse().expect("no error") {
            TokenizeResult::Token(TokenKind::EndOfFile) => break,
            TokenizeResult::Token(TokenKind::Text) => {
                let len = normalizer.token().text().len();
                assert!(len <= limit, "text token of {len} bytes");
                total += len;
            }
            TokenizeResult::Token(_) => {}
            TokenizeResult::NeedMoreInput => panic!("complete source starved"),
        }
    }
    assert_eq!(total, input.len());
}

#[test]
fn unterminated_markup_becomes_text() {
    for input in ["<div", "<!-- open", "<a href=\"x", "</", "<?pi", "<%", "&#x1234567;"] {
        let balance = check(input, ParserConfig::default())
            .unwrap_or_else(|problem| panic!("{input:?}: {problem}"));
        assert_eq!(balance.deepest, 0, "{input:?}");
    }
}
