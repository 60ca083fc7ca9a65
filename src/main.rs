//! Command line front end: tokenizes or normalizes a document and prints
//! one event per line.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use html::{
    ByteSource, Normalizer, NormalizerConfig, ParseError, ParserConfig, Restartable, Token,
    TokenKind, TokenizeResult, Tokenizer, TokenizerConfig, format_token,
};
use mimalloc::MiMalloc;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use tools::Encoding;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Input file; standard input when omitted
    input: Option<PathBuf>,

    /// Encoding to start decoding with
    #[arg(long, default_value = "windows-1252")]
    encoding: String,

    /// Bytes read per chunk
    #[arg(long, default_value_t = 8 * 1024)]
    chunk_size: usize,

    /// Print raw tokens instead of normalized events
    #[arg(long, action = ArgAction::SetTrue)]
    tokens: bool,

    /// Maximum element nesting
    #[arg(long, default_value_t = NormalizerConfig::default().max_depth)]
    max_depth: usize,

    /// Keep whitespace as written
    #[arg(long, action = ArgAction::SetTrue)]
    keep_whitespace: bool,

    /// Ignore charset declarations in the document
    #[arg(long = "no-sniff", action = ArgAction::SetTrue)]
    no_sniff: bool,

    /// Leave character references undecoded
    #[arg(long = "no-entities", action = ArgAction::SetTrue)]
    no_entities: bool,

    /// Markup injected before the first body content
    #[arg(long)]
    header: Option<String>,

    /// Markup injected at the end of the body
    #[arg(long)]
    footer: Option<String>,

    /// Log statistics when done (implies info level)
    #[arg(long, action = ArgAction::SetTrue)]
    stats: bool,

    /// More log output; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> ParserConfig {
        ParserConfig {
            tokenizer: TokenizerConfig {
                sniff_charset: !self.no_sniff,
                decode_entities: !self.no_entities,
                ..TokenizerConfig::default()
            },
            normalizer: NormalizerConfig {
                max_depth: self.max_depth,
                collapse_whitespace: !self.keep_whitespace,
                header: self.header.clone(),
                footer: self.footer.clone(),
            },
        }
    }

    fn level(&self) -> log::LevelFilter {
        match self.verbose {
            0 if self.stats => log::LevelFilter::Info,
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<()> {
    let cli = Cli::parse();
    log::set_logger(&LOGGER).context("installing the logger")?;
    log::set_max_level(cli.level());

    let mut reader: Box<dyn Read> = match &cli.input {
        Some(path) => {
            Box::new(File::open(path).with_context(|| format!("opening {}", path.display()))?)
        }
        None => Box::new(io::stdin()),
    };
    run(&cli, &mut reader, BufWriter::new(io::stdout().lock()))
}

fn run(cli: &Cli, reader: &mut dyn Read, out: impl Write) -> Result<()> {
    let Some(encoding) = Encoding::for_label(&cli.encoding) else {
        bail!("unsupported encoding '{}'", cli.encoding);
    };
    if cli.chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }
    let config = cli.config();
    let tokenizer = Tokenizer::new(ByteSource::new(encoding), config.tokenizer);
    let mut feed = Feed::new(reader, cli.chunk_size);
    let mut out = Output::new(out);

    if cli.tokens {
        let mut tokenizer = tokenizer;
        print_stream(&mut tokenizer, &mut feed, &mut out)?;
        if cli.stats {
            log::info!(target: "markguard", "{:?}", tokenizer.stats());
        }
    } else {
        let mut normalizer = Normalizer::new(tokenizer, config.normalizer);
        print_stream(&mut normalizer, &mut feed, &mut out)?;
        if cli.stats {
            log::info!(target: "markguard", "{:?}", normalizer.stats());
            log::info!(target: "markguard", "{:?}", normalizer.tokenizer().stats());
        }
    }
    out.finish()
}

/// Reads the input in fixed-size chunks on demand.
struct Feed<'a> {
    reader: &'a mut dyn Read,
    chunk: Vec<u8>,
}

impl<'a> Feed<'a> {
    fn new(reader: &'a mut dyn Read, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk: vec![0; chunk_size],
        }
    }

    /// Push the next chunk, or finish the source at the end of input.
    fn refill(&mut self, source: &mut ByteSource) -> Result<()> {
        if source.is_finished() {
            bail!("parser asked for input after the end");
        }
        let read = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err).context("reading input"),
            }
        };
        if read == 0 {
            source.finish();
        } else {
            source.push_bytes(&self.chunk[..read]);
        }
        Ok(())
    }
}

/// Output held back past this many bytes gives up restart instead.
const HOLD_LIMIT: usize = 64 * 1024;

/// Writes one line per token. Lines are held while the pipeline can still
/// restart, so a restart never follows output that already left.
struct Output<W> {
    out: W,
    held: Vec<String>,
    held_bytes: usize,
}

impl<W: Write> Output<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            held: Vec::new(),
            held_bytes: 0,
        }
    }

    fn push(&mut self, kind: TokenKind, line: String, pipeline: &mut impl Restartable) -> Result<()> {
        if kind == TokenKind::Restart {
            // Everything before a restart is still held and now void.
            log::debug!(target: "markguard", "restart dropped {} held lines", self.held.len());
            self.held.clear();
            self.held_bytes = 0;
            return Ok(());
        }
        if pipeline.can_restart() {
            if self.held_bytes + line.len() <= HOLD_LIMIT {
                self.held_bytes += line.len();
                self.held.push(line);
                return Ok(());
            }
            log::debug!(target: "markguard", "held output reached {HOLD_LIMIT} bytes; restart disabled");
            pipeline.disable_restart();
        }
        self.release()?;
        writeln!(self.out, "{line}").context("writing output")
    }

    fn release(&mut self) -> Result<()> {
        for line in self.held.drain(..) {
            writeln!(self.out, "{line}").context("writing output")?;
        }
        self.held_bytes = 0;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.release()?;
        self.out.flush().context("writing output")
    }
}

/// A pull pipeline over a [`ByteSource`]: the bare tokenizer or the
/// normalizer on top of it.
trait Pipeline: Restartable {
    fn advance(&mut self) -> Result<TokenizeResult, ParseError>;
    fn current(&self) -> &Token;
    fn input(&mut self) -> &mut ByteSource;
}

impl Pipeline for Tokenizer<ByteSource> {
    fn advance(&mut self) -> Result<TokenizeResult, ParseError> {
        self.parse()
    }

    fn current(&self) -> &Token {
        self.token()
    }

    fn input(&mut self) -> &mut ByteSource {
        self.source_mut()
    }
}

impl Pipeline for Normalizer<ByteSource> {
    fn advance(&mut self) -> Result<TokenizeResult, ParseError> {
        self.parse()
    }

    fn current(&self) -> &Token {
        self.token()
    }

    fn input(&mut self) -> &mut ByteSource {
        self.source_mut()
    }
}

fn print_stream(
    pipeline: &mut impl Pipeline,
    feed: &mut Feed<'_>,
    out: &mut Output<impl Write>,
) -> Result<()> {
    loop {
        match pipeline.advance().context("parsing input")? {
            TokenizeResult::Token(kind) => {
                let line = format_token(pipeline.current());
                out.push(kind, line, pipeline)?;
                if kind == TokenKind::EndOfFile {
                    return Ok(());
                }
            }
            TokenizeResult::NeedMoreInput => feed.refill(pipeline.input())?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(args: &[&str], input: &[u8]) -> Vec<String> {
        let cli = Cli::try_parse_from(std::iter::once("markguard").chain(args.iter().copied()))
            .expect("arguments");
        let mut reader = input;
        let mut out = Vec::new();
        run(&cli, &mut reader, &mut out).expect("run");
        String::from_utf8(out)
            .expect("utf-8 output")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn early_charset_restart_leaves_no_stale_output() {
        let input = "<p>caf\u{e9}<meta charset=utf-8>".as_bytes();
        for chunk_size in ["1", "4", "8192"] {
            let out = render(&["--chunk-size", chunk_size], input);
            assert_eq!(
                out,
                [
                    "EncodingChange(utf-8)",
                    "Begin(p)",
                    "Text(\"caf\u{e9}\")",
                    "Begin(meta charset=\"utf-8\")",
                    "End(p)",
                    "EOF"
                ],
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn late_charset_declaration_never_repeats_output() {
        let mut input = "<p>caf\u{e9}</p>\n".repeat(3000);
        input.push_str("<meta charset=utf-8>");
        let out = render(&[], input.as_bytes());
        assert!(!out.iter().any(|line| line == "Restart" || line.starts_with("EncodingChange")));
        let stale = out.iter().filter(|line| *line == "Text(\"caf\u{c3}\u{a9}\")").count();
        assert_eq!(stale, 3000);
        assert_eq!(out.last().map(String::as_str), Some("EOF"));
    }

    #[test]
    fn raw_tokens_are_held_the_same_way() {
        let out = render(&["--tokens", "--chunk-size", "3"], b"<b>\xc3\xa9<meta charset=utf-8>");
        assert_eq!(out[0], "EncodingChange(utf-8)");
        assert!(out.contains(&"Text(\"\u{e9}\")".to_string()));
        assert!(!out.iter().any(|line| line == "Restart"));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let cli = Cli::try_parse_from(["markguard", "--encoding", "x-nope"]).expect("arguments");
        let mut reader: &[u8] = b"";
        let err = run(&cli, &mut reader, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("x-nope"));
    }
}
