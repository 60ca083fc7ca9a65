//! Chunk plans for streaming parity tests.
//!
//! A plan says where an input is cut before it is fed to the pipeline.
//! Deterministic plans cover fixed sizes and cuts around markup bytes;
//! fuzz plans are seeded so failures reproduce in CI.

use crate::input::{ByteSource, InputSource, StringSource};
use crate::normalizer::{Normalizer, ParserConfig};
use crate::token::TokenKind;
use crate::token_fmt::format_token;
use crate::tokenizer::{TokenizeResult, Tokenizer};
use std::fmt;
use tools::Encoding;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoundaryPolicy {
    /// Cuts fall on UTF-8 character boundaries; chunks are pushed as text.
    Utf8Aligned,
    /// Cuts may split a character; chunks are pushed as bytes.
    ByteStream,
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPolicy::Utf8Aligned => f.write_str("utf8"),
            BoundaryPolicy::ByteStream => f.write_str("bytes"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkPlan {
    Fixed { size: usize, policy: BoundaryPolicy },
    Boundaries { indices: Vec<usize>, policy: BoundaryPolicy },
}

impl fmt::Display for ChunkPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPlan::Fixed { size, policy } => write!(f, "fixed size={size} policy={policy}"),
            ChunkPlan::Boundaries { indices, policy } => write!(
                f,
                "boundaries count={} policy={policy} indices={indices:?}",
                indices.len()
            ),
        }
    }
}

impl ChunkPlan {
    pub fn policy(&self) -> BoundaryPolicy {
        match self {
            ChunkPlan::Fixed { policy, .. } | ChunkPlan::Boundaries { policy, .. } => *policy,
        }
    }

    /// Cut `input` according to the plan.
    pub fn chunks<'a>(&self, input: &'a str) -> Vec<&'a [u8]> {
        let bytes = input.as_bytes();
        let mut out = Vec::new();
        let mut last = 0usize;
        let mut cut = |end: usize, out: &mut Vec<&'a [u8]>| {
            if end > last {
                out.push(&bytes[last..end]);
                last = end;
            }
        };
        match self {
            ChunkPlan::Fixed { size, policy } => {
                assert!(*size > 0, "chunk size must be > 0");
                let mut end = 0usize;
                while end < bytes.len() {
                    end = (end + size).min(bytes.len());
                    if *policy == BoundaryPolicy::Utf8Aligned {
                        while !input.is_char_boundary(end) {
                            end += 1;
                        }
                    }
                    cut(end, &mut out);
                }
            }
            ChunkPlan::Boundaries { indices, policy } => {
                let mut points = filter_boundaries(input, indices, *policy);
                points.sort_unstable();
                points.dedup();
                for index in points {
                    cut(index, &mut out);
                }
                cut(bytes.len(), &mut out);
            }
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct ChunkPlanCase {
    pub label: String,
    pub plan: ChunkPlan,
}

/// Deterministic plans plus `fuzz_runs` seeded ones for `input`.
pub fn build_chunk_plans(
    input: &str,
    fuzz_runs: usize,
    fuzz_seed: u64,
    policy: BoundaryPolicy,
) -> Vec<ChunkPlanCase> {
    let mut plans = Vec::new();
    for size in [1usize, 2, 3, 4, 8, 16, 32, 64] {
        plans.push(ChunkPlanCase {
            label: format!("fixed size={size}"),
            plan: ChunkPlan::Fixed { size, policy },
        });
    }

    let markup = markup_boundaries(input, policy);
    if !markup.is_empty() {
        plans.push(ChunkPlanCase {
            label: format!("markup boundaries count={}", markup.len()),
            plan: ChunkPlan::Boundaries {
                indices: markup.clone(),
                policy,
            },
        });
    }

    let mut candidates = char_boundaries(input, policy);
    candidates.extend(markup);
    candidates.sort_unstable();
    candidates.dedup();
    for i in 0..fuzz_runs {
        let seed = fuzz_seed.wrapping_add(i as u64);
        let mut rng = Lcg::new(seed);
        let plan = if candidates.is_empty() {
            ChunkPlan::Fixed { size: 1, policy }
        } else {
            let mut picks = candidates.clone();
            rng.shuffle(&mut picks);
            picks.truncate(1 + rng.gen_range(candidates.len().min(32)));
            picks.sort_unstable();
            ChunkPlan::Boundaries {
                indices: picks,
                policy,
            }
        };
        plans.push(ChunkPlanCase {
            label: format!("fuzz seed=0x{seed:016x}"),
            plan,
        });
    }
    plans
}

/// Normalize the whole input at once.
pub fn normalize_whole(input: &str, config: &ParserConfig) -> Vec<String> {
    let mut normalizer = Normalizer::from_str(input, config.clone());
    collect(&mut normalizer, |_| false)
}

/// Normalize `input` fed chunk by chunk as the plan says.
pub fn normalize_chunked(input: &str, plan: &ChunkPlan, config: &ParserConfig) -> Vec<String> {
    let chunks = plan.chunks(input);
    let mut chunks = chunks.into_iter();
    match plan.policy() {
        BoundaryPolicy::Utf8Aligned => {
            let tokenizer = Tokenizer::new(StringSource::new(), config.tokenizer.clone());
            let mut normalizer = Normalizer::new(tokenizer, config.normalizer.clone());
            collect(&mut normalizer, |source: &mut StringSource| {
                match chunks.next() {
                    Some(chunk) => {
                        let text = std::str::from_utf8(chunk).expect("utf-8 aligned chunk");
                        source.push_str(text);
                    }
                    None if source.is_finished() => return false,
                    None => source.finish(),
                }
                true
            })
        }
        BoundaryPolicy::ByteStream => feed_bytes(chunks, config, Encoding::utf8()),
    }
}

/// Normalize the UTF-8 bytes of `input` at once, decoding from `encoding`.
pub fn normalize_whole_bytes(input: &str, config: &ParserConfig, encoding: Encoding) -> Vec<String> {
    let mut normalizer = Normalizer::from_bytes(input.as_bytes(), encoding, config.clone());
    collect(&mut normalizer, |_| false)
}

/// Feed the UTF-8 bytes of `input` as the plan cuts them, decoding from
/// `encoding`. Chunks are always pushed as bytes, whatever the plan policy.
pub fn normalize_chunked_bytes(
    input: &str,
    plan: &ChunkPlan,
    config: &ParserConfig,
    encoding: Encoding,
) -> Vec<String> {
    feed_bytes(plan.chunks(input).into_iter(), config, encoding)
}

fn feed_bytes<'a>(
    mut chunks: impl Iterator<Item = &'a [u8]>,
    config: &ParserConfig,
    encoding: Encoding,
) -> Vec<String> {
    let tokenizer = Tokenizer::new(ByteSource::new(encoding), config.tokenizer.clone());
    let mut normalizer = Normalizer::new(tokenizer, config.normalizer.clone());
    let mut finished = false;
    collect(&mut normalizer, |source: &mut ByteSource| {
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

fn collect<S: InputSource>(
    normalizer: &mut Normalizer<S>,
    mut feed: impl FnMut(&mut S) -> bool,
) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        match normalizer.parse() {
            Ok(TokenizeResult::Token(kind)) => {
                out.push(format_token(normalizer.token()));
                if kind == TokenKind::EndOfFile {
                    break;
                }
            }
            Ok(TokenizeResult::NeedMoreInput) => {
                assert!(feed(normalizer.source_mut()), "pipeline starved after finish");
            }
            Err(err) => {
                out.push(format!("Error({err:?})"));
                break;
            }
        }
    }
    out
}

fn filter_boundaries(input: &str, indices: &[usize], policy: BoundaryPolicy) -> Vec<usize> {
    indices
        .iter()
        .copied()
        .filter(|&index| index > 0 && index < input.len())
        .filter(|&index| policy == BoundaryPolicy::ByteStream || input.is_char_boundary(index))
        .collect()
}

/// Cuts right before and after `<`, `>` and quotes.
fn markup_boundaries(input: &str, policy: BoundaryPolicy) -> Vec<usize> {
    let mut out = Vec::new();
    for index in memchr::memchr3_iter(b'<', b'>', b'"', input.as_bytes())
        .chain(memchr::memchr_iter(b'\'', input.as_bytes()))
    {
        out.push(index);
        out.push(index + 1);
    }
    out.sort_unstable();
    out.dedup();
    filter_boundaries(input, &out, policy)
}

fn char_boundaries(input: &str, policy: BoundaryPolicy) -> Vec<usize> {
    let all: Vec<usize> = match policy {
        BoundaryPolicy::Utf8Aligned => input.char_indices().map(|(index, _)| index).collect(),
        BoundaryPolicy::ByteStream => (0..input.len()).collect(),
    };
    filter_boundaries(input, &all, policy)
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() >> 32) as usize % upper
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_plans_never_split_characters() {
        let input = "a\u{e9}<b>\u{4e2d}</b>";
        let plan = ChunkPlan::Fixed {
            size: 1,
            policy: BoundaryPolicy::Utf8Aligned,
        };
        for chunk in plan.chunks(input) {
            assert!(std::str::from_utf8(chunk).is_ok());
        }
        let joined: Vec<u8> = plan.chunks(input).concat();
        assert_eq!(joined, input.as_bytes());
    }

    #[test]
    fn fuzz_plans_are_reproducible() {
        let input = "<p class='x'>hello</p>";
        let first = build_chunk_plans(input, 4, 7, BoundaryPolicy::ByteStream);
        let second = build_chunk_plans(input, 4, 7, BoundaryPolicy::ByteStream);
        let labels: Vec<_> = first.iter().map(|case| case.plan.to_string()).collect();
        let again: Vec<_> = second.iter().map(|case| case.plan.to_string()).collect();
        assert_eq!(labels, again);
    }

    #[test]
    fn restart_under_byte_splits_matches_whole_input() {
        let input = "<p>caf\u{e9}<meta charset=utf-8>\u{4e2d}";
        let config = ParserConfig::default();
        let whole = normalize_whole_bytes(input, &config, Encoding::windows_1252());
        assert!(whole.iter().any(|line| line == "Restart"));
        for split in 1..input.len() {
            let plan = ChunkPlan::Boundaries {
                indices: vec![split],
                policy: BoundaryPolicy::ByteStream,
            };
            assert_eq!(
                normalize_chunked_bytes(input, &plan, &config, Encoding::windows_1252()),
                whole,
                "split at {split}"
            );
        }
    }

    #[test]
    fn chunked_feed_matches_whole_input() {
        let input = "<ul><li>one<li>tw\u{f6}</ul><b>x<i>y</b>z</i>";
        let config = ParserConfig::default();
        let whole = normalize_whole(input, &config);
        for policy in [BoundaryPolicy::Utf8Aligned, BoundaryPolicy::ByteStream] {
            for case in build_chunk_plans(input, 8, 0x5eed, policy) {
                assert_eq!(
                    normalize_chunked(input, &case.plan, &config),
                    whole,
                    "plan {}",
                    case.label
                );
            }
        }
    }
}
