//! Feeding the input in pieces never changes the event stream.

use html::chunker::{
    BoundaryPolicy, ChunkPlan, build_chunk_plans, normalize_chunked, normalize_chunked_bytes,
    normalize_whole,
};
use html_test_support::golden::{CaseStatus, GoldenCase, load_golden_dir};
use html_test_support::pipeline::{parser_config, run_case};
use html_test_support::{diff_lines, parse_u64};
use std::path::{Path, PathBuf};
use tools::Encoding;

const FUZZ_RUNS_ENV: &str = "MARKGUARD_FUZZ_RUNS";
const FUZZ_SEED_ENV: &str = "MARKGUARD_FUZZ_SEED";
const DEFAULT_FUZZ_RUNS: usize = 8;
const DEFAULT_FUZZ_SEED: u64 = 0xC0FFEE;

fn fuzz_settings() -> (usize, u64) {
    let runs = std::env::var(FUZZ_RUNS_ENV)
        .ok()
        .map(|raw| {
            parse_u64(&raw).unwrap_or_else(|| panic!("invalid {FUZZ_RUNS_ENV} value '{raw}'")) as usize
        })
        .unwrap_or(DEFAULT_FUZZ_RUNS);
    let seed = std::env::var(FUZZ_SEED_ENV)
        .ok()
        .map(|raw| parse_u64(&raw).unwrap_or_else(|| panic!("invalid {FUZZ_SEED_ENV} value '{raw}'")))
        .unwrap_or(DEFAULT_FUZZ_SEED);
    (runs, seed)
}

fn golden_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/golden")
}

fn active_cases() -> Vec<GoldenCase> {
    load_golden_dir(&golden_dir())
        .into_iter()
        .map(|(_, case)| case)
        .filter(|case| case.status == CaseStatus::Active)
        .collect()
}

fn case_encoding(case: &GoldenCase) -> Option<Encoding> {
    let label = case.config.encoding.as_deref()?;
    let encoding = Encoding::for_label(label)
        .unwrap_or_else(|| panic!("case '{}': unknown encoding {label:?}", case.id));
    Some(encoding)
}

/// Feed `case` as `plan` cuts it; cases with a starting encoding go
/// through a byte source decoding from that encoding.
fn chunked_case(case: &GoldenCase, plan: &ChunkPlan) -> Vec<String> {
    let config = parser_config(&case.config);
    match case_encoding(case) {
        Some(encoding) => normalize_chunked_bytes(&case.input, plan, &config, encoding),
        None => normalize_chunked(&case.input, plan, &config),
    }
}

/// Byte cuts only for cases with a starting encoding; both kinds otherwise.
fn policies(case: &GoldenCase) -> &'static [BoundaryPolicy] {
    if case.config.encoding.is_some() {
        &[BoundaryPolicy::ByteStream]
    } else {
        &[BoundaryPolicy::Utf8Aligned, BoundaryPolicy::ByteStream]
    }
}

#[test]
fn encoding_cases_survive_byte_chunking() {
    let (fuzz_runs, fuzz_seed) = fuzz_settings();
    let mut checked = 0usize;
    for case in active_cases().iter().filter(|case| case.config.encoding.is_some()) {
        let whole = run_case(case);
        for plan in build_chunk_plans(&case.input, fuzz_runs, fuzz_seed, BoundaryPolicy::ByteStream) {
            let chunked = chunked_case(case, &plan.plan);
            assert!(
                chunked == whole,
                "case '{}' differs under {} ({}):\n{}",
                case.id,
                plan.label,
                plan.plan,
                diff_lines(&whole, &chunked)
            );
            checked += 1;
        }
    }
    assert!(checked > 0, "no encoding cases were checked");
}

#[test]
fn every_two_chunk_split_matches_whole_input() {
    for case in active_cases() {
        let whole = run_case(&case);
        for &policy in policies(&case) {
            for split in 1..case.input.len() {
                if policy == BoundaryPolicy::Utf8Aligned && !case.input.is_char_boundary(split) {
                    continue;
                }
                let plan = ChunkPlan::Boundaries {
                    indices: vec![split],
                    policy,
                };
                let chunked = chunked_case(&case, &plan);
                assert!(
                    chunked == whole,
                    "case '{}' differs when split at {split} ({policy}):\n{}",
                    case.id,
                    diff_lines(&whole, &chunked)
                );
            }
        }
    }
}

#[test]
fn golden_cases_survive_any_chunking() {
    let (fuzz_runs, fuzz_seed) = fuzz_settings();
    let mut checked = 0usize;

    for case in active_cases() {
        if case.config.encoding.is_some() {
            continue;
        }
        let config = parser_config(&case.config);
        let whole = normalize_whole(&case.input, &config);
        for policy in [BoundaryPolicy::Utf8Aligned, BoundaryPolicy::ByteStream] {
            for plan in build_chunk_plans(&case.input, fuzz_runs, fuzz_seed, policy) {
                let chunked = normalize_chunked(&case.input, &plan.plan, &config);
                assert!(
                    chunked == whole,
                    "case '{}' differs under {} ({}):\n{}",
                    case.id,
                    plan.label,
                    plan.plan,
                    diff_lines(&whole, &chunked)
                );
                checked += 1;
            }
        }
    }
    assert!(checked > 0, "no chunk plans were checked");
}

#[test]
fn mixed_document_survives_any_chunking() {
    let input = "<!DOCTYPE html><html><head><title>T &amp; U</title>\
<script>if (a<b) x('</p>')</script></head><body class=x>\
<p>caf\u{e9} &copy; <b>bold <i>both</b> italic</i>\n\
<table><tr><td>\u{4e2d}\n\u{6587}<td>cell</table>\
<ul><li>one<li>two</ul><!-- done --></body></html>";
    let (fuzz_runs, fuzz_seed) = fuzz_settings();
    let config = parser_config(&Default::default());
    let whole = normalize_whole(input, &config);
    assert_eq!(whole.last().map(String::as_str), Some("EOF"));
    for policy in [BoundaryPolicy::Utf8Aligned, BoundaryPolicy::ByteStream] {
        for plan in build_chunk_plans(input, fuzz_runs * 4, fuzz_seed, policy) {
            let chunked = normalize_chunked(input, &plan.plan, &config);
            assert!(
                chunked == whole,
                "differs under {} ({}):\n{}",
                plan.label,
                plan.plan,
                diff_lines(&whole, &chunked)
            );
        }
    }
}
