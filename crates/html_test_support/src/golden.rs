//! Golden event fixtures.
//!
//! A fixture file is TOML:
//!
//! ```toml
//! format = "golden-events-v1"
//!
//! [[cases]]
//! id = "overlap-basic"
//! input = "<b>A<div>B</b>C</div>"
//! expected = ["Begin(b)", "Text(\"A\")", "..."]
//! status = "active" # or "xfail" / "skip", which need a reason
//! ```
//!
//! A case that fails ends its `expected` list with `Error(..)` holding the
//! debug form of the error instead of `EOF`.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const GOLDEN_FORMAT_V1: &str = "golden-events-v1";

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Active,
    Xfail,
    Skip,
}

/// Per-case pipeline overrides; unset fields keep the defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CaseConfig {
    pub max_depth: Option<usize>,
    pub collapse_whitespace: Option<bool>,
    pub max_text_bytes: Option<usize>,
    pub max_tag_bytes: Option<usize>,
    pub decode_entities: Option<bool>,
    pub sniff_charset: Option<bool>,
    pub header: Option<String>,
    pub footer: Option<String>,
    /// Feed the input as UTF-8 bytes decoded starting with this encoding.
    pub encoding: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GoldenCase {
    pub id: String,
    pub input: String,
    pub expected: Vec<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub config: CaseConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GoldenFile {
    format: String,
    cases: Vec<GoldenCase>,
}

/// Load and validate one fixture file. Panics with the path on any problem.
pub fn load_golden(path: &Path) -> Vec<GoldenCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read golden fixture {path:?}: {err}"));
    let file: GoldenFile = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse golden fixture {path:?}: {err}"));
    assert_eq!(
        file.format, GOLDEN_FORMAT_V1,
        "unsupported golden fixture format in {path:?}"
    );
    validate_cases(&file.cases, path);
    file.cases
}

/// Load every `*.toml` fixture under `dir`, in path order.
pub fn load_golden_dir(dir: &Path) -> Vec<(PathBuf, GoldenCase)> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to list golden fixtures in {dir:?}: {err}"))
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no golden fixtures in {dir:?}");

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for path in paths {
        for case in load_golden(&path) {
            assert!(
                seen.insert(case.id.clone()),
                "duplicate golden case id '{}' in {path:?}",
                case.id
            );
            out.push((path.clone(), case));
        }
    }
    out
}

fn validate_cases(cases: &[GoldenCase], path: &Path) {
    let mut ids = BTreeSet::new();
    for case in cases {
        assert!(!case.id.trim().is_empty(), "empty case id in {path:?}");
        assert!(
            ids.insert(case.id.as_str()),
            "duplicate case id '{}' in {path:?}",
            case.id
        );
        if case.status != CaseStatus::Active {
            assert!(
                !case.reason.trim().is_empty(),
                "case '{}' in {path:?} is {:?} without a reason",
                case.id,
                case.status
            );
        }
        if case.status != CaseStatus::Skip {
            let last = case.expected.last().map(String::as_str).unwrap_or_default();
            assert!(
                last == "EOF" || last.starts_with("Error("),
                "case '{}' in {path:?} must end with EOF or an error",
                case.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cases_with_defaults() {
        let file: GoldenFile = toml::from_str(
            r#"
format = "golden-events-v1"

[[cases]]
id = "one"
input = "x"
expected = ["Text(\"x\")", "EOF"]

[[cases]]
id = "two"
input = "<b>"
expected = []
status = "skip"
reason = "not decided"
config = { max_depth = 4 }
"#,
        )
        .expect("fixture parses");
        assert_eq!(file.cases[0].status, CaseStatus::Active);
        assert_eq!(file.cases[1].status, CaseStatus::Skip);
        assert_eq!(file.cases[1].config.max_depth, Some(4));
        validate_cases(&file.cases, Path::new("inline"));
    }

    #[test]
    #[should_panic(expected = "without a reason")]
    fn xfail_needs_a_reason() {
        let case = GoldenCase {
            id: "x".to_string(),
            input: String::new(),
            expected: vec!["EOF".to_string()],
            status: CaseStatus::Xfail,
            reason: String::new(),
            config: CaseConfig::default(),
        };
        validate_cases(&[case], Path::new("inline"));
    }
}
