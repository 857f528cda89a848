//! Recovers structured artifacts from free-form LLM text. Clean
//! markdown artifacts, try strategies in order, stop at the first one
//! that returns anything, and never raise.
//!
//! No strategy here can fail the caller: each returns `None`/empty
//! rather than an error, and [`ArtifactParser::parse_code_package`]
//! always returns at least the heuristic fallback's result (which may
//! itself be empty).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::ArchitecturalPlan;

const MIN_CONTENT_LEN: usize = 20;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```(?:python|py|rust|json)?\s*\n").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)\n```\s*$").unwrap());
static INLINE_BACKTICK_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([a-zA-Z0-9_]+\.[a-zA-Z]+)`").unwrap());

static FILE_START_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)FILE[-_]?START\s*:\s*(.+?)\r?\n(.*?)FILE[-_]?END").unwrap());

static FENCED_WITH_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(?:#+\s*|\*{2})([a-zA-Z0-9_]+\.[a-zA-Z]+)\*{0,2}\s*\n+```(?:\w+)?\s*\n(.*?)\n```").unwrap()
});

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:\w+)?\s*\n(.*?)\n```").unwrap());

static FILENAME_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([a-zA-Z0-9_]+\.py)\b").unwrap());

static HEADER_TRIPLE_EQUALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\n===+\s*([a-zA-Z0-9_]+\.[a-zA-Z]+)\s*===+\n(.*?)(?=\n===+|$)").unwrap());
static HEADER_TRIPLE_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\n---+\s*([a-zA-Z0-9_]+\.[a-zA-Z]+)\s*---+\n(.*?)(?=\n---+|$)").unwrap());

/// Strips markdown fences / inline-backtick-wrapped filenames before any
/// strategy runs.
pub fn clean_response_text(text: &str) -> String {
    let text = FENCE_OPEN.replace_all(text, "");
    let text = FENCE_CLOSE.replace_all(&text, "");
    INLINE_BACKTICK_FILENAME.replace_all(&text, "$1").into_owned()
}

/// `ANALYSIS_START…ANALYSIS_END` marker extraction, falling back to
/// scanning the first 20 lines for diagnostic-sounding keywords.
pub fn extract_analysis(text: &str) -> String {
    if let (Some(start), Some(end)) = (text.find("ANALYSIS_START"), text.find("ANALYSIS_END")) {
        if start < end {
            return text[start..end + "ANALYSIS_END".len()].trim().to_string();
        }
    }
    let keywords = ["issue", "problem", "fix", "error", "bug"];
    let lines: Vec<&str> = text
        .lines()
        .take(20)
        .filter(|line| {
            let lower = line.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .collect();
    if lines.is_empty() {
        "No analysis found".to_string()
    } else {
        lines.join("\n")
    }
}

fn dedupe_insert(map: &mut BTreeMap<String, String>, filename: String, content: String) {
    if map.contains_key(&filename) {
        let (base, ext) = filename.rsplit_once('.').unwrap_or((filename.as_str(), ""));
        let mut idx = 1;
        loop {
            let candidate = format!("{base}_{idx}.{ext}");
            if !map.contains_key(&candidate) {
                map.insert(candidate, content);
                return;
            }
            idx += 1;
        }
    } else {
        map.insert(filename, content);
    }
}

/// Strategy 2: `FILE_START: <name>\n<code>\nFILE_END` blocks.
fn strategy_marker_delimited(text: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for caps in FILE_START_END.captures_iter(text) {
        let filename = caps[1].trim().to_string();
        let content = caps[2].trim().to_string();
        if !filename.is_empty() && content.len() >= MIN_CONTENT_LEN {
            dedupe_insert(&mut files, filename, content);
        }
    }
    files
}

/// Strategy 3: fenced code blocks paired with a filename header line.
fn strategy_fenced_with_filename_hints(text: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for caps in FENCED_WITH_HEADER.captures_iter(text) {
        let filename = caps[1].trim().to_string();
        let content = caps[2].trim().to_string();
        if !filename.is_empty() && content.len() >= MIN_CONTENT_LEN {
            dedupe_insert(&mut files, filename, content);
        }
    }
    if files.is_empty() {
        for re in [&*HEADER_TRIPLE_EQUALS, &*HEADER_TRIPLE_DASH] {
            for caps in re.captures_iter(text) {
                let filename = caps[1].trim().to_string();
                let content = caps[2].trim().to_string();
                if !filename.is_empty() && content.len() >= MIN_CONTENT_LEN {
                    dedupe_insert(&mut files, filename, content);
                }
            }
            if !files.is_empty() {
                break;
            }
        }
    }
    files
}

/// Strategy 4: last resort. Extract fenced blocks and guess filenames
/// from content or positional filename mentions in the surrounding
/// text.
fn strategy_heuristic_fallback(text: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let code_blocks: Vec<String> = FENCED_BLOCK
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .filter(|b| b.len() >= MIN_CONTENT_LEN)
        .collect();

    let filenames_mentioned: Vec<String> = FILENAME_MENTION
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();

    if !code_blocks.is_empty() && filenames_mentioned.len() == code_blocks.len() {
        for (filename, content) in filenames_mentioned.into_iter().zip(code_blocks.into_iter()) {
            dedupe_insert(&mut files, filename, content);
        }
        return files;
    }

    for (i, block) in code_blocks.into_iter().enumerate() {
        let filename = guess_filename(&block, text, i);
        dedupe_insert(&mut files, filename, block);
    }
    files
}

fn guess_filename(block: &str, full_text: &str, index: usize) -> String {
    if block.contains("import pytest") || block.contains("def test_") || block.contains("import unittest") {
        return "test_main.py".to_string();
    }
    if block.contains("if __name__") || block.contains("def main(") {
        return "main.py".to_string();
    }
    if let Some(pos) = full_text.find(block) {
        let context_start = pos.saturating_sub(200);
        let context = &full_text[context_start..pos];
        if let Some(caps) = FILENAME_MENTION.captures(context) {
            return caps[1].to_string();
        }
    }
    if index == 0 {
        "main.py".to_string()
    } else {
        format!("file_{index}.py")
    }
}

/// Single entry point for both code-package and debug-response parsing;
/// runs the three code-recovering strategies (marker / fenced-hints /
/// heuristic) in order and stops at the first non-empty result.
fn parse_files_cascade(cleaned: &str) -> BTreeMap<String, String> {
    let marker = strategy_marker_delimited(cleaned);
    if !marker.is_empty() {
        return marker;
    }
    let fenced = strategy_fenced_with_filename_hints(cleaned);
    if !fenced.is_empty() {
        return fenced;
    }
    strategy_heuristic_fallback(cleaned)
}

/// Strategy 1: structured JSON. Strips fences, locates the first `{`
/// and last `}`, and attempts decode; on a well-formed top-level object
/// with a `files` map this recovers the code package directly without
/// falling through to the text-cascade strategies.
fn try_structured_json_files(cleaned: &str) -> Option<BTreeMap<String, String>> {
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &cleaned[start..=end];
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let files = value.get("files")?.as_object()?;
    let mut map = BTreeMap::new();
    for (k, v) in files {
        if let Some(s) = v.as_str() {
            if s.len() >= MIN_CONTENT_LEN {
                map.insert(k.clone(), s.to_string());
            }
        }
    }
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

#[derive(Debug, Clone)]
pub struct DebugParseResult {
    pub analysis_summary: String,
    pub fixed_files: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct FailureAnalysis {
    pub issues: Vec<String>,
    pub summary: String,
}

/// Zero-sized: the parser holds no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArtifactParser;

impl ArtifactParser {
    pub fn new() -> Self {
        ArtifactParser
    }

    /// `parse_architecture(text) → ArchitecturalPlan | FallbackPlan`.
    /// Attempts structured JSON against the `ArchitecturalPlan` shape;
    /// on any failure returns the documented fallback skeleton with
    /// `low_confidence = true` rather than propagating an error.
    pub fn parse_architecture(&self, text: &str, requirements: &str) -> ArchitecturalPlan {
        let cleaned = clean_response_text(text);
        match self.try_parse_architecture_json(&cleaned, requirements) {
            Some(plan) => plan,
            None => {
                tracing::warn!("architect response could not be parsed; using fallback plan");
                ArchitecturalPlan::fallback(requirements)
            }
        }
    }

    fn try_parse_architecture_json(&self, cleaned: &str, requirements: &str) -> Option<ArchitecturalPlan> {
        let start = cleaned.find('{')?;
        let end = cleaned.rfind('}')?;
        if end <= start {
            return None;
        }
        let candidate = &cleaned[start..=end];
        let value: serde_json::Value = serde_json::from_str(candidate).ok()?;

        let analysis = value.get("analysis")?;
        let file_structure = value.get("file_structure")?;

        let plan: Result<crate::model::ArchitecturalPlan, _> = serde_json::from_value(serde_json::json!({
            "requirements": requirements,
            "analysis": analysis,
            "file_structure": file_structure,
            "detailed_plan": value.get("detailed_plan").cloned().unwrap_or(serde_json::json!({})),
            "timestamp": codeforge_utils::types::now_iso8601(),
            "low_confidence": false,
        }));
        plan.ok()
    }

    /// `parse_code_package(text, expected_filenames) → mapping filename
    /// → source`. Tries structured JSON first, then falls through the
    /// text cascade; `expected_filenames` is used only to log a
    /// mismatch warning, never to reject a result.
    pub fn parse_code_package(&self, text: &str, expected_filenames: &[String]) -> BTreeMap<String, String> {
        let cleaned = clean_response_text(text);
        let files = try_structured_json_files(&cleaned).unwrap_or_else(|| parse_files_cascade(&cleaned));

        if !expected_filenames.is_empty() {
            let missing: Vec<&String> = expected_filenames
                .iter()
                .filter(|f| !files.contains_key(f.as_str()))
                .collect();
            if !missing.is_empty() {
                tracing::warn!(?missing, "coder response is missing expected files");
            }
        }
        files
    }

    /// `parse_debug_response(text) → {analysis_summary, fixed_files}`,
    /// via the marker-delimited strategy.
    pub fn parse_debug_response(&self, text: &str) -> DebugParseResult {
        let cleaned = clean_response_text(text);
        let analysis_summary = extract_analysis(&cleaned);
        let fixed_files = parse_files_cascade(&cleaned);
        DebugParseResult {
            analysis_summary,
            fixed_files,
        }
    }

    /// `parse_failure_analysis(text) → {issues, summary}`.
    pub fn parse_failure_analysis(&self, text: &str) -> FailureAnalysis {
        let cleaned = clean_response_text(text);
        let summary = extract_analysis(&cleaned);
        let issues: Vec<String> = cleaned
            .lines()
            .filter(|l| {
                let lower = l.to_lowercase();
                lower.contains("issue") || lower.contains("error") || lower.contains("bug")
            })
            .map(|l| l.trim().to_string())
            .collect();
        FailureAnalysis { issues, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences_and_inline_backticks() {
        let text = "```python\nprint(1)\n```";
        assert_eq!(clean_response_text(text), "print(1)");
        assert_eq!(clean_response_text("`main.py` is the entry"), "main.py is the entry");
    }

    #[test]
    fn marker_delimited_strategy_recovers_files() {
        let text = "FILE_START: main.py\nprint('hello world')\nFILE_END";
        let parser = ArtifactParser::new();
        let result = parser.parse_debug_response(text);
        assert_eq!(result.fixed_files.get("main.py").unwrap(), "print('hello world')");
    }

    #[test]
    fn fenced_with_header_strategy_recovers_files() {
        let text = "## main.py\n```python\ndef main():\n    return 1\n```";
        let parser = ArtifactParser::new();
        let files = parser.parse_code_package(text, &[]);
        assert!(files.contains_key("main.py"));
        assert!(files["main.py"].contains("def main"));
    }

    #[test]
    fn heuristic_fallback_guesses_test_filename() {
        let text = "```python\nimport pytest\ndef test_add():\n    assert 1 + 1 == 2\n```";
        let parser = ArtifactParser::new();
        let files = parser.parse_code_package(text, &[]);
        assert!(files.contains_key("test_main.py"));
    }

    #[test]
    fn duplicate_filenames_are_disambiguated() {
        let text = "FILE_START: main.py\nprint('first file body')\nFILE_END\nFILE_START: main.py\nprint('second file body')\nFILE_END";
        let parser = ArtifactParser::new();
        let files = parser.parse_debug_response(text).fixed_files;
        assert!(files.contains_key("main.py"));
        assert!(files.contains_key("main_1.py"));
    }

    #[test]
    fn short_content_is_rejected_as_a_code_file() {
        let text = "FILE_START: main.py\nx=1\nFILE_END";
        let parser = ArtifactParser::new();
        let files = parser.parse_debug_response(text).fixed_files;
        assert!(files.is_empty());
    }

    #[test]
    fn total_failure_returns_fallback_plan_not_an_error() {
        let parser = ArtifactParser::new();
        let plan = parser.parse_architecture("not json at all, just prose", "build a thing");
        assert!(plan.low_confidence);
        assert!(plan.entry_point_is_known());
    }

    #[test]
    fn structured_json_round_trips_architecture() {
        let json = r#"{
            "analysis": {"components": ["a", "b", "c"], "dependencies": [], "architecture_type": "cli", "complexity": "simple", "summary": "s"},
            "file_structure": {"files": {"main.py": "entry"}, "entry_point": "main.py", "class_definitions": {}}
        }"#;
        let parser = ArtifactParser::new();
        let plan = parser.parse_architecture(json, "req");
        assert!(!plan.low_confidence);
        assert_eq!(plan.file_structure.entry_point, "main.py");
    }

    #[test]
    fn analysis_markers_are_extracted() {
        let text = "ANALYSIS_START\nthe bug is in save_to_disk\nANALYSIS_END\nFILE_START: main.py\nfixed body goes here\nFILE_END";
        let parser = ArtifactParser::new();
        let result = parser.parse_debug_response(text);
        assert!(result.analysis_summary.contains("save_to_disk"));
    }
}
