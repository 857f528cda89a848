//! Strips any `def test_*` whose body reaches a blocking pattern before
//! the test file is written to disk. Prevents a misgenerated test from
//! hanging the sandbox indefinitely regardless of the subprocess
//! timeout (the hang could be inside a single test within the suite).

use once_cell::sync::Lazy;
use regex::Regex;

static TEST_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^def\s+(test_[A-Za-z0-9_]*)\s*\(").unwrap());
static BLOCKING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.run\s*\(|\.main_loop\s*\(|\.start\s*\(|while\s+True\s*:|input\s*\(").unwrap()
});

pub struct FilterResult {
    pub source: String,
    pub removed_tests: Vec<String>,
}

pub fn filter_blocking_tests(content: &str) -> FilterResult {
    let lines: Vec<&str> = content.lines().collect();
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(caps) = TEST_DEF.captures(line.trim_start()) {
            let name = caps[1].to_string();
            let indent = line.len() - line.trim_start().len();
            let mut j = i + 1;
            let mut body_lines = vec![line];
            while j < lines.len() {
                let next = lines[j];
                if next.trim().is_empty() {
                    body_lines.push(next);
                    j += 1;
                    continue;
                }
                let next_indent = next.len() - next.trim_start().len();
                if next_indent <= indent {
                    break;
                }
                body_lines.push(next);
                j += 1;
            }
            let body = body_lines.join("\n");
            if BLOCKING_PATTERN.is_match(&body) && !has_bounded_deadline(&body) {
                removed.push(name);
                i = j;
                continue;
            }
            kept.extend(body_lines);
            i = j;
            continue;
        }
        kept.push(line);
        i += 1;
    }

    FilterResult {
        source: kept.join("\n"),
        removed_tests: removed,
    }
}

fn has_bounded_deadline(body: &str) -> bool {
    body.contains("@pytest.mark.timeout") || body.contains("timeout=")
}
