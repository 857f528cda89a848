//! Defensive pre-flight scan run before `run_tests`. These are
//! heuristic warnings, not a real parser: the sandbox has no
//! Python front end available, so "syntax validity" is approximated by
//! a balanced-delimiter check, and the rest are regex heuristics over
//! the generated source text. Warnings never abort a run; the
//! Orchestrator may forward them to the Debugger as hints.

use once_cell::sync::Lazy;
use regex::Regex;

static WHILE_TRUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"while\s+True\s*:").unwrap());
static BREAK_OR_RETURN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(break|return|raise|sys\.exit)\b").unwrap());
static BLOCKING_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\binput\s*\(").unwrap());
static DEF_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());
static CONDITIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(if|elif|while|for|try)\b").unwrap());
static LONG_SLEEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"time\.sleep\(\s*(\d+(?:\.\d+)?)\s*\)").unwrap());
static NETWORK_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(requests\.(get|post|put)|urlopen|socket\.connect)\s*\(").unwrap());

const WINDOW: usize = 20;
const LONG_SLEEP_THRESHOLD_S: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct PreflightWarning {
    pub file: String,
    pub message: String,
}

fn is_balanced(content: &str) -> bool {
    let mut depth: i64 = 0;
    for c in content.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

pub fn scan_source(filename: &str, content: &str) -> Vec<PreflightWarning> {
    let mut warnings = Vec::new();

    if !is_balanced(content) {
        warnings.push(PreflightWarning {
            file: filename.to_string(),
            message: "unbalanced brackets/parens detected".to_string(),
        });
    }

    let lines: Vec<&str> = content.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if WHILE_TRUE.is_match(line) {
            let window_end = (i + WINDOW).min(lines.len());
            let window = lines[i..window_end].join("\n");
            if !BREAK_OR_RETURN.is_match(&window) {
                warnings.push(PreflightWarning {
                    file: filename.to_string(),
                    message: format!("line {}: `while True:` with no exit within {WINDOW} lines", i + 1),
                });
            }
        }
        if BLOCKING_INPUT.is_match(line) {
            warnings.push(PreflightWarning {
                file: filename.to_string(),
                message: format!("line {}: blocking call to input()", i + 1),
            });
        }
        if let Some(caps) = LONG_SLEEP.captures(line) {
            if let Ok(secs) = caps[1].parse::<f64>() {
                if secs >= LONG_SLEEP_THRESHOLD_S {
                    warnings.push(PreflightWarning {
                        file: filename.to_string(),
                        message: format!("line {}: sleep of {secs}s may stall the sandbox", i + 1),
                    });
                }
            }
        }
        if NETWORK_CALL.is_match(line) {
            warnings.push(PreflightWarning {
                file: filename.to_string(),
                message: format!("line {}: unbounded network call", i + 1),
            });
        }
    }

    for caps in DEF_NAME.captures_iter(content) {
        let name = &caps[1];
        if let Some(body) = function_body(content, name) {
            let self_call = Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))).unwrap();
            let calls: usize = self_call.find_iter(&body).count();
            if calls >= 1 && !CONDITIONAL.is_match(&body) {
                warnings.push(PreflightWarning {
                    file: filename.to_string(),
                    message: format!("function `{name}` recurses without a conditional base case"),
                });
            }
        }
    }

    warnings
}

/// Best-effort indentation-based body extraction for the recursion
/// heuristic; not a real parser, only enough to bound the scan.
fn function_body(content: &str, name: &str) -> Option<String> {
    let marker = format!("def {name}(");
    let start = content.find(&marker)?;
    let after_def = &content[start..];
    let def_line_end = after_def.find('\n')?;
    let rest = &after_def[def_line_end + 1..];

    let mut body_lines = Vec::new();
    for line in rest.lines() {
        if line.trim().is_empty() {
            body_lines.push(line);
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent == 0 && !line.starts_with(' ') && !line.starts_with('\t') {
            break;
        }
        body_lines.push(line);
    }
    Some(body_lines.join("\n"))
}
