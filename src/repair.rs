//! Best-effort extraction of a JSON object from a free-form model reply.
//!
//! The text-generation service is instructed to answer with JSON only, but
//! replies routinely arrive wrapped in code fences or explanatory prose, or
//! with typographic quotes. This module applies one documented repair pass:
//! fence stripping, quote normalization, then outermost balanced-brace
//! extraction. Anything that still fails to decode afterwards is a
//! [`PipelineError::MalformedResponse`].

use crate::error::{PipelineError, PipelineResult};

pub fn strip_code_blocks(s: &str) -> &str {
    let s = s.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}

/// Replaces typographic double and single quotes with their ASCII forms.
pub fn normalize_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' | '\u{201e}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Returns the outermost balanced-brace span, skipping braces that occur
/// inside string literals.
pub fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in input.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The full repair pass. Returns the best candidate JSON object text.
pub fn repair_json(reply: &str) -> PipelineResult<String> {
    let stripped = strip_code_blocks(reply);
    let normalized = normalize_quotes(stripped);
    extract_json_object(&normalized)
        .map(str::to_string)
        .ok_or_else(|| {
            let head: String = reply.chars().take(120).collect();
            PipelineError::MalformedResponse(format!("no JSON object in reply: {head}"))
        })
}
