use serde::de::DeserializeOwned;

use crate::error::AiError;

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Locate the first top-level `{...}` block in free-form model output.
///
/// Scans from the first `{` to its matching `}`. Braces inside string
/// literals do not count. Text after the block is ignored.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse model output as JSON, tolerating prose and code fences around it.
///
/// Strict parse of the whole text first, then of the extracted `{...}` block.
pub fn parse_json_lenient<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    let cleaned = strip_code_blocks(raw);
    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            let block = extract_json_object(cleaned).ok_or_else(|| {
                AiError::Parse(format!("no JSON object in response: {strict_err}"))
            })?;
            serde_json::from_str(block).map_err(|e| AiError::Parse(e.to_string()))
        }
    }
}
