//! Extract file content from a model response.
//!
//! Generation prompts ask for raw file content, but models still wrap their
//! output in markdown fences or surround it with commentary. Every generated
//! response passes through [`extract_content`] before it is written to disk.

/// Strip markdown fences and surrounding prose from a generation response.
///
/// If the response contains a fenced block, the first block's body wins and
/// anything outside it is dropped. An optional language tag on the opening
/// fence (` ```python `) is discarded with the fence line. Responses without
/// fences are returned trimmed.
pub fn extract_content(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let Some(fence) = trimmed.find("```") else {
        return trimmed.to_string();
    };

    let after_fence = &trimmed[fence + 3..];
    // The rest of the fence line is a language tag; the body starts after it.
    let body = match after_fence.find('\n') {
        Some(eol) => &after_fence[eol + 1..],
        None => return trimmed.to_string(),
    };

    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };

    body.trim_matches('\n').to_string()
}
