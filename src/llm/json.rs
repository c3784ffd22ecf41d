//! Pulling a JSON object out of free-form model output.
//!
//! Models wrap JSON in markdown fences or chat around it. Extraction prefers
//! a fenced block, then the first `{` that starts a parseable object.

/// Extract the JSON object from a model response.
///
/// Returns the trimmed input unchanged when nothing object-like is found, so
/// the caller's parse error reports what the model actually said.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(inner) = fenced_block(trimmed) {
        return inner.to_string();
    }

    for (start, _) in trimmed.match_indices('{') {
        if let Some(object) = balanced_object(&trimmed[start..])
            && serde_json::from_str::<serde_json::Value>(object).is_ok()
        {
            return object.to_string();
        }
    }

    trimmed.to_string()
}

/// Contents of the first ```` ```json ```` block, or of a bare fence holding an object.
fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        let end = body.find("```")?;
        return Some(body[..end].trim());
    }

    let start = text.find("```")?;
    let body = &text[start + 3..];
    let end = body.find("```")?;
    let inner = body[..end].trim();
    inner.starts_with('{').then_some(inner)
}

/// The prefix of `text` up to the brace closing its leading `{`.
///
/// Braces inside string literals (including escaped quotes) are ignored.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}
