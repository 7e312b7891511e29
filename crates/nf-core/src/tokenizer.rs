use std::collections::HashSet;

/// Tokenize text into lowercase whitespace-separated words.
/// Punctuation stays attached: resonance compares raw words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Distinct lowercase words of `text`.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// True when `text` has no words at all.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
