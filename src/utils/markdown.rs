//! Telegram MarkdownV2 helpers.

/// Characters with special meaning in MarkdownV2.
const SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Backslash-escapes every MarkdownV2 special character in `text`.
///
/// # Example
/// ```
/// use art_studio_bot::utils::markdown::escape_markdown;
///
/// let text = "Still life (oils) - 2h!";
/// assert_eq!(escape_markdown(text), "Still life \\(oils\\) \\- 2h\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escaped text wrapped in bold markers.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}
